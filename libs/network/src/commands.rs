//! Command tables
//!
//! Compiled once at module init from the module's configuration and never
//! modified afterwards.

use crate::framing::TextEncoding;
use gpio_config::{InputCommandConfig, OutputCommandConfig};
use gpio_types::Result;

/// Payload recognized by an input module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputCommand {
    pub payload: String,
    pub label: Option<String>,
    pub actions: Vec<String>,
}

/// Ordered input-command table, matched by exact payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputCommandTable {
    commands: Vec<InputCommand>,
}

impl InputCommandTable {
    pub fn compile(configs: &[InputCommandConfig]) -> Self {
        let commands = configs
            .iter()
            .map(|config| InputCommand {
                payload: config.payload.clone(),
                label: config.text.clone(),
                actions: config.actions.clone(),
            })
            .collect();
        Self { commands }
    }

    /// First entry whose payload equals `token`
    pub fn lookup(&self, token: &str) -> Option<&InputCommand> {
        self.commands.iter().find(|command| command.payload == token)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Named payload of an output module, already encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputCommand {
    pub name: String,
    pub label: String,
    pub payload: Vec<u8>,
}

/// Name and label of an output command, for manual send menus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputCommandInfo {
    pub name: String,
    pub label: String,
}

/// Ordered output-command table, scanned by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputCommandTable {
    commands: Vec<OutputCommand>,
}

impl OutputCommandTable {
    /// Encode every payload; an unencodable payload is fatal
    pub fn compile(configs: &[OutputCommandConfig], encoding: TextEncoding) -> Result<Self> {
        let commands = configs
            .iter()
            .map(|config| {
                Ok(OutputCommand {
                    name: config.name.clone(),
                    label: config.text.clone().unwrap_or_else(|| config.name.clone()),
                    payload: encoding.encode(&config.payload)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { commands })
    }

    pub fn find(&self, name: &str) -> Option<&OutputCommand> {
        self.commands.iter().find(|command| command.name == name)
    }

    pub fn listing(&self) -> Vec<OutputCommandInfo> {
        self.commands
            .iter()
            .map(|command| OutputCommandInfo {
                name: command.name.clone(),
                label: command.label.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(payload: &str, actions: &[&str]) -> InputCommandConfig {
        InputCommandConfig {
            payload: payload.to_string(),
            text: None,
            actions: actions.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn output(name: &str, text: Option<&str>, payload: &str) -> OutputCommandConfig {
        OutputCommandConfig {
            name: name.to_string(),
            text: text.map(str::to_string),
            payload: payload.to_string(),
        }
    }

    #[test]
    fn test_input_lookup_is_exact_and_first_match_wins() {
        let table = InputCommandTable::compile(&[
            input("OPEN", &["Open"]),
            input("open", &["Lower"]),
            input("OPEN", &["Shadowed"]),
        ]);

        assert_eq!(table.len(), 3);
        assert_eq!(table.lookup("OPEN").unwrap().actions, vec!["Open"]);
        assert_eq!(table.lookup("open").unwrap().actions, vec!["Lower"]);
        assert!(table.lookup("OPEN ").is_none());
    }

    #[test]
    fn test_output_table_encodes_payloads() {
        let table = OutputCommandTable::compile(
            &[output("Play", Some("Play cart"), "PLAY"), output("Stop", None, "STOP")],
            TextEncoding::Latin1,
        )
        .unwrap();

        assert_eq!(table.find("Play").unwrap().payload, b"PLAY".to_vec());
        assert!(table.find("play").is_none());
        assert_eq!(
            table.listing(),
            vec![
                OutputCommandInfo {
                    name: "Play".to_string(),
                    label: "Play cart".to_string()
                },
                OutputCommandInfo {
                    name: "Stop".to_string(),
                    label: "Stop".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_unencodable_output_payload_is_fatal() {
        let err = OutputCommandTable::compile(&[output("Euro", None, "€")], TextEncoding::Ascii)
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
