//! Application Configuration Module
//!
//! Serde model of the RadioGPIO configuration file. Keys are PascalCase to
//! stay compatible with existing `config.json` files; sections this crate
//! does not know about (such as `Interface`) are ignored.
//!
//! JSON and TOML are both accepted, picked by the file extension.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Root of the configuration file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppConfig {
    /// Named action sequences triggered by input commands
    #[serde(default)]
    pub actions: Vec<ActionConfig>,

    /// Module settings keyed by module identifier
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConfig>,
}

/// Direction of a GPIO module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ModuleKind {
    Input,
    Output,
}

/// Settings of one module
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModuleConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Explicit direction, inferred from the module key when absent
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ModuleKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    /// Bind address of an input module
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,

    /// Remote host of an output module
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,

    /// CIDR blocks allowed to reach an input module
    #[serde(rename = "AllowedIP", default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_ip: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_commands: Vec<InputCommandConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_commands: Vec<OutputCommandConfig>,

    /// Input poll rate in Hz
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_rate: Option<u32>,
}

impl ModuleConfig {
    /// Configured direction, falling back to the conventional module keys
    pub fn resolve_kind(&self, module_key: &str) -> Option<ModuleKind> {
        self.kind.or_else(|| match module_key.to_ascii_lowercase().as_str() {
            "gpi" => Some(ModuleKind::Input),
            "gpo" => Some(ModuleKind::Output),
            _ => None,
        })
    }
}

/// Payload recognized by an input module and the actions it triggers
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputCommandConfig {
    #[serde(default)]
    pub payload: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default)]
    pub actions: Vec<String>,
}

/// Named payload an output module can send
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputCommandConfig {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default)]
    pub payload: String,
}

/// Named sequence of steps
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActionConfig {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default)]
    pub sequence: Vec<SequenceStepConfig>,
}

/// One step of an action sequence
///
/// `Type` stays a string here so an unknown step type is reported with the
/// action that contains it rather than as a parse failure of the whole file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SequenceStepConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub step_type: Option<String>,

    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_command: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Self::Toml),
            _ => bail!(
                "Unsupported configuration format for {:?} (expected .json or .toml)",
                path
            ),
        }
    }
}

impl Default for AppConfig {
    /// Starter configuration written when no file exists yet
    fn default() -> Self {
        let mut modules = BTreeMap::new();

        modules.insert(
            "GPI".to_string(),
            ModuleConfig {
                enabled: true,
                protocol: Some("tcp".to_string()),
                listen: Some("0.0.0.0".to_string()),
                port: Some(9310),
                encoding: Some("utf-8".to_string()),
                separator: Some("\n".to_string()),
                allowed_ip: vec!["127.0.0.0/8".to_string()],
                ..ModuleConfig::default()
            },
        );

        modules.insert(
            "GPO".to_string(),
            ModuleConfig {
                enabled: true,
                protocol: Some("tcp".to_string()),
                hostname: Some("192.168.0.1".to_string()),
                port: Some(9310),
                encoding: Some("utf-8".to_string()),
                separator: Some("\n".to_string()),
                ..ModuleConfig::default()
            },
        );

        Self {
            actions: Vec::new(),
            modules,
        }
    }
}

impl AppConfig {
    /// Load and parse a configuration file, then expand environment variables
    pub fn load(path: &Path) -> Result<Self> {
        let format = FileFormat::from_path(path)?;
        debug!("Loading configuration from {:?}", path);

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {:?}", path))?;

        let mut config: Self = match format {
            FileFormat::Json => serde_json::from_str(&raw)
                .with_context(|| format!("Unable to parse configuration {:?}", path))?,
            FileFormat::Toml => toml::from_str(&raw)
                .with_context(|| format!("Unable to parse configuration {:?}", path))?,
        };

        config.expand_env_vars()?;

        info!(
            modules = config.modules.len(),
            actions = config.actions.len(),
            "Configuration loaded from {:?}",
            path
        );
        Ok(config)
    }

    /// Write this configuration to `path` in the format its extension names
    pub fn save(&self, path: &Path) -> Result<()> {
        let rendered = match FileFormat::from_path(path)? {
            FileFormat::Json => serde_json::to_string_pretty(self)
                .context("Failed to serialize configuration as JSON")?,
            FileFormat::Toml => {
                toml::to_string_pretty(self).context("Failed to serialize configuration as TOML")?
            }
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        fs::write(path, rendered)
            .with_context(|| format!("Failed to write configuration file {:?}", path))?;

        debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Enabled modules in key order
    pub fn enabled_modules(&self) -> impl Iterator<Item = (&String, &ModuleConfig)> {
        self.modules.iter().filter(|(_, module)| module.enabled)
    }

    /// Expand `${VAR}` references in host fields
    pub fn expand_env_vars(&mut self) -> Result<()> {
        for (name, module) in &mut self.modules {
            if let Some(listen) = &module.listen {
                let expanded = shellexpand::env(listen)
                    .with_context(|| format!("Failed to expand Listen of module {}", name))?;
                module.listen = Some(expanded.to_string());
            }

            if let Some(hostname) = &module.hostname {
                let expanded = shellexpand::env(hostname)
                    .with_context(|| format!("Failed to expand Hostname of module {}", name))?;
                module.hostname = Some(expanded.to_string());
            }
        }

        Ok(())
    }
}
