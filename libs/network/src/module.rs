//! GPIO module actor
//!
//! Wraps an input or output module so it can run on the shared actor loop.
//! Input modules poll their socket from `tick` and never block on the
//! mailbox; output modules do nothing until a command arrives.

use crate::commands::OutputCommandInfo;
use crate::input::InputModule;
use crate::link::ModuleLink;
use crate::output::OutputModule;
use gpio_actors::{Actor, PollPolicy};
use gpio_config::{ModuleConfig, ModuleKind};
use gpio_types::{Alert, BaseState, GpioError, ModuleId, ModuleStatus, Result};
use std::time::Duration;
use tracing::{debug, info};

/// Commands a module accepts through its mailbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleCommand {
    /// Send the named output command after `delay`
    RunOutputCommand { name: String, delay: Duration },
    /// Send raw bytes followed by the separator
    SendPayload(Vec<u8>),
    /// List the output commands available for manual sending
    ListOutputCommands,
}

impl ModuleCommand {
    fn label(&self) -> &'static str {
        match self {
            Self::RunOutputCommand { .. } => "RunOutputCommand",
            Self::SendPayload(_) => "SendPayload",
            Self::ListOutputCommands => "ListOutputCommands",
        }
    }
}

/// Replies handed to message callbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleReply {
    /// Whether anything was written to the socket
    Sent(bool),
    OutputCommands(Vec<OutputCommandInfo>),
}

/// A configured GPIO module
pub enum GpioModule {
    Input(InputModule),
    Output(OutputModule),
}

impl GpioModule {
    /// Build the module named by `id` from its configuration
    pub fn init(id: ModuleId, config: &ModuleConfig, link: Box<dyn ModuleLink>) -> Result<Self> {
        debug!(module = %id, "Initializing module");

        match config.resolve_kind(id.name()) {
            Some(ModuleKind::Input) => Ok(Self::Input(InputModule::init(id, config, link)?)),
            Some(ModuleKind::Output) => Ok(Self::Output(OutputModule::init(id, config, link)?)),
            None => Err(GpioError::configuration(format!(
                "Module \"{}\" has no Type and is not a known module",
                id
            ))
            .into_fatal()),
        }
    }

    pub fn id(&self) -> &ModuleId {
        match self {
            Self::Input(module) => module.id(),
            Self::Output(module) => module.id(),
        }
    }

    pub fn kind(&self) -> ModuleKind {
        match self {
            Self::Input(_) => ModuleKind::Input,
            Self::Output(_) => ModuleKind::Output,
        }
    }

    /// Mailbox policy: inputs spin on their socket timeout, outputs wait
    pub fn poll_policy(&self) -> PollPolicy {
        match self {
            Self::Input(_) => PollPolicy::non_blocking(0, Duration::ZERO),
            Self::Output(_) => PollPolicy::default(),
        }
    }

    fn link(&self) -> &dyn ModuleLink {
        match self {
            Self::Input(module) => module.link(),
            Self::Output(module) => module.link(),
        }
    }

    fn unsupported(&self, command: &ModuleCommand) -> GpioError {
        GpioError::configuration(format!(
            "Module {} does not support {}",
            self.id(),
            command.label()
        ))
    }
}

impl Actor for GpioModule {
    type Command = ModuleCommand;
    type Reply = ModuleReply;

    fn name(&self) -> &str {
        self.id().name()
    }

    fn pre_start(&mut self) -> Result<()> {
        let id = self.id().clone();
        let running = self.link().update_status(
            &id,
            ModuleStatus::new(BaseState::Running),
            Some(ModuleStatus::new(BaseState::Initialized)),
        );

        match running {
            Some(_) => info!(module = %id, "Module running"),
            None => debug!(module = %id, "Module not initialized, status left unchanged"),
        }
        Ok(())
    }

    fn tick(&mut self) -> Result<()> {
        match self {
            Self::Input(module) => module.poll(),
            Self::Output(_) => Ok(()),
        }
    }

    fn handle(&mut self, command: ModuleCommand) -> Result<ModuleReply> {
        let module = match self {
            Self::Output(module) => module,
            Self::Input(_) => return Err(self.unsupported(&command)),
        };

        match command {
            ModuleCommand::RunOutputCommand { name, delay } => {
                module.run_output_command(&name, delay).map(ModuleReply::Sent)
            }
            ModuleCommand::SendPayload(payload) => module.send(&payload).map(ModuleReply::Sent),
            ModuleCommand::ListOutputCommands => {
                Ok(ModuleReply::OutputCommands(module.output_commands()))
            }
        }
    }

    fn report_error(&mut self, error: &GpioError) {
        self.link().report_alert(Alert::runtime_error(error));
    }

    fn cleanup(&mut self) {
        match self {
            Self::Input(module) => module.close(),
            Self::Output(module) => module.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingLink;
    use gpio_types::Severity;
    use std::net::UdpSocket;

    fn input_config() -> ModuleConfig {
        ModuleConfig {
            enabled: true,
            protocol: Some("udp".to_string()),
            listen: Some("127.0.0.1".to_string()),
            port: Some(0),
            ..ModuleConfig::default()
        }
    }

    #[test]
    fn test_kind_follows_module_key() {
        let link = RecordingLink::new();
        let module = GpioModule::init(ModuleId::new("GPI"), &input_config(), link.boxed()).unwrap();
        assert_eq!(module.kind(), ModuleKind::Input);
        assert!(!module.poll_policy().blocking);
    }

    #[test]
    fn test_unknown_module_key_without_type_is_fatal() {
        let link = RecordingLink::new();
        let err = GpioModule::init(ModuleId::new("Relay"), &input_config(), link.boxed())
            .err()
            .unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_pre_start_promotes_initialized_to_running() {
        let link = RecordingLink::new();
        let gpi = ModuleId::new("GPI");
        let mut module = GpioModule::init(gpi.clone(), &input_config(), link.boxed()).unwrap();

        module.pre_start().unwrap();
        assert_eq!(link.status(&gpi), Some(ModuleStatus::new(BaseState::Running)));
    }

    #[test]
    fn test_pre_start_leaves_failed_output_errored() {
        let link = RecordingLink::new();
        let gpo = ModuleId::new("GPO");
        let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = closed.local_addr().unwrap().port();
        drop(closed);

        let config = ModuleConfig {
            enabled: true,
            protocol: Some("tcp".to_string()),
            hostname: Some("127.0.0.1".to_string()),
            port: Some(port),
            ..ModuleConfig::default()
        };
        let mut module = GpioModule::init(gpo.clone(), &config, link.boxed()).unwrap();

        module.pre_start().unwrap();
        assert_eq!(link.status(&gpo), Some(ModuleStatus::activity(BaseState::Error, true)));
    }

    #[test]
    fn test_output_command_on_input_module_is_non_fatal() {
        let link = RecordingLink::new();
        let mut module = GpioModule::init(ModuleId::new("GPI"), &input_config(), link.boxed()).unwrap();

        let err = module
            .handle(ModuleCommand::RunOutputCommand {
                name: "Play".to_string(),
                delay: Duration::ZERO,
            })
            .unwrap_err();
        assert!(!err.is_fatal());

        module.report_error(&err);
        let alerts = link.alerts();
        assert_eq!(alerts[0].title, "Runtime Error");
        assert_eq!(alerts[0].severity, Severity::Error);
    }

    #[test]
    fn test_send_payload_reaches_udp_peer() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let config = ModuleConfig {
            enabled: true,
            protocol: Some("udp".to_string()),
            hostname: Some("127.0.0.1".to_string()),
            port: Some(receiver.local_addr().unwrap().port()),
            separator: Some("\r\n".to_string()),
            ..ModuleConfig::default()
        };

        let link = RecordingLink::new();
        let mut module = GpioModule::init(ModuleId::new("GPO"), &config, link.boxed()).unwrap();

        let reply = module.handle(ModuleCommand::SendPayload(b"ON AIR".to_vec())).unwrap();
        assert_eq!(reply, ModuleReply::Sent(true));

        let mut buffer = [0u8; 64];
        let len = receiver.recv(&mut buffer).unwrap();
        assert_eq!(&buffer[..len], b"ON AIR\r\n");
    }
}
