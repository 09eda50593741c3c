//! Output (sender) module
//!
//! Connects once at init and writes separator-terminated payloads. There is
//! no reconnect: after a failed connect or a failed write the module stays
//! flagged as errored until the process is restarted.

use crate::commands::{OutputCommandInfo, OutputCommandTable};
use crate::framing::TextEncoding;
use crate::link::ModuleLink;
use crate::protocol::Protocol;
use gpio_config::service::output::{CONNECT_TIMEOUT, WRITE_TIMEOUT};
use gpio_config::ModuleConfig;
use gpio_types::{Alert, BaseState, GpioError, ModuleId, ModuleStatus, Result};
use std::io::{self, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

enum Connection {
    Tcp(TcpStream),
    Udp(UdpSocket),
}

/// GPIO output module
pub struct OutputModule {
    id: ModuleId,
    protocol: Protocol,
    encoding: TextEncoding,
    separator: Vec<u8>,
    commands: OutputCommandTable,
    remote: SocketAddr,
    connection: Option<Connection>,
    link: Box<dyn ModuleLink>,
}

impl OutputModule {
    /// Resolve the remote host and attempt the one-shot connect
    ///
    /// Resolution failures are fatal. A refused or timed out connect is
    /// not: the module is still returned, flagged with a persistent error,
    /// and every later send fails.
    pub fn init(id: ModuleId, config: &ModuleConfig, link: Box<dyn ModuleLink>) -> Result<Self> {
        let protocol = Protocol::resolve(config.protocol.as_deref())?;
        let encoding = TextEncoding::from_name(config.encoding.as_deref())?;
        let separator = encoding.encode(config.separator.as_deref().unwrap_or_default())?;
        let commands = OutputCommandTable::compile(&config.output_commands, encoding)?;

        let host = config.hostname.as_deref().unwrap_or_default();
        let port = config.port.unwrap_or(0);
        let remote = resolve_remote(host, port)?;

        info!(module = %id, "{} will send on {}://{}:{}", id, protocol, host, port);

        let mut module = Self {
            id,
            protocol,
            encoding,
            separator,
            commands,
            remote,
            connection: None,
            link,
        };

        match connect(protocol, remote) {
            Ok(connection) => {
                module.connection = Some(connection);
                module.link.update_status(
                    &module.id,
                    ModuleStatus::new(BaseState::Initialized),
                    None,
                );
                debug!(module = %module.id, remote = %remote, "Connected");
            }
            Err(e) => {
                let err = GpioError::network_with_source("Connection error", e);
                error!(module = %module.id, remote = %remote, "{}", err);
                module.link.flag_activity(&module.id, BaseState::Error, true);
                let title = format!("{} failed to initialize", module.id);
                module.link.report_alert(Alert::from_error(title, &err));
            }
        }

        Ok(module)
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn link(&self) -> &dyn ModuleLink {
        self.link.as_ref()
    }

    /// Write `payload` followed by the separator
    ///
    /// Returns `Ok(false)` without touching the socket when there is no
    /// connection or nothing to send. A write failure flags a persistent
    /// error and is returned as a non-fatal network error.
    pub fn send(&mut self, payload: &[u8]) -> Result<bool> {
        let mut data = Vec::with_capacity(payload.len() + self.separator.len());
        data.extend_from_slice(payload);
        data.extend_from_slice(&self.separator);

        let written = match (&mut self.connection, payload.is_empty()) {
            (Some(Connection::Tcp(stream)), false) => {
                Some(stream.write_all(&data).and_then(|_| stream.flush()))
            }
            (Some(Connection::Udp(socket)), false) => Some(socket.send(&data).map(|_| ())),
            _ => None,
        };

        let written = match written {
            Some(written) => written,
            None => {
                warn!(
                    module = %self.id,
                    connected = self.connection.is_some(),
                    bytes = payload.len(),
                    "Nothing sent"
                );
                self.link.flag_activity(&self.id, BaseState::Error, false);
                return Ok(false);
            }
        };

        match written {
            Ok(()) => {
                debug!(module = %self.id, bytes = data.len(), "Sent payload");
                self.link.flag_activity(&self.id, BaseState::Running, false);
                Ok(true)
            }
            Err(e) => {
                self.link.flag_activity(&self.id, BaseState::Error, true);
                Err(GpioError::network_with_source("Error sending data", e))
            }
        }
    }

    /// Send the payload of the named output command after `delay`
    ///
    /// An unknown name is logged and flagged as a warning; nothing is sent.
    pub fn run_output_command(&mut self, name: &str, delay: Duration) -> Result<bool> {
        if !delay.is_zero() {
            debug!(
                module = %self.id,
                command = name,
                delay_ms = delay.as_millis() as u64,
                "Delaying output command"
            );
            thread::sleep(delay);
        }

        let payload = match self.commands.find(name) {
            Some(command) => command.payload.clone(),
            None => {
                warn!(module = %self.id, command = name, "Unknown output command");
                self.link.flag_activity(&self.id, BaseState::Warning, false);
                return Ok(false);
            }
        };

        info!(module = %self.id, command = name, "Running output command");
        self.send(&payload)
    }

    pub fn output_commands(&self) -> Vec<OutputCommandInfo> {
        self.commands.listing()
    }

    /// Drop the connection
    pub fn close(&mut self) {
        if self.connection.take().is_some() {
            debug!(module = %self.id, "Connection closed");
        }
    }
}

fn resolve_remote(host: &str, port: u16) -> Result<SocketAddr> {
    let message = format!("Hostname or address error: \"{}\"", host);

    if host.is_empty() {
        return Err(GpioError::configuration(message).into_fatal());
    }

    (host, port)
        .to_socket_addrs()
        .map_err(|e| GpioError::configuration_with_source(message.clone(), e).into_fatal())?
        .next()
        .ok_or_else(|| GpioError::configuration(message).into_fatal())
}

fn connect(protocol: Protocol, remote: SocketAddr) -> io::Result<Connection> {
    match protocol {
        Protocol::Tcp => {
            let stream = TcpStream::connect_timeout(&remote, CONNECT_TIMEOUT)?;
            if let Err(e) = stream.set_nodelay(true) {
                debug!(remote = %remote, "TCP_NODELAY not set: {}", e);
            }
            stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
            Ok(Connection::Tcp(stream))
        }
        Protocol::Udp => {
            let local: IpAddr = match remote {
                SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
                SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
            };
            let socket = UdpSocket::bind((local, 0))?;
            socket.connect(remote)?;
            Ok(Connection::Udp(socket))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingLink;
    use gpio_config::OutputCommandConfig;
    use gpio_types::Severity;
    use std::net::TcpListener;

    fn config(protocol: &str, port: u16) -> ModuleConfig {
        ModuleConfig {
            enabled: true,
            protocol: Some(protocol.to_string()),
            hostname: Some("127.0.0.1".to_string()),
            port: Some(port),
            separator: Some("\n".to_string()),
            output_commands: vec![OutputCommandConfig {
                name: "Play".to_string(),
                text: Some("Play cart".to_string()),
                payload: "PLAY".to_string(),
            }],
            ..ModuleConfig::default()
        }
    }

    fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_refused_connect_is_not_fatal() {
        let link = RecordingLink::new();
        let gpo = ModuleId::new("GPO");
        let module = OutputModule::init(gpo.clone(), &config("tcp", closed_port()), link.boxed()).unwrap();

        assert!(!module.is_connected());
        assert_eq!(link.status(&gpo), Some(ModuleStatus::activity(BaseState::Error, true)));

        let alerts = link.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Error);
        assert!(alerts[0].detail.starts_with("Network Error: Connection error"));
    }

    #[test]
    fn test_unresolvable_host_is_fatal() {
        let link = RecordingLink::new();
        let mut cfg = config("tcp", 9310);
        cfg.hostname = Some("host.invalid".to_string());

        let err = OutputModule::init(ModuleId::new("GPO"), &cfg, link.boxed()).err().unwrap();
        assert!(err.is_fatal());
        assert_eq!(err.category(), "configuration");
    }

    #[test]
    fn test_missing_hostname_is_fatal() {
        let link = RecordingLink::new();
        let mut cfg = config("udp", 9310);
        cfg.hostname = None;

        let err = OutputModule::init(ModuleId::new("GPO"), &cfg, link.boxed()).err().unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_send_without_connection_never_touches_socket() {
        let link = RecordingLink::new();
        let gpo = ModuleId::new("GPO");
        let mut module = OutputModule::init(gpo.clone(), &config("tcp", closed_port()), link.boxed()).unwrap();

        assert!(!module.send(b"PLAY").unwrap());
        assert_eq!(link.status(&gpo), Some(ModuleStatus::activity(BaseState::Error, false)));
    }

    #[test]
    fn test_empty_payload_is_rejected() {
        let link = RecordingLink::new();
        let gpo = ModuleId::new("GPO");
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = receiver.local_addr().unwrap().port();
        let mut module = OutputModule::init(gpo.clone(), &config("udp", port), link.boxed()).unwrap();

        assert!(!module.send(b"").unwrap());
        assert_eq!(link.status(&gpo), Some(ModuleStatus::activity(BaseState::Error, false)));

        receiver.set_nonblocking(true).unwrap();
        let mut buffer = [0u8; 16];
        assert!(receiver.recv(&mut buffer).is_err());
    }

    #[test]
    fn test_unknown_output_command_flags_warning() {
        let link = RecordingLink::new();
        let gpo = ModuleId::new("GPO");
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = receiver.local_addr().unwrap().port();
        let mut module = OutputModule::init(gpo.clone(), &config("udp", port), link.boxed()).unwrap();

        assert!(!module.run_output_command("Rewind", Duration::ZERO).unwrap());
        assert_eq!(link.status(&gpo), Some(ModuleStatus::activity(BaseState::Warning, false)));
        assert!(link.alerts().is_empty());
    }

    #[test]
    fn test_output_command_listing() {
        let link = RecordingLink::new();
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = receiver.local_addr().unwrap().port();
        let module = OutputModule::init(ModuleId::new("GPO"), &config("udp", port), link.boxed()).unwrap();

        assert_eq!(
            module.output_commands(),
            vec![OutputCommandInfo {
                name: "Play".to_string(),
                label: "Play cart".to_string()
            }]
        );
    }
}
