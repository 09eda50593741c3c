//! Input (listener) module
//!
//! Listens on the configured address and turns whitelisted payloads into
//! action dispatches:
//!
//! ```text
//! tcp: accept ─▶ whitelist ─▶ read one buffer ─▶ parse ─▶ dispatch ─▶ close
//! udp: recv   ─▶ whitelist ─────────────────────▶ parse ─▶ dispatch
//! ```
//!
//! Every poll is bounded by the module's poll timeout so the owning actor
//! keeps draining its mailbox. A poll that finds nothing is not an error.

use crate::commands::InputCommandTable;
use crate::framing::{CommandParser, TextEncoding};
use crate::link::ModuleLink;
use crate::protocol::Protocol;
use crate::whitelist::Whitelist;
use gpio_config::service::input::{
    poll_timeout, CONNECTION_READ_TIMEOUT, DEFAULT_POLL_RATE_HZ, RECV_BUFFER_SIZE,
};
use gpio_config::ModuleConfig;
use gpio_types::{BaseState, GpioError, ModuleId, ModuleStatus, Result};
use std::io::{self, Read};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs, UdpSocket};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

enum Listener {
    Tcp(TcpListener),
    Udp(UdpSocket),
}

/// GPIO input module
pub struct InputModule {
    id: ModuleId,
    protocol: Protocol,
    whitelist: Whitelist,
    parser: CommandParser,
    commands: InputCommandTable,
    poll_timeout: Duration,
    local_addr: SocketAddr,
    listener: Option<Listener>,
    link: Box<dyn ModuleLink>,
}

impl InputModule {
    /// Validate the configuration and bind the listening socket
    ///
    /// The whitelist is compiled before anything is bound, so a malformed
    /// entry never leaves a socket open.
    pub fn init(id: ModuleId, config: &ModuleConfig, link: Box<dyn ModuleLink>) -> Result<Self> {
        let protocol = Protocol::resolve(config.protocol.as_deref())?;
        let encoding = TextEncoding::from_name(config.encoding.as_deref())?;
        let whitelist = Whitelist::compile(&config.allowed_ip)?;
        let commands = InputCommandTable::compile(&config.input_commands);
        let parser = CommandParser::new(encoding, config.separator.clone().unwrap_or_default());
        let poll_timeout = poll_timeout(config.poll_rate.unwrap_or(DEFAULT_POLL_RATE_HZ));

        let host = config
            .listen
            .as_deref()
            .filter(|host| !host.is_empty())
            .unwrap_or("0.0.0.0");
        let address = resolve_listen_address(host, config.port.unwrap_or(0))?;

        let listener = bind(protocol, address, poll_timeout)?;
        let local_addr = match &listener {
            Listener::Tcp(socket) => socket.local_addr(),
            Listener::Udp(socket) => socket.local_addr(),
        }
        .map_err(|e| GpioError::network_with_source("Error reading bound address", e).into_fatal())?;

        info!(
            module = %id,
            whitelist = whitelist.blocks().len(),
            commands = commands.len(),
            "Listening for {} on {}://{}",
            id,
            protocol,
            local_addr
        );

        link.update_status(&id, ModuleStatus::new(BaseState::Initialized), None);

        Ok(Self {
            id,
            protocol,
            whitelist,
            parser,
            commands,
            poll_timeout,
            local_addr,
            listener: Some(listener),
            link,
        })
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn link(&self) -> &dyn ModuleLink {
        self.link.as_ref()
    }

    /// Serve at most one connection or datagram
    pub fn poll(&mut self) -> Result<()> {
        let result = match &self.listener {
            Some(Listener::Tcp(listener)) => match listener.accept() {
                Ok((stream, peer)) => Ok(Some((Connection::Tcp(stream), peer))),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(self.poll_timeout);
                    Ok(None)
                }
                Err(e) => Err(socket_failure("Error accepting connection", e, self.poll_timeout)),
            },
            Some(Listener::Udp(socket)) => {
                let mut buffer = vec![0u8; RECV_BUFFER_SIZE];
                match socket.recv_from(&mut buffer) {
                    Ok((len, peer)) => {
                        buffer.truncate(len);
                        Ok(Some((Connection::Datagram(buffer), peer)))
                    }
                    Err(e) if is_timeout(&e) => Ok(None),
                    Err(e) => Err(socket_failure("Error receiving datagram", e, self.poll_timeout)),
                }
            }
            None => return Ok(()),
        };

        match result? {
            Some((connection, peer)) => self.serve(connection, peer),
            None => Ok(()),
        }
    }

    fn serve(&self, connection: Connection, peer: SocketAddr) -> Result<()> {
        if !self.whitelist.allows(&peer.ip()) {
            warn!(module = %self.id, peer = %peer, "Rejected peer outside whitelist");
            self.link.flag_activity(&self.id, BaseState::Warning, false);
            return Ok(());
        }

        let payload = match connection {
            Connection::Datagram(payload) => payload,
            Connection::Tcp(stream) => match read_once(stream) {
                Ok(payload) => payload,
                Err(e) if is_timeout(&e) => {
                    debug!(module = %self.id, peer = %peer, "Connection sent nothing before timeout");
                    return Ok(());
                }
                Err(e) => {
                    return Err(GpioError::network_with_source(
                        format!("Error reading from {}", peer),
                        e,
                    ))
                }
            },
        };

        if payload.is_empty() {
            debug!(module = %self.id, peer = %peer, "Empty payload, closing");
            return Ok(());
        }

        debug!(module = %self.id, peer = %peer, bytes = payload.len(), "Received payload");
        self.process(&payload);
        Ok(())
    }

    /// Parse a payload and dispatch every recognized command in order
    pub fn process(&self, payload: &[u8]) {
        for token in self.parser.parse(payload) {
            match self.commands.lookup(&token) {
                Some(command) => {
                    info!(
                        module = %self.id,
                        command = %token,
                        actions = ?command.actions,
                        "Input command received"
                    );
                    self.link.dispatch_actions(&self.id, &command.actions);
                    self.link.flag_activity(&self.id, BaseState::Running, false);
                }
                None => {
                    warn!(module = %self.id, command = %token, "Unknown input command");
                    self.link.flag_activity(&self.id, BaseState::Warning, false);
                }
            }
        }
    }

    /// Close the listening socket
    pub fn close(&mut self) {
        if self.listener.take().is_some() {
            debug!(module = %self.id, "Listener closed");
        }
    }
}

enum Connection {
    Tcp(TcpStream),
    Datagram(Vec<u8>),
}

fn read_once(mut stream: TcpStream) -> io::Result<Vec<u8>> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(CONNECTION_READ_TIMEOUT))?;

    let mut buffer = vec![0u8; RECV_BUFFER_SIZE];
    let len = stream.read(&mut buffer)?;
    buffer.truncate(len);
    Ok(buffer)
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Error for a failed accept or receive, after one poll period
///
/// Errors such as EMFILE repeat on every poll; the pause keeps the actor
/// from spinning on them.
fn socket_failure(message: &str, error: io::Error, pause: Duration) -> GpioError {
    thread::sleep(pause);
    GpioError::network_with_source(message, error)
}

fn resolve_listen_address(host: &str, port: u16) -> Result<SocketAddr> {
    let message = format!("Listen address error: {}:{}", host, port);

    (host, port)
        .to_socket_addrs()
        .map_err(|e| GpioError::configuration_with_source(message.clone(), e).into_fatal())?
        .next()
        .ok_or_else(|| GpioError::configuration(message).into_fatal())
}

fn bind(protocol: Protocol, address: SocketAddr, poll_timeout: Duration) -> Result<Listener> {
    let bind_error =
        |e: io::Error| GpioError::network_with_source(format!("Error binding {}", address), e).into_fatal();

    match protocol {
        Protocol::Tcp => {
            let listener = TcpListener::bind(address).map_err(bind_error)?;
            listener.set_nonblocking(true).map_err(bind_error)?;
            Ok(Listener::Tcp(listener))
        }
        Protocol::Udp => {
            let socket = UdpSocket::bind(address).map_err(bind_error)?;
            socket.set_read_timeout(Some(poll_timeout)).map_err(bind_error)?;
            Ok(Listener::Udp(socket))
        }
    }
}
