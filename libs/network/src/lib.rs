//! GPIO Network Modules
//!
//! Socket-facing half of RadioGPIO: protocol selection, peer whitelisting,
//! command framing and the two module kinds.
//!
//! - **Input** modules listen on TCP or UDP, check each peer against a CIDR
//!   whitelist, split the payload into commands and hand matching actions to
//!   the supervisor.
//! - **Output** modules connect once and send named or raw payloads.
//!
//! Both report back through a [`ModuleLink`], and run on the shared actor
//! loop as a [`GpioModule`].

pub mod commands;
pub mod framing;
pub mod input;
pub mod link;
pub mod module;
pub mod output;
pub mod protocol;
pub mod whitelist;

#[cfg(test)]
mod testing;

pub use commands::{
    InputCommand, InputCommandTable, OutputCommand, OutputCommandInfo, OutputCommandTable,
};
pub use framing::{CommandParser, TextEncoding};
pub use input::InputModule;
pub use link::ModuleLink;
pub use module::{GpioModule, ModuleCommand, ModuleReply};
pub use output::OutputModule;
pub use protocol::Protocol;
pub use whitelist::{CidrBlock, Whitelist};
