//! Transport protocol selection

use gpio_types::{GpioError, Result};
use std::fmt;
use std::str::FromStr;

/// Socket kind a module opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Stream socket
    Tcp,
    /// Datagram socket
    Udp,
}

impl Protocol {
    /// Resolve the configured protocol name; anything unknown is fatal
    pub fn resolve(name: Option<&str>) -> Result<Self> {
        name.unwrap_or_default().parse()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl FromStr for Protocol {
    type Err = GpioError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            other => {
                Err(GpioError::configuration(format!("Protocol \"{}\" not supported.", other))
                    .into_fatal())
            }
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
