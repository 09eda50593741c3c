//! Service configuration and defaults
//!
//! Timing and sizing constants shared by the supervisor and the modules.

use std::time::Duration;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Supervisor defaults
pub mod supervisor {
    use super::Duration;

    /// How long each worker gets to exit during shutdown
    pub const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

    /// Upper bound of the supervisor's mailbox wait, one status cycle per tick
    pub const TICK_INTERVAL: Duration = Duration::from_millis(100);
}

/// Input (listener) module defaults
pub mod input {
    use super::Duration;

    /// Default socket poll rate (Hz)
    pub const DEFAULT_POLL_RATE_HZ: u32 = 10;

    /// Bytes read from one connection or datagram
    pub const RECV_BUFFER_SIZE: usize = 4096;

    /// Read timeout on an accepted TCP connection
    pub const CONNECTION_READ_TIMEOUT: Duration = Duration::from_secs(2);

    /// Timeout derived from a poll rate, 0 Hz falls back to the default rate
    pub fn poll_timeout(poll_rate_hz: u32) -> Duration {
        let rate = if poll_rate_hz == 0 {
            DEFAULT_POLL_RATE_HZ
        } else {
            poll_rate_hz
        };
        Duration::from_secs_f64(1.0 / f64::from(rate))
    }
}

/// Output (sender) module defaults
pub mod output {
    use super::Duration;

    /// One-shot connect timeout at init
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

    /// Write timeout on the connected socket
    pub const WRITE_TIMEOUT: Duration = Duration::from_secs(2);
}

/// Encoding and framing defaults
pub mod framing {
    /// Encoding used when a module sets none
    pub const DEFAULT_ENCODING: &str = "utf-8";
}
