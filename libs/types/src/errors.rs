//! Error taxonomy
//!
//! Every recoverable failure in RadioGPIO is one of three kinds:
//!
//! - **Configuration**: bad or missing settings, always surfaced, may be fatal
//! - **Network**: socket, connect and send failures, usually non-fatal
//! - **Internal**: broken invariants, always fatal
//!
//! A fatal error raised while an actor initializes terminates the process.
//! Raised while an actor dispatches a message, it stops only that actor.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for RadioGPIO operations
pub type Result<T> = std::result::Result<T, GpioError>;

fn fatal_prefix(fatal: &bool) -> &'static str {
    if *fatal {
        "Fatal "
    } else {
        ""
    }
}

fn source_suffix(source: &Option<BoxError>) -> String {
    match source {
        Some(source) => format!(" ({})", source),
        None => String::new(),
    }
}

/// Domain error raised by actors and modules
#[derive(Error, Debug)]
pub enum GpioError {
    /// Bad or missing settings
    #[error("{}Configuration Error: {message}{}", fatal_prefix(.fatal), source_suffix(.source))]
    Configuration {
        message: String,
        fatal: bool,
        source: Option<BoxError>,
    },

    /// Socket, connect and send failures
    #[error("{}Network Error: {message}{}", fatal_prefix(.fatal), source_suffix(.source))]
    Network {
        message: String,
        fatal: bool,
        source: Option<BoxError>,
    },

    /// Programming invariant violations
    #[error("{}Internal Error: {message}{}", fatal_prefix(.fatal), source_suffix(.source))]
    Internal {
        message: String,
        fatal: bool,
        source: Option<BoxError>,
    },
}

impl GpioError {
    /// Create a non-fatal configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            fatal: false,
            source: None,
        }
    }

    /// Create a non-fatal configuration error with source
    pub fn configuration_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            fatal: false,
            source: Some(Box::new(source)),
        }
    }

    /// Create a non-fatal network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            fatal: false,
            source: None,
        }
    }

    /// Create a non-fatal network error with source
    pub fn network_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Network {
            message: message.into(),
            fatal: false,
            source: Some(Box::new(source)),
        }
    }

    /// Create an internal error (always fatal)
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            fatal: true,
            source: None,
        }
    }

    /// Create an internal error with source (always fatal)
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            fatal: true,
            source: Some(Box::new(source)),
        }
    }

    /// Mark this error as fatal
    pub fn into_fatal(mut self) -> Self {
        match &mut self {
            Self::Configuration { fatal, .. }
            | Self::Network { fatal, .. }
            | Self::Internal { fatal, .. } => *fatal = true,
        }
        self
    }

    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Configuration { fatal, .. }
            | Self::Network { fatal, .. }
            | Self::Internal { fatal, .. } => *fatal,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Configuration { message, .. }
            | Self::Network { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::Network { .. } => "network",
            Self::Internal { .. } => "internal",
        }
    }

    /// Text shown to the user in an alert
    pub fn alert_text(&self) -> String {
        self.to_string()
    }
}
