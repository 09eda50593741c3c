//! User-facing alerts

use crate::errors::GpioError;
use std::fmt;

/// How loudly an alert should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    /// The reporting actor is going down
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        f.write_str(label)
    }
}

/// Message for the user-facing layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub detail: String,
    pub severity: Severity,
}

impl Alert {
    pub fn new(title: impl Into<String>, detail: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            detail: detail.into(),
            severity,
        }
    }

    /// Alert for an error raised while an actor was running
    pub fn runtime_error(error: &GpioError) -> Self {
        Self::from_error("Runtime Error", error)
    }

    pub fn from_error(title: impl Into<String>, error: &GpioError) -> Self {
        let severity = if error.is_fatal() {
            Severity::Fatal
        } else {
            Severity::Error
        };
        Self::new(title, error.alert_text(), severity)
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.title, self.detail)
    }
}
