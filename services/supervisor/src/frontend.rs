//! User-facing layer
//!
//! The supervisor renders module status once per tick and shows alerts
//! through a [`Frontend`]. [`LogFrontend`] writes both to the log; a GUI
//! would implement the same trait.

use gpio_types::{Alert, Indicator, ModuleId, Severity, StatusRender};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Status and alert sink driven from the supervisor thread
pub trait Frontend: Send {
    /// Called once per supervisor tick with every module's indicator
    fn render_status(&mut self, statuses: &[StatusRender]);

    fn show_alert(&mut self, alert: &Alert);
}

/// Frontend that logs indicator changes and alerts
#[derive(Debug, Default)]
pub struct LogFrontend {
    indicators: HashMap<ModuleId, Indicator>,
}

impl LogFrontend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Frontend for LogFrontend {
    fn render_status(&mut self, statuses: &[StatusRender]) {
        for render in statuses {
            if render.pulse {
                debug!(module = %render.module, indicator = %render.indicator, "Activity");
            }

            let previous = self.indicators.insert(render.module.clone(), render.indicator);
            if !render.pulse && previous != Some(render.indicator) {
                info!(
                    module = %render.module,
                    color = render.indicator.color(),
                    "Module is {}",
                    render.indicator
                );
            }
        }
    }

    fn show_alert(&mut self, alert: &Alert) {
        match alert.severity {
            Severity::Info => info!(title = %alert.title, "{}", alert.detail),
            Severity::Warning => warn!(title = %alert.title, "{}", alert.detail),
            Severity::Error | Severity::Fatal => {
                error!(title = %alert.title, severity = %alert.severity, "{}", alert.detail)
            }
        }
    }
}
