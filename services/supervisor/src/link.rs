//! Supervisor side of the module link

use crate::supervisor::{SupervisorCommand, SupervisorRef};
use gpio_network::ModuleLink;
use gpio_types::{Alert, ModuleId, ModuleStatus, StatusMap};
use std::sync::Arc;
use tracing::debug;

/// Posts module events to the supervisor's mailbox and writes status
/// straight into the shared map
#[derive(Clone)]
pub struct SupervisorLink {
    supervisor: SupervisorRef,
    status: Arc<StatusMap>,
}

impl SupervisorLink {
    pub fn new(supervisor: SupervisorRef, status: Arc<StatusMap>) -> Self {
        Self { supervisor, status }
    }
}

impl ModuleLink for SupervisorLink {
    fn dispatch_actions(&self, module: &ModuleId, actions: &[String]) {
        let command = SupervisorCommand::DispatchActions {
            module: module.clone(),
            actions: actions.to_vec(),
        };
        if let Err(e) = self.supervisor.send(command) {
            debug!(module = %module, "Actions dropped: {}", e);
        }
    }

    fn report_alert(&self, alert: Alert) {
        if let Err(e) = self.supervisor.send(SupervisorCommand::ReportAlert(alert)) {
            debug!("Alert dropped: {}", e);
        }
    }

    fn update_status(
        &self,
        module: &ModuleId,
        status: ModuleStatus,
        expected: Option<ModuleStatus>,
    ) -> Option<ModuleStatus> {
        self.status.update_status(module, status, expected)
    }
}
