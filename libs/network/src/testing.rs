//! Recording [`ModuleLink`] for unit tests

use crate::link::ModuleLink;
use gpio_types::{Alert, ModuleId, ModuleStatus, StatusMap};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct Record {
    dispatched: Mutex<Vec<Vec<String>>>,
    alerts: Mutex<Vec<Alert>>,
    statuses: Mutex<Vec<ModuleStatus>>,
    map: StatusMap,
}

#[derive(Clone, Default)]
pub(crate) struct RecordingLink {
    record: Arc<Record>,
}

impl RecordingLink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn boxed(&self) -> Box<dyn ModuleLink> {
        Box::new(self.clone())
    }

    pub(crate) fn dispatched(&self) -> Vec<Vec<String>> {
        self.record.dispatched.lock().clone()
    }

    pub(crate) fn alerts(&self) -> Vec<Alert> {
        self.record.alerts.lock().clone()
    }

    /// Every status successfully written, oldest first
    pub(crate) fn statuses(&self) -> Vec<ModuleStatus> {
        self.record.statuses.lock().clone()
    }

    pub(crate) fn status(&self, module: &ModuleId) -> Option<ModuleStatus> {
        self.record.map.get(module)
    }
}

impl ModuleLink for RecordingLink {
    fn dispatch_actions(&self, _module: &ModuleId, actions: &[String]) {
        self.record.dispatched.lock().push(actions.to_vec());
    }

    fn report_alert(&self, alert: Alert) {
        self.record.alerts.lock().push(alert);
    }

    fn update_status(
        &self,
        module: &ModuleId,
        status: ModuleStatus,
        expected: Option<ModuleStatus>,
    ) -> Option<ModuleStatus> {
        let written = self.record.map.update_status(module, status, expected);
        if written.is_some() {
            self.record.statuses.lock().push(status);
        }
        written
    }
}
