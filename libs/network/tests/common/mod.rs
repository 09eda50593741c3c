//! Shared helpers for loopback integration tests

#![allow(dead_code)]

use gpio_network::ModuleLink;
use gpio_types::{Alert, ModuleId, ModuleStatus, StatusMap};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Default)]
struct Record {
    dispatched: Mutex<Vec<(ModuleId, Vec<String>)>>,
    alerts: Mutex<Vec<Alert>>,
    statuses: Mutex<Vec<ModuleStatus>>,
    map: StatusMap,
}

/// ModuleLink double that records every call
#[derive(Clone, Default)]
pub struct RecordingLink {
    record: Arc<Record>,
}

impl RecordingLink {
    pub fn boxed(&self) -> Box<dyn ModuleLink> {
        Box::new(self.clone())
    }

    pub fn dispatched(&self) -> Vec<(ModuleId, Vec<String>)> {
        self.record.dispatched.lock().clone()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.record.alerts.lock().clone()
    }

    pub fn statuses(&self) -> Vec<ModuleStatus> {
        self.record.statuses.lock().clone()
    }

    pub fn status(&self, module: &ModuleId) -> Option<ModuleStatus> {
        self.record.map.get(module)
    }
}

impl ModuleLink for RecordingLink {
    fn dispatch_actions(&self, module: &ModuleId, actions: &[String]) {
        self.record
            .dispatched
            .lock()
            .push((module.clone(), actions.to_vec()));
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

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}
