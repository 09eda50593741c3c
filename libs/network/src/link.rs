//! Module to supervisor seam
//!
//! Modules never reach the supervisor's state directly: actions and alerts
//! are posted to its mailbox, status updates go through the shared,
//! lock-protected status map. [`ModuleLink`] bundles those three calls so a
//! module can be driven by a recording double in tests.

use gpio_types::{Alert, BaseState, ModuleId, ModuleStatus};

/// Calls a module makes towards its supervisor
pub trait ModuleLink: Send {
    /// Hand matched action names over for sequencing
    fn dispatch_actions(&self, module: &ModuleId, actions: &[String]);

    /// Surface a message to the user-facing layer
    fn report_alert(&self, alert: Alert);

    /// Conditional status write, see [`gpio_types::StatusMap::update_status`]
    fn update_status(
        &self,
        module: &ModuleId,
        status: ModuleStatus,
        expected: Option<ModuleStatus>,
    ) -> Option<ModuleStatus>;

    /// Flag an activity pulse; `keep` makes `base` persist after the pulse
    fn flag_activity(&self, module: &ModuleId, base: BaseState, keep: bool) {
        self.update_status(module, ModuleStatus::activity(base, keep), None);
    }
}
