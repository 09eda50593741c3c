//! Module Status State Machine
//!
//! A module's status is one packed byte: the low three bits hold the
//! persistent [`BaseState`], two overlay bits mark a transient activity
//! pulse.
//!
//! ```text
//!   7   6   5   4      3       2   1   0
//! ┌───┬───┬───┬──────┬──────┬───────────┐
//! │ unused    │ KEEP │ ACT  │ base state│
//! └───┴───┴───┴──────┴──────┴───────────┘
//! ```
//!
//! Workers only ever write through [`StatusMap::update_status`]. The status
//! consumer calls [`StatusMap::consume_cycle`] once per tick, which renders
//! every entry and collapses activity pulses back to a steady state:
//!
//! | overlay            | base      | rendered | next state |
//! |--------------------|-----------|----------|------------|
//! | ACT                | Running   | success  | Running    |
//! | ACT                | Warning   | warning  | Running    |
//! | ACT + KEEP         | Warning   | warning  | Warning    |
//! | ACT                | Error     | error    | Running    |
//! | ACT + KEEP         | Error     | error    | Error      |
//! | none               | any       | steady   | unchanged  |

use crate::module_id::ModuleId;
use bitflags::bitflags;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;

const BASE_MASK: u8 = 0b0000_0111;

bitflags! {
    /// Overlay bits layered on top of the base state
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u8 {
        /// A transient event just occurred
        const ACTIVITY = 0b0000_1000;
        /// The event upgrades the persistent base state instead of decaying
        const KEEP_ACTIVITY = 0b0001_0000;
    }
}

/// Persistent lifecycle state of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BaseState {
    Disabled = 0,
    Enabled = 1,
    Initialized = 2,
    Running = 3,
    Warning = 4,
    Error = 5,
    Reserved6 = 6,
    Reserved7 = 7,
}

impl BaseState {
    fn from_bits(bits: u8) -> Self {
        match bits & BASE_MASK {
            0 => BaseState::Disabled,
            1 => BaseState::Enabled,
            2 => BaseState::Initialized,
            3 => BaseState::Running,
            4 => BaseState::Warning,
            5 => BaseState::Error,
            6 => BaseState::Reserved6,
            _ => BaseState::Reserved7,
        }
    }

    fn steady_indicator(self) -> Indicator {
        match self {
            BaseState::Running => Indicator::Running,
            BaseState::Warning => Indicator::Warning,
            BaseState::Error => Indicator::Error,
            BaseState::Enabled | BaseState::Initialized => Indicator::Neutral,
            BaseState::Disabled | BaseState::Reserved6 | BaseState::Reserved7 => {
                Indicator::Disabled
            }
        }
    }
}

/// Packed base state plus activity overlay
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleStatus(u8);

impl ModuleStatus {
    /// Steady status without overlay
    pub const fn new(base: BaseState) -> Self {
        Self(base as u8)
    }

    /// Activity pulse on top of `base`; `keep` makes the base state persist
    /// once the pulse has been consumed
    pub fn activity(base: BaseState, keep: bool) -> Self {
        let mut flags = StatusFlags::ACTIVITY;
        if keep {
            flags |= StatusFlags::KEEP_ACTIVITY;
        }
        Self(base as u8 | flags.bits())
    }

    /// Successful event on a running module
    pub fn activity_running() -> Self {
        Self::activity(BaseState::Running, false)
    }

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & (BASE_MASK | StatusFlags::all().bits()))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn base(self) -> BaseState {
        BaseState::from_bits(self.0)
    }

    pub fn flags(self) -> StatusFlags {
        StatusFlags::from_bits_truncate(self.0)
    }

    pub fn has_activity(self) -> bool {
        self.flags().contains(StatusFlags::ACTIVITY)
    }

    pub fn keeps_activity(self) -> bool {
        self.flags().contains(StatusFlags::KEEP_ACTIVITY)
    }

    /// Render this status and compute the state it collapses to
    pub fn consume(self) -> (Indicator, bool, ModuleStatus) {
        if !self.has_activity() {
            return (self.base().steady_indicator(), false, self);
        }

        let base = self.base();
        let indicator = match base {
            BaseState::Error => Indicator::Error,
            BaseState::Warning => Indicator::Warning,
            _ => Indicator::Success,
        };

        let next = if self.keeps_activity() {
            ModuleStatus::new(base)
        } else {
            ModuleStatus::new(BaseState::Running)
        };

        (indicator, true, next)
    }
}

impl fmt::Debug for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleStatus")
            .field("base", &self.base())
            .field("flags", &self.flags())
            .finish()
    }
}

impl From<BaseState> for ModuleStatus {
    fn from(base: BaseState) -> Self {
        ModuleStatus::new(base)
    }
}

/// What the status consumer shows for a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// Activity pulse on a healthy module
    Success,
    Running,
    Warning,
    Error,
    /// Enabled or initialized but not running yet
    Neutral,
    Disabled,
}

impl Indicator {
    pub fn color(self) -> &'static str {
        match self {
            Indicator::Success => "lightgreen",
            Indicator::Running => "green",
            Indicator::Warning => "orange",
            Indicator::Error => "red",
            Indicator::Neutral => "neutral",
            Indicator::Disabled => "grey",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Indicator::Success => "success",
            Indicator::Running => "running",
            Indicator::Warning => "warning",
            Indicator::Error => "error",
            Indicator::Neutral => "neutral",
            Indicator::Disabled => "disabled",
        };
        f.write_str(label)
    }
}

/// One rendered entry of a consumption cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRender {
    pub module: ModuleId,
    pub indicator: Indicator,
    /// True when the indicator came from an activity pulse
    pub pulse: bool,
}

/// Shared module status map
///
/// Every worker thread writes here, so check and set happen under one lock.
#[derive(Debug, Default)]
pub struct StatusMap {
    entries: Mutex<BTreeMap<ModuleId, ModuleStatus>>,
}

impl StatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the status of `module`
    ///
    /// With `expected` set, the write only happens if the current value
    /// equals it. Returns the new status on success, `None` otherwise.
    pub fn update_status(
        &self,
        module: &ModuleId,
        status: ModuleStatus,
        expected: Option<ModuleStatus>,
    ) -> Option<ModuleStatus> {
        let mut entries = self.entries.lock();

        if let Some(expected) = expected {
            if entries.get(module) != Some(&expected) {
                tracing::debug!(
                    module = %module,
                    expected = ?expected,
                    current = ?entries.get(module),
                    "Conditional status update skipped"
                );
                return None;
            }
        }

        entries.insert(module.clone(), status);
        Some(status)
    }

    pub fn get(&self, module: &ModuleId) -> Option<ModuleStatus> {
        self.entries.lock().get(module).copied()
    }

    /// Render every entry and collapse consumed activity pulses
    pub fn consume_cycle(&self) -> Vec<StatusRender> {
        let mut entries = self.entries.lock();
        let mut rendered = Vec::with_capacity(entries.len());

        for (module, status) in entries.iter_mut() {
            let (indicator, pulse, next) = status.consume();
            *status = next;
            rendered.push(StatusRender {
                module: module.clone(),
                indicator,
                pulse,
            });
        }

        rendered
    }
}
