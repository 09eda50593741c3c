//! # RadioGPIO Shared Types
//!
//! Types shared between the actor runtime, the network modules and the
//! supervisor:
//!
//! - **Module identity**: case-insensitive [`ModuleId`] keys
//! - **Status overlay**: [`ModuleStatus`] packs a base state with transient
//!   activity bits, and [`StatusMap`] is the single guarded write path for them
//! - **Errors**: the [`GpioError`] taxonomy (configuration, network, internal)
//! - **Alerts**: user-facing [`Alert`] records produced from errors
//!
//! ## Quick Start
//!
//! ```rust
//! use gpio_types::{BaseState, ModuleId, ModuleStatus, StatusMap};
//!
//! let map = StatusMap::new();
//! let gpi = ModuleId::new("GPI");
//!
//! map.update_status(&gpi, ModuleStatus::new(BaseState::Initialized), None);
//! map.update_status(&gpi, ModuleStatus::activity(BaseState::Warning, false), None);
//!
//! // The next consumption cycle renders the pulse and collapses it.
//! let rendered = map.consume_cycle();
//! assert_eq!(rendered.len(), 1);
//! assert_eq!(map.get(&gpi), Some(ModuleStatus::new(BaseState::Running)));
//! ```

pub mod alert;
pub mod errors;
pub mod module_id;
pub mod status;

pub use alert::{Alert, Severity};
pub use errors::{GpioError, Result};
pub use module_id::ModuleId;
pub use status::{BaseState, Indicator, ModuleStatus, StatusFlags, StatusMap, StatusRender};
