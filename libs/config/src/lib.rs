//! # RadioGPIO Configuration
//!
//! Configuration file model and service-wide constants for the RadioGPIO
//! supervisor and its modules.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gpio_config::{service, AppConfig};
//! use std::path::Path;
//!
//! let config = AppConfig::load(Path::new(service::DEFAULT_CONFIG_PATH))?;
//! for (name, module) in config.enabled_modules() {
//!     println!("{} -> {:?}", name, module.resolve_kind(name));
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod app_config;
pub mod service;

pub use app_config::{
    ActionConfig, AppConfig, InputCommandConfig, ModuleConfig, ModuleKind, OutputCommandConfig,
    SequenceStepConfig,
};
