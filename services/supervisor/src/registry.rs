//! Module registry
//!
//! Built once while the application starts and only touched by the
//! supervisor afterwards. Each entry owns the module's mailbox reference
//! and, once spawned, its thread handle.

use gpio_actors::{ActorExit, ActorHandle, ActorRef, ActorRuntime};
use gpio_config::ModuleKind;
use gpio_network::{GpioModule, ModuleCommand, ModuleReply};
use gpio_types::{ModuleId, Result};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

pub type ModuleRef = ActorRef<ModuleCommand, ModuleReply>;

/// One registered module
pub struct ModuleEntry {
    actor_ref: ModuleRef,
    kind: ModuleKind,
    initialized: bool,
    runtime: Option<ActorRuntime<GpioModule>>,
    handle: Option<ActorHandle>,
    exit_reported: bool,
}

impl ModuleEntry {
    /// Entry for a module runtime that has not been started yet
    pub fn new(actor_ref: ModuleRef, runtime: ActorRuntime<GpioModule>) -> Self {
        let module = runtime.actor();
        let kind = module.kind();
        let initialized = match module {
            GpioModule::Input(_) => true,
            GpioModule::Output(output) => output.is_connected(),
        };

        Self {
            actor_ref,
            kind,
            initialized,
            runtime: Some(runtime),
            handle: None,
            exit_reported: false,
        }
    }

    /// Entry without a runtime, for modules driven elsewhere
    pub fn detached(actor_ref: ModuleRef, kind: ModuleKind, initialized: bool) -> Self {
        Self {
            actor_ref,
            kind,
            initialized,
            runtime: None,
            handle: None,
            exit_reported: false,
        }
    }

    pub fn actor_ref(&self) -> &ModuleRef {
        &self.actor_ref
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    /// Whether the module finished its init and can act on commands
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn has_stopped(&self) -> bool {
        self.handle.as_ref().map_or(false, ActorHandle::is_finished)
    }
}

/// Case-insensitive map from module identifier to entry
#[derive(Default)]
pub struct ModuleRegistry {
    entries: BTreeMap<ModuleId, ModuleEntry>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ModuleId, entry: ModuleEntry) {
        self.entries.insert(id, entry);
    }

    pub fn get(&self, id: &ModuleId) -> Option<&ModuleEntry> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, &ModuleEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Start every module that has not been started yet
    pub fn spawn_all(&mut self) -> Result<()> {
        info!(modules = self.entries.len(), "Starting modules");

        for entry in self.entries.values_mut() {
            if let Some(runtime) = entry.runtime.take() {
                entry.handle = Some(runtime.spawn()?);
            }
        }
        Ok(())
    }

    /// Modules whose thread ended since the last call
    pub fn take_stopped(&mut self) -> Vec<ModuleId> {
        self.entries
            .iter_mut()
            .filter(|(_, entry)| !entry.exit_reported && entry.has_stopped())
            .map(|(id, entry)| {
                entry.exit_reported = true;
                id.clone()
            })
            .collect()
    }

    /// Post a shutdown message to every module
    pub fn shutdown_all(&self) {
        info!("Stopping modules");

        for (id, entry) in &self.entries {
            if let Err(e) = entry.actor_ref.shutdown() {
                debug!(module = %id, "Shutdown not delivered: {}", e);
            }
        }
    }

    /// Join every started module, waiting at most `timeout` for each
    pub fn join_all(&mut self, timeout: Duration) -> Vec<(ModuleId, ActorExit)> {
        debug!("Waiting for all modules to shut down");

        let mut exits = Vec::new();
        for (id, entry) in &mut self.entries {
            if let Some(mut handle) = entry.handle.take() {
                let exit = handle.join_timeout(timeout);
                match exit {
                    ActorExit::Clean => debug!(module = %id, "Module joined"),
                    other => warn!(module = %id, exit = ?other, "Module did not exit cleanly"),
                }
                exits.push((id.clone(), exit));
            }
        }
        exits
    }
}
