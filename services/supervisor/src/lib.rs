//! RadioGPIO Supervisor
//!
//! Builds one actor per enabled module from the configuration, wires each to
//! the supervisor through a [`SupervisorLink`] and runs the supervisor loop.
//!
//! ```text
//!                 ┌────────────────────────────┐
//!  Ctrl-C ──────▶ │ Supervisor (mailbox)       │ ◀── DispatchActions / ReportAlert
//!  --send ──────▶ │ registry · status · actions│
//!                 └──────┬──────────────┬──────┘
//!                        │ ModuleCommand│
//!                        ▼              ▼
//!                 ┌────────────┐  ┌────────────┐
//!                 │ GPI thread │  │ GPO thread │
//!                 └────────────┘  └────────────┘
//! ```

pub mod actions;
pub mod frontend;
pub mod link;
pub mod registry;
pub mod supervisor;

pub use actions::{Action, ActionBook, Step};
pub use frontend::{Frontend, LogFrontend};
pub use link::SupervisorLink;
pub use registry::{ModuleEntry, ModuleRef, ModuleRegistry};
pub use supervisor::{Supervisor, SupervisorCommand, SupervisorRef};

use gpio_actors::{mailbox, ActorHandle, ActorId, ActorRuntime, PollPolicy};
use gpio_config::service::supervisor::TICK_INTERVAL;
use gpio_config::AppConfig;
use gpio_network::GpioModule;
use gpio_types::{Alert, BaseState, GpioError, ModuleId, ModuleStatus, Result, StatusMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Fully initialized application, ready to run
pub struct Application {
    runtime: ActorRuntime<Supervisor>,
    supervisor: SupervisorRef,
    status: Arc<StatusMap>,
}

impl Application {
    /// Initialize every enabled module and compile the actions
    ///
    /// A fatal error is shown on `frontend` and returned; the caller is
    /// expected to terminate. Non-fatal module errors are shown and the
    /// module is left out.
    pub fn build(config: &AppConfig, mut frontend: Box<dyn Frontend>) -> Result<Self> {
        let (supervisor, receiver) = mailbox(ActorId::new("Supervisor"));
        let status = Arc::new(StatusMap::new());

        let built = Self::build_modules(config, &supervisor, &status, frontend.as_mut())
            .and_then(|registry| {
                let actions = ActionBook::compile(&config.actions, &registry)?;
                Ok((registry, actions))
            });

        let (registry, actions) = match built {
            Ok(built) => built,
            Err(e) => {
                error!("{}", e);
                frontend.show_alert(&Alert::from_error("RadioGPIO failed to initialize.", &e));
                return Err(e);
            }
        };

        info!(
            modules = registry.len(),
            actions = actions.len(),
            "Application initialized"
        );

        let actor = Supervisor::new(
            supervisor.clone(),
            registry,
            Arc::clone(&status),
            actions,
            frontend,
        );
        let policy = PollPolicy::blocking(Some(TICK_INTERVAL), Duration::ZERO);

        Ok(Self {
            runtime: ActorRuntime::new(actor, receiver, policy),
            supervisor,
            status,
        })
    }

    fn build_modules(
        config: &AppConfig,
        supervisor: &SupervisorRef,
        status: &Arc<StatusMap>,
        frontend: &mut dyn Frontend,
    ) -> Result<ModuleRegistry> {
        let mut registry = ModuleRegistry::new();

        for (name, module_config) in &config.modules {
            let id = ModuleId::new(name.as_str());

            if status.get(&id).is_some() {
                return Err(GpioError::configuration(format!(
                    "Module \"{}\" is configured more than once",
                    id
                ))
                .into_fatal());
            }

            if !module_config.enabled {
                status.update_status(&id, ModuleStatus::new(BaseState::Disabled), None);
                continue;
            }

            // Keys such as HTTPClient or Livewire belong to modules RadioGPIO does not run
            if module_config.resolve_kind(name).is_none() {
                warn!(module = %id, "Not a GPIO module, skipping");
                status.update_status(&id, ModuleStatus::new(BaseState::Disabled), None);
                continue;
            }

            status.update_status(&id, ModuleStatus::new(BaseState::Enabled), None);
            let link = SupervisorLink::new(supervisor.clone(), Arc::clone(status));

            let module = match GpioModule::init(id.clone(), module_config, Box::new(link)) {
                Ok(module) => module,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(module = %id, "{}", e);
                    frontend.show_alert(&Alert::from_error(format!("{} failed to initialize", id), &e));
                    continue;
                }
            };

            let policy = module.poll_policy();
            let (module_ref, module_receiver) = mailbox(ActorId::new(id.name()));
            let runtime = ActorRuntime::new(module, module_receiver, policy);
            registry.insert(id, ModuleEntry::new(module_ref, runtime));
        }

        Ok(registry)
    }

    /// Mailbox of the supervisor, for shutdown requests and manual sends
    pub fn supervisor(&self) -> SupervisorRef {
        self.supervisor.clone()
    }

    pub fn status(&self) -> Arc<StatusMap> {
        Arc::clone(&self.status)
    }

    /// Override the per-module join timeout used at shutdown
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.runtime.actor_mut().set_join_timeout(timeout);
        self
    }

    /// Run the supervisor on the calling thread until it shuts down
    pub fn run(self) -> Supervisor {
        self.runtime.run()
    }

    /// Run the supervisor on its own thread
    pub fn spawn(self) -> Result<ActorHandle> {
        self.runtime.spawn()
    }
}
