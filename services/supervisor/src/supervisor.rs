//! Supervisor actor
//!
//! Owns the module registry, the shared status map and the action book.
//! Every tick renders module status through the frontend and checks for
//! modules that stopped on their own; messages from modules (actions,
//! alerts) and from the outside (manual sends) arrive through its mailbox.
//!
//! Shutdown posts a shutdown message to every module, then joins each with
//! a bounded timeout once the supervisor loop has ended.

use crate::actions::ActionBook;
use crate::frontend::Frontend;
use crate::registry::ModuleRegistry;
use gpio_actors::{Actor, ActorRef, ActorRole};
use gpio_config::service::supervisor::JOIN_TIMEOUT;
use gpio_config::ModuleKind;
use gpio_network::{ModuleCommand, ModuleReply, OutputCommandInfo};
use gpio_types::{Alert, BaseState, GpioError, ModuleId, ModuleStatus, Result, Severity, StatusMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub type SupervisorRef = ActorRef<SupervisorCommand, ()>;

/// Messages the supervisor accepts
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorCommand {
    /// An input module matched a command
    DispatchActions { module: ModuleId, actions: Vec<String> },
    /// Show an alert raised elsewhere
    ReportAlert(Alert),
    /// Run a named output command on a module
    RunOutputCommand { module: ModuleId, command: String },
    /// Reply to the start-up listing of an output module's commands
    OutputCommandsListed {
        module: ModuleId,
        commands: Vec<OutputCommandInfo>,
    },
}

/// Root actor of the application
pub struct Supervisor {
    name: String,
    self_ref: SupervisorRef,
    registry: ModuleRegistry,
    status: Arc<StatusMap>,
    actions: ActionBook,
    frontend: Box<dyn Frontend>,
    join_timeout: Duration,
}

impl Supervisor {
    pub fn new(
        self_ref: SupervisorRef,
        registry: ModuleRegistry,
        status: Arc<StatusMap>,
        actions: ActionBook,
        frontend: Box<dyn Frontend>,
    ) -> Self {
        Self {
            name: "Supervisor".to_string(),
            self_ref,
            registry,
            status,
            actions,
            frontend,
            join_timeout: JOIN_TIMEOUT,
        }
    }

    /// Override how long each module gets to exit during shutdown
    pub fn set_join_timeout(&mut self, timeout: Duration) {
        self.join_timeout = timeout;
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn status(&self) -> &Arc<StatusMap> {
        &self.status
    }

    /// Run a configured action; unknown names are ignored
    pub fn run_action(&mut self, name: &str) -> Result<()> {
        let action = match self.actions.find(name) {
            Some(action) => action,
            None => {
                warn!(action = name, "Unknown action, ignoring");
                return Ok(());
            }
        };

        if let Some((module, command)) = action.unready_step(&self.registry) {
            let alert = Alert::new(
                format!("Error while preparing to run action \"{}\":", name),
                format!(
                    "Output command \"{}\" failed to run because module {} is not initialized!",
                    command, module
                ),
                Severity::Error,
            );
            self.frontend.show_alert(&alert);
            return Ok(());
        }

        action.run(&self.registry)
    }

    fn run_output_command(&mut self, module: &ModuleId, command: String) -> Result<()> {
        let entry = self.registry.get(module).ok_or_else(|| {
            GpioError::configuration(format!("Module \"{}\" is not registered", module))
        })?;

        info!(module = %module, command = %command, "Manual output command");
        entry
            .actor_ref()
            .send(ModuleCommand::RunOutputCommand {
                name: command,
                delay: Duration::ZERO,
            })
            .map_err(|e| GpioError::network(format!("Module {} unreachable: {}", module, e)))
    }

    /// Ask every output module for its commands; replies come back by mail
    fn list_output_commands(&self) {
        for (id, entry) in self.registry.iter() {
            if entry.kind() != ModuleKind::Output {
                continue;
            }

            let supervisor = self.self_ref.clone();
            let module = id.clone();
            let sent = entry
                .actor_ref()
                .send_later(ModuleCommand::ListOutputCommands)
                .attach_callback(move |reply| {
                    if let ModuleReply::OutputCommands(commands) = reply {
                        let _ = supervisor
                            .send(SupervisorCommand::OutputCommandsListed { module, commands });
                    }
                })
                .fire();

            if let Err(e) = sent {
                debug!(module = %id, "Listing not requested: {}", e);
            }
        }
    }

    fn check_stopped_modules(&mut self) {
        for module in self.registry.take_stopped() {
            let alert = Alert::new(
                "Module stopped",
                format!("Module {} stopped unexpectedly and will not be restarted.", module),
                Severity::Error,
            );
            self.frontend.show_alert(&alert);
            self.status
                .update_status(&module, ModuleStatus::new(BaseState::Error), None);
        }
    }
}

impl Actor for Supervisor {
    type Command = SupervisorCommand;
    type Reply = ();

    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> ActorRole {
        ActorRole::Supervisor
    }

    fn pre_start(&mut self) -> Result<()> {
        info!(
            "Starting RadioGPIO v{} with {} modules",
            env!("CARGO_PKG_VERSION"),
            self.registry.len()
        );
        self.registry.spawn_all()?;
        self.list_output_commands();
        Ok(())
    }

    fn tick(&mut self) -> Result<()> {
        let rendered = self.status.consume_cycle();
        self.frontend.render_status(&rendered);
        self.check_stopped_modules();
        Ok(())
    }

    fn handle(&mut self, command: SupervisorCommand) -> Result<()> {
        match command {
            SupervisorCommand::DispatchActions { module, actions } => {
                debug!(module = %module, actions = ?actions, "Dispatching actions");
                for action in actions {
                    if let Err(e) = self.run_action(&action) {
                        error!(module = %module, action = %action, "{}", e);
                        self.report_error(&e);
                    }
                }
                Ok(())
            }
            SupervisorCommand::ReportAlert(alert) => {
                self.frontend.show_alert(&alert);
                Ok(())
            }
            SupervisorCommand::RunOutputCommand { module, command } => {
                self.run_output_command(&module, command)
            }
            SupervisorCommand::OutputCommandsListed { module, commands } => {
                for command in &commands {
                    info!(module = %module, command = %command.name, "Manual command: {}", command.label);
                }
                Ok(())
            }
        }
    }

    fn report_error(&mut self, error: &GpioError) {
        self.frontend.show_alert(&Alert::runtime_error(error));
    }

    fn cleanup(&mut self) {
        self.registry.shutdown_all();
    }

    fn post_stop(&mut self) {
        self.registry.join_all(self.join_timeout);
        info!("Supervisor exiting");
    }
}
