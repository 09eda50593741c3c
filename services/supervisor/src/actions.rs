//! Action sequencing
//!
//! An action is a named list of steps run on the supervisor thread when an
//! input module matches a command. Steps either wait or ask an output
//! module to run one of its output commands.
//!
//! Actions are compiled after the module registry exists so every step can
//! be bound to its module up front. Any configuration problem found here is
//! fatal.

use crate::registry::ModuleRegistry;
use gpio_config::{ActionConfig, SequenceStepConfig};
use gpio_network::ModuleCommand;
use gpio_types::{GpioError, ModuleId, Result};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// One compiled sequence step
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Disabled in configuration
    NoOp,
    /// Pause the supervisor
    Wait(Duration),
    /// Post `RunOutputCommand` to `module`
    RunOutputCommand {
        module: ModuleId,
        command: String,
        delay: Duration,
    },
}

impl Step {
    fn compile(action: &str, config: &SequenceStepConfig, registry: &ModuleRegistry) -> Result<Self> {
        if !config.enabled {
            return Ok(Self::NoOp);
        }

        let step_type = config.step_type.as_deref().ok_or_else(|| {
            fatal(format!("Action \"{}\": sequence item requires a \"Type\" property.", action))
        })?;

        match step_type {
            "Wait" => Ok(Self::Wait(seconds(action, config.delay)?)),
            "RunOutputCommand" => {
                let command = config.output_command.clone().ok_or_else(|| {
                    fatal(format!(
                        "Action \"{}\": sequence item requires an \"OutputCommand\" property.",
                        action
                    ))
                })?;

                let module = config.module.as_deref().ok_or_else(|| {
                    fatal(format!(
                        "Action \"{}\": sequence item requires a \"Module\" property.",
                        action
                    ))
                })?;

                let module = ModuleId::new(module);
                if registry.get(&module).is_none() {
                    return Err(GpioError::internal(format!(
                        "Cannot map action sequence item to module \"{}\"",
                        module
                    )));
                }

                Ok(Self::RunOutputCommand {
                    module,
                    command,
                    delay: seconds(action, config.delay)?,
                })
            }
            other => Err(fatal(format!(
                "Action \"{}\": unknown sequence item type \"{}\".",
                action, other
            ))),
        }
    }
}

fn fatal(message: String) -> GpioError {
    GpioError::configuration(message).into_fatal()
}

fn seconds(action: &str, delay: Option<f64>) -> Result<Duration> {
    let delay = delay.unwrap_or(0.0);
    Duration::try_from_secs_f64(delay)
        .map_err(|_| fatal(format!("Action \"{}\": invalid delay {}", action, delay)))
}

/// Named action sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    name: String,
    label: Option<String>,
    steps: Vec<Step>,
}

impl Action {
    pub fn compile(config: &ActionConfig, registry: &ModuleRegistry) -> Result<Self> {
        let name = config.name.trim();
        if name.is_empty() {
            return Err(fatal("Action requires a \"Name\" property.".to_string()));
        }

        let steps = config
            .sequence
            .iter()
            .map(|step| Step::compile(name, step, registry))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: name.to_string(),
            label: config.text.clone(),
            steps,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// First output step whose module is not initialized
    pub fn unready_step(&self, registry: &ModuleRegistry) -> Option<(&ModuleId, &str)> {
        self.steps.iter().find_map(|step| match step {
            Step::RunOutputCommand {
                module, command, ..
            } => {
                let ready = registry
                    .get(module)
                    .map_or(false, |entry| entry.is_initialized());
                (!ready).then_some((module, command.as_str()))
            }
            _ => None,
        })
    }

    /// Execute every step in order on the calling thread
    pub fn run(&self, registry: &ModuleRegistry) -> Result<()> {
        info!(action = %self.name, steps = self.steps.len(), "Running action");

        for step in &self.steps {
            match step {
                Step::NoOp => {}
                Step::Wait(delay) => {
                    debug!(action = %self.name, delay_ms = delay.as_millis() as u64, "Waiting");
                    thread::sleep(*delay);
                }
                Step::RunOutputCommand {
                    module,
                    command,
                    delay,
                } => {
                    let entry = registry.get(module).ok_or_else(|| {
                        GpioError::internal(format!("Module {} left the registry", module))
                    })?;

                    debug!(action = %self.name, module = %module, command = %command, "Posting output command");
                    entry
                        .actor_ref()
                        .send(ModuleCommand::RunOutputCommand {
                            name: command.clone(),
                            delay: *delay,
                        })
                        .map_err(|e| {
                            GpioError::network(format!(
                                "Output command \"{}\" not delivered to {}: {}",
                                command, module, e
                            ))
                        })?;
                }
            }
        }
        Ok(())
    }
}

/// All configured actions, looked up by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionBook {
    actions: Vec<Action>,
}

impl ActionBook {
    pub fn compile(configs: &[ActionConfig], registry: &ModuleRegistry) -> Result<Self> {
        let actions = configs
            .iter()
            .map(|config| Action::compile(config, registry))
            .collect::<Result<Vec<_>>>()?;

        debug!(actions = actions.len(), "Actions compiled");
        Ok(Self { actions })
    }

    pub fn find(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|action| action.name == name)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
