//! Actor System Core
//!
//! Run loop shared by the supervisor and every module. Each actor runs on
//! its own thread:
//!
//! ```text
//! pre_start()
//! while !exiting {
//!     tick()
//!     poll_mailbox()   // take one envelope, dispatch, invoke callback
//! }
//! post_stop()
//! ```
//!
//! Shutdown is cooperative. [`ActorRuntime::shutdown`] runs the actor's
//! cleanup and sets the exit flag, which is only observed between loop
//! iterations; an in-flight tick or dispatch is never interrupted. A thread
//! that does not reach its exit check within the join timeout is abandoned
//! by [`ActorHandle::join_timeout`], never killed.
//!
//! Domain errors ([`GpioError`]) returned by a hook are reported through
//! [`Actor::report_error`]; fatal ones shut the actor down. Anything else is
//! a panic and ends the actor thread, which the owner sees as
//! [`ActorExit::Panicked`] when joining.

use crate::mailbox::MailboxReceiver;
use crate::messages::Payload;
use crate::registry::ActorId;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use gpio_types::{GpioError, Result};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Which side of the supervision tree an actor sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    Supervisor,
    Worker,
}

/// How an actor waits on its mailbox
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    /// Wait for a message instead of returning immediately
    pub blocking: bool,
    /// Messages per second for non-blocking actors, 0 disables the limit
    pub rate_hz: u32,
    /// Upper bound on a blocking wait, `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Pause after a poll that found nothing
    pub cooldown: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            blocking: true,
            rate_hz: 5,
            timeout: Some(Duration::from_secs(10)),
            cooldown: Duration::from_millis(200),
        }
    }
}

impl PollPolicy {
    pub fn blocking(timeout: Option<Duration>, cooldown: Duration) -> Self {
        Self {
            blocking: true,
            rate_hz: 0,
            timeout,
            cooldown,
        }
    }

    pub fn non_blocking(rate_hz: u32, cooldown: Duration) -> Self {
        Self {
            blocking: false,
            rate_hz,
            timeout: None,
            cooldown,
        }
    }

    fn rate_delay(&self) -> Option<Duration> {
        if self.blocking || self.rate_hz == 0 {
            return None;
        }
        Some(Duration::from_secs_f64(1.0 / f64::from(self.rate_hz)))
    }
}

/// Behavior plugged into the shared run loop
pub trait Actor: Send + 'static {
    /// Typed commands accepted through the mailbox
    type Command: Send + 'static;
    /// Value handed to a message's callback
    type Reply: Send + 'static;

    fn name(&self) -> &str;

    fn role(&self) -> ActorRole {
        ActorRole::Worker
    }

    /// Called once on the actor's thread before the loop starts
    fn pre_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called at the top of every loop iteration
    fn tick(&mut self) -> Result<()> {
        Ok(())
    }

    fn handle(&mut self, command: Self::Command) -> Result<Self::Reply>;

    /// Surface a domain error to the user-facing layer
    ///
    /// The supervisor shows it directly, workers forward it to the
    /// supervisor's mailbox.
    fn report_error(&mut self, error: &GpioError);

    /// Release resources, runs once from shutdown before the exit flag flips
    fn cleanup(&mut self) {}

    /// Called on the actor's thread after the loop has ended
    fn post_stop(&mut self) {}
}

/// Result of one mailbox poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A message was dispatched successfully
    Processed,
    /// Nothing arrived within the wait
    Empty,
    /// The message was addressed to another actor and dropped
    Discarded,
    /// The handler returned a domain error
    Failed,
}

/// Drives one actor: owns it, its mailbox and its exit flag
pub struct ActorRuntime<A: Actor> {
    actor: A,
    mailbox: MailboxReceiver<A::Command, A::Reply>,
    policy: PollPolicy,
    exiting: bool,
}

impl<A: Actor> ActorRuntime<A> {
    pub fn new(actor: A, mailbox: MailboxReceiver<A::Command, A::Reply>, policy: PollPolicy) -> Self {
        Self {
            actor,
            mailbox,
            policy,
            exiting: false,
        }
    }

    pub fn id(&self) -> &ActorId {
        self.mailbox.owner()
    }

    pub fn actor(&self) -> &A {
        &self.actor
    }

    pub fn actor_mut(&mut self) -> &mut A {
        &mut self.actor
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting
    }

    /// Run the loop on the current thread until the exit flag is set
    pub fn run(mut self) -> A {
        info!(
            actor = %self.id(),
            role = ?self.actor.role(),
            "{} started",
            self.actor.name()
        );

        if let Err(e) = self.actor.pre_start() {
            self.fail(e);
        }
        debug!(actor = %self.id(), "Pre-start finished");

        while !self.exiting {
            if let Err(e) = self.actor.tick() {
                self.fail(e);
                if self.exiting {
                    break;
                }
            }

            if self.poll_mailbox() != PollOutcome::Processed {
                continue;
            }

            if let Some(delay) = self.policy.rate_delay() {
                thread::sleep(delay);
            }
        }

        self.actor.post_stop();
        info!(actor = %self.id(), "{} exited", self.actor.name());
        self.actor
    }

    /// Take at most one message from the mailbox and dispatch it
    pub fn poll_mailbox(&mut self) -> PollOutcome {
        let envelope = match self.mailbox.take(self.policy.blocking, self.policy.timeout) {
            Some(envelope) => envelope,
            None => {
                if !self.policy.cooldown.is_zero() {
                    thread::sleep(self.policy.cooldown);
                }
                return PollOutcome::Empty;
            }
        };

        let (target, payload, callback) = envelope.into_parts();

        // Mailboxes are actor-exclusive, so this only fires on a wiring bug.
        if &target != self.mailbox.owner() {
            error!(
                actor = %self.id(),
                target = %target,
                "Discarding message addressed to another actor"
            );
            return PollOutcome::Discarded;
        }

        match payload {
            Payload::Shutdown => {
                self.shutdown();
                PollOutcome::Processed
            }
            Payload::Command(command) => match self.actor.handle(command) {
                Ok(reply) => {
                    if let Some(callback) = callback {
                        debug!(actor = %self.id(), "Forwarding reply to callback");
                        callback(reply);
                    }
                    PollOutcome::Processed
                }
                Err(e) => {
                    self.fail(e);
                    PollOutcome::Failed
                }
            },
        }
    }

    /// Run cleanup and set the exit flag; later calls are no-ops
    pub fn shutdown(&mut self) {
        if self.exiting {
            return;
        }

        warn!(actor = %self.id(), "{} shutting down", self.actor.name());
        self.actor.cleanup();
        self.exiting = true;
    }

    fn fail(&mut self, error: GpioError) {
        error!(
            actor = %self.id(),
            category = error.category(),
            fatal = error.is_fatal(),
            "{}",
            error
        );

        self.actor.report_error(&error);

        if error.is_fatal() {
            self.shutdown();
        }
    }

    /// Move the runtime onto a dedicated thread named after the actor
    pub fn spawn(self) -> Result<ActorHandle> {
        let id = self.id().clone();
        let (done_tx, done_rx) = bounded(1);

        let thread = thread::Builder::new()
            .name(self.actor.name().to_string())
            .spawn(move || {
                let _signal = ExitSignal(done_tx);
                self.run();
            })
            .map_err(|e| {
                GpioError::internal_with_source(format!("Failed to start thread for {}", id), e)
            })?;

        Ok(ActorHandle {
            id,
            thread: Some(thread),
            done: done_rx,
        })
    }
}

/// Signals loop exit from the actor thread, including on panic
struct ExitSignal(Sender<()>);

impl Drop for ExitSignal {
    fn drop(&mut self) {
        let _ = self.0.try_send(());
    }
}

/// How a joined actor thread ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorExit {
    /// The loop ended through shutdown
    Clean,
    /// The thread unwound from a panic
    Panicked,
    /// The thread did not finish in time and was abandoned
    TimedOut,
    /// The handle was already joined or abandoned
    Detached,
}

/// Owner's handle to a spawned actor thread
#[derive(Debug)]
pub struct ActorHandle {
    id: ActorId,
    thread: Option<JoinHandle<()>>,
    done: Receiver<()>,
}

impl ActorHandle {
    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// True once the actor thread has returned, whatever the reason
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |thread| thread.is_finished())
    }

    /// Wait up to `timeout` for the actor thread to end
    pub fn join_timeout(&mut self, timeout: Duration) -> ActorExit {
        let thread = match self.thread.take() {
            Some(thread) => thread,
            None => return ActorExit::Detached,
        };

        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => match thread.join() {
                Ok(()) => {
                    debug!(actor = %self.id, "Actor thread joined");
                    ActorExit::Clean
                }
                Err(_) => {
                    error!(actor = %self.id, "Actor thread panicked");
                    ActorExit::Panicked
                }
            },
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    actor = %self.id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Actor did not exit in time, abandoning its thread"
                );
                ActorExit::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::mailbox;
    use crate::messages::Envelope;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug)]
    enum TestCommand {
        Record(u32),
        Fail { fatal: bool },
        Explode,
    }

    #[derive(Default)]
    struct Journal {
        handled: Vec<u32>,
        errors: Vec<String>,
        cleanups: usize,
        ticks: usize,
        post_stops: usize,
    }

    struct RecordingActor {
        journal: Arc<Mutex<Journal>>,
    }

    impl Actor for RecordingActor {
        type Command = TestCommand;
        type Reply = u32;

        fn name(&self) -> &str {
            "RecordingActor"
        }

        fn tick(&mut self) -> Result<()> {
            self.journal.lock().ticks += 1;
            Ok(())
        }

        fn handle(&mut self, command: TestCommand) -> Result<u32> {
            match command {
                TestCommand::Record(value) => {
                    self.journal.lock().handled.push(value);
                    Ok(value * 2)
                }
                TestCommand::Fail { fatal } => {
                    let err = GpioError::network("send failed");
                    Err(if fatal { err.into_fatal() } else { err })
                }
                TestCommand::Explode => panic!("unexpected failure"),
            }
        }

        fn report_error(&mut self, error: &GpioError) {
            self.journal.lock().errors.push(error.to_string());
        }

        fn cleanup(&mut self) {
            self.journal.lock().cleanups += 1;
        }

        fn post_stop(&mut self) {
            self.journal.lock().post_stops += 1;
        }
    }

    fn runtime() -> (
        ActorRuntime<RecordingActor>,
        crate::registry::ActorRef<TestCommand, u32>,
        Arc<Mutex<Journal>>,
    ) {
        let journal = Arc::new(Mutex::new(Journal::default()));
        let (actor_ref, receiver) = mailbox(ActorId::new("RecordingActor"));
        let actor = RecordingActor {
            journal: Arc::clone(&journal),
        };
        let policy = PollPolicy::non_blocking(0, Duration::ZERO);
        (ActorRuntime::new(actor, receiver, policy), actor_ref, journal)
    }

    #[test]
    fn test_callback_receives_reply() {
        let (mut runtime, actor_ref, _journal) = runtime();
        let reply = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&reply);

        actor_ref
            .send_later(TestCommand::Record(21))
            .attach_callback(move |value| *slot.lock() = Some(value))
            .fire()
            .unwrap();

        assert_eq!(runtime.poll_mailbox(), PollOutcome::Processed);
        assert_eq!(*reply.lock(), Some(42));
    }

    #[test]
    fn test_empty_poll() {
        let (mut runtime, _actor_ref, _journal) = runtime();
        assert_eq!(runtime.poll_mailbox(), PollOutcome::Empty);
    }

    #[test]
    fn test_misaddressed_message_is_discarded() {
        let (mut runtime, actor_ref, journal) = runtime();

        let stray = Envelope::new(ActorId::new("Elsewhere"), Payload::Command(TestCommand::Record(1)));
        actor_ref.sender.send(stray).unwrap();

        assert_eq!(runtime.poll_mailbox(), PollOutcome::Discarded);
        assert!(journal.lock().handled.is_empty());
    }

    #[test]
    fn test_non_fatal_error_is_reported_and_actor_keeps_running() {
        let (mut runtime, actor_ref, journal) = runtime();
        actor_ref.send(TestCommand::Fail { fatal: false }).unwrap();

        assert_eq!(runtime.poll_mailbox(), PollOutcome::Failed);
        assert!(!runtime.is_exiting());
        assert_eq!(journal.lock().errors, vec!["Network Error: send failed".to_string()]);
    }

    #[test]
    fn test_fatal_error_shuts_actor_down() {
        let (mut runtime, actor_ref, journal) = runtime();
        actor_ref.send(TestCommand::Fail { fatal: true }).unwrap();

        assert_eq!(runtime.poll_mailbox(), PollOutcome::Failed);
        assert!(runtime.is_exiting());
        assert_eq!(journal.lock().cleanups, 1);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (mut runtime, _actor_ref, journal) = runtime();
        runtime.shutdown();
        runtime.shutdown();
        assert!(runtime.is_exiting());
        assert_eq!(journal.lock().cleanups, 1);
    }

    #[test]
    fn test_run_processes_in_fifo_order_then_stops() {
        let (runtime, actor_ref, journal) = runtime();
        for value in 0..50 {
            actor_ref.send(TestCommand::Record(value)).unwrap();
        }
        actor_ref.shutdown().unwrap();

        runtime.run();

        let journal = journal.lock();
        assert_eq!(journal.handled, (0..50).collect::<Vec<_>>());
        assert_eq!(journal.cleanups, 1);
        assert_eq!(journal.post_stops, 1);
        assert!(journal.ticks >= 51);
    }

    #[test]
    fn test_spawned_actor_joins_cleanly() {
        let (runtime, actor_ref, journal) = runtime();
        let mut handle = runtime.spawn().unwrap();

        actor_ref.send(TestCommand::Record(3)).unwrap();
        actor_ref.shutdown().unwrap();

        assert_eq!(handle.join_timeout(Duration::from_secs(5)), ActorExit::Clean);
        assert_eq!(handle.join_timeout(Duration::from_secs(5)), ActorExit::Detached);
        assert_eq!(journal.lock().handled, vec![3]);
    }

    #[test]
    fn test_panic_terminates_only_that_actor() {
        let (runtime, actor_ref, journal) = runtime();
        let mut handle = runtime.spawn().unwrap();

        actor_ref.send(TestCommand::Explode).unwrap();

        assert_eq!(handle.join_timeout(Duration::from_secs(5)), ActorExit::Panicked);
        assert!(handle.is_finished());
        assert_eq!(journal.lock().cleanups, 0);
    }

    #[test]
    fn test_stuck_actor_is_abandoned_after_timeout() {
        struct Sleeper;

        impl Actor for Sleeper {
            type Command = ();
            type Reply = ();

            fn name(&self) -> &str {
                "Sleeper"
            }

            fn handle(&mut self, _: ()) -> Result<()> {
                thread::sleep(Duration::from_millis(500));
                Ok(())
            }

            fn report_error(&mut self, _error: &GpioError) {}
        }

        let (actor_ref, receiver) = mailbox(ActorId::new("Sleeper"));
        let policy = PollPolicy::blocking(Some(Duration::from_millis(10)), Duration::ZERO);
        let mut handle = ActorRuntime::new(Sleeper, receiver, policy).spawn().unwrap();

        actor_ref.send(()).unwrap();
        actor_ref.shutdown().unwrap();
        thread::sleep(Duration::from_millis(50));

        assert_eq!(handle.join_timeout(Duration::from_millis(10)), ActorExit::TimedOut);
    }
}
