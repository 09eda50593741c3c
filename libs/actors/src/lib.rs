//! Actor Runtime
//!
//! Minimal thread-per-actor runtime used by the RadioGPIO supervisor and
//! every module it starts. Actors never call into each other: the only way
//! to reach an actor is to post an [`Envelope`] into its own mailbox through
//! an [`ActorRef`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  send_later(cmd)   ┌──────────────────────────────┐
//! │ any thread   │ ─────────────────▶ │ mailbox (MPSC, FIFO)         │
//! │ (ActorRef)   │                    └──────────────┬───────────────┘
//! └──────────────┘                                   │ take()
//!                                                    ▼
//!                                     ┌──────────────────────────────┐
//!                                     │ ActorRuntime::run            │
//!                                     │  pre_start()                 │
//!                                     │  loop { tick(); poll() }     │
//!                                     │  post_stop()                 │
//!                                     └──────────────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust
//! use gpio_actors::{mailbox, Actor, ActorId, ActorRuntime, PollPolicy};
//! use gpio_types::{GpioError, Result};
//! use std::time::Duration;
//!
//! struct Counter {
//!     total: u64,
//! }
//!
//! impl Actor for Counter {
//!     type Command = u64;
//!     type Reply = u64;
//!
//!     fn name(&self) -> &str {
//!         "Counter"
//!     }
//!
//!     fn handle(&mut self, amount: u64) -> Result<u64> {
//!         self.total += amount;
//!         Ok(self.total)
//!     }
//!
//!     fn report_error(&mut self, _error: &GpioError) {}
//! }
//!
//! let (counter_ref, receiver) = mailbox(ActorId::new("Counter"));
//! let policy = PollPolicy::blocking(Some(Duration::from_millis(50)), Duration::ZERO);
//! let mut handle = ActorRuntime::new(Counter { total: 0 }, receiver, policy)
//!     .spawn()
//!     .unwrap();
//!
//! counter_ref.send(5).unwrap();
//! counter_ref.shutdown().unwrap();
//! handle.join_timeout(Duration::from_secs(5));
//! ```

pub mod mailbox;
pub mod messages;
pub mod registry;
pub mod system;

pub use mailbox::{mailbox, MailboxError, MailboxReceiver};
pub use messages::{Callback, Envelope, Payload};
pub use registry::{ActorId, ActorRef, PendingMessage};
pub use system::{
    Actor, ActorExit, ActorHandle, ActorRole, ActorRuntime, PollOutcome, PollPolicy,
};
