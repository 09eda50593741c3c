//! Actor messages
//!
//! An [`Envelope`] is the unit placed into a mailbox: the identity of the
//! actor it is meant for, a typed payload and an optional completion
//! callback. Envelopes are immutable once built and owned by the mailbox
//! until the receiving actor consumes them.

use crate::registry::ActorId;
use std::fmt;

/// Completion callback invoked with the handler's reply
pub type Callback<R> = Box<dyn FnOnce(R) + Send + 'static>;

/// Message payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<C> {
    /// Actor-specific command
    Command(C),
    /// Ask the receiving actor to shut down
    Shutdown,
}

/// Targeted message envelope
pub struct Envelope<C, R> {
    target: ActorId,
    payload: Payload<C>,
    callback: Option<Callback<R>>,
}

impl<C, R> Envelope<C, R> {
    pub fn new(target: ActorId, payload: Payload<C>) -> Self {
        Self {
            target,
            payload,
            callback: None,
        }
    }

    pub(crate) fn set_callback(&mut self, callback: Callback<R>) {
        self.callback = Some(callback);
    }

    pub fn target(&self) -> &ActorId {
        &self.target
    }

    pub fn payload(&self) -> &Payload<C> {
        &self.payload
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub(crate) fn into_parts(self) -> (ActorId, Payload<C>, Option<Callback<R>>) {
        (self.target, self.payload, self.callback)
    }
}

impl<C: fmt::Debug, R> fmt::Debug for Envelope<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("target", &self.target)
            .field("payload", &self.payload)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
