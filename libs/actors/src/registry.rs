//! Actor identity and references
//!
//! An [`ActorRef`] is the sending half of one actor's mailbox. Cloning it is
//! cheap and every clone delivers into the same FIFO queue.

use crate::mailbox::MailboxError;
use crate::messages::{Envelope, Payload};
use crossbeam_channel::Sender;
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Unique actor identifier
#[derive(Debug, Clone)]
pub struct ActorId {
    name: String,
    id: Uuid,
}

impl ActorId {
    /// Create new actor ID
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: Uuid::new_v4(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for ActorId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ActorId {}

impl Hash for ActorId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, &self.id.simple().to_string()[..8])
    }
}

/// Reference used to post messages to an actor
pub struct ActorRef<C, R> {
    id: ActorId,
    pub(crate) sender: Sender<Envelope<C, R>>,
}

impl<C, R> ActorRef<C, R> {
    pub(crate) fn new(id: ActorId, sender: Sender<Envelope<C, R>>) -> Self {
        Self { id, sender }
    }

    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// Build a message for this actor without delivering it yet
    ///
    /// A callback can be attached to the returned [`PendingMessage`] before
    /// it is fired into the mailbox.
    pub fn send_later(&self, command: C) -> PendingMessage<C, R> {
        PendingMessage {
            sender: self.sender.clone(),
            envelope: Envelope::new(self.id.clone(), Payload::Command(command)),
        }
    }

    /// Post a command without callback
    pub fn send(&self, command: C) -> Result<(), MailboxError> {
        self.send_later(command).fire()
    }

    /// Ask the actor to shut down after the messages already queued
    pub fn shutdown(&self) -> Result<(), MailboxError> {
        PendingMessage {
            sender: self.sender.clone(),
            envelope: Envelope::new(self.id.clone(), Payload::Shutdown),
        }
        .fire()
    }

    /// Number of messages waiting in the mailbox
    pub fn queued(&self) -> usize {
        self.sender.len()
    }
}

impl<C, R> Clone for ActorRef<C, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<C, R> fmt::Debug for ActorRef<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("id", &self.id)
            .field("queued", &self.sender.len())
            .finish()
    }
}

/// Message built by [`ActorRef::send_later`], delivered on [`fire`](Self::fire)
#[must_use = "a pending message is only delivered once fired"]
pub struct PendingMessage<C, R> {
    sender: Sender<Envelope<C, R>>,
    envelope: Envelope<C, R>,
}

impl<C, R> PendingMessage<C, R> {
    /// Invoke `callback` with the handler's reply once processed
    pub fn attach_callback<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(R) + Send + 'static,
    {
        self.envelope.set_callback(Box::new(callback));
        self
    }

    /// Enqueue into the target's mailbox
    pub fn fire(self) -> Result<(), MailboxError> {
        let target = self.envelope.target().to_string();
        self.sender
            .send(self.envelope)
            .map_err(|_| MailboxError::Closed(target))
    }
}
