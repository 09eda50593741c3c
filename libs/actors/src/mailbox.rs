//! Actor mailbox implementation
//!
//! Each actor owns exactly one mailbox: any number of producers hold an
//! [`ActorRef`], the actor itself is the single consumer draining the
//! [`MailboxReceiver`] in arrival order.

use crate::messages::Envelope;
use crate::registry::{ActorId, ActorRef};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::time::Duration;
use thiserror::Error;

/// Error when posting into a mailbox
#[derive(Error, Debug)]
pub enum MailboxError {
    /// The receiving actor has exited and dropped its mailbox
    #[error("mailbox of {0} is closed")]
    Closed(String),
}

/// Create a mailbox owned by `owner`
pub fn mailbox<C, R>(owner: ActorId) -> (ActorRef<C, R>, MailboxReceiver<C, R>) {
    let (sender, receiver) = unbounded();
    let actor_ref = ActorRef::new(owner.clone(), sender.clone());
    let mailbox = MailboxReceiver {
        owner,
        receiver,
        _keepalive: sender,
    };
    (actor_ref, mailbox)
}

/// Consuming half of an actor's mailbox
pub struct MailboxReceiver<C, R> {
    owner: ActorId,
    receiver: Receiver<Envelope<C, R>>,
    // Keeps the channel connected so a blocking take waits instead of
    // returning immediately once every ActorRef is gone.
    _keepalive: Sender<Envelope<C, R>>,
}

impl<C, R> MailboxReceiver<C, R> {
    pub fn owner(&self) -> &ActorId {
        &self.owner
    }

    /// Take the next envelope
    ///
    /// Non-blocking takes return immediately. Blocking takes wait up to
    /// `timeout`, or indefinitely when no timeout is given.
    pub fn take(&self, blocking: bool, timeout: Option<Duration>) -> Option<Envelope<C, R>> {
        if !blocking {
            return self.receiver.try_recv().ok();
        }

        match timeout {
            Some(timeout) => self.receiver.recv_timeout(timeout).ok(),
            None => self.receiver.recv().ok(),
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
