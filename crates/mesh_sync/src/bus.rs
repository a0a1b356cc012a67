//! Subscriber lists backed by tokio channels
//!
//! Publishing happens inside the call that produced the value, so every
//! subscriber has it queued by the time that call returns. Receivers that were
//! dropped are pruned on the next publish.

use tokio::sync::mpsc;

/// Registered listeners for values of type `T`, in registration order
#[derive(Debug)]
pub struct Subscribers<T> {
    senders: Vec<mpsc::UnboundedSender<T>>,
}

impl<T: Clone> Subscribers<T> {
    pub fn new() -> Self {
        Self { senders: Vec::new() }
    }

    /// Register a new listener
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.push(tx);
        rx
    }

    /// Hand `value` to every live listener
    pub fn publish(&mut self, value: &T) {
        self.senders.retain(|tx| tx.send(value.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

impl<T: Clone> Default for Subscribers<T> {
    fn default() -> Self {
        Self::new()
    }
}
