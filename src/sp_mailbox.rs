use std::collections::VecDeque;

use crate::sp_interface::{Message, SimTime};

/// Per-node FIFO queue, the only way a node observes the outside world.
///
/// `put` never blocks. Taking a message is the engine's job: a task waiting
/// on an empty mailbox is simply not runnable, and becomes runnable at the
/// time its head message arrived.
#[derive(Debug, Default)]
pub struct Mailbox {
    queue: VecDeque<Message>,
    // arrival time of the current head
    head_since: Option<SimTime>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, message: Message, now: SimTime) {
        if self.queue.is_empty() {
            self.head_since = Some(now);
        }
        self.queue.push_back(message);
    }

    /// Dequeue the oldest message.
    ///
    /// Remaining messages are already present, so the new head counts as
    /// available from `now`.
    pub fn take(&mut self, now: SimTime) -> Option<Message> {
        let message = self.queue.pop_front()?;
        self.head_since = if self.queue.is_empty() { None } else { Some(now) };
        Some(message)
    }

    /// Time since which a message has been waiting, if any
    pub fn ready_since(&self) -> Option<SimTime> {
        self.head_since
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
