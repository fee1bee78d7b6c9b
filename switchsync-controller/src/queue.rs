use alloc::collections::VecDeque;

use crate::error::{Error, Result};

/// Where a queued command came from. Manual transitions feed the same queue
/// as remote commands, ordered by arrival, so a human at the wall switch is
/// never silently overridden by a stale remote command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOrigin {
    Remote { seq: u64 },
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCommand {
    pub pin: u8,
    pub state: bool,
    pub origin: CommandOrigin,
}

/// Bounded FIFO between command sources and the apply step.
///
/// Drained at a fixed cadence rather than instantaneously so relays are not
/// re-triggered faster than they can settle.
#[derive(Debug)]
pub struct CommandQueue {
    items: VecDeque<SlotCommand>,
    capacity: usize,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, command: SlotCommand) -> Result<()> {
        if self.items.len() >= self.capacity {
            return Err(Error::QueueFull);
        }
        self.items.push_back(command);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<SlotCommand> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(pin: u8) -> SlotCommand {
        SlotCommand {
            pin,
            state: true,
            origin: CommandOrigin::Manual,
        }
    }

    #[test]
    fn preserves_arrival_order() {
        let mut queue = CommandQueue::new(4);
        queue.push(cmd(1)).unwrap();
        queue.push(cmd(2)).unwrap();

        assert_eq!(queue.pop().map(|c| c.pin), Some(1));
        assert_eq!(queue.pop().map(|c| c.pin), Some(2));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn rejects_when_full() {
        let mut queue = CommandQueue::new(2);
        queue.push(cmd(1)).unwrap();
        queue.push(cmd(2)).unwrap();

        assert_eq!(queue.push(cmd(3)), Err(Error::QueueFull));
        assert_eq!(queue.len(), 2);
    }
}
