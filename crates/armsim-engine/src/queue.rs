//! [`CommandQueue`] – the ordered backlog of pending commands.
//!
//! Strictly FIFO: commands leave from the head in the order they were
//! appended. The only other insertion point is
//! [`push_front_all`][CommandQueue::push_front_all], used by expansion so a
//! compound command's steps run before anything queued behind it.

use std::collections::VecDeque;

use armsim_types::{Command, CommandId};

#[derive(Debug, Default, Clone)]
pub struct CommandQueue {
    pending: VecDeque<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `cmd` at the tail.
    pub fn push_back(&mut self, cmd: Command) {
        self.pending.push_back(cmd);
    }

    /// Insert `cmds` at the head, keeping their relative order.
    pub fn push_front_all(&mut self, cmds: Vec<Command>) {
        for cmd in cmds.into_iter().rev() {
            self.pending.push_front(cmd);
        }
    }

    pub fn pop_front(&mut self) -> Option<Command> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove every pending command, head first.
    pub fn drain(&mut self) -> impl Iterator<Item = Command> + '_ {
        self.pending.drain(..)
    }

    /// Ids of the pending commands, head first.
    pub fn ids(&self) -> impl Iterator<Item = &CommandId> {
        self.pending.iter().map(|c| &c.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armsim_types::CommandKind;

    fn home(id: &str) -> Command {
        Command::new(id, CommandKind::Home)
    }

    fn ids(q: &CommandQueue) -> Vec<&str> {
        q.ids().map(CommandId::as_str).collect()
    }

    #[test]
    fn fifo_order() {
        let mut q = CommandQueue::new();
        q.push_back(home("a"));
        q.push_back(home("b"));
        q.push_back(home("c"));
        assert_eq!(q.pop_front().unwrap().id.as_str(), "a");
        assert_eq!(ids(&q), ["b", "c"]);
    }

    #[test]
    fn push_front_all_keeps_relative_order() {
        let mut q = CommandQueue::new();
        q.push_back(home("c"));
        q.push_front_all(vec![home("b:1"), home("b:2"), home("b:3")]);
        assert_eq!(ids(&q), ["b:1", "b:2", "b:3", "c"]);
    }

    #[test]
    fn drain_empties_in_order() {
        let mut q = CommandQueue::new();
        q.push_back(home("a"));
        q.push_back(home("b"));
        let drained: Vec<_> = q.drain().map(|c| c.id).collect();
        assert_eq!(drained, vec![CommandId::from("a"), CommandId::from("b")]);
        assert!(q.is_empty());
        assert_eq!(q.len(), 0);
    }
}
