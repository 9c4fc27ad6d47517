//! [`PendingCompletions`] – request/response correlation keyed by command id.
//!
//! An agent that submits a command parks a one-shot slot here under the
//! command's id. When the engine emits the matching [`CompletionEvent`] the
//! slot is resolved and removed; a stop fails every slot still parked. At
//! most one await may be outstanding per id, and ids shaped like an expanded
//! sub-command (`"<parent>:<index>"`) are reserved for the engine so an
//! expansion can never resolve an agent's await.

use std::collections::HashMap;

use armsim_types::{ArmError, CommandId, CommandResult, CompletionEvent};
use tokio::sync::oneshot;
use tracing::debug;

/// The agent-side half of one awaited command.
pub type CompletionSlot = oneshot::Sender<CommandResult>;

#[derive(Debug, Default)]
pub struct PendingCompletions {
    slots: HashMap<CommandId, CompletionSlot>,
}

impl PendingCompletions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `slot` under `id`.
    ///
    /// # Errors
    ///
    /// If an await for `id` is already outstanding, or `id` has the shape of
    /// an expanded sub-command id, the new slot is failed immediately with
    /// [`ArmError::InvalidArgument`], which is also returned. Existing awaits
    /// are left untouched.
    pub fn register(&mut self, id: CommandId, slot: CompletionSlot) -> Result<(), ArmError> {
        let rejection = if id.is_sub_id() {
            Some(format!("command id '{id}' is reserved for expanded sub-commands"))
        } else if self.slots.contains_key(&id) {
            Some(format!("command id '{id}' is already in flight"))
        } else {
            None
        };
        if let Some(reason) = rejection {
            let err = ArmError::InvalidArgument(reason);
            let _ = slot.send(Err(err.clone()));
            return Err(err);
        }
        self.slots.insert(id, slot);
        Ok(())
    }

    /// Resolve the await for `event.id`, if any. Returns `true` when an agent
    /// was still listening.
    pub fn resolve(&mut self, event: &CompletionEvent) -> bool {
        self.settle(&event.id, event.result.clone())
    }

    /// Fail the await for `id` with `error`, if any.
    pub fn reject(&mut self, id: &CommandId, error: ArmError) -> bool {
        self.settle(id, Err(error))
    }

    /// Fail every outstanding await with `error`. Returns how many were
    /// failed.
    pub fn fail_all(&mut self, error: ArmError) -> usize {
        let count = self.slots.len();
        for (id, slot) in self.slots.drain() {
            if slot.send(Err(error.clone())).is_err() {
                debug!(id = %id, "await dropped before it could be failed");
            }
        }
        count
    }

    pub fn contains(&self, id: &CommandId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn settle(&mut self, id: &CommandId, result: CommandResult) -> bool {
        match self.slots.remove(id) {
            Some(slot) => {
                let delivered = slot.send(result).is_ok();
                if !delivered {
                    debug!(id = %id, "completion arrived after the agent stopped waiting");
                }
                delivered
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armsim_types::{Completion, IkBranch};

    #[test]
    fn resolve_delivers_and_removes() {
        let mut table = PendingCompletions::new();
        let (tx, mut rx) = oneshot::channel();
        table.register("a".into(), tx).unwrap();
        assert!(table.contains(&"a".into()));

        let event = CompletionEvent::new("a".into(), Ok(Completion::with_ik(IkBranch::ElbowUp)));
        assert!(table.resolve(&event));
        assert!(table.is_empty());
        assert_eq!(
            rx.try_recv().unwrap(),
            Ok(Completion::with_ik(IkBranch::ElbowUp))
        );
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut table = PendingCompletions::new();
        let event = CompletionEvent::new("line:3".into(), Ok(Completion::done()));
        assert!(!table.resolve(&event));
    }

    #[test]
    fn duplicate_id_is_rejected_without_disturbing_the_first() {
        let mut table = PendingCompletions::new();
        let (tx1, mut rx1) = oneshot::channel();
        let (tx2, mut rx2) = oneshot::channel();
        table.register("dup".into(), tx1).unwrap();
        let err = table.register("dup".into(), tx2).unwrap_err();
        assert_eq!(err.code(), "invalid-argument");
        assert!(matches!(rx2.try_recv(), Ok(Err(ArmError::InvalidArgument(_)))));
        assert!(rx1.try_recv().is_err(), "first await must still be pending");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn sub_command_shaped_ids_are_reserved() {
        let mut table = PendingCompletions::new();
        let (tx, mut rx) = oneshot::channel();
        let err = table.register("L:1".into(), tx).unwrap_err();
        assert_eq!(err.code(), "invalid-argument");
        assert!(matches!(rx.try_recv(), Ok(Err(ArmError::InvalidArgument(_)))));
        assert!(table.is_empty());

        let (tx, _rx) = oneshot::channel();
        table.register("task:a".into(), tx).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn fail_all_rejects_every_await() {
        let mut table = PendingCompletions::new();
        let mut receivers = Vec::new();
        for id in ["a", "b", "c"] {
            let (tx, rx) = oneshot::channel();
            table.register(id.into(), tx).unwrap();
            receivers.push(rx);
        }
        assert_eq!(table.fail_all(ArmError::Stopped), 3);
        assert!(table.is_empty());
        for mut rx in receivers {
            assert_eq!(rx.try_recv().unwrap(), Err(ArmError::Stopped));
        }
    }

    #[test]
    fn dropped_await_is_not_an_error() {
        let mut table = PendingCompletions::new();
        let (tx, rx) = oneshot::channel();
        table.register("gone".into(), tx).unwrap();
        drop(rx);
        assert!(!table.reject(&"gone".into(), ArmError::Stopped));
        assert!(table.is_empty());
    }
}
