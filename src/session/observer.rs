use crossbeam_channel::Sender;

use crate::session::state::StateChange;

/// Receives every [`StateChange`] a session publishes.
pub trait Observer {
    fn notify(&mut self, change: &StateChange);
}

impl<F> Observer for F
where
    F: FnMut(&StateChange),
{
    fn notify(&mut self, change: &StateChange) {
        self(change)
    }
}

/// Forwards changes to another thread. A full or disconnected channel drops
/// the change (traced) rather than blocking the session.
impl Observer for Sender<StateChange> {
    fn notify(&mut self, change: &StateChange) {
        if let Err(err) = self.try_send(*change) {
            tracing::trace!(
                change = %change,
                error = %err,
                "observer channel dropped a state change"
            );
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    entries: Vec<(SubscriptionId, Box<dyn Observer + Send>)>,
}

impl Observers {
    pub(crate) fn subscribe(&mut self, observer: Box<dyn Observer + Send>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn publish(&mut self, change: StateChange) {
        for (_, observer) in &mut self.entries {
            observer.notify(&change);
        }
    }
}
