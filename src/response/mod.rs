//! The response sink a chat turn writes into.
//!
//! A [`ChatResponse`] receives ordered [`StreamChunk`]s, a single terminal
//! `finish()`, and, out of band, user decisions delivered by the transport.
//! Decisions fan out to the listeners in the sink's [`UserInputListeners`]
//! set, which is how [`crate::confirm`] waits for a confirmation.

mod channel;

pub use channel::ChannelResponse;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::stream::{StreamChunk, UserInput};

/// Callback invoked for every user input delivered to a response.
pub type UserInputListener = Arc<dyn Fn(&UserInput) + Send + Sync>;

/// Handle returned by [`UserInputListeners::add`], used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered set of user-input listeners owned by one response.
///
/// Keeps running totals of registrations and deregistrations so hosts can
/// check that every turn cleaned up after itself.
#[derive(Default)]
pub struct UserInputListeners {
    entries: Mutex<Vec<(ListenerId, UserInputListener)>>,
    next_id: AtomicU64,
    added: AtomicUsize,
    removed: AtomicUsize,
}

impl UserInputListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: UserInputListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        self.added.fetch_add(1, Ordering::Relaxed);
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() != before;
        if removed {
            self.removed.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Calls every listener, in registration order, with `input`.
    ///
    /// The set is snapshotted first, so a listener may add or remove
    /// listeners without deadlocking.
    pub fn dispatch(&self, input: &UserInput) {
        let snapshot: Vec<UserInputListener> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(input);
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of successful `add` calls.
    pub fn registrations(&self) -> usize {
        self.added.load(Ordering::Relaxed)
    }

    /// Total number of successful `remove` calls.
    pub fn deregistrations(&self) -> usize {
        self.removed.load(Ordering::Relaxed)
    }
}

/// Output side of one chat turn.
///
/// Implementations forward chunks to a transport; the listener plumbing is
/// provided on top of [`ChatResponse::listeners`].
pub trait ChatResponse: Send + Sync {
    /// Stable identifier of the in-progress message.
    fn message_id(&self) -> &str;

    /// Appends a chunk. `is_final` closes the current message, not the turn.
    fn emit(&self, chunk: StreamChunk, is_final: bool);

    /// Marks the turn complete. No chunks may follow.
    fn finish(&self);

    fn listeners(&self) -> &UserInputListeners;

    fn add_user_input_listener(&self, listener: UserInputListener) -> ListenerId {
        self.listeners().add(listener)
    }

    fn remove_user_input_listener(&self, id: ListenerId) -> bool {
        self.listeners().remove(id)
    }

    /// Entry point for the transport when the user answers a prompt.
    fn deliver_user_input(&self, input: &UserInput) {
        self.listeners().dispatch(input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(callback_id: &str) -> UserInput {
        UserInput {
            callback_id: callback_id.into(),
            data: json!({"confirmed": true}),
        }
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let listeners = UserInputListeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            listeners.add(Arc::new(move |input: &UserInput| {
                seen.lock()
                    .unwrap()
                    .push(format!("{tag}:{}", input.callback_id));
            }));
        }

        listeners.dispatch(&input("a"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:a", "second:a", "third:a"]
        );
    }

    #[test]
    fn test_remove_counts_only_real_removals() {
        let listeners = UserInputListeners::new();
        let id = listeners.add(Arc::new(|_: &UserInput| {}));
        assert_eq!(listeners.len(), 1);

        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));

        assert!(listeners.is_empty());
        assert_eq!(listeners.registrations(), 1);
        assert_eq!(listeners.deregistrations(), 1);
    }

    #[test]
    fn test_listener_can_remove_itself() {
        let listeners = Arc::new(UserInputListeners::new());
        let slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));
        let id = {
            let listeners_ref = Arc::clone(&listeners);
            let slot = Arc::clone(&slot);
            listeners.add(Arc::new(move |_: &UserInput| {
                if let Some(id) = slot.lock().unwrap().take() {
                    listeners_ref.remove(id);
                }
            }))
        };
        *slot.lock().unwrap() = Some(id);

        listeners.dispatch(&input("x"));

        assert!(listeners.is_empty());
    }
}
