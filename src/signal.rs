//! Broadcast listener lists
//!
//! A [`Signal`] holds listeners that are notified in registration order.
//! A listener can unsubscribe itself by returning [`ListenerAction::Remove`]
//! while the signal is being emitted; listeners added during an emission are
//! kept but only notified by the next one.

use std::fmt;

/// Returned by a listener to stay subscribed or to detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerAction {
    Keep,
    Remove,
}

/// Handle to a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener<T: ?Sized> {
    id: ListenerId,
    notify: Box<dyn FnMut(&T) -> ListenerAction>,
}

pub struct Signal<T: ?Sized> {
    listeners: Vec<Listener<T>>,
    next_id: u64,
}

impl<T: ?Sized> Default for Signal<T> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T: ?Sized> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<T: ?Sized> Signal<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, notify: impl FnMut(&T) -> ListenerAction + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener {
            id,
            notify: Box::new(notify),
        });
        id
    }

    /// Returns false if the listener was already gone.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn emit(&mut self, data: &T) {
        let mut current = std::mem::take(&mut self.listeners);
        current.retain_mut(|listener| (listener.notify)(data) == ListenerAction::Keep);
        // Anything registered meanwhile sits in `self.listeners`; keep it after the survivors.
        current.append(&mut self.listeners);
        self.listeners = current;
    }
}
