//! Listener registry used for property-store subscriptions.
//!
//! Listeners are identified by a `CallbackId` handed out at registration.
//! Dropping the id does nothing; pass it to `unregister` to cancel.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Handle returned by `Callbacks::register`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

type Callback<T> = Rc<dyn Fn(&T)>;

/// Single-threaded set of `Fn(&T)` listeners.
pub struct Callbacks<T> {
    entries: RefCell<Vec<(CallbackId, Callback<T>)>>,
    next_id: Cell<u64>,
}

impl<T> Callbacks<T> {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    /// Add a listener and return its cancellation handle.
    pub fn register<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&T) + 'static,
    {
        let id = CallbackId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.entries.borrow_mut().push((id, Rc::new(callback)));
        id
    }

    /// Remove a listener. Returns false if the id was not registered.
    pub fn unregister(&self, id: CallbackId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Invoke every listener in registration order.
    ///
    /// The listener list is snapshotted first, so a listener may register or
    /// unregister others without a borrow conflict.
    pub fn notify(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for callback in snapshot {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl<T> Default for Callbacks<T> {
    fn default() -> Self {
        Self::new()
    }
}
