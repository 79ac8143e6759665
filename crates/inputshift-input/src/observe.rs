//! Observer lists with cancellation tokens.
//!
//! Registering an observer returns an [`ObservationToken`]. Dropping the
//! token, or calling [`ObservationToken::cancel`], unregisters the observer.
//! Tokens only hold a weak reference to the list, so cancelling after the
//! owner (a registry or a detached device) is gone is a no-op.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

/// Handle to one registered observer.
#[must_use = "dropping the token unregisters the observer"]
pub struct ObservationToken {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl ObservationToken {
    fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Unregister the observer. Calling this more than once does nothing.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for ObservationToken {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for ObservationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationToken")
            .field("active", &self.is_active())
            .finish()
    }
}

struct Slots<F: ?Sized> {
    next_id: u64,
    entries: BTreeMap<u64, Rc<RefCell<F>>>,
}

/// An ordered list of observers of type `F`, usually a `dyn FnMut(..)`.
pub struct Observers<F: ?Sized> {
    slots: Rc<RefCell<Slots<F>>>,
}

impl<F: ?Sized + 'static> Observers<F> {
    pub fn new() -> Self {
        Self {
            slots: Rc::new(RefCell::new(Slots {
                next_id: 0,
                entries: BTreeMap::new(),
            })),
        }
    }

    /// Register an observer. Observers are notified in registration order.
    pub fn insert(&self, observer: Rc<RefCell<F>>) -> ObservationToken {
        let id = {
            let mut slots = self.slots.borrow_mut();
            let id = slots.next_id;
            slots.next_id += 1;
            slots.entries.insert(id, observer);
            id
        };

        let slots: Weak<RefCell<Slots<F>>> = Rc::downgrade(&self.slots);
        ObservationToken::new(move || {
            if let Some(slots) = slots.upgrade() {
                slots.borrow_mut().entries.remove(&id);
            }
        })
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call `notify` with every observer registered when dispatch starts.
    ///
    /// Observers may register or cancel observers on this list while being
    /// notified. New observers are first called on the next dispatch; a
    /// cancelled one is not called again, even later in this dispatch. An
    /// observer that is already running further up the stack is skipped.
    pub fn notify(&self, mut notify: impl FnMut(&mut F)) {
        let snapshot: Vec<(u64, Rc<RefCell<F>>)> = self
            .slots
            .borrow()
            .entries
            .iter()
            .map(|(id, observer)| (*id, Rc::clone(observer)))
            .collect();
        for (id, observer) in snapshot {
            if !self.slots.borrow().entries.contains_key(&id) {
                continue;
            }
            if let Ok(mut observer) = observer.try_borrow_mut() {
                notify(&mut *observer);
            }
        }
    }
}

impl<F: ?Sized + 'static> Default for Observers<F> {
    fn default() -> Self {
        Self::new()
    }
}
