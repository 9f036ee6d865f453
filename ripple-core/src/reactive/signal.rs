//! State Cells
//!
//! A state cell holds one value and is reachable only through the
//! [`Getter`] / [`Setter`] pair returned by `Reactor::use_state`.
//!
//! # How State Cells Work
//!
//! 1. When a getter is called while an effect of the owning reactor is
//!    running, the reactor records that effect as a dependent of the cell.
//!
//! 2. When the setter stores a different value, the reactor detaches the
//!    cell's dependents and queues them to re-run.
//!
//! 3. Listeners registered with [`Getter::subscribe`] are called
//!    synchronously after every change. They are the bridge for code outside
//!    the reactor, for example another reactor's `use_external`.
//!
//! # Threading
//!
//! Cells are single-threaded (`Rc`/`RefCell`). The reactor never runs user
//! code concurrently, so there is nothing to lock.

use std::cell::RefCell;
use std::fmt::Debug;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::error::{panic_message, Error, Result};

use super::runtime::Inner;
use super::{ListenerId, StateId};

/// Options for a single getter call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Do not record this read as a dependency of the running effect.
    pub untracked: bool,
}

impl ReadOptions {
    pub fn untracked() -> Self {
        Self { untracked: true }
    }
}

type Listener = Rc<dyn Fn()>;

/// Shared storage behind a getter/setter pair.
struct StateCell<T> {
    id: StateId,
    value: RefCell<T>,
    listeners: RefCell<IndexMap<ListenerId, Listener>>,
    reactor: Weak<Inner>,
}

impl<T> StateCell<T> {
    /// Record a read by the running effect, unless suppressed.
    fn track(&self, options: ReadOptions) {
        if options.untracked {
            return;
        }
        if let Some(reactor) = self.reactor.upgrade() {
            reactor.track(self.id);
        }
    }

    /// Call every listener once. A panicking listener is reported and the
    /// rest still run.
    fn notify_listeners(&self, reactor: Option<&Inner>) {
        let listeners: Vec<Listener> = self.listeners.borrow().values().cloned().collect();

        for listener in listeners {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener())) {
                let err = Error::ListenerPanicked {
                    state: self.id,
                    message: panic_message(payload.as_ref()),
                };
                match reactor {
                    Some(reactor) => reactor.report(err),
                    None => tracing::warn!(error = %err, "listener failed without a reactor"),
                }
            }
        }
    }
}

/// Create a new cell owned by `reactor`.
pub(crate) fn state_pair<T>(reactor: Weak<Inner>, initial: T) -> (Getter<T>, Setter<T>)
where
    T: PartialEq + 'static,
{
    let cell = Rc::new(StateCell {
        id: StateId::new(),
        value: RefCell::new(initial),
        listeners: RefCell::new(IndexMap::new()),
        reactor,
    });

    (
        Getter {
            cell: Rc::clone(&cell),
        },
        Setter { cell },
    )
}

/// Read half of a state cell.
///
/// # Example
///
/// ```rust
/// use ripple_core::{ReadOptions, Reactor};
///
/// let reactor = Reactor::default();
/// let (count, _set_count) = reactor.use_state(3);
///
/// assert_eq!(count.get(), 3);
/// assert_eq!(count.get_with(ReadOptions::untracked()), 3);
/// ```
pub struct Getter<T> {
    cell: Rc<StateCell<T>>,
}

impl<T> Getter<T> {
    /// Get the cell's identity.
    pub fn id(&self) -> StateId {
        self.cell.id
    }

    /// Get the current value.
    ///
    /// Inside an effect of the owning reactor, this records the effect as a
    /// dependent of the cell.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.get_with(ReadOptions::default())
    }

    /// Get the current value without recording a dependency.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.get_with(ReadOptions::untracked())
    }

    pub fn get_with(&self, options: ReadOptions) -> T
    where
        T: Clone,
    {
        self.cell.track(options);
        self.cell.value.borrow().clone()
    }

    /// Read the value by reference. Tracked like [`Getter::get`].
    ///
    /// The cell is borrowed while `f` runs, so `f` must not write to it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.track(ReadOptions::default());
        let value = self.cell.value.borrow();
        f(&value)
    }

    /// Register a listener called after every change to the cell.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + 'static,
    {
        let id = ListenerId::new();
        self.cell
            .listeners
            .borrow_mut()
            .insert(id, Rc::new(listener));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.cell.listeners.borrow_mut().shift_remove(&id).is_some()
    }

    /// Number of effects whose last run read this cell.
    pub fn dependent_count(&self) -> usize {
        self.cell
            .reactor
            .upgrade()
            .map(|reactor| reactor.dependent_count(self.cell.id))
            .unwrap_or(0)
    }
}

/// Write half of a state cell.
pub struct Setter<T> {
    cell: Rc<StateCell<T>>,
}

impl<T> Setter<T>
where
    T: PartialEq,
{
    /// Get the cell's identity.
    pub fn id(&self) -> StateId {
        self.cell.id
    }

    /// Store `value` if it differs from the current one.
    ///
    /// Returns `Ok(true)` if the cell changed. A change queues every effect
    /// that read the cell during its last run and then calls the cell's
    /// listeners. Fails with [`Error::WriteDuringEffect`] while any effect
    /// or cleanup of the owning reactor is running; the cell is left
    /// untouched in that case.
    pub fn set(&self, value: T) -> Result<bool> {
        let reactor = self.cell.reactor.upgrade();

        if let Some(effect) = reactor.as_ref().and_then(|r| r.executing()) {
            tracing::debug!(state = %self.cell.id, %effect, "write rejected during effect");
            return Err(Error::WriteDuringEffect {
                state: self.cell.id,
                effect,
            });
        }

        {
            let mut current = self.cell.value.borrow_mut();
            if *current == value {
                return Ok(false);
            }
            *current = value;
        }

        if let Some(reactor) = reactor.as_ref() {
            reactor.invalidate(self.cell.id);
        }
        self.cell.notify_listeners(reactor.as_deref());

        Ok(true)
    }

    /// Store the value computed from the current one.
    ///
    /// The cell is borrowed while `f` runs, so `f` must not read or write it
    /// through another handle.
    pub fn update<F>(&self, f: F) -> Result<bool>
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.cell.value.borrow());
        self.set(next)
    }
}

impl<T> Clone for Getter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: Debug> Debug for Getter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Getter")
            .field("id", &self.cell.id)
            .field("value", &*self.cell.value.borrow())
            .field("listeners", &self.cell.listeners.borrow().len())
            .finish()
    }
}

impl<T> Debug for Setter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Setter").field("id", &self.cell.id).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn detached<T: PartialEq + 'static>(initial: T) -> (Getter<T>, Setter<T>) {
        state_pair(Weak::new(), initial)
    }

    #[test]
    fn state_get_and_set() {
        let (value, set_value) = detached(0);
        assert_eq!(value.get(), 0);

        assert!(set_value.set(42).unwrap());
        assert_eq!(value.get(), 42);
    }

    #[test]
    fn state_update() {
        let (value, set_value) = detached(10);
        set_value.update(|v| v + 5).unwrap();
        assert_eq!(value.get(), 15);
    }

    #[test]
    fn equal_write_is_a_no_op() {
        let (value, set_value) = detached(String::from("same"));
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        value.subscribe(move || counter.set(counter.get() + 1));

        assert!(!set_value.set(String::from("same")).unwrap());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn listeners_are_notified_and_removable() {
        let (value, set_value) = detached(0);
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();

        let id = value.subscribe(move || counter.set(counter.get() + 1));

        set_value.set(1).unwrap();
        set_value.set(2).unwrap();
        assert_eq!(calls.get(), 2);

        assert!(value.unsubscribe(id));
        assert!(!value.unsubscribe(id));

        set_value.set(3).unwrap();
        // Should not have been called again
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn panicking_listener_does_not_stop_others() {
        let (value, set_value) = detached(0);
        let reached = Rc::new(Cell::new(false));
        let flag = reached.clone();

        value.subscribe(|| panic!("listener exploded"));
        value.subscribe(move || flag.set(true));

        assert!(set_value.set(1).unwrap());
        assert!(reached.get());
    }

    #[test]
    fn with_reads_by_reference() {
        let (items, set_items) = detached(vec![1, 2, 3]);
        assert_eq!(items.with(|v| v.len()), 3);

        set_items.update(|v| v.iter().map(|x| x * 2).collect()).unwrap();
        assert_eq!(items.with(|v| v.iter().sum::<i32>()), 12);
    }

    #[test]
    fn handles_share_identity() {
        let (value, set_value) = detached(0);
        let (other, _) = detached(0);

        assert_eq!(value.id(), set_value.id());
        assert_eq!(value.clone().id(), value.id());
        assert_ne!(value.id(), other.id());
        assert_eq!(value.dependent_count(), 0);
    }
}
