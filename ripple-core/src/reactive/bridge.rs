//! External-state bridging.
//!
//! Sources outside the reactor (timers, sockets, another reactor's cells)
//! are mirrored into a local state cell. Effects then depend on them through
//! the ordinary getter path.
//!
//! The contract is a getter plus an observer: the observer accepts a
//! listener and calls it whenever the source changes. [`Reactor::use_watch`]
//! is the same idea for a `tokio::sync::watch` channel.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

use super::runtime::Reactor;
use super::signal::Getter;

impl Reactor {
    /// Mirror an external source into a new state cell.
    ///
    /// The cell is seeded with `get()`. `observe` receives a listener that
    /// re-reads `get()` and writes the result into the cell; write failures
    /// go to the error handler.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ripple_core::Reactor;
    ///
    /// let source = Reactor::default();
    /// let (temperature, set_temperature) = source.use_state(20);
    ///
    /// let mirror = Reactor::default();
    /// let remote = temperature.clone();
    /// let local = mirror.use_external(
    ///     move || remote.get_untracked(),
    ///     |listener| {
    ///         temperature.subscribe(listener);
    ///     },
    /// );
    ///
    /// set_temperature.set(25).unwrap();
    /// assert_eq!(local.get(), 25);
    /// ```
    pub fn use_external<T, G, O>(&self, get: G, observe: O) -> Getter<T>
    where
        T: PartialEq + 'static,
        G: Fn() -> T + 'static,
        O: FnOnce(Box<dyn Fn()>),
    {
        let (getter, setter) = self.use_state(get());
        let reactor = self.downgrade();

        observe(Box::new(move || {
            let value = get();
            if let Err(err) = setter.set(value) {
                if let Some(inner) = reactor.upgrade() {
                    inner.report(err);
                }
            }
        }));

        getter
    }

    /// Mirror a tokio watch channel into a new state cell.
    ///
    /// Spawns a local task, so this must be called inside a
    /// [`tokio::task::LocalSet`]. Every received value is written into the
    /// cell and the reactor is flushed. The task ends when the sender is
    /// dropped or the reactor is gone.
    pub fn use_watch<T>(&self, mut rx: watch::Receiver<T>) -> (Getter<T>, JoinHandle<()>)
    where
        T: Clone + PartialEq + 'static,
    {
        let initial = rx.borrow_and_update().clone();
        let (getter, setter) = self.use_state(initial);
        let reactor = self.downgrade();

        let task = tokio::task::spawn_local(async move {
            while rx.changed().await.is_ok() {
                let value = rx.borrow_and_update().clone();
                let Some(inner) = reactor.upgrade() else {
                    break;
                };
                let reactor = Reactor::from_inner(inner);
                match setter.set(value) {
                    Ok(_) => {
                        reactor.flush();
                    }
                    Err(err) => reactor.report(err),
                }
            }
            trace!("watch bridge finished");
        });

        (getter, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn external_source_seeds_and_follows() {
        let external = Rc::new(Cell::new(1));
        let listeners: Rc<RefCell<Vec<Box<dyn Fn()>>>> = Rc::new(RefCell::new(Vec::new()));

        let reactor = Reactor::default();
        let source = external.clone();
        let registry = listeners.clone();
        let value = reactor.use_external(
            move || source.get(),
            move |listener| registry.borrow_mut().push(listener),
        );
        assert_eq!(value.get(), 1);

        external.set(7);
        for listener in listeners.borrow().iter() {
            listener();
        }
        assert_eq!(value.get(), 7);
    }

    #[test]
    fn external_update_during_effect_is_reported() {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        let reactor = Reactor::new(move |err| sink.borrow_mut().push(err));

        let external = Rc::new(Cell::new(0));
        let notify: Rc<RefCell<Option<Box<dyn Fn()>>>> = Rc::new(RefCell::new(None));

        let source = external.clone();
        let slot = notify.clone();
        let value = reactor.use_external(move || source.get(), move |listener| {
            *slot.borrow_mut() = Some(listener);
        });

        // The effect pokes the external source synchronously, which would
        // write the local cell while the effect runs.
        let (poke, bump) = (notify.clone(), external.clone());
        reactor.effect(move || {
            bump.set(bump.get() + 1);
            if let Some(listener) = poke.borrow().as_ref() {
                listener();
            }
        });
        reactor.start();
        reactor.flush();

        assert_eq!(value.get(), 0);
        let errors = errors.borrow();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], Error::WriteDuringEffect { .. }));
    }
}
