//! Reactive Runtime
//!
//! The [`Reactor`] is the central coordinator that connects state cells and
//! effects. It owns the effect registry, the cleanup table, the association
//! index and the deferred queue.
//!
//! # How It Works
//!
//! 1. `use_effect` registers an effect and queues it. `start` queues every
//!    registered effect.
//!
//! 2. `flush` drains the queue. For each effect it runs the pending cleanup,
//!    then the body inside an execution frame so that getter reads are
//!    recorded in the association index.
//!
//! 3. When a setter changes a cell, the reactor:
//!    a. Removes the cell from the index and receives the effects that read it
//!    b. Those effects are detached from every other cell as well
//!    c. Each one is queued once, in registration order
//!    d. Nothing runs until the next `flush`
//!
//! # Batching
//!
//! An effect already waiting in the queue is not queued twice. Several writes
//! before a `flush` therefore produce one run that sees the final values.
//!
//! # Threading
//!
//! A reactor is single-threaded. The execution frame lives in the reactor
//! itself, so several reactors can coexist on one thread without seeing each
//! other's effects.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::config::{ReactorBuilder, ReactorConfig};
use crate::error::{panic_message, Error};
use crate::graph::AssociationIndex;

use super::context::{ExecutionContext, Frame};
use super::effect::{Cleanup, Effect, EffectOutput};
use super::queue::TaskQueue;
use super::signal::{state_pair, Getter, Setter};
use super::{EffectId, StateId};

/// Shared reactor state. Cells hold a `Weak` to it.
pub(crate) struct Inner {
    config: ReactorConfig,

    /// Whether queued effects may run.
    started: Cell<bool>,

    /// Set while `flush` is draining, so nested flushes return immediately.
    draining: Cell<bool>,

    /// Registered effects in registration order.
    effects: RefCell<IndexMap<EffectId, Effect>>,

    /// Cleanup returned by each effect's most recent run.
    cleanups: RefCell<HashMap<EffectId, Cleanup>>,

    /// State → effects that read it during their last run.
    index: RefCell<AssociationIndex<StateId, EffectId>>,

    queue: RefCell<TaskQueue<EffectId>>,

    context: ExecutionContext,
}

impl Inner {
    fn new(config: ReactorConfig) -> Self {
        Self {
            config,
            started: Cell::new(false),
            draining: Cell::new(false),
            effects: RefCell::new(IndexMap::new()),
            cleanups: RefCell::new(HashMap::new()),
            index: RefCell::new(AssociationIndex::new()),
            queue: RefCell::new(TaskQueue::new()),
            context: ExecutionContext::new(),
        }
    }

    /// The effect whose body or cleanup is running, if any.
    pub(crate) fn executing(&self) -> Option<EffectId> {
        self.context.executing()
    }

    /// Record a read of `state` by the running effect.
    pub(crate) fn track(&self, state: StateId) {
        if let Some(effect) = self.context.subscriber() {
            self.index.borrow_mut().associate(state, effect);
        }
    }

    /// Queue every effect that read `state`, in registration order.
    pub(crate) fn invalidate(&self, state: StateId) {
        let detached = self.index.borrow_mut().remove_associations(&state);
        if detached.is_empty() {
            return;
        }

        let mut ordered: Vec<(usize, EffectId)> = {
            let effects = self.effects.borrow();
            detached
                .into_iter()
                .filter_map(|id| effects.get_index_of(&id).map(|pos| (pos, id)))
                .collect()
        };
        ordered.sort_unstable();

        trace!(%state, effects = ordered.len(), "state changed");
        for (_, id) in ordered {
            self.schedule(id);
        }
    }

    pub(crate) fn dependent_count(&self, state: StateId) -> usize {
        self.index
            .borrow()
            .consumers(&state)
            .map(|consumers| consumers.len())
            .unwrap_or(0)
    }

    /// Deliver `err` to the error handler. A panicking handler is ignored.
    pub(crate) fn report(&self, err: Error) {
        let handler = Rc::clone(&self.config.on_error);
        let _ = catch_unwind(AssertUnwindSafe(move || handler(err)));
    }

    fn schedule(&self, id: EffectId) {
        if !self.started.get() {
            return;
        }
        if self.queue.borrow_mut().push(id) {
            trace!(effect = %id, "effect queued");
        }
    }

    fn use_effect(&self, effect: &Effect) -> EffectId {
        let id = effect.id();
        if self.effects.borrow().contains_key(&id) {
            return id;
        }

        self.effects.borrow_mut().insert(id, effect.clone());
        trace!(effect = %id, "effect registered");
        self.schedule(id);
        id
    }

    fn start(&self) {
        if self.started.replace(true) {
            return;
        }

        let ids: Vec<EffectId> = self.effects.borrow().keys().copied().collect();
        debug!(reactor = %self.config.name, effects = ids.len(), "reactor started");

        let mut queue = self.queue.borrow_mut();
        for id in ids {
            queue.push(id);
        }
    }

    fn stop(&self) {
        // Flip first: a cleanup that calls `stop` again must see "stopped".
        if !self.started.replace(false) {
            return;
        }

        self.queue.borrow_mut().clear();

        let pending: Vec<(EffectId, Cleanup)> = {
            let effects = self.effects.borrow();
            let mut cleanups = self.cleanups.borrow_mut();
            effects
                .keys()
                .filter_map(|id| cleanups.remove(id).map(|cleanup| (*id, cleanup)))
                .collect()
        };

        debug!(reactor = %self.config.name, cleanups = pending.len(), "reactor stopping");
        for (id, cleanup) in pending {
            self.run_cleanup(id, cleanup);
        }

        self.index.borrow_mut().remove_all_associations();
    }

    fn flush(&self) -> usize {
        if self.draining.replace(true) {
            return 0;
        }
        let _draining = DrainGuard(&self.draining);

        let span = tracing::debug_span!("flush", reactor = %self.config.name);
        let _enter = span.enter();

        let mut ran = 0;
        loop {
            let next = self.queue.borrow_mut().pop();
            let Some(id) = next else {
                break;
            };
            if !self.started.get() {
                continue;
            }
            if self.run_effect(id) {
                ran += 1;
            }
        }

        if ran > 0 {
            debug!(ran, "queue drained");
        }
        ran
    }

    /// Run one effect: pending cleanup first, then the body.
    ///
    /// Returns `false` if the body did not run.
    fn run_effect(&self, id: EffectId) -> bool {
        let Some(effect) = self.effects.borrow().get(&id).cloned() else {
            return false;
        };

        let previous = self.cleanups.borrow_mut().remove(&id);
        if let Some(cleanup) = previous {
            self.run_cleanup(id, cleanup);
            if !self.started.get() {
                trace!(effect = %id, "reactor stopped by cleanup");
                return false;
            }
        }

        trace!(effect = %id, "running effect");
        let outcome = {
            let _frame = self.context.enter(Frame::body(id));
            catch_unwind(AssertUnwindSafe(|| effect.call()))
        };

        let cleanup = match outcome {
            Ok(Ok(cleanup)) => cleanup,
            Ok(Err(source)) => {
                self.report(Error::EffectFailed { effect: id, source });
                None
            }
            Err(payload) => {
                self.report(Error::EffectPanicked {
                    effect: id,
                    message: panic_message(payload.as_ref()),
                });
                None
            }
        };

        if !self.started.get() {
            // The body stopped the reactor. Its reads after the stop must not
            // survive, and its cleanup has no later stop to run in.
            self.index.borrow_mut().remove_consumer(&id);
            if let Some(cleanup) = cleanup {
                self.run_cleanup(id, cleanup);
            }
            return true;
        }

        if let Some(cleanup) = cleanup {
            self.cleanups.borrow_mut().insert(id, cleanup);
        }
        true
    }

    fn run_cleanup(&self, id: EffectId, cleanup: Cleanup) {
        let result = {
            let _frame = self.context.enter(Frame::cleanup(id));
            catch_unwind(AssertUnwindSafe(move || cleanup.invoke()))
        };

        match result {
            Ok(Ok(())) => {}
            Ok(Err(source)) => self.report(Error::CleanupFailed { effect: id, source }),
            Err(payload) => self.report(Error::CleanupPanicked {
                effect: id,
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

/// Resets the draining flag when `flush` returns.
struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Reactive scheduler owning state cells and effects.
///
/// Cloning a `Reactor` yields another handle to the same scheduler.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use ripple_core::{Cleanup, Reactor};
///
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let reactor = Reactor::default();
/// let (count, set_count) = reactor.use_state(0);
///
/// let sink = log.clone();
/// reactor.effect(move || {
///     sink.borrow_mut().push(count.get().to_string());
///     let sink = sink.clone();
///     Cleanup::new(move || sink.borrow_mut().push("cleanup".into()))
/// });
///
/// reactor.start();
/// reactor.flush();
/// set_count.set(1).unwrap();
/// reactor.flush();
/// reactor.stop();
///
/// assert_eq!(*log.borrow(), ["0", "cleanup", "1", "cleanup"]);
/// ```
#[derive(Clone)]
pub struct Reactor {
    inner: Rc<Inner>,
}

impl Reactor {
    /// Create a stopped reactor that delivers failures to `on_error`.
    pub fn new<F>(on_error: F) -> Self
    where
        F: Fn(Error) + 'static,
    {
        Self::builder().on_error(on_error).build()
    }

    pub fn builder() -> ReactorBuilder {
        ReactorBuilder::new()
    }

    pub(crate) fn with_config(config: ReactorConfig) -> Self {
        Self {
            inner: Rc::new(Inner::new(config)),
        }
    }

    pub(crate) fn from_inner(inner: Rc<Inner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<Inner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn report(&self, err: Error) {
        self.inner.report(err);
    }

    /// The name recorded on this reactor's tracing spans.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Transition to running and queue every registered effect.
    ///
    /// Does nothing if already running.
    pub fn start(&self) {
        self.inner.start();
    }

    /// Transition to stopped.
    ///
    /// Discards queued runs, invokes every pending cleanup once (in
    /// registration order) and forgets all dependencies. Does nothing if
    /// already stopped, including when called from inside a cleanup.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Drain the deferred queue and return how many effect bodies ran.
    ///
    /// Effects queued while draining run in the same flush. Calling `flush`
    /// from inside an effect returns 0 and leaves the work to the outer
    /// drain.
    pub fn flush(&self) -> usize {
        self.inner.flush()
    }

    /// Create a state cell.
    pub fn use_state<T>(&self, initial: T) -> (Getter<T>, Setter<T>)
    where
        T: PartialEq + 'static,
    {
        state_pair(self.downgrade(), initial)
    }

    /// Register `effect` and queue its first run.
    ///
    /// Registering the same handle again (or a clone of it) does nothing.
    pub fn use_effect(&self, effect: &Effect) -> EffectId {
        self.inner.use_effect(effect)
    }

    /// Create an effect from `run` and register it.
    pub fn effect<F, R>(&self, run: F) -> Effect
    where
        F: Fn() -> R + 'static,
        R: EffectOutput,
    {
        let effect = Effect::new(run);
        self.use_effect(&effect);
        effect
    }

    pub fn is_running(&self) -> bool {
        self.inner.started.get()
    }

    /// Whether an effect body or cleanup is running right now.
    pub fn is_executing(&self) -> bool {
        self.inner.executing().is_some()
    }

    pub fn is_registered(&self, effect: &Effect) -> bool {
        self.inner.effects.borrow().contains_key(&effect.id())
    }

    pub fn effect_count(&self) -> usize {
        self.inner.effects.borrow().len()
    }

    /// Number of effects waiting for the next flush.
    pub fn pending_count(&self) -> usize {
        self.inner.queue.borrow().len()
    }
}

impl Default for Reactor {
    fn default() -> Self {
        Self::with_config(ReactorConfig::default())
    }
}

impl fmt::Debug for Reactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor")
            .field("name", &self.name())
            .field("running", &self.is_running())
            .field("effects", &self.effect_count())
            .field("pending", &self.pending_count())
            .finish()
    }
}
