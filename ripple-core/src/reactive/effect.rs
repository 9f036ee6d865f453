//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever a state
//! cell it read during its last run changes.
//!
//! # How Effects Work
//!
//! 1. Registering an effect queues it. It never runs inside the registering
//!    call; it runs on the next `Reactor::flush`.
//!
//! 2. While the body runs, every tracked getter call records the effect as a
//!    dependent of that cell.
//!
//! 3. When one of those cells changes, the effect is detached from all of its
//!    cells and queued again. The next run records a fresh set.
//!
//! # Cleanup
//!
//! An effect may return a [`Cleanup`]. It runs before the effect's next run
//! and when the reactor stops. Bodies can return `()`, a `Cleanup`,
//! `Option<Cleanup>`, or a `Result` of any of those; see [`EffectOutput`].

use std::fmt;
use std::rc::Rc;

use crate::error::BoxError;

use super::EffectId;

/// What an effect run produced: an optional cleanup, or a failure.
pub(crate) type Outcome = Result<Option<Cleanup>, BoxError>;

/// Teardown returned by an effect run.
pub struct Cleanup {
    run: Box<dyn FnOnce() -> Result<(), BoxError>>,
}

impl Cleanup {
    /// Create a cleanup from an infallible closure.
    pub fn new<F>(run: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            run: Box::new(move || {
                run();
                Ok::<(), BoxError>(())
            }),
        }
    }

    /// Create a cleanup that may fail. Failures go to the error handler.
    pub fn try_new<F, E>(run: F) -> Self
    where
        F: FnOnce() -> Result<(), E> + 'static,
        E: Into<BoxError>,
    {
        Self {
            run: Box::new(move || run().map_err(Into::<BoxError>::into)),
        }
    }

    pub(crate) fn invoke(self) -> Result<(), BoxError> {
        (self.run)()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleanup").finish_non_exhaustive()
    }
}

/// Values an effect body may return.
pub trait EffectOutput {
    fn into_outcome(self) -> Result<Option<Cleanup>, BoxError>;
}

impl EffectOutput for () {
    fn into_outcome(self) -> Result<Option<Cleanup>, BoxError> {
        Ok(None)
    }
}

impl EffectOutput for Cleanup {
    fn into_outcome(self) -> Result<Option<Cleanup>, BoxError> {
        Ok(Some(self))
    }
}

impl EffectOutput for Option<Cleanup> {
    fn into_outcome(self) -> Result<Option<Cleanup>, BoxError> {
        Ok(self)
    }
}

impl<T, E> EffectOutput for Result<T, E>
where
    T: EffectOutput,
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Result<Option<Cleanup>, BoxError> {
        match self {
            Ok(output) => output.into_outcome(),
            Err(err) => Err(err.into()),
        }
    }
}

/// Handle to an effect function.
///
/// The handle carries the effect's identity. Cloning it keeps the same
/// [`EffectId`], so registering a clone is the same as registering the
/// original.
///
/// # Example
///
/// ```rust
/// use ripple_core::{Cleanup, Effect, Reactor};
///
/// let reactor = Reactor::default();
/// let (count, set_count) = reactor.use_state(0);
///
/// let effect = Effect::new(move || {
///     let value = count.get();
///     Cleanup::new(move || println!("leaving {value}"))
/// });
///
/// reactor.use_effect(&effect);
/// reactor.use_effect(&effect.clone()); // no-op
/// reactor.start();
/// reactor.flush();
///
/// set_count.set(1).unwrap();
/// reactor.flush(); // prints "leaving 0", then the effect runs with 1
/// ```
#[derive(Clone)]
pub struct Effect {
    id: EffectId,
    run: Rc<dyn Fn() -> Outcome>,
}

impl Effect {
    /// Create a new effect handle. The effect does not run until it is
    /// registered with a started reactor and the reactor is flushed.
    pub fn new<F, R>(run: F) -> Self
    where
        F: Fn() -> R + 'static,
        R: EffectOutput,
    {
        Self {
            id: EffectId::new(),
            run: Rc::new(move || run().into_outcome()),
        }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> EffectId {
        self.id
    }

    pub(crate) fn call(&self) -> Outcome {
        (self.run)()
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect").field("id", &self.id).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn effect_clone_shares_id() {
        let effect1 = Effect::new(|| {});
        let effect2 = effect1.clone();
        let effect3 = Effect::new(|| {});

        assert_eq!(effect1.id(), effect2.id());
        assert_ne!(effect1.id(), effect3.id());
    }

    #[test]
    fn unit_output_has_no_cleanup() {
        let effect = Effect::new(|| {});
        assert!(matches!(effect.call(), Ok(None)));
    }

    #[test]
    fn cleanup_output_is_returned() {
        let cleaned = Rc::new(Cell::new(false));
        let flag = cleaned.clone();

        let effect = Effect::new(move || {
            let flag = flag.clone();
            Cleanup::new(move || flag.set(true))
        });

        let cleanup = effect.call().unwrap().expect("cleanup returned");
        assert!(!cleaned.get());
        cleanup.invoke().unwrap();
        assert!(cleaned.get());
    }

    #[test]
    fn result_output_carries_errors() {
        let failing = Effect::new(|| -> Result<(), String> { Err("bad input".into()) });
        let err = failing.call().unwrap_err();
        assert_eq!(err.to_string(), "bad input");

        let ok = Effect::new(|| -> Result<Option<Cleanup>, String> {
            Ok(Some(Cleanup::new(|| {})))
        });
        assert!(matches!(ok.call(), Ok(Some(_))));
    }

    #[test]
    fn fallible_cleanup_reports_error() {
        let cleanup = Cleanup::try_new(|| Err::<(), _>("teardown failed"));
        assert_eq!(cleanup.invoke().unwrap_err().to_string(), "teardown failed");
    }
}
