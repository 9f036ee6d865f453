//! Reactive Primitives
//!
//! This module implements the reactive scheduler: state cells, effects and
//! the reactor that connects them.
//!
//! # Concepts
//!
//! ## State cells
//!
//! A state cell holds a mutable value behind a getter/setter pair. When the
//! getter is called while an effect runs, the reactor records that effect as
//! a dependent of the cell. When the setter stores a different value, every
//! dependent is queued to run again.
//!
//! ## Effects
//!
//! An Effect is a side-effecting function that re-runs whenever a cell it
//! read during its last run changes. It may return a cleanup that runs
//! before the next run and when the reactor stops.
//!
//! ## Reactor
//!
//! The reactor owns the effect registry and the deferred queue. Effects never
//! run inside the call that made them due; they run on the next `flush`.
//!
//! # Implementation Notes
//!
//! Dependencies are discovered, not declared: the reactor keeps an execution
//! frame for the running effect, and every getter consults it. Each reactor
//! owns its frame, so independent reactors can share a thread.

mod bridge;
mod context;
mod effect;
mod id;
mod queue;
mod runtime;
mod signal;

pub use effect::{Cleanup, Effect, EffectOutput};
pub use id::{EffectId, ListenerId, StateId};
pub use runtime::Reactor;
pub use signal::{Getter, ReadOptions, Setter};
