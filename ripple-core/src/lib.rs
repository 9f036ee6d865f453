//! Ripple Core
//!
//! This crate provides a reactive state-and-effect scheduler. It implements:
//!
//! - State cells with getter/setter handles
//! - Effects that re-run when the cells they read change
//! - Automatic dependency tracking (no declared dependencies)
//! - Cleanups that run before each re-run and on stop
//! - Bridging of external sources into state cells
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `graph`: The association index between state cells and effects
//! - `reactive`: State cells, effects and the `Reactor` that schedules them
//!
//! Effects never run synchronously. Writes queue the affected effects and
//! the host drains the queue with [`Reactor::flush`], so several writes in a
//! row produce one re-run that sees the final values.
//!
//! # Example
//!
//! ```rust
//! use ripple_core::Reactor;
//!
//! let reactor = Reactor::default();
//! let (count, set_count) = reactor.use_state(0);
//!
//! reactor.effect(move || {
//!     println!("Count: {}", count.get());
//! });
//!
//! reactor.start();
//! reactor.flush(); // prints "Count: 0"
//!
//! set_count.set(5).unwrap();
//! set_count.set(6).unwrap();
//! reactor.flush(); // prints "Count: 6" once
//! ```

pub mod graph;
pub mod reactive;

mod config;
mod error;

pub use config::{ErrorHandler, ReactorBuilder, ReactorConfig};
pub use error::{BoxError, Error, Result};
pub use reactive::{
    Cleanup, Effect, EffectId, EffectOutput, Getter, ListenerId, ReadOptions, Reactor, Setter,
    StateId,
};
