//! Identity tokens for the reactive system.
//!
//! Closures have no stable identity in Rust, so every state cell, effect and
//! listener gets a token when it is created. The token, not the closure, is
//! what the reactor stores in its maps.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Generate a new unique ID.
            ///
            /// Uses an atomic counter so IDs stay unique across reactors.
            pub fn new() -> Self {
                static COUNTER: AtomicU64 = AtomicU64::new(0);
                Self(COUNTER.fetch_add(1, Ordering::Relaxed))
            }

            /// Get the raw ID value.
            pub fn raw(&self) -> u64 {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identity of a state cell, shared by its getter and setter.
    StateId,
    "state"
);

define_id!(
    /// Identity of an effect handle. Clones of a handle share it.
    EffectId,
    "effect"
);

define_id!(
    /// Identity of a listener registered on a state cell.
    ListenerId,
    "listener"
);
