//! Error types for ripple-core

use std::any::Any;

use thiserror::Error;

use crate::reactive::{EffectId, StateId};

/// Boxed error returned by fallible effects and cleanups.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error type.
///
/// `WriteDuringEffect` is returned directly to the caller of a setter. Every
/// other variant describes a failure in user code and is delivered to the
/// reactor's error handler instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{state} cannot be written while {effect} is executing")]
    WriteDuringEffect { state: StateId, effect: EffectId },

    #[error("{effect} failed: {source}")]
    EffectFailed {
        effect: EffectId,
        #[source]
        source: BoxError,
    },

    #[error("{effect} panicked: {message}")]
    EffectPanicked { effect: EffectId, message: String },

    #[error("cleanup of {effect} failed: {source}")]
    CleanupFailed {
        effect: EffectId,
        #[source]
        source: BoxError,
    },

    #[error("cleanup of {effect} panicked: {message}")]
    CleanupPanicked { effect: EffectId, message: String },

    #[error("listener on {state} panicked: {message}")]
    ListenerPanicked { state: StateId, message: String },
}

impl Error {
    /// Whether this error is a misuse of the API rather than a failure
    /// inside user code.
    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, Error::WriteDuringEffect { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Extract a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_str_and_string() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");

        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn only_writes_are_invalid_operations() {
        let write = Error::WriteDuringEffect {
            state: StateId::new(),
            effect: EffectId::new(),
        };
        let failed = Error::EffectFailed {
            effect: EffectId::new(),
            source: "nope".into(),
        };

        assert!(write.is_invalid_operation());
        assert!(!failed.is_invalid_operation());
        assert!(failed.to_string().ends_with("failed: nope"));
    }
}
