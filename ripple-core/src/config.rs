//! Reactor configuration.
//!
//! [`ReactorBuilder`] collects the settings a reactor is created with.
//! Everything has a default: an unnamed reactor reports failures through
//! `tracing::error!`.

use std::fmt;
use std::rc::Rc;

use crate::error::Error;
use crate::reactive::Reactor;

/// Callback receiving failures from effects, cleanups and listeners.
///
/// A panic inside the handler is caught and discarded.
pub type ErrorHandler = Rc<dyn Fn(Error)>;

const DEFAULT_NAME: &str = "reactor";

/// Resolved reactor settings.
#[derive(Clone)]
pub struct ReactorConfig {
    /// Label recorded on the reactor's tracing spans.
    pub name: String,

    /// Where effect, cleanup and listener failures are delivered.
    pub on_error: ErrorHandler,
}

impl ReactorConfig {
    /// Handler used when none is configured.
    pub fn log_errors() -> ErrorHandler {
        Rc::new(|err: Error| {
            tracing::error!(error = %err, "reactor task failed");
        })
    }
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            on_error: Self::log_errors(),
        }
    }
}

impl fmt::Debug for ReactorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactorConfig")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Reactor`].
///
/// # Example
///
/// ```rust
/// use ripple_core::Reactor;
///
/// let reactor = Reactor::builder()
///     .name("ui")
///     .on_error(|err| eprintln!("ui effect failed: {err}"))
///     .build();
///
/// assert_eq!(reactor.name(), "ui");
/// ```
#[derive(Debug, Default)]
pub struct ReactorBuilder {
    config: ReactorConfig,
}

impl ReactorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(Error) + 'static,
    {
        self.config.on_error = Rc::new(handler);
        self
    }

    pub fn build(self) -> Reactor {
        Reactor::with_config(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn defaults_are_named_and_logging() {
        let config = ReactorConfig::default();
        assert_eq!(config.name, "reactor");

        // The default handler must not panic.
        (config.on_error)(Error::EffectPanicked {
            effect: crate::EffectId::new(),
            message: "test".into(),
        });
    }

    #[test]
    fn builder_overrides_handler() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();

        let builder = ReactorBuilder::new()
            .name("custom")
            .on_error(move |err| sink.borrow_mut().push(err.to_string()));

        assert_eq!(builder.config.name, "custom");
        (builder.config.on_error)(Error::EffectPanicked {
            effect: crate::EffectId::new(),
            message: "boom".into(),
        });
        assert_eq!(seen.borrow().len(), 1);
        assert!(seen.borrow()[0].ends_with("panicked: boom"));
    }
}
