//! Execution Context
//!
//! The execution context records which effect (or cleanup) a reactor is
//! running right now. Getters read it to find the subscriber for a tracked
//! read, and setters read it to reject writes while user code is running.
//!
//! # Implementation
//!
//! Each reactor owns one context; there is no global or thread-local slot,
//! so independent reactors never see each other's frames.
//!
//! Entering a frame returns a guard that restores the previous frame when it
//! is dropped. Nesting happens when an effect calls `stop()` and the reactor
//! runs cleanups underneath it. The guard also clears the frame if user code
//! panics past a `catch_unwind`.

use std::cell::Cell;

use super::EffectId;

/// What the reactor is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Frame {
    /// The effect whose body or cleanup is running.
    pub(crate) effect: EffectId,
    /// Whether getter reads are recorded as dependencies of `effect`.
    pub(crate) tracking: bool,
}

impl Frame {
    /// Frame for an effect body. Reads are tracked.
    pub(crate) fn body(effect: EffectId) -> Self {
        Self {
            effect,
            tracking: true,
        }
    }

    /// Frame for a cleanup. Reads are not tracked.
    pub(crate) fn cleanup(effect: EffectId) -> Self {
        Self {
            effect,
            tracking: false,
        }
    }
}

/// Per-reactor slot holding the current frame.
#[derive(Debug, Default)]
pub(crate) struct ExecutionContext {
    current: Cell<Option<Frame>>,
}

impl ExecutionContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enter `frame`. The previous frame is restored when the guard drops.
    pub(crate) fn enter(&self, frame: Frame) -> FrameGuard<'_> {
        let previous = self.current.replace(Some(frame));
        FrameGuard {
            context: self,
            previous,
        }
    }

    /// The effect whose body or cleanup is running, if any.
    pub(crate) fn executing(&self) -> Option<EffectId> {
        self.current.get().map(|frame| frame.effect)
    }

    /// The effect that should receive a tracked read, if any.
    pub(crate) fn subscriber(&self) -> Option<EffectId> {
        self.current
            .get()
            .filter(|frame| frame.tracking)
            .map(|frame| frame.effect)
    }
}

/// Guard that restores the previous frame when dropped.
pub(crate) struct FrameGuard<'a> {
    context: &'a ExecutionContext,
    previous: Option<Frame>,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.context.current.set(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_effect() {
        let context = ExecutionContext::new();
        let id = EffectId::new();

        assert!(context.executing().is_none());
        assert!(context.subscriber().is_none());

        {
            let _frame = context.enter(Frame::body(id));

            assert_eq!(context.executing(), Some(id));
            assert_eq!(context.subscriber(), Some(id));
        }

        // Context should be cleaned up after drop
        assert!(context.executing().is_none());
        assert!(context.subscriber().is_none());
    }

    #[test]
    fn cleanup_frames_do_not_track() {
        let context = ExecutionContext::new();
        let id = EffectId::new();

        let _frame = context.enter(Frame::cleanup(id));
        assert_eq!(context.executing(), Some(id));
        assert!(context.subscriber().is_none());
    }

    #[test]
    fn nested_frames_restore_outer() {
        let context = ExecutionContext::new();
        let outer = EffectId::new();
        let inner = EffectId::new();

        {
            let _outer = context.enter(Frame::body(outer));
            {
                let _inner = context.enter(Frame::cleanup(inner));
                assert_eq!(context.executing(), Some(inner));
                assert!(context.subscriber().is_none());
            }

            // After inner frame drops, outer should be current
            assert_eq!(context.subscriber(), Some(outer));
        }

        assert!(context.executing().is_none());
    }

    #[test]
    fn contexts_are_independent() {
        let a = ExecutionContext::new();
        let b = ExecutionContext::new();

        let _frame = a.enter(Frame::body(EffectId::new()));
        assert!(a.executing().is_some());
        assert!(b.executing().is_none());
    }
}
