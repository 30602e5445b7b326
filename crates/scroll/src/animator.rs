//! Per-area scroll animation state.
//!
//! Animations are stepped explicitly by the frame clock, so a smooth
//! scroll of `duration_ms` completes after as many ticks as it takes to
//! accumulate that much elapsed time.

use crate::types::{ScrollCallback, ScrollType};
use std::fmt;
use strata_geometry::ScrollOffset;

/// A programmatic smooth scroll in flight.
pub struct ProgrammaticAnimation {
    start: ScrollOffset,
    target: ScrollOffset,
    elapsed_ms: u64,
    duration_ms: u64,
    scroll_type: ScrollType,
    pub(crate) callback: Option<ScrollCallback>,
}

impl ProgrammaticAnimation {
    pub fn target(&self) -> ScrollOffset {
        self.target
    }

    pub fn scroll_type(&self) -> ScrollType {
        self.scroll_type
    }

    fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        (self.elapsed_ms as f32 / self.duration_ms as f32).min(1.0)
    }

    /// Cubic ease-in-out.
    fn eased(progress: f32) -> f32 {
        if progress < 0.5 {
            4.0 * progress * progress * progress
        } else {
            1.0 - (-2.0 * progress + 2.0).powi(3) / 2.0
        }
    }

    fn offset_at_progress(&self, progress: f32) -> ScrollOffset {
        if progress >= 1.0 {
            return self.target;
        }
        let eased = Self::eased(progress);
        self.start + (self.target - self.start).scaled(eased)
    }
}

impl fmt::Debug for ProgrammaticAnimation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ProgrammaticAnimation")
            .field("start", &self.start)
            .field("target", &self.target)
            .field("elapsed_ms", &self.elapsed_ms)
            .field("duration_ms", &self.duration_ms)
            .field("scroll_type", &self.scroll_type)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// One step of a running animation.
pub(crate) struct AnimationStep {
    pub offset: ScrollOffset,
    pub scroll_type: ScrollType,
    /// Set on the final step.
    pub finished: Option<Option<ScrollCallback>>,
}

/// The offset an area is animating from, and any animation in flight.
///
/// `current_offset` is the untruncated offset last applied through the
/// animator; it can be ahead of a snapped stored offset.
#[derive(Debug)]
pub struct ScrollAnimator {
    current_offset: ScrollOffset,
    duration_ms: u64,
    animation: Option<ProgrammaticAnimation>,
}

impl Default for ScrollAnimator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DURATION_MS)
    }
}

impl ScrollAnimator {
    pub const DEFAULT_DURATION_MS: u64 = 150;

    /// An idle animator whose smooth scrolls take `duration_ms`.
    pub const fn new(duration_ms: u64) -> Self {
        Self {
            current_offset: ScrollOffset::ZERO,
            duration_ms,
            animation: None,
        }
    }

    #[inline]
    pub fn current_offset(&self) -> ScrollOffset {
        self.current_offset
    }

    #[inline]
    pub fn set_current_offset(&mut self, offset: ScrollOffset) {
        self.current_offset = offset;
    }

    pub fn has_running_animation(&self) -> bool {
        self.animation.is_some()
    }

    pub fn animation(&self) -> Option<&ProgrammaticAnimation> {
        self.animation.as_ref()
    }

    /// Start animating from the current offset to `target`.
    ///
    /// Any animation already running is replaced and returned so the caller
    /// can report its interruption.
    pub(crate) fn animate_to(
        &mut self,
        target: ScrollOffset,
        scroll_type: ScrollType,
        callback: Option<ScrollCallback>,
    ) -> Option<ProgrammaticAnimation> {
        self.animation.replace(ProgrammaticAnimation {
            start: self.current_offset,
            target,
            elapsed_ms: 0,
            duration_ms: self.duration_ms,
            scroll_type,
            callback,
        })
    }

    /// Shift a running animation by `delta`, keeping it visually continuous
    /// when content is adjusted underneath it.
    pub fn adjust_animation(&mut self, delta: ScrollOffset) {
        if let Some(animation) = self.animation.as_mut() {
            animation.start += delta;
            animation.target += delta;
        }
    }

    /// Drop the running animation, if any.
    pub(crate) fn take_animation(&mut self) -> Option<ProgrammaticAnimation> {
        self.animation.take()
    }

    /// Advance the running animation by `elapsed_ms`.
    pub(crate) fn tick(&mut self, elapsed_ms: u64) -> Option<AnimationStep> {
        let animation = self.animation.as_mut()?;
        animation.elapsed_ms = animation.elapsed_ms.saturating_add(elapsed_ms);
        let progress = animation.progress();
        let offset = animation.offset_at_progress(progress);
        let scroll_type = animation.scroll_type;
        self.current_offset = offset;
        let finished = if progress >= 1.0 {
            self.animation.take().map(|done| done.callback)
        } else {
            None
        };
        Some(AnimationStep {
            offset,
            scroll_type,
            finished,
        })
    }
}
