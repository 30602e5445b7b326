//! Vocabulary shared by every scrollable area.

/// Who asked for a scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollType {
    /// Wheel, keyboard or touch input.
    User,
    /// Script or browser-initiated `scrollTo`.
    Programmatic,
    /// Re-clamping after the scroll range shrank.
    Clamping,
    /// The compositor already scrolled; the main thread only catches up.
    Compositor,
    /// Scroll anchoring adjustments.
    Anchoring,
    /// One step of a queued scroll-into-view sequence.
    Sequenced,
}

impl ScrollType {
    /// Explicit scrolls are reported to the root frame viewport; clamping
    /// and compositor catch-ups are not.
    pub const fn is_explicit(self) -> bool {
        matches!(
            self,
            Self::User | Self::Programmatic | Self::Anchoring | Self::Sequenced
        )
    }

    /// Whether a new scroll of this type cancels a queued scroll-into-view sequence.
    pub const fn aborts_sequenced_scrolls(self) -> bool {
        !matches!(self, Self::Sequenced | Self::Clamping | Self::Compositor)
    }
}

/// How a scroll should be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScrollBehavior {
    /// Use the scroller's `scroll-behavior` style.
    #[default]
    Auto,
    Instant,
    Smooth,
}

impl ScrollBehavior {
    /// Replace `Auto` with the scroller's own preference.
    pub const fn resolve(self, style: Self) -> Self {
        match self {
            Self::Auto => match style {
                Self::Smooth => Self::Smooth,
                Self::Auto | Self::Instant => Self::Instant,
            },
            other => other,
        }
    }
}

/// Unit of a user scroll delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollGranularity {
    Line,
    Page,
    Document,
    Pixel,
    PrecisePixel,
    /// Fraction of the visible size.
    Percentage,
}

/// Outcome reported to a scroll completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollCompletionMode {
    /// Nothing had to move.
    ZeroDelta,
    Finished,
    /// A newer scroll took over before the animation completed.
    InterruptedByScroll,
}

impl ScrollCompletionMode {
    /// Combine the outcomes of two sub-scrolls.
    pub const fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::InterruptedByScroll, _) | (_, Self::InterruptedByScroll) => {
                Self::InterruptedByScroll
            }
            (Self::ZeroDelta, Self::ZeroDelta) => Self::ZeroDelta,
            _ => Self::Finished,
        }
    }
}

/// Called exactly once when a scroll completes.
pub type ScrollCallback = Box<dyn FnOnce(ScrollCompletionMode)>;

/// Run `callback`, if any.
pub fn run_callback(callback: Option<ScrollCallback>, mode: ScrollCompletionMode) {
    if let Some(callback) = callback {
        callback(mode);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollbarOrientation {
    Horizontal,
    Vertical,
}

/// What a user scroll did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollResult {
    pub did_scroll_x: bool,
    pub did_scroll_y: bool,
    pub unused_scroll_delta_x: f32,
    pub unused_scroll_delta_y: f32,
}

impl ScrollResult {
    pub const fn new(
        did_scroll_x: bool,
        did_scroll_y: bool,
        unused_scroll_delta_x: f32,
        unused_scroll_delta_y: f32,
    ) -> Self {
        Self {
            did_scroll_x,
            did_scroll_y,
            unused_scroll_delta_x,
            unused_scroll_delta_y,
        }
    }

    pub const fn did_scroll(&self) -> bool {
        self.did_scroll_x || self.did_scroll_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_behavior_follows_style() {
        assert_eq!(ScrollBehavior::Auto.resolve(ScrollBehavior::Smooth), ScrollBehavior::Smooth);
        assert_eq!(ScrollBehavior::Auto.resolve(ScrollBehavior::Auto), ScrollBehavior::Instant);
        assert_eq!(ScrollBehavior::Instant.resolve(ScrollBehavior::Smooth), ScrollBehavior::Instant);
    }

    #[test]
    fn interruption_wins_when_combining() {
        use ScrollCompletionMode::*;
        assert_eq!(Finished.combine(InterruptedByScroll), InterruptedByScroll);
        assert_eq!(ZeroDelta.combine(Finished), Finished);
        assert_eq!(ZeroDelta.combine(ZeroDelta), ZeroDelta);
    }
}
