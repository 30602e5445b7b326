//! Lifecycle states and their debug names.

use core::fmt;

/// Pipeline phase of a document.
///
/// The declaration order is the phase order; comparisons between states
/// compare positions in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Uninitialized,
    Inactive,

    // When the document is active, it traverses these states.
    VisualUpdatePending,

    InStyleRecalc,
    StyleClean,

    InPerformLayout,
    AfterPerformLayout,
    LayoutClean,

    InCompositingInputsUpdate,
    CompositingInputsClean,

    InPrePaint,
    PrePaintClean,

    InPaint,
    PaintClean,

    // Once the document starts shutting down, we cannot return
    // to the style/layout/compositing states.
    Stopping,
    Stopped,
}

impl LifecycleState {
    /// Every state, in pipeline order.
    pub const ALL: [Self; 16] = [
        Self::Uninitialized,
        Self::Inactive,
        Self::VisualUpdatePending,
        Self::InStyleRecalc,
        Self::StyleClean,
        Self::InPerformLayout,
        Self::AfterPerformLayout,
        Self::LayoutClean,
        Self::InCompositingInputsUpdate,
        Self::CompositingInputsClean,
        Self::InPrePaint,
        Self::PrePaintClean,
        Self::InPaint,
        Self::PaintClean,
        Self::Stopping,
        Self::Stopped,
    ];

    /// Human readable name for logs and assertion messages.
    ///
    /// Not a stable serialization format.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::Inactive => "Inactive",
            Self::VisualUpdatePending => "VisualUpdatePending",
            Self::InStyleRecalc => "InStyleRecalc",
            Self::StyleClean => "StyleClean",
            Self::InPerformLayout => "InPerformLayout",
            Self::AfterPerformLayout => "AfterPerformLayout",
            Self::LayoutClean => "LayoutClean",
            Self::InCompositingInputsUpdate => "InCompositingInputsUpdate",
            Self::CompositingInputsClean => "CompositingInputsClean",
            Self::InPrePaint => "InPrePaint",
            Self::PrePaintClean => "PrePaintClean",
            Self::InPaint => "InPaint",
            Self::PaintClean => "PaintClean",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
        }
    }

    /// States a transition may rewind from.
    pub const fn is_settled(self) -> bool {
        matches!(
            self,
            Self::StyleClean
                | Self::AfterPerformLayout
                | Self::LayoutClean
                | Self::CompositingInputsClean
                | Self::PrePaintClean
                | Self::PaintClean
        )
    }

    /// Legal forward successors, excluding the always-allowed `Stopping`.
    pub const fn successors(self) -> &'static [Self] {
        match self {
            Self::Uninitialized => &[Self::Inactive],
            Self::Inactive => &[Self::StyleClean],
            Self::VisualUpdatePending => &[
                Self::InStyleRecalc,
                Self::InPerformLayout,
                Self::InCompositingInputsUpdate,
            ],
            Self::InStyleRecalc => &[Self::StyleClean],
            Self::StyleClean => &[
                Self::InStyleRecalc,
                Self::InPerformLayout,
                Self::StyleClean,
                Self::LayoutClean,
                Self::InCompositingInputsUpdate,
            ],
            Self::InPerformLayout => &[Self::AfterPerformLayout],
            Self::AfterPerformLayout => &[Self::InPerformLayout, Self::LayoutClean],
            Self::LayoutClean => &[
                Self::InStyleRecalc,
                Self::InPerformLayout,
                Self::LayoutClean,
                Self::StyleClean,
                Self::InCompositingInputsUpdate,
                Self::InPrePaint,
            ],
            Self::InCompositingInputsUpdate => &[Self::CompositingInputsClean],
            Self::CompositingInputsClean => &[
                Self::InStyleRecalc,
                Self::InCompositingInputsUpdate,
                Self::InPrePaint,
            ],
            Self::InPrePaint => &[Self::PrePaintClean],
            Self::PrePaintClean => &[
                Self::InPaint,
                Self::InStyleRecalc,
                Self::InCompositingInputsUpdate,
                Self::InPrePaint,
            ],
            Self::InPaint => &[Self::PaintClean],
            Self::PaintClean => &[
                Self::InStyleRecalc,
                Self::CompositingInputsClean,
                Self::InPrePaint,
                Self::InPaint,
            ],
            Self::Stopping => &[Self::Stopped],
            Self::Stopped => &[],
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_are_ordered_by_pipeline_position() {
        for pair in LifecycleState::ALL.windows(2) {
            assert!(pair[0] < pair[1], "{} should precede {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn every_state_has_a_distinct_name() {
        let mut names: Vec<&str> = LifecycleState::ALL.iter().map(|state| state.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), LifecycleState::ALL.len());
        assert_eq!(LifecycleState::InPrePaint.to_string(), "InPrePaint");
    }
}
