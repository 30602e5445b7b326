//! Writing modes as far as scrolling and anchoring care about them.

use crate::point::{PointF, ScrollOffset};
use serde::{Deserialize, Serialize};

/// Writing mode determines the block and inline flow directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WritingMode {
    /// Horizontal top-to-bottom (default for Latin scripts).
    /// - Block flow: top to bottom
    /// - Inline flow: left to right (or right to left with direction: rtl)
    #[default]
    HorizontalTb,

    /// Vertical right-to-left (common for East Asian scripts).
    /// - Block flow: right to left
    /// - Inline flow: top to bottom
    VerticalRl,

    /// Vertical left-to-right (Mongolian script).
    /// - Block flow: left to right
    /// - Inline flow: top to bottom
    VerticalLr,
}

/// Physical direction in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalAxis {
    /// The x axis.
    Horizontal,
    /// The y axis.
    Vertical,
}

impl WritingMode {
    /// Block flow runs top to bottom.
    #[inline]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::HorizontalTb)
    }

    /// Block flow runs right to left, so logical and physical x disagree.
    #[inline]
    pub const fn is_flipped_blocks(self) -> bool {
        matches!(self, Self::VerticalRl)
    }

    /// Physical axis that carries the block direction.
    #[inline]
    pub const fn block_axis(self) -> PhysicalAxis {
        match self {
            Self::HorizontalTb => PhysicalAxis::Vertical,
            Self::VerticalRl | Self::VerticalLr => PhysicalAxis::Horizontal,
        }
    }

    /// Keep only the block-axis component of `delta`.
    #[must_use]
    pub fn block_axis_component(self, delta: ScrollOffset) -> ScrollOffset {
        match self.block_axis() {
            PhysicalAxis::Vertical => ScrollOffset::new(0.0, delta.y),
            PhysicalAxis::Horizontal => ScrollOffset::new(delta.x, 0.0),
        }
    }

    /// Block-axis component of an offset as a scalar.
    #[must_use]
    pub fn block_offset(self, offset: ScrollOffset) -> f32 {
        match self.block_axis() {
            PhysicalAxis::Vertical => offset.y,
            PhysicalAxis::Horizontal => offset.x,
        }
    }

    /// Convert a physical point inside a box of `width` to the
    /// block-flow-relative point. Only flipped-blocks modes change x.
    #[must_use]
    pub fn flip_for_writing_mode(self, point: PointF, width: f32) -> PointF {
        if self.is_flipped_blocks() {
            PointF::new(width - point.x, point.y)
        } else {
            point
        }
    }
}
