//! Rounding rules used when committing scroll offsets.

use crate::point::ScrollOffset;

/// Ceil positive values and floor negative ones.
#[inline]
pub fn round_away_from_zero(value: f32) -> f32 {
    if value >= 0.0 {
        value.ceil()
    } else {
        value.floor()
    }
}

/// [`round_away_from_zero`] applied per component.
#[inline]
#[must_use]
pub fn round_offset_away_from_zero(offset: ScrollOffset) -> ScrollOffset {
    ScrollOffset::new(round_away_from_zero(offset.x), round_away_from_zero(offset.y))
}

/// Snap an offset to whole pixels unless fractional offsets are allowed.
#[inline]
#[must_use]
pub fn snap_offset(offset: ScrollOffset, allow_fractional: bool) -> ScrollOffset {
    if allow_fractional {
        offset
    } else {
        offset.rounded()
    }
}
