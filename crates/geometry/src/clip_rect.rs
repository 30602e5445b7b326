//! Clip rectangles as produced by clip-rect computation and the geometry mapper.

use crate::point::ScrollOffset;
use crate::rect::RectF;

/// A clip rect in some layer's coordinate space.
///
/// `has_radius` records whether a rounded clip contributed to this rect;
/// the rect itself is then only the bounding box of the clip shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRect {
    rect: RectF,
    has_radius: bool,
}

impl Default for ClipRect {
    fn default() -> Self {
        Self::infinite()
    }
}

impl ClipRect {
    /// A clip that does not clip anything.
    #[must_use]
    pub const fn infinite() -> Self {
        Self {
            rect: RectF::infinite(),
            has_radius: false,
        }
    }

    /// A clip from a finite rect.
    #[must_use]
    pub const fn from_rect(rect: RectF) -> Self {
        Self {
            rect,
            has_radius: false,
        }
    }

    /// The clip bounds.
    #[inline]
    pub const fn rect(&self) -> &RectF {
        &self.rect
    }

    /// Replace the clip bounds, keeping the radius bit.
    #[inline]
    pub fn set_rect(&mut self, rect: RectF) {
        self.rect = rect;
    }

    /// True when a rounded clip contributed.
    #[inline]
    pub const fn has_radius(&self) -> bool {
        self.has_radius
    }

    /// Mark whether a rounded clip contributed.
    #[inline]
    pub fn set_has_radius(&mut self, has_radius: bool) {
        self.has_radius = has_radius;
    }

    /// True when nothing is clipped.
    #[inline]
    pub fn is_infinite(&self) -> bool {
        self.rect.is_infinite()
    }

    /// Back to the unclipped state.
    pub fn reset(&mut self) {
        *self = Self::infinite();
    }

    /// Intersect with a plain rect.
    pub fn intersect_rect(&mut self, other: &RectF) {
        self.rect.intersect(other);
    }

    /// Intersect with another clip, carrying its radius bit.
    pub fn intersect(&mut self, other: &Self) {
        self.rect.intersect(&other.rect);
        if other.has_radius {
            self.has_radius = true;
        }
    }

    /// Translate the clip. Infinite clips stay infinite.
    pub fn move_by(&mut self, delta: ScrollOffset) {
        if self.is_infinite() {
            return;
        }
        self.rect.offset(delta);
    }
}

impl From<FloatClipRect> for ClipRect {
    fn from(value: FloatClipRect) -> Self {
        if value.is_infinite() {
            return Self::infinite();
        }
        Self {
            rect: value.rect,
            has_radius: value.has_radius,
        }
    }
}

/// Result of mapping a visual rect through property-tree clips.
///
/// Unlike [`ClipRect`], infiniteness is tracked explicitly so that a
/// mapping across transforms does not have to preserve the magic rect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatClipRect {
    rect: RectF,
    is_infinite: bool,
    has_radius: bool,
    is_tight: bool,
}

impl Default for FloatClipRect {
    fn default() -> Self {
        Self::infinite()
    }
}

impl FloatClipRect {
    /// The unclipped rect.
    #[must_use]
    pub const fn infinite() -> Self {
        Self {
            rect: RectF::infinite(),
            is_infinite: true,
            has_radius: false,
            is_tight: true,
        }
    }

    /// A finite, tight rect.
    #[must_use]
    pub const fn new(rect: RectF) -> Self {
        Self {
            rect,
            is_infinite: false,
            has_radius: false,
            is_tight: true,
        }
    }

    /// The mapped bounds.
    #[inline]
    pub const fn rect(&self) -> &RectF {
        &self.rect
    }

    /// True when no clip contributed.
    #[inline]
    pub const fn is_infinite(&self) -> bool {
        self.is_infinite
    }

    /// True when a rounded clip contributed.
    #[inline]
    pub const fn has_radius(&self) -> bool {
        self.has_radius
    }

    /// False once a non axis-aligned transform made the rect a bounding box.
    #[inline]
    pub const fn is_tight(&self) -> bool {
        self.is_tight
    }

    /// Intersect with a clip rect from a property-tree node.
    pub fn intersect(&mut self, other: &Self) {
        if other.is_infinite {
            return;
        }
        if self.is_infinite {
            *self = *other;
            return;
        }
        self.rect.intersect(&other.rect);
        self.has_radius |= other.has_radius;
        self.is_tight &= other.is_tight;
    }

    /// Mark that a rounded clip contributed.
    pub fn set_has_radius(&mut self) {
        self.has_radius = true;
        self.is_tight = false;
    }

    /// Mark that the rect is only a bounding box.
    pub fn clear_is_tight(&mut self) {
        self.is_tight = false;
    }

    /// Replace the bounds with a finite rect.
    pub fn set_rect(&mut self, rect: RectF) {
        self.rect = rect;
        self.is_infinite = false;
    }

    /// Translate the rect. Infinite rects stay infinite.
    pub fn move_by(&mut self, delta: ScrollOffset) {
        if self.is_infinite {
            return;
        }
        self.rect.offset(delta);
    }
}
