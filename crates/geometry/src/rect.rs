//! Axis aligned rectangles.

use crate::point::{PointF, ScrollOffset, SizeF};
use serde::{Deserialize, Serialize};

/// Edge offsets, used for scroll-padding, borders and browser-controls insets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Outsets {
    /// Top edge.
    pub top: f32,
    /// Right edge.
    pub right: f32,
    /// Bottom edge.
    pub bottom: f32,
    /// Left edge.
    pub left: f32,
}

impl Outsets {
    /// All edges zero.
    pub const ZERO: Self = Self {
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
        left: 0.0,
    };

    /// Create edge offsets in CSS order.
    #[must_use]
    pub const fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// The same value on every edge.
    #[must_use]
    pub const fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }
}

/// A rectangle with a top-left origin and a non-negative size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RectF {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Horizontal extent.
    pub width: f32,
    /// Vertical extent.
    pub height: f32,
}

/// Origin of the rect that stands for "no clip".
const INFINITE_ORIGIN: f32 = -33_554_432.0;
/// Extent of the rect that stands for "no clip".
const INFINITE_EXTENT: f32 = 67_108_864.0;

impl RectF {
    /// The empty rect at the origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a new rect.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rect from an origin and a size.
    #[inline]
    #[must_use]
    pub const fn from_origin_size(origin: PointF, size: SizeF) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    /// The rect used to represent an unclipped region.
    ///
    /// It is large but finite so that it survives translation and
    /// intersection without producing NaN.
    #[inline]
    #[must_use]
    pub const fn infinite() -> Self {
        Self::new(
            INFINITE_ORIGIN,
            INFINITE_ORIGIN,
            INFINITE_EXTENT,
            INFINITE_EXTENT,
        )
    }

    /// True when this is exactly [`RectF::infinite`].
    #[inline]
    pub fn is_infinite(&self) -> bool {
        *self == Self::infinite()
    }

    /// Top-left corner.
    #[inline]
    #[must_use]
    pub const fn origin(&self) -> PointF {
        PointF::new(self.x, self.y)
    }

    /// Width and height.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> SizeF {
        SizeF::new(self.width, self.height)
    }

    /// Right edge.
    #[inline]
    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    #[inline]
    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    /// Top-right corner.
    #[inline]
    #[must_use]
    pub fn top_right(&self) -> PointF {
        PointF::new(self.max_x(), self.y)
    }

    /// True when the rect covers no area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Area in square pixels; zero for empty rects.
    #[inline]
    pub fn area(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.width * self.height
        }
    }

    /// True when all four components are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// True when the two rects share a non-empty area.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.max_x()
            && other.x < self.max_x()
            && self.y < other.max_y()
            && other.y < self.max_y()
    }

    /// True when `other` lies entirely inside `self`.
    #[must_use]
    pub fn contains_rect(&self, other: &Self) -> bool {
        other.x >= self.x
            && other.max_x() <= self.max_x()
            && other.y >= self.y
            && other.max_y() <= self.max_y()
    }

    /// True when `point` lies inside `self`, right and bottom edges excluded.
    #[must_use]
    pub fn contains_point(&self, point: PointF) -> bool {
        point.x >= self.x && point.x < self.max_x() && point.y >= self.y && point.y < self.max_y()
    }

    /// Intersect in place. Disjoint rects collapse to [`RectF::ZERO`].
    pub fn intersect(&mut self, other: &Self) {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.max_x().min(other.max_x());
        let bottom = self.max_y().min(other.max_y());
        if left >= right || top >= bottom {
            *self = Self::ZERO;
            return;
        }
        *self = Self::new(left, top, right - left, bottom - top);
    }

    /// The intersection of two rects.
    #[must_use]
    pub fn intersection(mut self, other: &Self) -> Self {
        self.intersect(other);
        self
    }

    /// Grow in place to cover `other`. Empty rects do not contribute.
    pub fn unite(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
            return;
        }
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = self.max_x().max(other.max_x());
        let bottom = self.max_y().max(other.max_y());
        *self = Self::new(left, top, right - left, bottom - top);
    }

    /// The smallest rect covering both.
    #[must_use]
    pub fn union(mut self, other: &Self) -> Self {
        self.unite(other);
        self
    }

    /// Translate in place.
    #[inline]
    pub fn offset(&mut self, delta: ScrollOffset) {
        self.x += delta.x;
        self.y += delta.y;
    }

    /// A translated copy.
    #[inline]
    #[must_use]
    pub fn translated(mut self, delta: ScrollOffset) -> Self {
        self.offset(delta);
        self
    }

    /// Shrink by the given edge offsets, never below zero size.
    #[must_use]
    pub fn contracted(&self, outsets: &Outsets) -> Self {
        Self::new(
            self.x + outsets.left,
            self.y + outsets.top,
            (self.width - outsets.left - outsets.right).max(0.0),
            (self.height - outsets.top - outsets.bottom).max(0.0),
        )
    }

    /// Grow by the given edge offsets.
    #[must_use]
    pub fn expanded(&self, outsets: &Outsets) -> Self {
        Self::new(
            self.x - outsets.left,
            self.y - outsets.top,
            self.width + outsets.left + outsets.right,
            self.height + outsets.top + outsets.bottom,
        )
    }

    /// Scale origin and size by `factor`.
    #[inline]
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(
            self.x * factor,
            self.y * factor,
            self.width * factor,
            self.height * factor,
        )
    }

    /// The smallest integer-aligned rect covering this one.
    #[must_use]
    pub fn enclosing(&self) -> Self {
        let left = self.x.floor();
        let top = self.y.floor();
        Self::new(
            left,
            top,
            self.max_x().ceil() - left,
            self.max_y().ceil() - top,
        )
    }

    /// Move the bottom edge to `max_y`, keeping the top edge.
    pub fn shift_bottom_edge_to(&mut self, max_y: f32) {
        self.height = (max_y - self.y).max(0.0);
    }

    /// Move the right edge to `max_x`, keeping the left edge.
    pub fn shift_right_edge_to(&mut self, max_x: f32) {
        self.width = (max_x - self.x).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_intersection_is_zero() {
        let rect = RectF::new(0.0, 0.0, 10.0, 10.0).intersection(&RectF::new(20.0, 0.0, 5.0, 5.0));
        assert_eq!(rect, RectF::ZERO);
        assert!(rect.is_empty());
    }

    #[test]
    fn infinite_intersected_with_finite_is_finite() {
        let finite = RectF::new(5.0, 6.0, 100.0, 50.0);
        let rect = RectF::infinite().intersection(&finite);
        assert_eq!(rect, finite);
        assert!(!rect.is_infinite());
        assert!(RectF::infinite().intersection(&RectF::infinite()).is_infinite());
    }

    #[test]
    fn union_ignores_empty_rects() {
        let rect = RectF::new(0.0, 0.0, 10.0, 10.0).union(&RectF::new(100.0, 100.0, 0.0, 0.0));
        assert_eq!(rect, RectF::new(0.0, 0.0, 10.0, 10.0));
        let grown = rect.union(&RectF::new(5.0, 5.0, 10.0, 20.0));
        assert_eq!(grown, RectF::new(0.0, 0.0, 15.0, 25.0));
    }

    #[test]
    fn contraction_never_goes_negative() {
        let rect = RectF::new(0.0, 0.0, 10.0, 10.0).contracted(&Outsets::new(4.0, 8.0, 4.0, 8.0));
        assert_eq!(rect, RectF::new(8.0, 4.0, 0.0, 2.0));
        assert_eq!(rect.area(), 0.0);
    }

    #[test]
    fn containment_and_intersection_are_distinct() {
        let outer = RectF::new(0.0, 0.0, 100.0, 100.0);
        let inside = RectF::new(10.0, 10.0, 20.0, 20.0);
        let straddling = RectF::new(90.0, 10.0, 20.0, 20.0);
        assert!(outer.contains_rect(&inside));
        assert!(outer.intersects(&straddling));
        assert!(!outer.contains_rect(&straddling));
    }

    #[test]
    fn enclosing_rounds_outwards() {
        let rect = RectF::new(0.5, 1.25, 10.0, 10.0).enclosing();
        assert_eq!(rect, RectF::new(0.0, 1.0, 11.0, 11.0));
    }
}
