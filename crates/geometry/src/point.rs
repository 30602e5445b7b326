//! Points, sizes and scroll offsets.

use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use serde::{Deserialize, Serialize};

/// A point in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointF {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl PointF {
    /// The origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new point.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// The vector from the origin to this point.
    #[inline]
    #[must_use]
    pub const fn to_offset(self) -> ScrollOffset {
        ScrollOffset::new(self.x, self.y)
    }

    /// Uniformly scale both coordinates.
    #[inline]
    #[must_use]
    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Round each coordinate to the nearest integer.
    #[inline]
    #[must_use]
    pub fn rounded(self) -> Self {
        Self::new(self.x.round(), self.y.round())
    }

    /// Floor each coordinate.
    #[inline]
    #[must_use]
    pub fn floored(self) -> Self {
        Self::new(self.x.floor(), self.y.floor())
    }

    /// True when neither coordinate is NaN or infinite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add<ScrollOffset> for PointF {
    type Output = Self;

    #[inline]
    fn add(self, rhs: ScrollOffset) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub<ScrollOffset> for PointF {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: ScrollOffset) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Sub for PointF {
    type Output = ScrollOffset;

    #[inline]
    fn sub(self, rhs: Self) -> ScrollOffset {
        ScrollOffset::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// A two dimensional vector. Used for scroll offsets, scroll deltas and
/// paint offsets alike.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollOffset {
    /// Horizontal component.
    pub x: f32,
    /// Vertical component.
    pub y: f32,
}

impl ScrollOffset {
    /// The zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new offset.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// True when both components are exactly zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// True when neither component is NaN or infinite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Component-wise minimum.
    #[inline]
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Component-wise maximum.
    #[inline]
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// Clamp each component into `[min, max]`. When the range is inverted
    /// the minimum wins.
    #[inline]
    #[must_use]
    pub fn clamped(self, min: Self, max: Self) -> Self {
        self.min(max).max(min)
    }

    /// Uniformly scale both components.
    #[inline]
    #[must_use]
    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Round each component to the nearest integer.
    #[inline]
    #[must_use]
    pub fn rounded(self) -> Self {
        Self::new(self.x.round(), self.y.round())
    }

    /// The point this vector reaches from the origin.
    #[inline]
    #[must_use]
    pub const fn to_point(self) -> PointF {
        PointF::new(self.x, self.y)
    }
}

impl Add for ScrollOffset {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for ScrollOffset {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for ScrollOffset {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for ScrollOffset {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Neg for ScrollOffset {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// A width and height in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SizeF {
    /// Horizontal extent.
    pub width: f32,
    /// Vertical extent.
    pub height: f32,
}

impl SizeF {
    /// The empty size.
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    /// Create a new size.
    #[inline]
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Uniformly scale both dimensions.
    #[inline]
    #[must_use]
    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }

    /// True when either dimension is zero or negative.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// The size as a vector, used to compute maximum scroll offsets.
    #[inline]
    #[must_use]
    pub const fn to_offset(self) -> ScrollOffset {
        ScrollOffset::new(self.width, self.height)
    }
}
