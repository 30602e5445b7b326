//! 2D affine transforms for transform property-tree nodes.

use crate::point::{PointF, ScrollOffset};
use crate::rect::RectF;

/// 2D transformation matrix in column-major order.
///
/// Matrix layout:
/// ```text
/// [ scale_x  skew_x   translate_x ]
/// [ skew_y   scale_y  translate_y ]
/// [ 0        0        1           ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    /// Horizontal scale.
    pub scale_x: f32,
    /// Vertical shear contributed by x.
    pub skew_y: f32,
    /// Horizontal shear contributed by y.
    pub skew_x: f32,
    /// Vertical scale.
    pub scale_y: f32,
    /// Horizontal translation.
    pub translate_x: f32,
    /// Vertical translation.
    pub translate_y: f32,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform2D {
    /// Identity transform (no transformation).
    pub const IDENTITY: Self = Self {
        scale_x: 1.0,
        skew_y: 0.0,
        skew_x: 0.0,
        scale_y: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
    };

    /// Create a translation transform.
    #[must_use]
    pub const fn translate(translate_x: f32, translate_y: f32) -> Self {
        Self {
            translate_x,
            translate_y,
            ..Self::IDENTITY
        }
    }

    /// Create a translation transform from a vector.
    #[must_use]
    pub const fn from_offset(offset: ScrollOffset) -> Self {
        Self::translate(offset.x, offset.y)
    }

    /// Create a scale transform.
    #[must_use]
    pub const fn scale(scale_x: f32, scale_y: f32) -> Self {
        Self {
            scale_x,
            scale_y,
            ..Self::IDENTITY
        }
    }

    /// Create a rotation transform (angle in radians).
    #[must_use]
    pub fn rotate(angle: f32) -> Self {
        let cos = angle.cos();
        let sin = angle.sin();
        Self {
            scale_x: cos,
            skew_y: sin,
            skew_x: -sin,
            scale_y: cos,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }

    /// Multiply this transform by another (compose transformations).
    ///
    /// Returns `self * other` (applies `other` then `self`).
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        Self {
            scale_x: self.scale_x * other.scale_x + self.skew_x * other.skew_y,
            skew_y: self.skew_y * other.scale_x + self.scale_y * other.skew_y,
            skew_x: self.scale_x * other.skew_x + self.skew_x * other.scale_y,
            scale_y: self.skew_y * other.skew_x + self.scale_y * other.scale_y,
            translate_x: self.scale_x * other.translate_x
                + self.skew_x * other.translate_y
                + self.translate_x,
            translate_y: self.skew_y * other.translate_x
                + self.scale_y * other.translate_y
                + self.translate_y,
        }
    }

    /// Transform a point.
    #[must_use]
    pub fn map_point(&self, point: PointF) -> PointF {
        PointF::new(
            self.scale_x * point.x + self.skew_x * point.y + self.translate_x,
            self.skew_y * point.x + self.scale_y * point.y + self.translate_y,
        )
    }

    /// Transform a rect and return the bounding box of the result.
    #[must_use]
    pub fn map_rect(&self, rect: &RectF) -> RectF {
        if self.is_identity_or_translation() {
            return rect.translated(ScrollOffset::new(self.translate_x, self.translate_y));
        }
        let corners = [
            self.map_point(PointF::new(rect.x, rect.y)),
            self.map_point(PointF::new(rect.max_x(), rect.y)),
            self.map_point(PointF::new(rect.x, rect.max_y())),
            self.map_point(PointF::new(rect.max_x(), rect.max_y())),
        ];
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for corner in corners {
            min_x = min_x.min(corner.x);
            min_y = min_y.min(corner.y);
            max_x = max_x.max(corner.x);
            max_y = max_y.max(corner.y);
        }
        RectF::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Compute the inverse transformation.
    ///
    /// Returns None if the matrix is not invertible (determinant is zero).
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let det = self.scale_x * self.scale_y - self.skew_y * self.skew_x;
        if det.abs() < 1e-10 {
            return None;
        }

        let inv_det = 1.0 / det;
        Some(Self {
            scale_x: self.scale_y * inv_det,
            skew_y: -self.skew_y * inv_det,
            skew_x: -self.skew_x * inv_det,
            scale_y: self.scale_x * inv_det,
            translate_x: (self.skew_x * self.translate_y - self.scale_y * self.translate_x)
                * inv_det,
            translate_y: (self.skew_y * self.translate_x - self.scale_x * self.translate_y)
                * inv_det,
        })
    }

    /// True for the identity matrix.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// True when the matrix only translates.
    pub fn is_identity_or_translation(&self) -> bool {
        self.scale_x == 1.0 && self.skew_y == 0.0 && self.skew_x == 0.0 && self.scale_y == 1.0
    }

    /// True when axis-aligned rects stay axis-aligned.
    pub fn preserves_axis_alignment(&self) -> bool {
        (self.skew_y == 0.0 && self.skew_x == 0.0) || (self.scale_x == 0.0 && self.scale_y == 0.0)
    }

    /// The translation part of the matrix.
    #[must_use]
    pub const fn translation(&self) -> ScrollOffset {
        ScrollOffset::new(self.translate_x, self.translate_y)
    }
}
