//! Geometry primitives shared by the lifecycle, scrolling and paint crates.
//!
//! All values are CSS pixels stored as `f32`. Rects use the physical
//! coordinate space of whatever box or layer they are attached to; the
//! consumer decides which space that is.

mod clip_rect;
mod point;
mod rect;
mod rounding;
mod transform;
mod writing_mode;

pub use clip_rect::{ClipRect, FloatClipRect};
pub use point::{PointF, ScrollOffset, SizeF};
pub use rect::{Outsets, RectF};
pub use rounding::{round_away_from_zero, round_offset_away_from_zero, snap_offset};
pub use transform::Transform2D;
pub use writing_mode::{PhysicalAxis, WritingMode};
