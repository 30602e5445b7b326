//! Where to scroll so a rect becomes visible.

use strata_geometry::{RectF, ScrollOffset};

/// How a target is aligned inside the scroll snapport along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScrollAlignment {
    /// Align to start edge.
    Start,
    /// Align to center.
    Center,
    /// Align to end edge.
    End,
    /// Minimal scroll; no scroll at all if already visible.
    #[default]
    Nearest,
}

/// Snap-point lookup for scroll-into-view.
pub trait SnapCoordinator {
    /// The snap position a scroll ending at `offset` settles on, or `None`
    /// when no snap point applies.
    fn snap_end_position(&self, offset: ScrollOffset) -> Option<ScrollOffset>;
}

/// Delta along one axis that brings `[start, start + size)` to `alignment`
/// inside `[port_start, port_start + port_size)`.
fn axis_delta(start: f32, size: f32, port_start: f32, port_size: f32, alignment: ScrollAlignment) -> f32 {
    let end = start + size;
    let port_end = port_start + port_size;
    match alignment {
        ScrollAlignment::Start => start - port_start,
        ScrollAlignment::Center => (start + size / 2.0) - (port_start + port_size / 2.0),
        ScrollAlignment::End => end - port_end,
        ScrollAlignment::Nearest => {
            if start < port_start {
                start - port_start
            } else if end > port_end && size <= port_size {
                end - port_end
            } else if end > port_end {
                // Larger than the port: show its start.
                start - port_start
            } else {
                0.0
            }
        }
    }
}

/// The offset that aligns `target` inside `snapport`, both in content
/// coordinates, given the `current` offset. Not clamped.
pub fn scroll_offset_to_expose(
    snapport: &RectF,
    target: &RectF,
    align_x: ScrollAlignment,
    align_y: ScrollAlignment,
    current: ScrollOffset,
) -> ScrollOffset {
    let delta_x = axis_delta(target.x, target.width, snapport.x, snapport.width, align_x);
    let delta_y = axis_delta(target.y, target.height, snapport.y, snapport.height, align_y);
    current + ScrollOffset::new(delta_x, delta_y)
}
