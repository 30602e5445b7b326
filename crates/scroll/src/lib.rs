//! Scrollable areas and the viewport composition.
//!
//! Everything that scrolls implements [`ScrollableArea`]: element scrollers
//! and the layout viewport ([`BoxScroller`]), the pinch-zoom
//! [`VisualViewport`], and the [`RootFrameViewport`] that presents both
//! viewports as one.
#![allow(clippy::float_cmp, reason = "offsets and scales are compared after exact assignment")]

mod alignment;
mod animator;
mod barrier;
mod box_scroller;
mod events;
mod root_frame_viewport;
mod scrollable_area;
mod sequencer;
mod types;
mod view_state;
mod visual_viewport;

pub use alignment::{ScrollAlignment, SnapCoordinator, scroll_offset_to_expose};
pub use animator::{ProgrammaticAnimation, ScrollAnimator};
pub use barrier::split_callback;
pub use box_scroller::BoxScroller;
pub use events::{ScrollEventQueue, ViewportEvent};
pub use root_frame_viewport::{RootFrameViewport, ViewportToScrollFirst};
pub use scrollable_area::{
    MIN_FRACTION_TO_STEP_WHEN_PAGING, PIXELS_PER_LINE_STEP, ScrollIntoViewParams, ScrollableArea,
    service_scroll_animation, set_scroll_offset_default,
};
pub use sequencer::SmoothScrollSequencer;
pub use types::{
    ScrollBehavior, ScrollCallback, ScrollCompletionMode, ScrollGranularity, ScrollResult,
    ScrollType, ScrollbarOrientation, run_callback,
};
pub use view_state::{LEGACY_VISUAL_VIEWPORT_OFFSET, ViewState};
pub use visual_viewport::{PageScaleConstraints, VisualViewport};
