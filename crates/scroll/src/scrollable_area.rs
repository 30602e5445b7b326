//! The capability surface shared by element scrollers, the layout
//! viewport, the visual viewport and the root frame viewport.

use crate::alignment::{ScrollAlignment, SnapCoordinator, scroll_offset_to_expose};
use crate::animator::ScrollAnimator;
use crate::sequencer::SmoothScrollSequencer;
use crate::types::{
    ScrollBehavior, ScrollCallback, ScrollCompletionMode, ScrollGranularity, ScrollResult,
    ScrollType, ScrollbarOrientation, run_callback,
};
use log::{trace, warn};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use strata_geometry::{Outsets, RectF, ScrollOffset, SizeF};
use strata_layout_tree::LayoutObjectId;

/// Pixels scrolled per line step.
pub const PIXELS_PER_LINE_STEP: f32 = 40.0;
/// Fraction of the visible size scrolled per page step.
pub const MIN_FRACTION_TO_STEP_WHEN_PAGING: f32 = 0.875;

/// Parameters of a scroll-into-view request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollIntoViewParams {
    pub align_x: ScrollAlignment,
    pub align_y: ScrollAlignment,
    pub scroll_type: ScrollType,
    pub behavior: ScrollBehavior,
    /// Queue into the smooth-scroll sequencer instead of scrolling now.
    pub is_for_scroll_sequence: bool,
}

impl Default for ScrollIntoViewParams {
    fn default() -> Self {
        Self {
            align_x: ScrollAlignment::Nearest,
            align_y: ScrollAlignment::Nearest,
            scroll_type: ScrollType::Programmatic,
            behavior: ScrollBehavior::Auto,
            is_for_scroll_sequence: false,
        }
    }
}

/// Anything with a scroll offset, a scroll range and an animator.
///
/// Offsets are in the area's content coordinates: the visible content
/// rect starts at the scroll offset.
pub trait ScrollableArea {
    fn scroll_offset(&self) -> ScrollOffset;

    fn minimum_scroll_offset(&self) -> ScrollOffset;

    fn maximum_scroll_offset(&self) -> ScrollOffset;

    fn animator(&self) -> &ScrollAnimator;

    fn animator_mut(&mut self) -> &mut ScrollAnimator;

    /// The visible part of the contents, in content coordinates.
    fn visible_content_rect(&self) -> RectF;

    fn contents_size(&self) -> SizeF;

    /// Commit `offset`. Implementations store it, raise scroll events and
    /// invalidate whatever depends on it.
    fn update_scroll_offset(&mut self, offset: ScrollOffset, scroll_type: ScrollType);

    fn user_input_scrollable(&self, _orientation: ScrollbarOrientation) -> bool {
        true
    }

    /// The `scroll-behavior` the area's box asks for.
    fn scroll_behavior_style(&self) -> ScrollBehavior {
        ScrollBehavior::Instant
    }

    fn scroll_padding(&self) -> Outsets {
        Outsets::ZERO
    }

    /// The box whose overflow this area scrolls.
    fn layout_box(&self) -> Option<LayoutObjectId> {
        None
    }

    fn is_root_frame_viewport(&self) -> bool {
        false
    }

    /// The offset of the scroller whose contents are laid out under this
    /// area. Differs from [`Self::scroll_offset`] only for compositions of
    /// several viewports.
    fn content_scroll_offset(&self) -> ScrollOffset {
        self.scroll_offset()
    }

    fn smooth_scroll_sequencer(&self) -> Option<Rc<RefCell<SmoothScrollSequencer>>> {
        None
    }

    fn snap_coordinator(&self) -> Option<Rc<dyn SnapCoordinator>> {
        None
    }

    /// A handle to this area, when it is shared.
    fn weak_self(&self) -> Option<Weak<RefCell<dyn ScrollableArea>>> {
        None
    }

    fn clamp_scroll_offset(&self, offset: ScrollOffset) -> ScrollOffset {
        offset.clamped(self.minimum_scroll_offset(), self.maximum_scroll_offset())
    }

    /// Scroll to `offset`. `on_finish` runs exactly once.
    fn set_scroll_offset(
        &mut self,
        offset: ScrollOffset,
        scroll_type: ScrollType,
        behavior: ScrollBehavior,
        on_finish: Option<ScrollCallback>,
    ) {
        set_scroll_offset_default(self, offset, scroll_type, behavior, on_finish);
    }

    /// Scroll by `delta` relative to the current offset.
    fn scroll_by(&mut self, delta: ScrollOffset, scroll_type: ScrollType, behavior: ScrollBehavior) {
        let target = self.scroll_offset() + delta;
        self.set_scroll_offset(target, scroll_type, behavior, None);
    }

    /// Convert a delta in `granularity` units into pixels.
    fn resolve_scroll_delta(&self, granularity: ScrollGranularity, delta: ScrollOffset) -> ScrollOffset {
        let visible = self.visible_content_rect().size();
        match granularity {
            ScrollGranularity::Pixel | ScrollGranularity::PrecisePixel => delta,
            ScrollGranularity::Line => delta.scaled(PIXELS_PER_LINE_STEP),
            ScrollGranularity::Page => ScrollOffset::new(
                delta.x * page_step(visible.width),
                delta.y * page_step(visible.height),
            ),
            ScrollGranularity::Document => {
                let contents = self.contents_size();
                ScrollOffset::new(delta.x * contents.width, delta.y * contents.height)
            }
            ScrollGranularity::Percentage => {
                ScrollOffset::new(delta.x * visible.width, delta.y * visible.height)
            }
        }
    }

    /// How much of `delta` the animator could apply from its current offset.
    fn compute_delta_to_consume(&self, delta: ScrollOffset) -> ScrollOffset {
        let current = self.animator().current_offset();
        self.clamp_scroll_offset(current + delta) - current
    }

    /// Apply a user scroll of `delta` pixels through the animator, without
    /// touching sequencers or programmatic animations.
    fn animator_user_scroll(
        &mut self,
        granularity: ScrollGranularity,
        delta: ScrollOffset,
        on_finish: Option<ScrollCallback>,
    ) -> ScrollResult {
        let consumed = self.compute_delta_to_consume(delta);
        let current = self.animator().current_offset();
        let target = current + consumed;
        if consumed.is_zero() {
            run_callback(on_finish, ScrollCompletionMode::ZeroDelta);
            return ScrollResult::new(false, false, delta.x, delta.y);
        }
        trace!("user scroll ({granularity:?}) by {consumed:?}");
        self.animator_mut().set_current_offset(target);
        self.update_scroll_offset(target, ScrollType::User);
        run_callback(on_finish, ScrollCompletionMode::Finished);
        let unused = delta - consumed;
        ScrollResult::new(consumed.x != 0.0, consumed.y != 0.0, unused.x, unused.y)
    }

    /// Scroll by `delta` in `granularity` units on behalf of user input.
    fn user_scroll(
        &mut self,
        granularity: ScrollGranularity,
        delta: ScrollOffset,
        on_finish: Option<ScrollCallback>,
    ) -> ScrollResult {
        let pixel_delta = self.resolve_scroll_delta(granularity, delta);
        let scrollable = ScrollOffset::new(
            if self.user_input_scrollable(ScrollbarOrientation::Horizontal) {
                pixel_delta.x
            } else {
                0.0
            },
            if self.user_input_scrollable(ScrollbarOrientation::Vertical) {
                pixel_delta.y
            } else {
                0.0
            },
        );
        if self.compute_delta_to_consume(scrollable).is_zero() {
            run_callback(on_finish, ScrollCompletionMode::ZeroDelta);
            return ScrollResult::new(false, false, pixel_delta.x, pixel_delta.y);
        }
        self.cancel_programmatic_scroll_animation();
        if let Some(sequencer) = self.smooth_scroll_sequencer() {
            SmoothScrollSequencer::abort_animations(&sequencer);
        }
        let mut result = self.animator_user_scroll(granularity, scrollable, on_finish);
        result.unused_scroll_delta_x += pixel_delta.x - scrollable.x;
        result.unused_scroll_delta_y += pixel_delta.y - scrollable.y;
        result
    }

    /// Stop a running programmatic animation where it is.
    fn cancel_programmatic_scroll_animation(&mut self) {
        if let Some(animation) = self.animator_mut().take_animation() {
            trace!("cancelled programmatic scroll to {:?}", animation.target());
            run_callback(animation.callback, ScrollCompletionMode::InterruptedByScroll);
        }
    }

    fn has_running_animation(&self) -> bool {
        self.animator().has_running_animation()
    }

    /// The visible content rect minus `scroll-padding`.
    fn visible_scroll_snapport_rect(&self) -> RectF {
        self.visible_content_rect().contracted(&self.scroll_padding())
    }

    /// Scroll so `rect`, in content coordinates, is aligned inside the
    /// scroll snapport. Returns `rect` relative to the new offset.
    fn scroll_into_view(&mut self, rect: &RectF, params: &ScrollIntoViewParams) -> RectF {
        let current = self.scroll_offset();
        let snapport = self.visible_scroll_snapport_rect();
        let mut target = self.clamp_scroll_offset(scroll_offset_to_expose(
            &snapport,
            rect,
            params.align_x,
            params.align_y,
            current,
        ));
        if let Some(snap) = self.snap_coordinator() {
            target = self.clamp_scroll_offset(snap.snap_end_position(target).unwrap_or(target));
        }
        if target != current {
            queue_or_scroll(self, target, params);
        }
        rect.translated(current - target)
    }
}

/// Either queue `target` into the area's sequencer or scroll there now.
pub(crate) fn queue_or_scroll<A: ScrollableArea + ?Sized>(
    area: &mut A,
    target: ScrollOffset,
    params: &ScrollIntoViewParams,
) {
    if params.is_for_scroll_sequence {
        debug_assert!(
            matches!(params.scroll_type, ScrollType::Programmatic | ScrollType::User),
            "sequenced scrolls come from programmatic or user requests"
        );
        if let (Some(sequencer), Some(handle)) = (area.smooth_scroll_sequencer(), area.weak_self()) {
            sequencer
                .borrow_mut()
                .queue_animation(handle, target, params.behavior);
            return;
        }
    }
    area.set_scroll_offset(target, params.scroll_type, params.behavior, None);
}

fn page_step(length: f32) -> f32 {
    (length * MIN_FRACTION_TO_STEP_WHEN_PAGING).max(1.0)
}

/// The shared body of [`ScrollableArea::set_scroll_offset`]. Overrides that
/// only add bookkeeping call back into this.
pub fn set_scroll_offset_default<A: ScrollableArea + ?Sized>(
    area: &mut A,
    offset: ScrollOffset,
    scroll_type: ScrollType,
    behavior: ScrollBehavior,
    on_finish: Option<ScrollCallback>,
) {
    let clamped = area.clamp_scroll_offset(offset);
    if !offset.is_finite() || !clamped.is_finite() {
        warn!("rejecting non-finite scroll offset {clamped:?}");
        run_callback(on_finish, ScrollCompletionMode::ZeroDelta);
        return;
    }
    if scroll_type.aborts_sequenced_scrolls() {
        if let Some(sequencer) = area.smooth_scroll_sequencer() {
            SmoothScrollSequencer::abort_animations(&sequencer);
        }
    }
    if clamped == area.scroll_offset() {
        run_callback(on_finish, ScrollCompletionMode::ZeroDelta);
        return;
    }
    let behavior = behavior.resolve(area.scroll_behavior_style());
    match scroll_type {
        ScrollType::Compositor | ScrollType::Clamping => {
            apply_without_animation(area, clamped, scroll_type);
            run_callback(on_finish, ScrollCompletionMode::Finished);
        }
        ScrollType::Anchoring => {
            let delta = clamped - area.scroll_offset();
            area.animator_mut().adjust_animation(delta);
            apply_without_animation(area, clamped, scroll_type);
            run_callback(on_finish, ScrollCompletionMode::Finished);
        }
        ScrollType::User => {
            area.cancel_programmatic_scroll_animation();
            apply_without_animation(area, clamped, scroll_type);
            run_callback(on_finish, ScrollCompletionMode::Finished);
        }
        ScrollType::Programmatic | ScrollType::Sequenced => {
            area.cancel_programmatic_scroll_animation();
            if behavior == ScrollBehavior::Smooth {
                trace!("animating to {clamped:?}");
                area.animator_mut().animate_to(clamped, scroll_type, on_finish);
            } else {
                apply_without_animation(area, clamped, scroll_type);
                run_callback(on_finish, ScrollCompletionMode::Finished);
            }
        }
    }
}

fn apply_without_animation<A: ScrollableArea + ?Sized>(
    area: &mut A,
    offset: ScrollOffset,
    scroll_type: ScrollType,
) {
    area.animator_mut().set_current_offset(offset);
    area.update_scroll_offset(offset, scroll_type);
}

/// Step the running animation of `area` by `elapsed_ms`.
///
/// The completion callback runs after the area is released, so it may
/// start further scrolls. Returns whether an animation was running.
pub fn service_scroll_animation(area: &RefCell<dyn ScrollableArea>, elapsed_ms: u64) -> bool {
    let finished = {
        let Ok(mut area) = area.try_borrow_mut() else {
            warn!("scrollable area busy while servicing animations");
            return false;
        };
        let Some(step) = area.animator_mut().tick(elapsed_ms) else {
            return false;
        };
        let offset = area.clamp_scroll_offset(step.offset);
        if offset.is_finite() {
            area.update_scroll_offset(offset, step.scroll_type);
        }
        step.finished
    };
    if let Some(callback) = finished {
        run_callback(callback, ScrollCompletionMode::Finished);
    }
    true
}
