//! The viewport the user sees: the visual viewport panning over the layout
//! viewport, presented as one scrollable area.
//!
//! Offsets of the composition are the sum of both viewports' offsets.
//! Scrolls are split between the two. The layout viewport is always
//! committed first so the window `scroll` event precedes the visual
//! viewport's.

use crate::alignment::SnapCoordinator;
use crate::animator::ScrollAnimator;
use crate::barrier::split_callback;
use crate::scrollable_area::{ScrollableArea, set_scroll_offset_default};
use crate::sequencer::SmoothScrollSequencer;
use crate::types::{
    ScrollBehavior, ScrollCallback, ScrollCompletionMode, ScrollGranularity, ScrollResult,
    ScrollType, ScrollbarOrientation, run_callback,
};
use crate::view_state::ViewState;
use crate::visual_viewport::VisualViewport;
use log::{debug, trace};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use strata_geometry::{Outsets, RectF, ScrollOffset, SizeF, round_offset_away_from_zero};
use strata_layout_tree::LayoutObjectId;

/// Which viewport absorbs a distributed delta first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportToScrollFirst {
    Visual,
    Layout,
}

pub struct RootFrameViewport {
    visual: Rc<RefCell<VisualViewport>>,
    layout: Rc<RefCell<dyn ScrollableArea>>,
    animator: ScrollAnimator,
    sequencer: Option<Rc<RefCell<SmoothScrollSequencer>>>,
    allow_fractional_offsets: bool,
    pending_view_state: Option<ViewState>,
    handle: Weak<RefCell<dyn ScrollableArea>>,
}

impl RootFrameViewport {
    pub fn new(
        visual: Rc<RefCell<VisualViewport>>,
        layout: Rc<RefCell<dyn ScrollableArea>>,
    ) -> Rc<RefCell<Self>> {
        Rc::new_cyclic(|weak: &Weak<RefCell<Self>>| {
            RefCell::new(Self {
                visual,
                layout,
                animator: ScrollAnimator::default(),
                sequencer: None,
                allow_fractional_offsets: false,
                pending_view_state: None,
                handle: Weak::<RefCell<Self>>::clone(weak),
            })
        })
    }

    pub fn visual_viewport(&self) -> &Rc<RefCell<VisualViewport>> {
        &self.visual
    }

    pub fn layout_viewport(&self) -> &Rc<RefCell<dyn ScrollableArea>> {
        &self.layout
    }

    pub fn set_allow_fractional_scroll_offsets(&mut self, allow: bool) {
        self.allow_fractional_offsets = allow;
    }

    pub fn set_smooth_scroll_sequencer(&mut self, sequencer: Option<Rc<RefCell<SmoothScrollSequencer>>>) {
        self.sequencer = sequencer;
    }

    /// Split the delta to `target` between both viewports, filling
    /// `first` before the other. Returns what neither could absorb.
    pub fn distribute_scroll_between_viewports(
        &mut self,
        target: ScrollOffset,
        scroll_type: ScrollType,
        behavior: ScrollBehavior,
        first: ViewportToScrollFirst,
        on_finish: Option<ScrollCallback>,
    ) -> ScrollOffset {
        let _span = tracing::debug_span!("distribute_scroll_between_viewports", ?first).entered();
        let visual_current = self.visual.borrow().animator().current_offset();
        let layout_current = self.layout.borrow().animator().current_offset();
        let delta = target - (visual_current + layout_current);
        if delta.is_zero() {
            run_callback(on_finish, ScrollCompletionMode::ZeroDelta);
            return ScrollOffset::ZERO;
        }

        let clamp_visual = |offset| self.visual.borrow().clamp_scroll_offset(offset);
        let clamp_layout = |offset| self.layout.borrow().clamp_scroll_offset(offset);
        let (visual_target, layout_target, unconsumed) = match first {
            ViewportToScrollFirst::Visual => {
                let visual_target = clamp_visual(visual_current + delta);
                let leftover = visual_current + delta - visual_target;
                let layout_target = clamp_layout(layout_current + leftover);
                (visual_target, layout_target, layout_current + leftover - layout_target)
            }
            ViewportToScrollFirst::Layout => {
                let layout_target = clamp_layout(layout_current + delta);
                let leftover = layout_current + delta - layout_target;
                let visual_target = clamp_visual(visual_current + leftover);
                (visual_target, layout_target, visual_current + leftover - visual_target)
            }
        };
        trace!("layout -> {layout_target:?}, visual -> {visual_target:?}, unconsumed {unconsumed:?}");

        let (layout_done, visual_done) = match on_finish.map(split_callback) {
            Some((layout_done, visual_done)) => (Some(layout_done), Some(visual_done)),
            None => (None, None),
        };
        self.layout
            .borrow_mut()
            .set_scroll_offset(layout_target, scroll_type, behavior, layout_done);
        self.visual
            .borrow_mut()
            .set_scroll_offset(visual_target, scroll_type, behavior, visual_done);
        unconsumed
    }

    /// Scroll the composition back to `target` after a resize, re-trying
    /// on the other viewport what clamping ate.
    pub fn restore_to_anchor(&mut self, target: ScrollOffset) {
        let _span = tracing::debug_span!("restore_to_anchor").entered();
        let programmatic = |area: &Rc<RefCell<dyn ScrollableArea>>, offset: ScrollOffset| {
            area.borrow_mut()
                .set_scroll_offset(offset, ScrollType::Programmatic, ScrollBehavior::Instant, None);
        };
        let visual: Rc<RefCell<dyn ScrollableArea>> = Rc::<RefCell<VisualViewport>>::clone(&self.visual);

        let visual_offset = visual.borrow().scroll_offset();
        programmatic(&visual, visual_offset);
        let layout_offset = self.layout.borrow().scroll_offset();
        programmatic(&self.layout, layout_offset);

        let delta = target - self.scroll_offset();
        let visual_offset = visual.borrow().scroll_offset();
        programmatic(&visual, visual_offset + delta);

        let delta = target - self.scroll_offset();
        let layout_offset = self.layout.borrow().scroll_offset();
        if self.allow_fractional_offsets {
            programmatic(&self.layout, layout_offset + delta);
        } else {
            programmatic(
                &self.layout,
                layout_offset.rounded() + round_offset_away_from_zero(delta),
            );
        }

        let delta = target - self.scroll_offset();
        let visual_offset = visual.borrow().scroll_offset();
        programmatic(&visual, visual_offset + delta);
    }

    /// Remember a history entry to restore once layout is ready.
    pub fn set_pending_history_restore_scroll_offset(&mut self, state: ViewState) {
        self.pending_view_state = Some(state);
    }

    pub fn pending_history_restore_scroll_offset(&self) -> Option<&ViewState> {
        self.pending_view_state.as_ref()
    }

    /// Apply the pending history entry, once. Returns whether there was one.
    pub fn apply_pending_history_restore_scroll_offset(&mut self) -> bool {
        let Some(state) = self.pending_view_state.take() else {
            return false;
        };
        debug!("restoring history view state {state:?}");
        self.layout.borrow_mut().set_scroll_offset(
            state.scroll_offset,
            ScrollType::Programmatic,
            ScrollBehavior::Instant,
            None,
        );
        let visual_offset = if state.has_legacy_visual_viewport_offset() {
            state.scroll_offset - self.layout.borrow().scroll_offset()
        } else {
            state.visual_viewport_scroll_offset
        };
        let mut visual = self.visual.borrow_mut();
        if state.page_scale_factor == 0.0 {
            visual.set_location(visual_offset);
        } else {
            visual.set_scale_and_location(state.page_scale_factor, false, visual_offset);
        }
        true
    }

    /// Snapshot for a history entry.
    pub fn view_state(&self) -> ViewState {
        let visual = self.visual.borrow();
        ViewState {
            scroll_offset: self.layout.borrow().scroll_offset(),
            visual_viewport_scroll_offset: visual.scroll_offset(),
            page_scale_factor: visual.scale(),
        }
    }
}

impl ScrollableArea for RootFrameViewport {
    fn scroll_offset(&self) -> ScrollOffset {
        self.layout.borrow().scroll_offset() + self.visual.borrow().scroll_offset()
    }

    fn minimum_scroll_offset(&self) -> ScrollOffset {
        self.layout.borrow().minimum_scroll_offset() + self.visual.borrow().minimum_scroll_offset()
    }

    fn maximum_scroll_offset(&self) -> ScrollOffset {
        self.layout.borrow().maximum_scroll_offset() + self.visual.borrow().maximum_scroll_offset()
    }

    fn animator(&self) -> &ScrollAnimator {
        &self.animator
    }

    fn animator_mut(&mut self) -> &mut ScrollAnimator {
        &mut self.animator
    }

    fn visible_content_rect(&self) -> RectF {
        RectF::from_origin_size(
            self.scroll_offset().to_point(),
            self.visual.borrow().visible_content_rect().size(),
        )
    }

    fn contents_size(&self) -> SizeF {
        self.layout.borrow().contents_size()
    }

    fn update_scroll_offset(&mut self, offset: ScrollOffset, scroll_type: ScrollType) {
        self.distribute_scroll_between_viewports(
            offset,
            scroll_type,
            ScrollBehavior::Instant,
            ViewportToScrollFirst::Visual,
            None,
        );
    }

    fn user_input_scrollable(&self, orientation: ScrollbarOrientation) -> bool {
        self.layout.borrow().user_input_scrollable(orientation)
    }

    fn scroll_behavior_style(&self) -> ScrollBehavior {
        self.layout.borrow().scroll_behavior_style()
    }

    fn scroll_padding(&self) -> Outsets {
        self.layout.borrow().scroll_padding()
    }

    fn layout_box(&self) -> Option<LayoutObjectId> {
        self.layout.borrow().layout_box()
    }

    fn is_root_frame_viewport(&self) -> bool {
        true
    }

    fn content_scroll_offset(&self) -> ScrollOffset {
        self.layout.borrow().scroll_offset()
    }

    fn smooth_scroll_sequencer(&self) -> Option<Rc<RefCell<SmoothScrollSequencer>>> {
        self.sequencer.as_ref().map(Rc::clone)
    }

    fn snap_coordinator(&self) -> Option<Rc<dyn SnapCoordinator>> {
        self.layout.borrow().snap_coordinator()
    }

    fn weak_self(&self) -> Option<Weak<RefCell<dyn ScrollableArea>>> {
        Some(Weak::clone(&self.handle))
    }

    fn set_scroll_offset(
        &mut self,
        offset: ScrollOffset,
        scroll_type: ScrollType,
        behavior: ScrollBehavior,
        on_finish: Option<ScrollCallback>,
    ) {
        let behavior = behavior.resolve(self.scroll_behavior_style());
        if scroll_type == ScrollType::Anchoring {
            self.distribute_scroll_between_viewports(
                offset,
                scroll_type,
                behavior,
                ViewportToScrollFirst::Layout,
                on_finish,
            );
            return;
        }
        if behavior == ScrollBehavior::Smooth {
            self.distribute_scroll_between_viewports(
                offset,
                scroll_type,
                behavior,
                ViewportToScrollFirst::Visual,
                on_finish,
            );
            return;
        }
        let clamped = self.clamp_scroll_offset(offset);
        set_scroll_offset_default(self, clamped, scroll_type, behavior, on_finish);
    }

    fn compute_delta_to_consume(&self, delta: ScrollOffset) -> ScrollOffset {
        let visual = self.visual.borrow().compute_delta_to_consume(delta);
        visual + self.layout.borrow().compute_delta_to_consume(delta - visual)
    }

    fn user_scroll(
        &mut self,
        granularity: ScrollGranularity,
        delta: ScrollOffset,
        on_finish: Option<ScrollCallback>,
    ) -> ScrollResult {
        let pixel_delta = self.resolve_scroll_delta(granularity, delta);
        let visual_consumed = self.visual.borrow().compute_delta_to_consume(pixel_delta);
        let layout_delta = pixel_delta - visual_consumed;
        let (scrollable_x, scrollable_y) = {
            let layout = self.layout.borrow();
            (
                layout.user_input_scrollable(ScrollbarOrientation::Horizontal),
                layout.user_input_scrollable(ScrollbarOrientation::Vertical),
            )
        };
        let scrollable_axis_delta = ScrollOffset::new(
            if scrollable_x { layout_delta.x } else { 0.0 },
            if scrollable_y { layout_delta.y } else { 0.0 },
        );
        let layout_consumed = self.layout.borrow().compute_delta_to_consume(scrollable_axis_delta);

        if visual_consumed.is_zero() && layout_consumed.is_zero() {
            run_callback(on_finish, ScrollCompletionMode::ZeroDelta);
            return ScrollResult::new(false, false, pixel_delta.x, pixel_delta.y);
        }

        self.cancel_programmatic_scroll_animation();
        if let Some(sequencer) = self.smooth_scroll_sequencer() {
            SmoothScrollSequencer::abort_animations(&sequencer);
        }

        if visual_consumed == pixel_delta {
            return self
                .visual
                .borrow_mut()
                .animator_user_scroll(granularity, visual_consumed, on_finish);
        }
        if layout_consumed == pixel_delta {
            return self
                .layout
                .borrow_mut()
                .animator_user_scroll(granularity, scrollable_axis_delta, on_finish);
        }

        let (visual_done, layout_done) = match on_finish.map(split_callback) {
            Some((visual_done, layout_done)) => (Some(visual_done), Some(layout_done)),
            None => (None, None),
        };
        let visual_result = self
            .visual
            .borrow_mut()
            .animator_user_scroll(granularity, visual_consumed, visual_done);
        let layout_result = self
            .layout
            .borrow_mut()
            .animator_user_scroll(granularity, scrollable_axis_delta, layout_done);
        let unscrollable = layout_delta - scrollable_axis_delta;
        ScrollResult::new(
            visual_result.did_scroll_x || layout_result.did_scroll_x,
            visual_result.did_scroll_y || layout_result.did_scroll_y,
            visual_result.unused_scroll_delta_x + layout_result.unused_scroll_delta_x + unscrollable.x,
            visual_result.unused_scroll_delta_y + layout_result.unused_scroll_delta_y + unscrollable.y,
        )
    }

    fn cancel_programmatic_scroll_animation(&mut self) {
        self.visual.borrow_mut().cancel_programmatic_scroll_animation();
        self.layout.borrow_mut().cancel_programmatic_scroll_animation();
    }

    fn has_running_animation(&self) -> bool {
        self.visual.borrow().has_running_animation() || self.layout.borrow().has_running_animation()
    }

    /// The part of the layout viewport the visual viewport shows, in
    /// document coordinates, minus the layout viewport's scroll padding.
    fn visible_scroll_snapport_rect(&self) -> RectF {
        let layout = self.layout.borrow();
        let layout_rect = layout.visible_content_rect();
        let visual_rect = self
            .visual
            .borrow()
            .visible_content_rect()
            .translated(layout.scroll_offset());
        visual_rect
            .intersection(&layout_rect)
            .contracted(&layout.scroll_padding())
    }
}
