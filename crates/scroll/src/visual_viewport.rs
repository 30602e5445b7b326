//! The pinch-zoom viewport layered over the layout viewport.
//!
//! The visual viewport has a scale and an offset relative to the layout
//! viewport. Its contents are the layout viewport itself, so its maximum
//! offset depends on the scale.

use crate::animator::ScrollAnimator;
use crate::events::{ScrollEventQueue, ViewportEvent};
use crate::scrollable_area::ScrollableArea;
use crate::sequencer::SmoothScrollSequencer;
use crate::types::{ScrollType, ScrollbarOrientation};
use log::{debug, trace, warn};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use strata_geometry::{PointF, RectF, ScrollOffset, SizeF, Transform2D};
use strata_property_trees::{PaintArtifactCompositor, PropertyTrees, TransformKind, TransformNodeId};

/// Bounds the page scale factor is clamped to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageScaleConstraints {
    pub minimum_scale: f32,
    pub maximum_scale: f32,
}

impl Default for PageScaleConstraints {
    fn default() -> Self {
        Self {
            minimum_scale: 1.0,
            maximum_scale: 5.0,
        }
    }
}

impl PageScaleConstraints {
    pub fn clamp(&self, scale: f32) -> f32 {
        scale.min(self.maximum_scale).max(self.minimum_scale)
    }
}

pub struct VisualViewport {
    scale: f32,
    constraints: PageScaleConstraints,
    is_pinch_gesture_active: bool,
    /// Size in device pixels, excluding the browser controls adjustment.
    size: SizeF,
    /// Size of the layout viewport (the frame) it pans over.
    contents_size: SizeF,
    browser_controls_adjustment: f32,
    offset: ScrollOffset,
    animator: ScrollAnimator,
    events: ScrollEventQueue,
    fullscreen: bool,
    sequencer: Option<Rc<RefCell<SmoothScrollSequencer>>>,
    compositor: Option<Rc<RefCell<dyn PaintArtifactCompositor>>>,
    page_scale_node: Option<TransformNodeId>,
    scroll_translation_node: Option<TransformNodeId>,
    needs_paint_property_update: bool,
    handle: Weak<RefCell<dyn ScrollableArea>>,
}

impl fmt::Debug for VisualViewport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("VisualViewport")
            .field("scale", &self.scale)
            .field("size", &self.size)
            .field("offset", &self.offset)
            .field("browser_controls_adjustment", &self.browser_controls_adjustment)
            .finish_non_exhaustive()
    }
}

impl VisualViewport {
    /// An unscaled viewport of `size` over a frame of the same size.
    pub fn new(size: SizeF, events: ScrollEventQueue) -> Rc<RefCell<Self>> {
        Rc::new_cyclic(|weak: &Weak<RefCell<Self>>| {
            RefCell::new(Self {
                scale: 1.0,
                constraints: PageScaleConstraints::default(),
                is_pinch_gesture_active: false,
                size,
                contents_size: size,
                browser_controls_adjustment: 0.0,
                offset: ScrollOffset::ZERO,
                animator: ScrollAnimator::default(),
                events,
                fullscreen: false,
                sequencer: None,
                compositor: None,
                page_scale_node: None,
                scroll_translation_node: None,
                needs_paint_property_update: true,
                handle: Weak::<RefCell<Self>>::clone(weak),
            })
        })
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn size(&self) -> SizeF {
        self.size
    }

    pub fn is_pinch_gesture_active(&self) -> bool {
        self.is_pinch_gesture_active
    }

    pub fn page_scale_constraints(&self) -> PageScaleConstraints {
        self.constraints
    }

    /// Replace the constraints and re-clamp the current scale.
    pub fn set_page_scale_constraints(&mut self, constraints: PageScaleConstraints) {
        self.constraints = constraints;
        self.set_scale(self.scale);
    }

    pub fn set_size(&mut self, size: SizeF) {
        if self.size == size {
            return;
        }
        debug!("visual viewport resized to {size:?}");
        self.size = size;
        self.needs_paint_property_update = true;
        self.events.enqueue(ViewportEvent::VisualViewportResize);
        self.clamp_to_boundaries();
    }

    /// Track the size of the layout viewport.
    pub fn set_contents_size(&mut self, size: SizeF) {
        if self.contents_size != size {
            self.contents_size = size;
            self.clamp_to_boundaries();
        }
    }

    pub fn browser_controls_adjustment(&self) -> f32 {
        self.browser_controls_adjustment
    }

    /// The height the browser controls hide from or give back to the
    /// viewport. Returns whether it changed.
    pub fn set_browser_controls_adjustment(&mut self, adjustment: f32) -> bool {
        if self.browser_controls_adjustment == adjustment {
            return false;
        }
        self.browser_controls_adjustment = adjustment;
        self.needs_paint_property_update = true;
        self.events.enqueue(ViewportEvent::VisualViewportResize);
        true
    }

    /// Scrolling is disabled while an element is fullscreen.
    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    pub fn set_smooth_scroll_sequencer(&mut self, sequencer: Option<Rc<RefCell<SmoothScrollSequencer>>>) {
        self.sequencer = sequencer;
    }

    pub fn set_compositor(&mut self, compositor: Option<Rc<RefCell<dyn PaintArtifactCompositor>>>) {
        self.compositor = compositor;
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.set_scale_and_location(scale, self.is_pinch_gesture_active, self.offset);
    }

    pub fn set_location(&mut self, location: ScrollOffset) {
        self.set_scale_and_location(self.scale, self.is_pinch_gesture_active, location);
    }

    pub fn move_by(&mut self, delta: ScrollOffset) {
        self.set_location(self.offset + delta);
    }

    /// Apply a new scale and offset together. Returns whether anything
    /// changed; non-finite offsets are rejected without side effects.
    pub fn set_scale_and_location(
        &mut self,
        scale: f32,
        is_pinch_gesture_active: bool,
        location: ScrollOffset,
    ) -> bool {
        let mut changed = false;
        if scale.is_finite() {
            let clamped_scale = self.constraints.clamp(scale);
            if clamped_scale != self.scale {
                trace!("page scale {} -> {clamped_scale}", self.scale);
                self.scale = clamped_scale;
                changed = true;
                self.did_change_scale();
                self.events.enqueue(ViewportEvent::VisualViewportResize);
            }
        }
        let clamped = self.clamp_scroll_offset(location);
        if !location.is_finite() || !clamped.is_finite() {
            warn!("rejecting non-finite visual viewport offset {clamped:?}");
            return false;
        }
        if clamped != self.offset {
            self.offset = clamped;
            self.animator.set_current_offset(clamped);
            self.did_change_offset();
            self.events.enqueue(ViewportEvent::VisualViewportScroll);
            changed = true;
        }
        if !changed {
            return false;
        }
        self.is_pinch_gesture_active = is_pinch_gesture_active;
        true
    }

    fn did_change_scale(&mut self) {
        let patched = match (self.compositor.as_ref(), self.page_scale_node) {
            (Some(compositor), Some(node)) => compositor
                .try_borrow_mut()
                .is_ok_and(|mut compositor| compositor.directly_update_page_scale_transform(node, self.scale)),
            _ => false,
        };
        if !patched {
            self.needs_paint_property_update = true;
        }
    }

    fn did_change_offset(&mut self) {
        let patched = match (self.compositor.as_ref(), self.scroll_translation_node) {
            (Some(compositor), Some(node)) => compositor
                .try_borrow_mut()
                .is_ok_and(|mut compositor| compositor.directly_update_scroll_offset_transform(node, self.offset)),
            _ => false,
        };
        if !patched {
            self.needs_paint_property_update = true;
        }
    }

    /// Re-clamp the offset to the current range.
    pub fn clamp_to_boundaries(&mut self) {
        self.set_location(self.offset);
    }

    /// The largest offset reachable at `scale`.
    pub fn maximum_scroll_offset_at_scale(&self, scale: f32) -> ScrollOffset {
        let mut frame_size = self.contents_size;
        if self.browser_controls_adjustment != 0.0 {
            frame_size.height += self.browser_controls_adjustment / self.constraints.minimum_scale;
        }
        let frame_size = frame_size.scaled(scale);
        let frame_size = SizeF::new(frame_size.width.floor(), frame_size.height.floor());
        let viewport_height = self.size.height + self.browser_controls_adjustment.ceil();
        ScrollOffset::new(
            (frame_size.width - self.size.width) / scale,
            (frame_size.height - viewport_height) / scale,
        )
    }

    /// The size of the visible area in layout viewport coordinates.
    pub fn visible_size(&self) -> SizeF {
        SizeF::new(
            self.size.width,
            self.size.height + self.browser_controls_adjustment,
        )
        .scaled(1.0 / self.scale)
    }

    /// The visible area in layout viewport coordinates.
    pub fn visible_rect(&self) -> RectF {
        RectF::from_origin_size(self.offset.to_point(), self.visible_size())
    }

    /// Scale first, then translate.
    pub fn viewport_to_root_frame_point(&self, point: PointF) -> PointF {
        point.scaled(1.0 / self.scale) + self.offset
    }

    /// Translate first, then scale.
    pub fn root_frame_to_viewport_point(&self, point: PointF) -> PointF {
        (point - self.offset).scaled(self.scale)
    }

    pub fn viewport_to_root_frame_rect(&self, rect: &RectF) -> RectF {
        rect.scaled(1.0 / self.scale).translated(self.offset)
    }

    pub fn root_frame_to_viewport_rect(&self, rect: &RectF) -> RectF {
        rect.translated(-self.offset).scaled(self.scale)
    }

    pub fn needs_paint_property_update(&self) -> bool {
        self.needs_paint_property_update
    }

    pub fn page_scale_node(&self) -> Option<TransformNodeId> {
        self.page_scale_node
    }

    pub fn scroll_translation_node(&self) -> Option<TransformNodeId> {
        self.scroll_translation_node
    }

    /// Create the page scale and scroll translation nodes under `parent`.
    /// Returns the scroll translation, which parents the frame contents.
    pub fn update_paint_property_nodes(
        &mut self,
        trees: &mut PropertyTrees,
        parent: TransformNodeId,
    ) -> TransformNodeId {
        let page_scale = trees.add_transform(
            parent,
            Transform2D::scale(self.scale, self.scale),
            TransformKind::PageScale,
        );
        let scroll = trees.add_transform(
            page_scale,
            Transform2D::from_offset(-self.offset),
            TransformKind::VisualViewportScroll,
        );
        self.page_scale_node = Some(page_scale);
        self.scroll_translation_node = Some(scroll);
        self.needs_paint_property_update = false;
        scroll
    }
}

impl ScrollableArea for VisualViewport {
    fn scroll_offset(&self) -> ScrollOffset {
        self.offset
    }

    fn minimum_scroll_offset(&self) -> ScrollOffset {
        ScrollOffset::ZERO
    }

    fn maximum_scroll_offset(&self) -> ScrollOffset {
        self.maximum_scroll_offset_at_scale(self.scale)
    }

    fn animator(&self) -> &ScrollAnimator {
        &self.animator
    }

    fn animator_mut(&mut self) -> &mut ScrollAnimator {
        &mut self.animator
    }

    fn visible_content_rect(&self) -> RectF {
        self.visible_rect()
    }

    fn contents_size(&self) -> SizeF {
        self.contents_size
    }

    fn update_scroll_offset(&mut self, offset: ScrollOffset, scroll_type: ScrollType) {
        trace!("visual viewport scroll to {offset:?} ({scroll_type:?})");
        self.set_scale_and_location(self.scale, self.is_pinch_gesture_active, offset);
    }

    fn user_input_scrollable(&self, _orientation: ScrollbarOrientation) -> bool {
        !self.fullscreen
    }

    fn smooth_scroll_sequencer(&self) -> Option<Rc<RefCell<SmoothScrollSequencer>>> {
        self.sequencer.as_ref().map(Rc::clone)
    }

    fn weak_self(&self) -> Option<Weak<RefCell<dyn ScrollableArea>>> {
        Some(Weak::clone(&self.handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingCompositor {
        accept: bool,
        scroll_updates: Vec<ScrollOffset>,
    }

    impl PaintArtifactCompositor for RecordingCompositor {
        fn directly_update_scroll_offset_transform(&mut self, _node: TransformNodeId, offset: ScrollOffset) -> bool {
            self.scroll_updates.push(offset);
            self.accept
        }

        fn directly_update_page_scale_transform(&mut self, _node: TransformNodeId, _scale: f32) -> bool {
            self.accept
        }
    }

    fn viewport() -> (Rc<RefCell<VisualViewport>>, ScrollEventQueue) {
        let events = ScrollEventQueue::new();
        (VisualViewport::new(SizeF::new(100.0, 100.0), events.clone()), events)
    }

    #[test]
    fn range_grows_with_scale() {
        let (viewport, _) = viewport();
        let mut viewport = viewport.borrow_mut();
        assert_eq!(viewport.maximum_scroll_offset(), ScrollOffset::ZERO);
        viewport.set_scale(2.0);
        assert_eq!(viewport.maximum_scroll_offset(), ScrollOffset::new(50.0, 50.0));
        assert_eq!(viewport.visible_size(), SizeF::new(50.0, 50.0));
    }

    #[test]
    fn scale_is_clamped_and_raises_resize() {
        let (viewport, events) = viewport();
        viewport.borrow_mut().set_scale(10.0);
        assert_eq!(viewport.borrow().scale(), 5.0);
        assert_eq!(events.take(), vec![ViewportEvent::VisualViewportResize]);
        viewport.borrow_mut().set_scale(f32::NAN);
        assert_eq!(viewport.borrow().scale(), 5.0);
        assert!(events.is_empty());
    }

    #[test]
    fn non_finite_locations_are_rejected() {
        let (viewport, events) = viewport();
        viewport.borrow_mut().set_scale(2.0);
        events.take();
        let changed = viewport
            .borrow_mut()
            .set_scale_and_location(2.0, false, ScrollOffset::new(f32::NAN, 0.0));
        assert!(!changed);
        assert_eq!(viewport.borrow().scroll_offset(), ScrollOffset::ZERO);
        assert!(events.is_empty());
    }

    #[test]
    fn mapping_order_round_trips() {
        let (viewport, _) = viewport();
        let mut viewport = viewport.borrow_mut();
        viewport.set_scale_and_location(2.0, false, ScrollOffset::new(10.0, 20.0));
        let point = PointF::new(30.0, 40.0);
        let root = viewport.viewport_to_root_frame_point(point);
        assert_eq!(root, PointF::new(25.0, 40.0));
        assert_eq!(viewport.root_frame_to_viewport_point(root), point);
    }

    #[test]
    fn compositor_fast_path_skips_property_invalidation() {
        let (viewport, _) = viewport();
        let compositor = Rc::new(RefCell::new(RecordingCompositor {
            accept: true,
            ..RecordingCompositor::default()
        }));
        let mut viewport = viewport.borrow_mut();
        viewport.set_scale(2.0);
        let mut trees = PropertyTrees::new();
        viewport.update_paint_property_nodes(&mut trees, TransformNodeId::ROOT);
        viewport.set_compositor(Some(Rc::clone(&compositor) as Rc<RefCell<dyn PaintArtifactCompositor>>));
        viewport.set_location(ScrollOffset::new(10.0, 10.0));
        assert!(!viewport.needs_paint_property_update());
        assert_eq!(compositor.borrow().scroll_updates, vec![ScrollOffset::new(10.0, 10.0)]);
        compositor.borrow_mut().accept = false;
        viewport.set_location(ScrollOffset::new(20.0, 10.0));
        assert!(viewport.needs_paint_property_update());
    }

    #[test]
    fn fullscreen_disables_user_scrolling() {
        let (viewport, _) = viewport();
        viewport.borrow_mut().set_fullscreen(true);
        assert!(!viewport.borrow().user_input_scrollable(ScrollbarOrientation::Vertical));
    }
}
