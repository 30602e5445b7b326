//! Scrollable areas backed by a layout box: the layout viewport (the view)
//! and element scrollers.

use crate::alignment::SnapCoordinator;
use crate::animator::ScrollAnimator;
use crate::events::{ScrollEventQueue, ViewportEvent};
use crate::scrollable_area::ScrollableArea;
use crate::sequencer::SmoothScrollSequencer;
use crate::types::{ScrollBehavior, ScrollType, ScrollbarOrientation};
use anyhow::{Result, anyhow};
use log::{trace, warn};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use strata_geometry::{Outsets, RectF, ScrollOffset, SizeF, snap_offset};
use strata_layout_tree::{CssScrollBehavior, Document, LayoutObject, LayoutObjectId};

/// Scrolls the overflow of one scroll container.
///
/// The committed offset lives in the layout tree; this keeps a copy so the
/// area stays usable while the document is borrowed elsewhere.
pub struct BoxScroller {
    document: Weak<RefCell<Document>>,
    object: LayoutObjectId,
    is_layout_viewport: bool,
    offset: ScrollOffset,
    animator: ScrollAnimator,
    events: ScrollEventQueue,
    allow_fractional_offsets: bool,
    sequencer: Option<Rc<RefCell<SmoothScrollSequencer>>>,
    snap: Option<Rc<dyn SnapCoordinator>>,
    handle: Weak<RefCell<dyn ScrollableArea>>,
    last_scroll_type: Option<ScrollType>,
}

impl BoxScroller {
    /// A scroller for `object`, which must be a scroll container.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is gone, busy, or `object` is stale
    /// or does not scroll.
    pub fn new(
        document: &Rc<RefCell<Document>>,
        object: LayoutObjectId,
        events: ScrollEventQueue,
    ) -> Result<Rc<RefCell<Self>>> {
        let (is_layout_viewport, offset) = {
            let doc = document
                .try_borrow()
                .map_err(|_| anyhow!("document is busy"))?;
            let layout_object = doc.layout.object(object)?;
            if !layout_object.is_scroll_container() {
                return Err(anyhow!("{object:?} is not a scroll container"));
            }
            (layout_object.is_view(), layout_object.scroll_offset)
        };
        let mut animator = ScrollAnimator::default();
        animator.set_current_offset(offset);
        Ok(Rc::new_cyclic(|weak: &Weak<RefCell<Self>>| {
            RefCell::new(Self {
                document: Rc::downgrade(document),
                object,
                is_layout_viewport,
                offset,
                animator,
                events,
                allow_fractional_offsets: false,
                sequencer: None,
                snap: None,
                handle: Weak::<RefCell<Self>>::clone(weak),
                last_scroll_type: None,
            })
        }))
    }

    /// The scroller of the frame's view.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is busy.
    pub fn layout_viewport(
        document: &Rc<RefCell<Document>>,
        events: ScrollEventQueue,
    ) -> Result<Rc<RefCell<Self>>> {
        let view = document
            .try_borrow()
            .map_err(|_| anyhow!("document is busy"))?
            .layout
            .view();
        Self::new(document, view, events)
    }

    pub fn object(&self) -> LayoutObjectId {
        self.object
    }

    pub fn is_layout_viewport(&self) -> bool {
        self.is_layout_viewport
    }

    /// The type of the last committed scroll.
    pub fn last_scroll_type(&self) -> Option<ScrollType> {
        self.last_scroll_type
    }

    pub fn set_allow_fractional_scroll_offsets(&mut self, allow: bool) {
        self.allow_fractional_offsets = allow;
    }

    pub fn set_smooth_scroll_sequencer(&mut self, sequencer: Option<Rc<RefCell<SmoothScrollSequencer>>>) {
        self.sequencer = sequencer;
    }

    pub fn set_snap_coordinator(&mut self, snap: Option<Rc<dyn SnapCoordinator>>) {
        self.snap = snap;
    }

    /// Re-clamp after layout changed the scroll range.
    pub fn clamp_after_layout(&mut self) {
        let clamped = self.clamp_scroll_offset(self.offset);
        if clamped != self.offset {
            self.set_scroll_offset(clamped, ScrollType::Clamping, ScrollBehavior::Instant, None);
        }
    }

    fn with_object<R>(&self, read: impl FnOnce(&LayoutObject) -> R) -> Option<R> {
        let document = self.document.upgrade()?;
        let document = document.try_borrow().ok()?;
        document.layout.get(self.object).map(read)
    }

    /// The overflow clip rect and the scrollable overflow, in local
    /// coordinates.
    fn scroll_geometry(&self) -> (RectF, RectF) {
        self.with_object(|object| (object.overflow_clip_rect(), object.scrollable_overflow_rect()))
            .unwrap_or((RectF::ZERO, RectF::ZERO))
    }
}

impl ScrollableArea for BoxScroller {
    fn scroll_offset(&self) -> ScrollOffset {
        self.offset
    }

    fn minimum_scroll_offset(&self) -> ScrollOffset {
        ScrollOffset::ZERO
    }

    fn maximum_scroll_offset(&self) -> ScrollOffset {
        let visible = self.visible_content_rect().size();
        let contents = self.contents_size();
        ScrollOffset::new(
            (contents.width - visible.width).max(0.0),
            (contents.height - visible.height).max(0.0),
        )
    }

    fn animator(&self) -> &ScrollAnimator {
        &self.animator
    }

    fn animator_mut(&mut self) -> &mut ScrollAnimator {
        &mut self.animator
    }

    fn visible_content_rect(&self) -> RectF {
        let (clip, _) = self.scroll_geometry();
        RectF::from_origin_size(self.offset.to_point(), clip.size())
    }

    fn contents_size(&self) -> SizeF {
        let (clip, overflow) = self.scroll_geometry();
        SizeF::new(
            (overflow.max_x() - clip.x).max(clip.width),
            (overflow.max_y() - clip.y).max(clip.height),
        )
    }

    fn update_scroll_offset(&mut self, offset: ScrollOffset, scroll_type: ScrollType) {
        let snapped = snap_offset(offset, self.allow_fractional_offsets);
        if snapped == self.offset {
            return;
        }
        trace!("{:?} scrolled to {snapped:?} ({scroll_type:?})", self.object);
        self.offset = snapped;
        self.last_scroll_type = Some(scroll_type);
        if let Some(document) = self.document.upgrade() {
            match document.try_borrow_mut() {
                Ok(mut document) => {
                    if let Err(error) = document.layout.set_scroll_offset(self.object, snapped) {
                        warn!("could not record scroll offset: {error}");
                    }
                }
                Err(_) => warn!("document busy; scroll offset of {:?} not written back", self.object),
            }
        }
        self.events.enqueue(if self.is_layout_viewport {
            ViewportEvent::LayoutViewportScroll
        } else {
            ViewportEvent::ElementScroll(self.object)
        });
    }

    fn user_input_scrollable(&self, orientation: ScrollbarOrientation) -> bool {
        self.with_object(LayoutObject::user_scrollable_axes)
            .is_some_and(|(horizontal, vertical)| match orientation {
                ScrollbarOrientation::Horizontal => horizontal,
                ScrollbarOrientation::Vertical => vertical,
            })
    }

    fn scroll_behavior_style(&self) -> ScrollBehavior {
        match self.with_object(|object| object.style().scroll_behavior) {
            Some(CssScrollBehavior::Smooth) => ScrollBehavior::Smooth,
            Some(CssScrollBehavior::Auto) | None => ScrollBehavior::Instant,
        }
    }

    fn scroll_padding(&self) -> Outsets {
        self.with_object(|object| object.style().scroll_padding)
            .unwrap_or(Outsets::ZERO)
    }

    fn layout_box(&self) -> Option<LayoutObjectId> {
        Some(self.object)
    }

    fn smooth_scroll_sequencer(&self) -> Option<Rc<RefCell<SmoothScrollSequencer>>> {
        self.sequencer.as_ref().map(Rc::clone)
    }

    fn snap_coordinator(&self) -> Option<Rc<dyn SnapCoordinator>> {
        self.snap.as_ref().map(Rc::clone)
    }

    fn weak_self(&self) -> Option<Weak<RefCell<dyn ScrollableArea>>> {
        Some(Weak::clone(&self.handle))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test code")]
mod tests {
    use super::*;
    use strata_geometry::PointF;
    use strata_layout_tree::{ComputedStyle, LayoutObjectKind, Overflow};

    fn document_with_scroller() -> (Rc<RefCell<Document>>, LayoutObjectId) {
        let mut document = Document::new(SizeF::new(800.0, 600.0));
        let view = document.layout.view();
        let scroller = document
            .attach_layout_object(
                None,
                LayoutObjectKind::Block,
                ComputedStyle::default().with_overflow(Overflow::Scroll),
                view,
            )
            .unwrap();
        document
            .layout
            .set_geometry(scroller, PointF::new(10.0, 10.0), SizeF::new(200.0, 100.0))
            .unwrap();
        document
            .layout
            .set_overflow(scroller, None, Some(RectF::new(0.0, 0.0, 200.0, 500.0)))
            .unwrap();
        (Rc::new(RefCell::new(document)), scroller)
    }

    #[test]
    fn range_comes_from_scrollable_overflow() {
        let (document, object) = document_with_scroller();
        let scroller = BoxScroller::new(&document, object, ScrollEventQueue::new()).unwrap();
        assert_eq!(scroller.borrow().maximum_scroll_offset(), ScrollOffset::new(0.0, 400.0));
    }

    #[test]
    fn committed_offsets_reach_the_layout_tree() {
        let (document, object) = document_with_scroller();
        let events = ScrollEventQueue::new();
        let scroller = BoxScroller::new(&document, object, events.clone()).unwrap();
        scroller.borrow_mut().set_scroll_offset(
            ScrollOffset::new(0.0, 1000.0),
            ScrollType::Programmatic,
            ScrollBehavior::Instant,
            None,
        );
        assert_eq!(scroller.borrow().scroll_offset(), ScrollOffset::new(0.0, 400.0));
        assert_eq!(
            document.borrow().layout.object(object).unwrap().scroll_offset,
            ScrollOffset::new(0.0, 400.0)
        );
        assert_eq!(events.take(), vec![ViewportEvent::ElementScroll(object)]);
    }

    #[test]
    fn offsets_snap_unless_fractional() {
        let (document, object) = document_with_scroller();
        let scroller = BoxScroller::new(&document, object, ScrollEventQueue::new()).unwrap();
        scroller.borrow_mut().update_scroll_offset(ScrollOffset::new(0.0, 10.4), ScrollType::User);
        assert_eq!(scroller.borrow().scroll_offset(), ScrollOffset::new(0.0, 10.0));
        scroller.borrow_mut().set_allow_fractional_scroll_offsets(true);
        scroller.borrow_mut().update_scroll_offset(ScrollOffset::new(0.0, 10.4), ScrollType::User);
        assert_eq!(scroller.borrow().scroll_offset(), ScrollOffset::new(0.0, 10.4));
    }

    #[test]
    fn non_scrolling_boxes_are_refused() {
        let mut document = Document::new(SizeF::new(800.0, 600.0));
        let view = document.layout.view();
        let block = document
            .attach_layout_object(None, LayoutObjectKind::Block, ComputedStyle::default(), view)
            .unwrap();
        let document = Rc::new(RefCell::new(document));
        assert!(BoxScroller::new(&document, block, ScrollEventQueue::new()).is_err());
    }
}
