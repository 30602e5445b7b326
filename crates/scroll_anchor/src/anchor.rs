//! Scroll anchoring: keep a visible node at the same viewport-relative
//! position across layout.
//!
//! Before layout, [`ScrollAnchor::notify_before_layout`] picks an anchor
//! node inside the scroller's snapport and records its offset relative to
//! the snapport. After layout, [`ScrollAnchor::adjust`] scrolls by however
//! far the anchor moved along the block axis.

use crate::queue::AnchoringAdjustmentQueue;
use crate::selector::query_selector_all;
use crate::serialize::{MAX_SERIALIZED_SELECTOR_LENGTH, SerializedAnchor, compute_unique_selector};
use log::{debug, trace, warn};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use strata_geometry::{PointF, RectF, ScrollOffset, WritingMode};
use strata_layout_tree::{Document, DomNodeId, LayoutObjectId, LayoutTree, OverflowAnchor};
use strata_scroll::{ScrollBehavior, ScrollType, ScrollableArea};

/// Which corner of the anchor and snapport the relative offset measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Corner {
    #[default]
    TopLeft,
    /// Flipped-blocks writing modes start the block axis on the right.
    TopRight,
}

/// How the anchor search treats one layout object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStatus {
    /// Neither this object nor its descendants can be the anchor.
    Skip,
    /// Partially visible: a candidate, but a descendant may fit better.
    Constrain,
    /// Not a candidate itself; look at its descendants.
    Continue,
    /// Fully visible: use it and stop.
    Return,
}

impl WalkStatus {
    const fn is_viable(self) -> bool {
        matches!(self, Self::Constrain | Self::Return)
    }
}

/// The scroller's frame of reference, sampled once per operation.
struct ScrollerGeometry {
    scroller_box: LayoutObjectId,
    writing_mode: WritingMode,
    /// Added to a rect relative to the scroller's border box to get content
    /// coordinates.
    content_shift: ScrollOffset,
    /// The scroll-padding-contracted visible rect, in content coordinates.
    snapport: RectF,
}

impl ScrollerGeometry {
    fn corner(&self) -> Corner {
        if self.writing_mode.is_flipped_blocks() {
            Corner::TopRight
        } else {
            Corner::TopLeft
        }
    }

    /// Bounds of `object` in the scroller's content coordinates.
    ///
    /// Boxes that do not clip extend down to their scrollable overflow, so
    /// floats and overflowing content count towards their extent.
    fn relative_bounds(&self, layout: &LayoutTree, object: LayoutObjectId) -> RectF {
        let Some(layout_object) = layout.get(object) else {
            return RectF::ZERO;
        };
        let mut local = layout_object.border_box_rect();
        if layout_object.is_box() && !layout_object.should_clip_overflow_along_either_axis() {
            let bottom = local.max_y().max(layout_object.scrollable_overflow_rect().max_y());
            local.shift_bottom_edge_to(bottom);
        }
        layout
            .map_rect_to_ancestor(object, local, self.scroller_box)
            .translated(self.content_shift)
    }

    /// Position of the anchor's corner relative to the snapport's, in
    /// block-flow-relative terms.
    fn relative_offset(&self, layout: &LayoutTree, object: LayoutObjectId) -> PointF {
        let bounds = self.relative_bounds(layout, object);
        match self.corner() {
            Corner::TopLeft => PointF::new(bounds.x - self.snapport.x, bounds.y - self.snapport.y),
            Corner::TopRight => PointF::new(
                self.snapport.max_x() - bounds.max_x(),
                bounds.y - self.snapport.y,
            ),
        }
    }

    /// Convert a block-flow-relative delta to a physical one.
    fn to_physical(&self, delta: ScrollOffset) -> ScrollOffset {
        if self.writing_mode.is_flipped_blocks() {
            ScrollOffset::new(-delta.x, delta.y)
        } else {
            delta
        }
    }
}

/// Whether scrolling the scroller moves `candidate`: sticky and fixed boxes
/// do not, nor does anything whose containing-block chain skips the
/// scroller.
fn may_move_with_scroller(layout: &LayoutTree, candidate: LayoutObjectId, scroller_box: LayoutObjectId) -> bool {
    let Some(object) = layout.get(candidate) else {
        return false;
    };
    if object.is_fixed_positioned() || object.is_sticky_positioned() {
        return false;
    }
    !layout.container_skipping(candidate, Some(scroller_box)).1
}

/// The anchoring state of one scrollable area.
pub struct ScrollAnchor {
    scroller: Option<Rc<RefCell<dyn ScrollableArea>>>,
    document: Weak<RefCell<Document>>,
    queue: AnchoringAdjustmentQueue,
    anchor_object: Option<LayoutObjectId>,
    corner: Corner,
    saved_relative_offset: PointF,
    saved_selector: String,
    scroll_anchor_disabling_style_changed: bool,
    queued: bool,
    anchor_is_cv_auto_without_layout: bool,
    max_selector_length: usize,
    adjustment_count: u64,
}

impl ScrollAnchor {
    pub fn new(
        scroller: Rc<RefCell<dyn ScrollableArea>>,
        document: &Rc<RefCell<Document>>,
        queue: AnchoringAdjustmentQueue,
    ) -> Self {
        Self {
            scroller: Some(scroller),
            document: Rc::downgrade(document),
            queue,
            anchor_object: None,
            corner: Corner::TopLeft,
            saved_relative_offset: PointF::ZERO,
            saved_selector: String::new(),
            scroll_anchor_disabling_style_changed: false,
            queued: false,
            anchor_is_cv_auto_without_layout: false,
            max_selector_length: MAX_SERIALIZED_SELECTOR_LENGTH,
            adjustment_count: 0,
        }
    }

    pub fn set_max_selector_length(&mut self, length: usize) {
        self.max_selector_length = length;
    }

    pub fn scroller(&self) -> Option<&Rc<RefCell<dyn ScrollableArea>>> {
        self.scroller.as_ref()
    }

    /// Replace the scroller, dropping any anchor chosen for the old one.
    pub fn set_scroller(&mut self, scroller: Rc<RefCell<dyn ScrollableArea>>) {
        self.dispose();
        self.scroller = Some(scroller);
    }

    pub fn anchor_object(&self) -> Option<LayoutObjectId> {
        self.anchor_object
    }

    pub fn corner(&self) -> Corner {
        self.corner
    }

    pub fn saved_relative_offset(&self) -> PointF {
        self.saved_relative_offset
    }

    pub fn saved_selector(&self) -> &str {
        &self.saved_selector
    }

    pub fn is_queued(&self) -> bool {
        self.queued
    }

    /// How many anchoring adjustments were applied.
    pub fn adjustment_count(&self) -> u64 {
        self.adjustment_count
    }

    /// The scroller box the frame's adjustment queue knows this anchor by.
    pub fn queue_key(&self) -> Option<LayoutObjectId> {
        self.scroller.as_ref()?.borrow().layout_box()
    }

    fn geometry(&self, layout: &LayoutTree) -> Option<ScrollerGeometry> {
        let scroller = self.scroller.as_ref()?.borrow();
        let scroller_box = scroller.layout_box()?;
        let object = layout.get(scroller_box)?;
        let clip_origin = object.overflow_clip_rect().origin();
        Some(ScrollerGeometry {
            scroller_box,
            writing_mode: object.style().writing_mode,
            content_shift: scroller.content_scroll_offset() - clip_origin.to_offset(),
            snapport: scroller.visible_scroll_snapport_rect(),
        })
    }

    /// Forget the anchor node. The scroller stays attached.
    pub fn clear_self(&mut self) {
        if let Some(anchor) = self.anchor_object.take() {
            trace!("cleared scroll anchor {anchor:?}");
        }
        self.saved_selector.clear();
    }

    /// Called before `object` leaves the layout tree.
    pub fn notify_removed(&mut self, object: LayoutObjectId) {
        if self.anchor_object == Some(object) {
            self.clear_self();
        }
    }

    /// Detach from the scroller, which is going away.
    pub fn dispose(&mut self) {
        if let Some(key) = self.queue_key() {
            self.queue.dequeue(key);
        }
        self.scroller = None;
        self.anchor_object = None;
        self.saved_selector.clear();
        self.queued = false;
    }

    /// Choose an anchor before layout and queue the adjustment for after it.
    pub fn notify_before_layout(&mut self) {
        let Some(document) = self.document.upgrade() else {
            return;
        };
        if self.queued {
            let changed = document
                .try_borrow()
                .is_ok_and(|doc| self.compute_scroll_anchor_disabling_style_changed(&doc.layout));
            self.scroll_anchor_disabling_style_changed |= changed;
            return;
        }
        let Some(scroller) = self.scroller.as_ref().map(Rc::clone) else {
            return;
        };
        let Ok(doc) = document.try_borrow() else {
            warn!("document busy; scroll anchor not updated before layout");
            return;
        };
        let Some(geometry) = self.geometry(&doc.layout) else {
            return;
        };
        let offset = scroller.borrow().scroll_offset();
        if geometry.writing_mode.block_offset(offset) == 0.0 {
            self.clear_self();
            return;
        }
        if self.anchor_object.is_none() {
            self.find_anchor_in(&doc, &geometry);
            if self.anchor_object.is_none() {
                return;
            }
        }
        self.scroll_anchor_disabling_style_changed = self.compute_scroll_anchor_disabling_style_changed(&doc.layout);
        self.queue.enqueue(geometry.scroller_box);
        self.queued = true;
    }

    /// True if the anchor or any ancestor up to the scroller had a style
    /// change that invalidates the saved offset.
    fn compute_scroll_anchor_disabling_style_changed(&self, layout: &LayoutTree) -> bool {
        let Some(anchor) = self.anchor_object else {
            return false;
        };
        let scroller_box = self.queue_key();
        let mut current = Some(anchor);
        while let Some(object) = current {
            if layout
                .get(object)
                .is_some_and(|layout_object| layout_object.scroll_anchor_disabling_style_changed())
            {
                return true;
            }
            if Some(object) == scroller_box {
                return false;
            }
            current = layout.parent(object);
        }
        false
    }

    /// Pick an anchor for the current scroll position.
    pub fn find_anchor(&mut self) {
        let Some(document) = self.document.upgrade() else {
            return;
        };
        let Ok(doc) = document.try_borrow() else {
            warn!("document busy; no scroll anchor chosen");
            return;
        };
        if let Some(geometry) = self.geometry(&doc.layout) {
            self.find_anchor_in(&doc, &geometry);
        }
    }

    fn find_anchor_in(&mut self, document: &Document, geometry: &ScrollerGeometry) {
        let _span = tracing::debug_span!("scroll_anchor.find_anchor", scroller = ?geometry.scroller_box).entered();
        self.anchor_object = None;
        if !self.find_anchor_in_priority_candidates(document, geometry) {
            self.find_anchor_recursive(&document.layout, geometry, geometry.scroller_box);
        }
        let Some(anchor) = self.anchor_object else {
            trace!("no scroll anchor in {:?}", geometry.scroller_box);
            return;
        };
        self.corner = geometry.corner();
        self.saved_relative_offset = geometry.relative_offset(&document.layout, anchor);
        self.anchor_is_cv_auto_without_layout = document
            .layout
            .get(anchor)
            .is_some_and(|object| object.content_visibility_auto_without_layout);
        debug!(
            "scroll anchor {anchor:?} at {:?} in {:?}",
            self.saved_relative_offset, geometry.scroller_box
        );
    }

    /// The editable focused element, then the active find-in-page match.
    fn find_anchor_in_priority_candidates(&mut self, document: &Document, geometry: &ScrollerGeometry) -> bool {
        let focused = document
            .focused_element()
            .filter(|node| document.dom.element(*node).is_some_and(|data| data.editable));
        for node in [focused, document.active_find_match()].into_iter().flatten() {
            let Some(candidate) = priority_candidate_from_node(document, node) else {
                continue;
            };
            if self
                .examine_priority_candidate(&document.layout, geometry, candidate)
                .is_viable()
            {
                self.anchor_object = Some(candidate);
                return true;
            }
        }
        false
    }

    fn examine_priority_candidate(
        &self,
        layout: &LayoutTree,
        geometry: &ScrollerGeometry,
        candidate: LayoutObjectId,
    ) -> WalkStatus {
        let mut ancestor = Some(candidate);
        while let Some(current) = ancestor.filter(|object| *object != geometry.scroller_box) {
            let Some(object) = layout.get(current) else {
                return WalkStatus::Skip;
            };
            if object.style().overflow_anchor == OverflowAnchor::None
                || !may_move_with_scroller(layout, current, geometry.scroller_box)
            {
                return WalkStatus::Skip;
            }
            ancestor = layout.container(current);
        }
        if ancestor.is_some() {
            self.examine(layout, geometry, candidate)
        } else {
            WalkStatus::Skip
        }
    }

    /// Classify `candidate` for the anchor walk.
    pub fn examine_candidate(&self, candidate: LayoutObjectId) -> WalkStatus {
        let Some(document) = self.document.upgrade() else {
            return WalkStatus::Skip;
        };
        let Ok(doc) = document.try_borrow() else {
            return WalkStatus::Skip;
        };
        self.geometry(&doc.layout)
            .map_or(WalkStatus::Skip, |geometry| self.examine(&doc.layout, &geometry, candidate))
    }

    fn examine(&self, layout: &LayoutTree, geometry: &ScrollerGeometry, candidate: LayoutObjectId) -> WalkStatus {
        if candidate == geometry.scroller_box {
            return WalkStatus::Continue;
        }
        let Some(object) = layout.get(candidate) else {
            return WalkStatus::Skip;
        };
        if object.style().overflow_anchor == OverflowAnchor::None {
            return WalkStatus::Skip;
        }
        // Inline boxes and anonymous boxes are hard to reason about as
        // anchors; their descendants are considered instead.
        if object.is_layout_inline() || object.is_anonymous() {
            return WalkStatus::Continue;
        }
        if !may_move_with_scroller(layout, candidate, geometry.scroller_box) {
            return WalkStatus::Skip;
        }

        let bounds = geometry.relative_bounds(layout, candidate);
        let occupies_space = bounds.width > 0.0 && bounds.height > 0.0;
        if occupies_space && geometry.snapport.intersects(&bounds) {
            if geometry.snapport.contains_rect(&bounds) {
                WalkStatus::Return
            } else {
                WalkStatus::Constrain
            }
        } else {
            WalkStatus::Skip
        }
    }

    fn find_anchor_recursive(&mut self, layout: &LayoutTree, geometry: &ScrollerGeometry, candidate: LayoutObjectId) -> bool {
        let status = self.examine(layout, geometry, candidate);
        if status.is_viable() {
            self.anchor_object = Some(candidate);
        }
        match status {
            WalkStatus::Return => return true,
            WalkStatus::Skip => return false,
            WalkStatus::Constrain | WalkStatus::Continue => {}
        }

        for child in children_in_visual_order(layout, candidate) {
            if self.find_anchor_recursive(layout, geometry, child) {
                return true;
            }
        }

        // Positioned descendants whose static parent was skipped above.
        let positioned: Vec<LayoutObjectId> = layout
            .descendants(candidate)
            .into_iter()
            .filter(|descendant| {
                layout.parent(*descendant) != Some(candidate)
                    && layout.container(*descendant) == Some(candidate)
                    && layout
                        .get(*descendant)
                        .is_some_and(|object| object.is_out_of_flow_positioned())
            })
            .collect();
        for descendant in positioned {
            if self.find_anchor_recursive(layout, geometry, descendant) {
                return true;
            }
        }
        // A partially visible candidate ends the walk when none of its
        // descendants did better.
        status == WalkStatus::Constrain
    }

    /// The scroll delta that puts the anchor back where it was, along the
    /// block axis only. Read-only: calling it twice gives the same result.
    pub fn compute_adjustment(&self) -> ScrollOffset {
        let Some(anchor) = self.anchor_object else {
            return ScrollOffset::ZERO;
        };
        let Some(document) = self.document.upgrade() else {
            return ScrollOffset::ZERO;
        };
        let Ok(doc) = document.try_borrow() else {
            return ScrollOffset::ZERO;
        };
        let Some(geometry) = self.geometry(&doc.layout) else {
            return ScrollOffset::ZERO;
        };
        self.compute_adjustment_in(&doc.layout, &geometry, anchor)
    }

    fn compute_adjustment_in(&self, layout: &LayoutTree, geometry: &ScrollerGeometry, anchor: LayoutObjectId) -> ScrollOffset {
        // The anchor paints pixel-snapped, so compare rounded positions:
        // 2.4 -> 2.6 is really 2 -> 3, a 1px move.
        let current = geometry.relative_offset(layout, anchor).rounded();
        let saved = self.saved_relative_offset.rounded();
        let writing_mode = geometry.writing_mode;
        let mut delta = writing_mode.block_axis_component(current - saved);

        if self.anchor_is_cv_auto_without_layout {
            // Keep an anchor that had no layout yet from being pushed out of
            // view before the start of the block axis.
            let rect = geometry
                .relative_bounds(layout, anchor)
                .translated(-geometry.snapport.origin().to_offset());
            if writing_mode.is_horizontal() {
                let moved = rect.translated(-delta);
                if moved.max_y() < 0.0 {
                    delta.y += moved.max_y().trunc();
                }
            } else if writing_mode.is_flipped_blocks() {
                let moved = rect.translated(ScrollOffset::new(delta.x, 0.0));
                if moved.x > geometry.snapport.width {
                    delta.x -= moved.x.trunc() - geometry.snapport.width.trunc();
                }
            } else {
                let moved = rect.translated(-delta);
                if moved.max_x() < 0.0 {
                    delta.x += moved.max_x().trunc();
                }
            }
        }
        geometry.to_physical(delta)
    }

    /// Apply the adjustment queued by [`Self::notify_before_layout`].
    pub fn adjust(&mut self) {
        if !self.queued {
            return;
        }
        self.queued = false;
        if self.anchor_object.is_none() {
            return;
        }
        let adjustment = self.compute_adjustment();
        // A content-visibility:auto anchor has now been laid out; choose
        // again next time.
        if self.anchor_is_cv_auto_without_layout {
            self.clear_self();
        }
        if adjustment.is_zero() {
            return;
        }
        if self.scroll_anchor_disabling_style_changed {
            // Only cleared when the adjustment would have been non-zero.
            self.clear_self();
            return;
        }
        let Some(scroller) = self.scroller.as_ref().map(Rc::clone) else {
            return;
        };
        let new_offset = scroller.borrow().scroll_offset() + adjustment;
        let _span = tracing::debug_span!("scroll_anchor.adjust", ?adjustment).entered();
        debug!("anchoring adjustment {adjustment:?} to {new_offset:?}");
        scroller
            .borrow_mut()
            .set_scroll_offset(new_offset, ScrollType::Anchoring, ScrollBehavior::Instant, None);
        self.adjustment_count += 1;
    }

    /// The anchor in a form that can be restored after navigation. Chooses
    /// an anchor first if there is none. Invalid when no anchor is found or
    /// the anchor node cannot be reached by a selector.
    pub fn get_serialized_anchor(&mut self) -> SerializedAnchor {
        let Some(document) = self.document.upgrade() else {
            return SerializedAnchor::default();
        };
        let Ok(doc) = document.try_borrow() else {
            return SerializedAnchor::default();
        };
        let Some(geometry) = self.geometry(&doc.layout) else {
            return SerializedAnchor::default();
        };

        // Clearing the anchor also clears the saved selector.
        if let Some(anchor) = self.anchor_object.filter(|_| !self.saved_selector.is_empty()) {
            return SerializedAnchor::new(self.saved_selector.clone(), geometry.relative_offset(&doc.layout, anchor));
        }
        if self.anchor_object.is_none() {
            self.find_anchor_in(&doc, &geometry);
        }
        let Some(anchor) = self.anchor_object else {
            return SerializedAnchor::default();
        };
        let selector = doc
            .layout
            .get(anchor)
            .and_then(|object| object.node())
            .and_then(|node| compute_unique_selector(&doc.dom, node, self.max_selector_length))
            .unwrap_or_default();
        let serialized = SerializedAnchor::new(selector, geometry.relative_offset(&doc.layout, anchor));
        if serialized.is_valid() {
            self.saved_selector.clone_from(&serialized.selector);
        }
        serialized
    }

    /// Scroll so the node `serialized` names sits at its saved relative
    /// offset, and anchor to it.
    ///
    /// Each match of the selector is tried in turn; the scroll position is
    /// rolled back after a match where no anchor could be found. Returns
    /// false when nothing could be restored.
    pub fn restore_anchor(&mut self, serialized: &SerializedAnchor) -> bool {
        let Some(scroller) = self.scroller.as_ref().map(Rc::clone) else {
            return false;
        };
        if !serialized.is_valid() {
            return false;
        }
        if self.anchor_object.is_some() {
            return serialized.selector == self.saved_selector;
        }
        let Some(document) = self.document.upgrade() else {
            return false;
        };
        let _span = tracing::debug_span!("scroll_anchor.restore", selector = %serialized.selector).entered();

        let matches = match document.try_borrow() {
            Ok(doc) => match query_selector_all(&doc.dom, &serialized.selector) {
                Ok(matches) => matches,
                Err(error) => {
                    debug!("cannot restore scroll anchor: {error:#}");
                    return false;
                }
            },
            Err(_) => return false,
        };

        let saved = serialized.relative_offset.rounded();
        for element in matches {
            let Some(delta) = self.restore_delta(&document, element, saved) else {
                continue;
            };
            let current_offset = scroller.borrow().scroll_offset();
            scroller.borrow_mut().set_scroll_offset(
                current_offset + delta,
                ScrollType::Anchoring,
                ScrollBehavior::Instant,
                None,
            );
            self.find_anchor();
            if self.anchor_object.is_none() {
                scroller.borrow_mut().set_scroll_offset(
                    current_offset,
                    ScrollType::Anchoring,
                    ScrollBehavior::Instant,
                    None,
                );
                continue;
            }
            self.saved_selector.clone_from(&serialized.selector);
            return true;
        }
        false
    }

    /// The physical scroll delta that moves `element`'s layout object to
    /// `saved` relative to the snapport.
    fn restore_delta(&self, document: &Rc<RefCell<Document>>, element: DomNodeId, saved: PointF) -> Option<ScrollOffset> {
        let doc = document.try_borrow().ok()?;
        let object = doc.dom.layout_object(element)?;
        let geometry = self.geometry(&doc.layout)?;
        let current = geometry.relative_offset(&doc.layout, object);
        Some(geometry.to_physical(current - saved))
    }
}

/// The nearest layout object at or above `node` in the flat tree that can
/// anchor: not anonymous and not a non-atomic inline.
fn priority_candidate_from_node(document: &Document, node: DomNodeId) -> Option<LayoutObjectId> {
    let mut current = Some(node);
    while let Some(ancestor) = current {
        let candidate = document
            .dom
            .layout_object(ancestor)
            .filter(|object| {
                document
                    .layout
                    .get(*object)
                    .is_some_and(|layout_object| !layout_object.is_anonymous() && !layout_object.is_inline_non_atomic())
            });
        if candidate.is_some() {
            return candidate;
        }
        current = document.dom.flat_tree_parent(ancestor);
    }
    None
}

/// Children of `object` in the order the walk visits them. A multi-column
/// container's flow-thread contents are visited column by column.
fn children_in_visual_order(layout: &LayoutTree, object: LayoutObjectId) -> Vec<LayoutObjectId> {
    let columns = layout.get(object).and_then(|layout_object| layout_object.column_layout());
    let Some(columns) = columns else {
        return layout.children(object).collect();
    };
    let mut children: Vec<LayoutObjectId> = layout
        .children(object)
        .flat_map(|flow_thread| layout.children(flow_thread).collect::<Vec<_>>())
        .collect();
    children.sort_by(|first, second| {
        let key = |child: &LayoutObjectId| {
            layout
                .get(*child)
                .map_or((0, 0.0), |object| (columns.column_at(object.location.y), object.location.y))
        };
        let (first_column, first_y) = key(first);
        let (second_column, second_y) = key(second);
        first_column
            .cmp(&second_column)
            .then(first_y.total_cmp(&second_y))
    });
    children
}
