//! The frame view drives one document through the rendering pipeline.
//!
//! It owns the document lifecycle, the viewports and element scrollers with
//! their scroll anchors, the paint layer tree and the property trees.
//! [`FrameView::update_style_and_layout`] and
//! [`FrameView::update_all_lifecycle_phases`] advance the lifecycle one
//! phase at a time, calling into a [`LayoutEngine`] for style and layout.

use crate::config::PipelineConfig;
use crate::engine::{LayoutEngine, StyleChange};
use crate::history::HistoryItem;
use crate::presentation::{PresentationCallback, PresentationCallbacks};
use anyhow::{Context as _, Result, anyhow, bail};
use core::cell::{Ref, RefCell, RefMut};
use core::iter;
use log::{debug, info, trace, warn};
use std::rc::Rc;
use std::time::Instant;
use strata_geometry::{ClipRect, PointF, ScrollOffset, SizeF};
use strata_layout_tree::{Document, LayoutObject, LayoutObjectId, LayoutTree};
use strata_lifecycle::{DetachScope, DocumentLifecycle, LifecycleState};
use strata_paint::{
    ClipRectsContext, PaintLayerClipper, PaintLayerTree, PaintStep, PrePaintTreeBuilder, paint_sequence,
};
use strata_property_trees::{ClipNodeId, EffectNodeId, PropertyTreeState, PropertyTrees, TransformNodeId};
use strata_scroll::{
    BoxScroller, RootFrameViewport, ScrollAnimator, ScrollEventQueue, ScrollGranularity, ScrollResult,
    ScrollableArea, SmoothScrollSequencer, ViewportEvent, VisualViewport, service_scroll_animation,
};
use strata_scroll_anchor::{AnchoringAdjustmentQueue, ScrollAnchor, SerializedAnchor};

/// One entry of the frame's paint output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintChunk {
    pub step: PaintStep,
    pub fragment_index: u32,
    /// Border-box origin of the fragment in the root layer's space.
    pub layer_offset: PointF,
    /// The foreground rect for a layer, the background rect for its
    /// overlay overflow controls.
    pub clip: ClipRect,
}

struct ElementScroller {
    object: LayoutObjectId,
    area: Rc<RefCell<BoxScroller>>,
    anchor: ScrollAnchor,
}

pub struct FrameView<E> {
    config: PipelineConfig,
    engine: E,
    document: Rc<RefCell<Document>>,
    view: LayoutObjectId,
    lifecycle: DocumentLifecycle,
    events: ScrollEventQueue,
    sequencer: Rc<RefCell<SmoothScrollSequencer>>,
    layout_viewport: Rc<RefCell<BoxScroller>>,
    visual_viewport: Rc<RefCell<VisualViewport>>,
    root_viewport: Rc<RefCell<RootFrameViewport>>,
    root_anchor: ScrollAnchor,
    /// Element scrollers in creation order, which is also the order their
    /// anchors are notified in.
    scrollers: Vec<ElementScroller>,
    anchoring_queue: AnchoringAdjustmentQueue,
    layers: PaintLayerTree,
    properties: PropertyTrees,
    paint_chunks: Vec<PaintChunk>,
    presentation: PresentationCallbacks,
}

fn configure_animator(area: &mut dyn ScrollableArea, duration_ms: u64) {
    let animator = area.animator_mut();
    let offset = animator.current_offset();
    *animator = ScrollAnimator::new(duration_ms);
    animator.set_current_offset(offset);
}

fn configure_box_scroller(
    scroller: &mut BoxScroller,
    config: &PipelineConfig,
    sequencer: &Rc<RefCell<SmoothScrollSequencer>>,
) {
    scroller.set_allow_fractional_scroll_offsets(config.fractional_scroll_offsets);
    scroller.set_smooth_scroll_sequencer(Some(Rc::clone(sequencer)));
    configure_animator(scroller, config.smooth_scroll_duration_ms);
}

impl<E: LayoutEngine> FrameView<E> {
    /// Take over `document` and activate its lifecycle with a visual update
    /// pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the document's view cannot host the layout
    /// viewport or the initial paint layer tree cannot be built.
    pub fn new(document: Document, viewport_size: SizeF, engine: E, config: PipelineConfig) -> Result<Self> {
        let view = document.layout.view();
        let view_size = document.layout.object(view)?.size;
        let layers = PaintLayerTree::build_from_layout_tree(&document.layout)?;
        let document = Rc::new(RefCell::new(document));

        let events = ScrollEventQueue::new();
        let sequencer = SmoothScrollSequencer::new();
        let layout_viewport = BoxScroller::layout_viewport(&document, events.clone())?;
        configure_box_scroller(&mut layout_viewport.borrow_mut(), &config, &sequencer);

        let visual_viewport = VisualViewport::new(viewport_size, events.clone());
        {
            let mut visual = visual_viewport.borrow_mut();
            visual.set_contents_size(view_size);
            visual.set_smooth_scroll_sequencer(Some(Rc::clone(&sequencer)));
            configure_animator(&mut *visual, config.smooth_scroll_duration_ms);
        }

        let layout_area: Rc<RefCell<dyn ScrollableArea>> = Rc::<RefCell<BoxScroller>>::clone(&layout_viewport);
        let root_viewport = RootFrameViewport::new(Rc::clone(&visual_viewport), layout_area);
        {
            let mut root = root_viewport.borrow_mut();
            root.set_allow_fractional_scroll_offsets(config.fractional_scroll_offsets);
            root.set_smooth_scroll_sequencer(Some(Rc::clone(&sequencer)));
            configure_animator(&mut *root, config.smooth_scroll_duration_ms);
        }

        let anchoring_queue = AnchoringAdjustmentQueue::new();
        let root_area: Rc<RefCell<dyn ScrollableArea>> = Rc::<RefCell<RootFrameViewport>>::clone(&root_viewport);
        let mut root_anchor = ScrollAnchor::new(root_area, &document, anchoring_queue.clone());
        root_anchor.set_max_selector_length(config.scroll_anchor_max_selector_len);

        let lifecycle = DocumentLifecycle::new();
        lifecycle.advance_to(LifecycleState::Inactive);
        lifecycle.advance_to(LifecycleState::StyleClean);
        lifecycle.ensure_state_at_most(LifecycleState::VisualUpdatePending);
        // Setting up the viewports is not a scroll the embedder should see.
        drop(events.take());

        info!(
            "frame view {}x{} over a {}x{} view, {} paint layers",
            viewport_size.width,
            viewport_size.height,
            view_size.width,
            view_size.height,
            layers.len()
        );
        Ok(Self {
            config,
            engine,
            document,
            view,
            lifecycle,
            events,
            sequencer,
            layout_viewport,
            visual_viewport,
            root_viewport,
            root_anchor,
            scrollers: Vec::new(),
            anchoring_queue,
            layers,
            properties: PropertyTrees::new(),
            paint_chunks: Vec::new(),
            presentation: PresentationCallbacks::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn lifecycle(&self) -> &DocumentLifecycle {
        &self.lifecycle
    }

    pub fn document(&self) -> &Rc<RefCell<Document>> {
        &self.document
    }

    /// # Errors
    ///
    /// Returns an error while the document is mutably borrowed.
    pub fn document_ref(&self) -> Result<Ref<'_, Document>> {
        self.document.try_borrow().map_err(|_| anyhow!("document is busy"))
    }

    /// Borrow the document for a DOM or layout mutation.
    ///
    /// Callers that change style or geometry should follow up with
    /// [`Self::schedule_visual_update`].
    ///
    /// # Errors
    ///
    /// Returns an error while the document is borrowed.
    pub fn document_mut(&self) -> Result<RefMut<'_, Document>> {
        self.document.try_borrow_mut().map_err(|_| anyhow!("document is busy"))
    }

    pub fn layout_viewport(&self) -> &Rc<RefCell<BoxScroller>> {
        &self.layout_viewport
    }

    pub fn visual_viewport(&self) -> &Rc<RefCell<VisualViewport>> {
        &self.visual_viewport
    }

    pub fn root_frame_viewport(&self) -> &Rc<RefCell<RootFrameViewport>> {
        &self.root_viewport
    }

    pub fn root_scroll_anchor(&self) -> &ScrollAnchor {
        &self.root_anchor
    }

    /// The anchor of `object`'s scroller; the view answers with the root
    /// anchor.
    pub fn scroll_anchor(&self, object: LayoutObjectId) -> Option<&ScrollAnchor> {
        if object == self.view {
            return Some(&self.root_anchor);
        }
        self.scrollers
            .iter()
            .find(|scroller| scroller.object == object)
            .map(|scroller| &scroller.anchor)
    }

    pub fn paint_layers(&self) -> &PaintLayerTree {
        &self.layers
    }

    pub fn property_trees(&self) -> &PropertyTrees {
        &self.properties
    }

    /// What the last paint produced, back to front.
    pub fn paint_chunks(&self) -> &[PaintChunk] {
        &self.paint_chunks
    }

    pub fn presentation_callbacks(&self) -> &PresentationCallbacks {
        &self.presentation
    }

    /// Scroll and resize notifications since the last call.
    pub fn take_scroll_events(&self) -> Vec<ViewportEvent> {
        self.events.take()
    }

    /// Mark the frame as needing style, layout and paint again.
    ///
    /// Ignored while a phase is running; that phase's results are already
    /// going to be recomputed by the update that is in progress.
    pub fn schedule_visual_update(&self) {
        let state = self.lifecycle.state();
        if !self.lifecycle.is_active() || !state.is_settled() {
            trace!("not scheduling a visual update during {state}");
            return;
        }
        self.lifecycle.ensure_state_at_most(LifecycleState::VisualUpdatePending);
    }

    /// The scroller of `object`, created on first use. The view answers
    /// with the layout viewport.
    ///
    /// # Errors
    ///
    /// Returns an error if `object` is not a scroll container.
    pub fn ensure_scroller(&mut self, object: LayoutObjectId) -> Result<Rc<RefCell<BoxScroller>>> {
        if object == self.view {
            return Ok(Rc::clone(&self.layout_viewport));
        }
        if let Some(existing) = self.scrollers.iter().find(|scroller| scroller.object == object) {
            return Ok(Rc::clone(&existing.area));
        }
        let area = BoxScroller::new(&self.document, object, self.events.clone())?;
        configure_box_scroller(&mut area.borrow_mut(), &self.config, &self.sequencer);
        let anchor_area: Rc<RefCell<dyn ScrollableArea>> = Rc::<RefCell<BoxScroller>>::clone(&area);
        let mut anchor = ScrollAnchor::new(anchor_area, &self.document, self.anchoring_queue.clone());
        anchor.set_max_selector_length(self.config.scroll_anchor_max_selector_len);
        debug!("created scroller for {object:?}");
        self.scrollers.push(ElementScroller {
            object,
            area: Rc::clone(&area),
            anchor,
        });
        Ok(area)
    }

    fn dispose_scroller(&mut self, object: LayoutObjectId) {
        let Some(index) = self.scrollers.iter().position(|scroller| scroller.object == object) else {
            return;
        };
        let mut scroller = self.scrollers.remove(index);
        scroller.anchor.dispose();
        debug!("disposed scroller for {object:?}");
    }

    /// Detach `object` and its layout subtree.
    ///
    /// Every anchor pointing into the subtree is cleared, scrollers owned
    /// by removed objects are disposed and their paint layers destroyed.
    ///
    /// # Errors
    ///
    /// Returns an error if the lifecycle does not allow detaching right
    /// now, the document is busy, or `object` is the view or stale.
    pub fn detach_layout_subtree(&mut self, object: LayoutObjectId) -> Result<Vec<LayoutObjectId>> {
        if !self.lifecycle.state_allows_detach() {
            bail!("cannot detach layout objects during {}", self.lifecycle.state());
        }
        let removed = {
            let _detach = DetachScope::new(&self.lifecycle);
            let mut doc = self.document.try_borrow_mut().map_err(|_| anyhow!("document is busy"))?;
            let removed = doc.detach_layout_subtree(object)?;
            self.layers.remove_layers_for_removed_objects(&doc.layout, &removed);
            removed
        };
        for &id in &removed {
            self.root_anchor.notify_removed(id);
            for scroller in &mut self.scrollers {
                scroller.anchor.notify_removed(id);
            }
            self.dispose_scroller(id);
        }
        debug!("detached {} layout objects under {object:?}", removed.len());
        self.schedule_visual_update();
        Ok(removed)
    }

    /// Run style recalc and layout if they are dirty.
    ///
    /// Anchors are chosen before layout and their scrollers adjusted after
    /// it, before offsets are clamped to the new scroll extents.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not active or an engine phase
    /// fails. A failed style recalc leaves a visual update pending.
    pub fn update_style_and_layout(&mut self) -> Result<()> {
        let state = self.lifecycle.state();
        if !self.lifecycle.is_active() {
            bail!("cannot update an inactive document ({state})");
        }
        if state >= LifecycleState::LayoutClean {
            return Ok(());
        }
        let _span = tracing::info_span!("update_style_and_layout", from = state.as_str()).entered();
        if state < LifecycleState::StyleClean {
            self.update_style()?;
        }
        if self.config.scroll_anchoring {
            self.notify_scroll_anchors_before_layout();
        }
        self.update_layout()?;
        self.perform_post_layout_tasks();
        self.lifecycle.advance_to(LifecycleState::LayoutClean);
        Ok(())
    }

    fn update_style(&mut self) -> Result<()> {
        let document = Rc::clone(&self.document);
        let mut doc = document.try_borrow_mut().map_err(|_| anyhow!("document is busy"))?;
        self.lifecycle.advance_to(LifecycleState::InStyleRecalc);
        let changes = self.engine.recalc_style(&mut doc);
        self.lifecycle.advance_to(LifecycleState::StyleClean);
        let changes = match changes {
            Ok(changes) => changes,
            Err(error) => {
                self.lifecycle.ensure_state_at_most(LifecycleState::VisualUpdatePending);
                return Err(error.context("style recalc failed"));
            }
        };
        trace!("style recalc changed {} objects", changes.len());
        let (created, gone) = self.apply_style_changes(&doc.layout, &changes);
        drop(doc);
        for object in gone {
            self.dispose_scroller(object);
        }
        for object in created {
            self.ensure_scroller(object)?;
        }
        Ok(())
    }

    /// Update paint layers for restyled objects. Returns the objects that
    /// became scroll containers and the ones that stopped being one.
    fn apply_style_changes(
        &mut self,
        layout: &LayoutTree,
        changes: &[StyleChange],
    ) -> (Vec<LayoutObjectId>, Vec<LayoutObjectId>) {
        let mut created = Vec::new();
        let mut gone = Vec::new();
        for change in changes {
            match self.layers.update_layer_for_object(layout, change.object) {
                Ok(Some(layer)) => {
                    if self.layers.style_did_change(layout, layer, change.old_style.as_ref()) {
                        trace!("restyle of {:?} dirtied z-order lists", change.object);
                    }
                }
                Ok(None) => {}
                Err(error) => warn!("paint layer for {:?} not updated: {error:#}", change.object),
            }
            if change.object == self.view {
                continue;
            }
            let scrolls = layout.get(change.object).is_some_and(LayoutObject::is_scroll_container);
            let has_scroller = self.scrollers.iter().any(|scroller| scroller.object == change.object);
            if scrolls && !has_scroller {
                created.push(change.object);
            } else if !scrolls && has_scroller {
                gone.push(change.object);
            }
        }
        (created, gone)
    }

    fn notify_scroll_anchors_before_layout(&mut self) {
        let _span = tracing::debug_span!("notify_scroll_anchors_before_layout").entered();
        self.root_anchor.notify_before_layout();
        for scroller in &mut self.scrollers {
            scroller.anchor.notify_before_layout();
        }
    }

    fn update_layout(&mut self) -> Result<()> {
        let document = Rc::clone(&self.document);
        let mut doc = document.try_borrow_mut().map_err(|_| anyhow!("document is busy"))?;
        self.lifecycle.advance_to(LifecycleState::InPerformLayout);
        let result = self.engine.perform_layout(&mut doc);
        self.lifecycle.advance_to(LifecycleState::AfterPerformLayout);
        result.context("layout failed")
    }

    fn perform_post_layout_tasks(&mut self) {
        let view_size = self
            .document
            .try_borrow()
            .ok()
            .and_then(|doc| doc.layout.get(self.view).map(|view| view.size));
        if let Some(size) = view_size {
            self.visual_viewport.borrow_mut().set_contents_size(size);
        }
        if self.config.scroll_anchoring {
            self.perform_scroll_anchoring_adjustments();
        }
        self.layout_viewport.borrow_mut().clamp_after_layout();
        for scroller in &self.scrollers {
            scroller.area.borrow_mut().clamp_after_layout();
        }
        self.visual_viewport.borrow_mut().clamp_to_boundaries();
        if let Ok(mut doc) = self.document.try_borrow_mut() {
            doc.layout.clear_scroll_anchor_disabling_style_changes();
        }
        if self.root_viewport.borrow_mut().apply_pending_history_restore_scroll_offset() {
            debug!("applied the pending history scroll offset");
        }
    }

    /// Let every anchor that was queued before layout adjust its scroller.
    pub fn perform_scroll_anchoring_adjustments(&mut self) {
        let pending = self.anchoring_queue.take();
        if pending.is_empty() {
            return;
        }
        let _span = tracing::debug_span!("perform_scroll_anchoring_adjustments", count = pending.len()).entered();
        for key in pending {
            if key == self.view {
                self.root_anchor.adjust();
                continue;
            }
            match self.scrollers.iter_mut().find(|scroller| scroller.object == key) {
                Some(scroller) => scroller.anchor.adjust(),
                None => trace!("scroller {key:?} went away before its adjustment"),
            }
        }
    }

    /// Drop the anchors of `object`'s scroller and of every scroller that
    /// encloses it. A scroll inside a nested scroller moves content that
    /// the outer anchors were measured against.
    pub fn clear_scroll_anchors_from(&mut self, object: LayoutObjectId) {
        let chain: Vec<LayoutObjectId> = {
            let Ok(doc) = self.document.try_borrow() else {
                warn!("document is busy, scroll anchors under {object:?} were not cleared");
                return;
            };
            let layout = &doc.layout;
            let first = layout
                .get(object)
                .filter(|candidate| candidate.is_scroll_container())
                .map(|_| object)
                .or_else(|| layout.enclosing_scroll_container(object));
            iter::successors(first, |&id| layout.enclosing_scroll_container(id)).collect()
        };
        for id in chain {
            if id == self.view {
                self.root_anchor.clear_self();
            } else if let Some(scroller) = self.scrollers.iter_mut().find(|scroller| scroller.object == id) {
                scroller.anchor.clear_self();
            }
        }
    }

    /// Scroll `object`'s scroller by a user gesture. The view scrolls the
    /// root frame viewport.
    ///
    /// # Errors
    ///
    /// Returns an error if `object` is not a scroll container.
    pub fn user_scroll(
        &mut self,
        object: LayoutObjectId,
        granularity: ScrollGranularity,
        delta: ScrollOffset,
    ) -> Result<ScrollResult> {
        let area: Rc<RefCell<dyn ScrollableArea>> = if object == self.view {
            Rc::<RefCell<RootFrameViewport>>::clone(&self.root_viewport)
        } else {
            self.ensure_scroller(object)?
        };
        let result = area.borrow_mut().user_scroll(granularity, delta, None);
        if result.did_scroll_x || result.did_scroll_y {
            self.clear_scroll_anchors_from(object);
        }
        Ok(result)
    }

    /// Bring every lifecycle phase up to date, ending in `PaintClean`.
    ///
    /// # Errors
    ///
    /// Returns an error if style or layout fails or the document is busy.
    pub fn update_all_lifecycle_phases(&mut self) -> Result<()> {
        self.update_style_and_layout()?;
        let state = self.lifecycle.state();
        if state >= LifecycleState::PaintClean {
            return Ok(());
        }
        let _span = tracing::info_span!("update_all_lifecycle_phases", from = state.as_str()).entered();
        let document = Rc::clone(&self.document);
        let doc = document.try_borrow().map_err(|_| anyhow!("document is busy"))?;
        if state < LifecycleState::CompositingInputsClean {
            self.update_compositing_inputs(&doc);
        }
        if state < LifecycleState::PrePaintClean {
            self.pre_paint(&doc.layout);
        }
        self.paint(&doc.layout);
        Ok(())
    }

    fn update_compositing_inputs(&mut self, doc: &Document) {
        self.lifecycle.advance_to(LifecycleState::InCompositingInputsUpdate);
        if self.layers.root().is_none() {
            match PaintLayerTree::build_from_layout_tree(&doc.layout) {
                Ok(layers) => self.layers = layers,
                Err(error) => warn!("paint layer tree not rebuilt: {error:#}"),
            }
        }
        self.layers.update_descendant_dependent_flags(&doc.layout);
        self.layers.update_z_order_lists(&doc.layout, &doc.top_layer_objects());
        self.lifecycle.advance_to(LifecycleState::CompositingInputsClean);
    }

    fn pre_paint(&mut self, layout: &LayoutTree) {
        self.lifecycle.advance_to(LifecycleState::InPrePaint);
        self.properties.clear();
        let contents = self
            .visual_viewport
            .borrow_mut()
            .update_paint_property_nodes(&mut self.properties, TransformNodeId::ROOT);
        let root_state = PropertyTreeState::new(contents, ClipNodeId::ROOT, EffectNodeId::ROOT);
        PrePaintTreeBuilder::new(layout, &mut self.properties).update(&mut self.layers, root_state);
        self.lifecycle.advance_to(LifecycleState::PrePaintClean);
    }

    fn paint(&mut self, layout: &LayoutTree) {
        self.lifecycle.advance_to(LifecycleState::InPaint);
        self.paint_chunks = self.collect_paint_chunks(layout);
        if let Some(root) = self.layers.root() {
            for layer in self.layers.descendants(root) {
                if let Some(paint_layer) = self.layers.get_mut(layer) {
                    paint_layer.clear_needs_repaint();
                }
            }
        }
        debug!("painted {} chunks", self.paint_chunks.len());
        self.lifecycle.advance_to(LifecycleState::PaintClean);
    }

    fn collect_paint_chunks(&self, layout: &LayoutTree) -> Vec<PaintChunk> {
        let Some(root) = self.layers.root() else {
            return Vec::new();
        };
        let Some(context) = ClipRectsContext::for_layer(&self.layers, root) else {
            warn!("root paint layer has no fragment, nothing painted");
            return Vec::new();
        };
        let mut chunks = Vec::new();
        for step in paint_sequence(&self.layers, layout, root) {
            let layer = step.layer();
            let Some(paint_layer) = self.layers.get(layer) else {
                continue;
            };
            let clipper = PaintLayerClipper::new(&self.layers, layout, &self.properties, layer);
            for fragment in paint_layer.fragments() {
                let Some(rects) = clipper.calculate_rects(&context, fragment) else {
                    warn!("no clip rects for {layer:?} fragment {}", fragment.fragment_index);
                    continue;
                };
                let clip = match step {
                    PaintStep::Layer(_) => rects.foreground_rect_for_phase(false),
                    PaintStep::OverlayOverflowControls(_) => rects.background_rect,
                };
                chunks.push(PaintChunk {
                    step,
                    fragment_index: fragment.fragment_index,
                    layer_offset: rects.layer_offset,
                    clip,
                });
            }
        }
        chunks
    }

    /// Queue `callback` for the next presented frame. Returns whether this
    /// registered a new presentation request with the compositor.
    pub fn request_presentation_callback(&mut self, callback: PresentationCallback) -> bool {
        self.presentation.request(callback)
    }

    /// The compositor presented a frame at `time`; run the queued
    /// callbacks in request order. Returns how many ran.
    pub fn did_present_frame(&mut self, time: Instant) -> usize {
        self.presentation.did_present(time)
    }

    /// Serialize the frame's scroll position for a history entry.
    ///
    /// # Errors
    ///
    /// Returns an error if a viewport is busy or serialization fails.
    pub fn save_view_state(&mut self) -> Result<String> {
        let view_state = self
            .root_viewport
            .try_borrow()
            .map_err(|_| anyhow!("root frame viewport is busy"))?
            .view_state();
        let scroll_anchor = self
            .config
            .scroll_anchoring
            .then(|| self.root_anchor.get_serialized_anchor())
            .filter(SerializedAnchor::is_valid);
        HistoryItem {
            view_state,
            scroll_anchor,
        }
        .to_json()
    }

    /// Restore a position saved by [`Self::save_view_state`].
    ///
    /// A serialized anchor that still matches the document wins and is
    /// applied at once. Otherwise the offsets are restored after the next
    /// layout, or right away when layout is already clean. Returns false
    /// for unparseable input.
    pub fn restore_view_state(&mut self, json: &str) -> bool {
        let item = match HistoryItem::from_json(json) {
            Ok(item) => item,
            Err(error) => {
                debug!("not restoring view state: {error:#}");
                return false;
            }
        };
        let anchored = self.config.scroll_anchoring
            && item
                .scroll_anchor
                .as_ref()
                .is_some_and(|serialized| self.root_anchor.restore_anchor(serialized));
        if anchored {
            debug!("restored history position from its scroll anchor");
            return true;
        }
        let mut root = self.root_viewport.borrow_mut();
        root.set_pending_history_restore_scroll_offset(item.view_state);
        if self.lifecycle.state() >= LifecycleState::LayoutClean {
            root.apply_pending_history_restore_scroll_offset();
        }
        true
    }

    /// Advance every running scroll animation by one configured step and
    /// start the next queued smooth scroll when none is running. Returns
    /// whether anything is still animating.
    pub fn service_scroll_animations(&mut self) -> bool {
        let step = self.config.smooth_scroll_step_ms;
        let mut areas: Vec<Rc<RefCell<dyn ScrollableArea>>> = Vec::with_capacity(self.scrollers.len() + 3);
        areas.push(Rc::<RefCell<RootFrameViewport>>::clone(&self.root_viewport));
        areas.push(Rc::<RefCell<VisualViewport>>::clone(&self.visual_viewport));
        areas.push(Rc::<RefCell<BoxScroller>>::clone(&self.layout_viewport));
        for scroller in &self.scrollers {
            areas.push(Rc::<RefCell<BoxScroller>>::clone(&scroller.area));
        }

        let mut animating = false;
        for area in &areas {
            animating |= service_scroll_animation(area, step);
        }
        let start_queued = {
            let sequencer = self.sequencer.borrow();
            !sequencer.is_running() && !sequencer.is_empty()
        };
        if start_queued {
            SmoothScrollSequencer::run_queued_animations(&self.sequencer);
            animating = true;
        }
        animating
    }
}
