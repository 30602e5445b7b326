//! Z-order lists of a stacking context.
//!
//! Stacked descendants of a stacking context are collected into a
//! negative and a positive list, each stably sorted by effective z-index so
//! that layers with equal z-index keep tree order (CSS 2.2 Appendix E).
//! Top-layer elements are appended to the root's positive list after
//! sorting, so they paint above everything else.

use crate::layer::PaintLayerId;
use crate::tree::PaintLayerTree;
use log::{trace, warn};
use smallvec::SmallVec;
use std::collections::HashMap;
use strata_layout_tree::{LayoutObject, LayoutObjectId, LayoutTree, Position};

/// Stacking order owned by a layer whose object is a stacking context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaintLayerStackingNode {
    pos_z_order_list: Vec<PaintLayerId>,
    neg_z_order_list: Vec<PaintLayerId>,
    z_order_lists_dirty: bool,
    /// Stacked layer -> scrollers whose overlay overflow controls paint
    /// right after it.
    overlay_overflow_controls_painting_after: HashMap<PaintLayerId, SmallVec<PaintLayerId, 2>>,
}

impl Default for PaintLayerStackingNode {
    fn default() -> Self {
        Self::new()
    }
}

impl PaintLayerStackingNode {
    /// A node whose lists still have to be built.
    pub fn new() -> Self {
        Self {
            pos_z_order_list: Vec::new(),
            neg_z_order_list: Vec::new(),
            z_order_lists_dirty: true,
            overlay_overflow_controls_painting_after: HashMap::new(),
        }
    }

    /// Stacked layers with z-index >= 0, back to front.
    pub fn pos_z_order_list(&self) -> &[PaintLayerId] {
        &self.pos_z_order_list
    }

    /// Stacked layers with negative z-index, back to front.
    pub fn neg_z_order_list(&self) -> &[PaintLayerId] {
        &self.neg_z_order_list
    }

    #[inline]
    pub fn z_order_lists_dirty(&self) -> bool {
        self.z_order_lists_dirty
    }

    pub fn dirty_z_order_lists(&mut self) {
        self.pos_z_order_list.clear();
        self.neg_z_order_list.clear();
        self.overlay_overflow_controls_painting_after.clear();
        self.z_order_lists_dirty = true;
    }

    /// Scrollers whose overlay overflow controls must paint directly after
    /// `layer`.
    pub fn layers_painting_overlay_overflow_controls_after(
        &self,
        layer: PaintLayerId,
    ) -> Option<&[PaintLayerId]> {
        self.overlay_overflow_controls_painting_after
            .get(&layer)
            .map(SmallVec::as_slice)
    }

    /// Rebuild both lists from the layers under `owner`.
    ///
    /// Returns the new reorder bit of every layer visited, in visiting
    /// order; the tree applies them once the node is back in place.
    pub(crate) fn rebuild_z_order_lists(
        &mut self,
        tree: &PaintLayerTree,
        layout: &LayoutTree,
        owner: PaintLayerId,
        top_layer: &[LayoutObjectId],
    ) -> Vec<(PaintLayerId, bool)> {
        let _span = tracing::debug_span!("rebuild_z_order_lists", ?owner).entered();
        let mut collector = ZOrderCollector {
            tree,
            layout,
            pos: Vec::new(),
            neg: Vec::new(),
            sequence: 0,
            painting_after: HashMap::new(),
            reorder: Vec::new(),
        };
        for child in tree.children(owner) {
            collector.collect(child, None);
        }

        collector.pos.sort_by_key(|entry| entry.z_index);
        collector.neg.sort_by_key(|entry| entry.z_index);
        self.pos_z_order_list = collector.pos.iter().map(|entry| entry.layer).collect();
        self.neg_z_order_list = collector.neg.iter().map(|entry| entry.layer).collect();

        if tree.get(owner).is_some_and(|layer| layer.is_root_layer()) {
            self.append_top_layer(tree, layout, top_layer);
        }

        self.overlay_overflow_controls_painting_after = collector.painting_after;
        self.z_order_lists_dirty = false;
        trace!(
            "{owner:?}: {} negative, {} positive z-order layers",
            self.neg_z_order_list.len(),
            self.pos_z_order_list.len()
        );
        collector.reorder
    }

    fn append_top_layer(&mut self, tree: &PaintLayerTree, layout: &LayoutTree, top_layer: &[LayoutObjectId]) {
        // A paginated view moves everything, top layer included, into its
        // flow thread.
        let view = layout.view();
        let root_block = layout
            .children(view)
            .find(|child| layout.get(*child).is_some_and(LayoutObject::is_flow_thread))
            .unwrap_or(view);
        for &object in top_layer {
            if layout.parent(object) != Some(root_block) {
                continue;
            }
            let Some(layout_object) = layout.get(object) else {
                continue;
            };
            if !layout_object.is_in_top_layer() || !layout_object.is_stacked() {
                continue;
            }
            match tree.layer_for_object(object) {
                Some(layer) => self.pos_z_order_list.push(layer),
                None => warn!("top-layer object {object:?} has no paint layer"),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ZOrderEntry {
    layer: PaintLayerId,
    z_index: i32,
    /// Collection order; equal z-indices paint in this order.
    sequence: usize,
}

impl ZOrderEntry {
    /// Whether `self` paints at or after `other`.
    fn paints_after(&self, other: &Self) -> bool {
        (self.z_index, self.sequence) >= (other.z_index, other.sequence)
    }

    fn later(first: Option<Self>, second: Option<Self>) -> Option<Self> {
        match (first, second) {
            (Some(first), Some(second)) => Some(if second.paints_after(&first) { second } else { first }),
            (first, second) => first.or(second),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayerBucket {
    AbsolutePosition = 0,
    FixedPosition = 1,
    InFlowStacked = 2,
}

impl LayerBucket {
    fn of(object: &LayoutObject) -> Self {
        match object.style().position {
            Position::Absolute => Self::AbsolutePosition,
            Position::Fixed => Self::FixedPosition,
            _ => Self::InFlowStacked,
        }
    }
}

/// The topmost stacked layer of each positioning scheme in a subtree.
#[derive(Debug, Default)]
struct HighestLayers {
    highest: [Option<ZOrderEntry>; 3],
    /// Buckets in the order they were last updated.
    order: SmallVec<LayerBucket, 3>,
}

impl HighestLayers {
    fn update_bucket(&mut self, bucket: LayerBucket, entry: ZOrderEntry) {
        let slot = &mut self.highest[bucket as usize];
        match slot {
            None => {
                *slot = Some(entry);
                self.order.push(bucket);
            }
            Some(current) => {
                if current.z_index <= entry.z_index {
                    *current = entry;
                    self.order.retain(|filled| *filled != bucket);
                    self.order.push(bucket);
                }
            }
        }
    }

    /// Negative z-index layers paint below the scroller, so they never
    /// force its controls to move.
    fn update(&mut self, object: &LayoutObject, entry: ZOrderEntry) {
        if !object.is_stacked() || entry.z_index < 0 {
            return;
        }
        self.update_bucket(LayerBucket::of(object), entry);
    }

    /// Fold a child subtree's result into this one. A stacked `object`
    /// that contains a bucket's positioning scheme propagates that bucket
    /// as its own.
    fn merge(&mut self, child: &Self, object: &LayoutObject) {
        for &bucket in &child.order {
            let Some(entry) = child.highest[bucket as usize] else {
                continue;
            };
            let contained = match bucket {
                LayerBucket::AbsolutePosition => object.can_contain_absolute_position_objects(),
                LayerBucket::FixedPosition => object.can_contain_fixed_position_objects(),
                LayerBucket::InFlowStacked => true,
            };
            let propagated = if object.is_stacked() && contained {
                LayerBucket::of(object)
            } else {
                bucket
            };
            self.update_bucket(propagated, entry);
        }
    }
}

struct ZOrderCollector<'tree> {
    tree: &'tree PaintLayerTree,
    layout: &'tree LayoutTree,
    pos: Vec<ZOrderEntry>,
    neg: Vec<ZOrderEntry>,
    sequence: usize,
    painting_after: HashMap<PaintLayerId, SmallVec<PaintLayerId, 2>>,
    reorder: Vec<(PaintLayerId, bool)>,
}

impl ZOrderCollector<'_> {
    fn collect(&mut self, layer: PaintLayerId, mut highest: Option<&mut HighestLayers>) {
        self.reorder.push((layer, false));
        let Some(paint_layer) = self.tree.get(layer) else {
            return;
        };
        let Some(object) = self.layout.get(paint_layer.layout_object()) else {
            warn!("{layer:?} outlived its layout object");
            return;
        };
        if object.is_in_top_layer() {
            return;
        }

        if object.is_stacked() {
            let entry = ZOrderEntry {
                layer,
                z_index: object.effective_z_index(),
                sequence: self.sequence,
            };
            self.sequence += 1;
            if entry.z_index >= 0 {
                self.pos.push(entry);
            } else {
                self.neg.push(entry);
            }
            if let Some(highest) = highest.as_deref_mut() {
                highest.update(object, entry);
            }
        }
        if object.is_stacking_context() {
            return;
        }

        let has_overlay_controls = object.has_overlay_overflow_controls();
        let mut subtree = (has_overlay_controls || highest.is_some()).then(HighestLayers::default);
        for child in self.tree.children(layer) {
            self.collect(child, subtree.as_mut());
        }

        if let Some(subtree) = subtree.as_ref().filter(|_| has_overlay_controls) {
            let mut paint_after = subtree.highest[LayerBucket::InFlowStacked as usize];
            if object.can_contain_fixed_position_objects() {
                paint_after = ZOrderEntry::later(
                    paint_after,
                    subtree.highest[LayerBucket::FixedPosition as usize],
                );
            }
            if object.can_contain_absolute_position_objects() {
                paint_after = ZOrderEntry::later(
                    paint_after,
                    subtree.highest[LayerBucket::AbsolutePosition as usize],
                );
            }
            if let Some(after) = paint_after {
                self.painting_after.entry(after.layer).or_default().push(layer);
            }
            self.reorder.push((layer, paint_after.is_some()));
        }

        if let (Some(highest), Some(subtree)) = (highest, &subtree) {
            highest.merge(subtree, object);
        }
    }
}
