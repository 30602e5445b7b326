//! Flattened paint order of a whole layer tree.

use crate::layer::PaintLayerId;
use crate::paint_order::{ChildrenFilter, PaintOrderIterator};
use crate::stacking_node::PaintLayerStackingNode;
use crate::tree::PaintLayerTree;
use strata_layout_tree::{LayoutObject, LayoutTree};

/// One entry of the paint sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintStep {
    /// The layer's own box and its non-layer contents.
    Layer(PaintLayerId),
    /// The overlay scrollbars and resizer of a scroller.
    OverlayOverflowControls(PaintLayerId),
}

impl PaintStep {
    pub const fn layer(self) -> PaintLayerId {
        match self {
            Self::Layer(layer) | Self::OverlayOverflowControls(layer) => layer,
        }
    }
}

/// Every layer under `root` back to front, with overlay overflow controls
/// placed after the stacked layers they must cover.
///
/// Layers with no visible content and no visible descendants are skipped
/// together with their subtrees.
pub fn paint_sequence(tree: &PaintLayerTree, layout: &LayoutTree, root: PaintLayerId) -> Vec<PaintStep> {
    let _span = tracing::debug_span!("paint_sequence", ?root).entered();
    let mut steps = Vec::new();
    paint_layer(tree, layout, root, None, &mut steps);
    steps
}

/// The paint sequence front to back.
pub fn hit_test_order(tree: &PaintLayerTree, layout: &LayoutTree, root: PaintLayerId) -> Vec<PaintStep> {
    let mut steps = paint_sequence(tree, layout, root);
    steps.reverse();
    steps
}

fn paint_layer(
    tree: &PaintLayerTree,
    layout: &LayoutTree,
    layer: PaintLayerId,
    enclosing_context: Option<&PaintLayerStackingNode>,
    steps: &mut Vec<PaintStep>,
) {
    let Some(paint_layer) = tree.get(layer) else {
        return;
    };
    if !paint_layer.has_visible_content() && !paint_layer.has_visible_descendant() {
        return;
    }
    steps.push(PaintStep::Layer(layer));

    let context = paint_layer.stacking_node().or(enclosing_context);
    for child in PaintOrderIterator::new(tree, layout, layer, ChildrenFilter::ALL_CHILDREN) {
        paint_layer_with_reordered_controls(tree, layout, child, context, steps);
    }

    let has_controls = layout
        .get(paint_layer.layout_object())
        .is_some_and(LayoutObject::has_overlay_overflow_controls);
    if has_controls && !paint_layer.needs_reorder_overlay_overflow_controls() {
        steps.push(PaintStep::OverlayOverflowControls(layer));
    }
}

fn paint_layer_with_reordered_controls(
    tree: &PaintLayerTree,
    layout: &LayoutTree,
    child: PaintLayerId,
    context: Option<&PaintLayerStackingNode>,
    steps: &mut Vec<PaintStep>,
) {
    paint_layer(tree, layout, child, context, steps);
    let reordered = context.and_then(|node| node.layers_painting_overlay_overflow_controls_after(child));
    for scroller in reordered.into_iter().flatten() {
        steps.push(PaintStep::OverlayOverflowControls(*scroller));
    }
}
