//! Paint layers: stacking order, overflow-control reordering, pre-paint
//! fragments and clip rects.
//!
//! A [`PaintLayerTree`] mirrors the layout objects that need layers. Each
//! stacking context owns a [`PaintLayerStackingNode`] with its negative
//! and positive z-order lists; [`PaintOrderIterator`] walks a layer's
//! children in paint order from those lists. [`PrePaintTreeBuilder`]
//! writes property-tree state into every layer fragment, which
//! [`PaintLayerClipper`] reads to compute clip rects.
#![allow(clippy::float_cmp, reason = "geometry is compared after exact assignment")]

mod clipper;
mod fragment;
mod layer;
mod paint_order;
mod paint_sequence;
mod pre_paint;
mod stacking_node;
mod tree;

pub use clipper::{
    ClipRectsCache, ClipRectsContext, LayerClipRects, OVERLAY_SCROLLBAR_THICKNESS,
    OverlayScrollbarClipBehavior, PaintLayerClipper,
};
pub use fragment::FragmentData;
pub use layer::{PaintLayer, PaintLayerId, PaintLayerRareData};
pub use paint_order::{ChildrenFilter, PaintOrderIterator, PaintOrderReverseIterator};
pub use paint_sequence::{PaintStep, hit_test_order, paint_sequence};
pub use pre_paint::PrePaintTreeBuilder;
pub use stacking_node::PaintLayerStackingNode;
pub use tree::PaintLayerTree;
