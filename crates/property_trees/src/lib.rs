//! Transform, clip and effect property trees written by pre-paint and
//! read by clip computation and the compositor.
//!
//! Each tree is a flat vector of nodes; index 0 is the root and every
//! other node points at a parent with a smaller index.

mod compositor;
mod geometry_mapper;
mod node;
mod trees;

pub use compositor::PaintArtifactCompositor;
pub use geometry_mapper::GeometryMapper;
pub use node::{
    ClipKind, ClipNode, ClipNodeId, EffectNode, EffectNodeId, PropertyTreeState, TransformKind,
    TransformNode, TransformNodeId,
};
pub use trees::PropertyTrees;
