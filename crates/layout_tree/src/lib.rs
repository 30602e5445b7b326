//! The style and layout collaborators that the paint and scroll crates
//! consume.
//!
//! This is not a layout engine. It stores what a layout engine produces:
//! a DOM, a tree of layout objects with computed style and geometry, and
//! the derived predicates (stacking, containing blocks, overflow clipping)
//! that the paint layer tree and scroll anchoring query.

mod document;
mod dom;
mod object;
mod style;
mod tree;

pub use document::Document;
pub use dom::{DomNode, DomNodeId, DomTree, ElementData, NodeData, PseudoId};
pub use object::{ColumnLayout, LayoutObject, LayoutObjectId, LayoutObjectKind, PaintLayerType};
pub use style::{
    ComputedStyle, ContentVisibility, CssScrollBehavior, Overflow, OverflowAnchor, Position,
    Resize, Visibility,
};
pub use tree::LayoutTree;
