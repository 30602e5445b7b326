//! Child layers of a layer in paint order.
//!
//! Negative z-order children come first, then normal-flow children that
//! are not stacked, in sibling order, then positive z-order children. The
//! iterators borrow the tree, so the child lists cannot change while one
//! is alive.

use crate::layer::PaintLayerId;
use crate::stacking_node::PaintLayerStackingNode;
use crate::tree::PaintLayerTree;
use log::warn;
use std::ops::BitOr;
use strata_layout_tree::{LayoutObject, LayoutTree};

/// Which groups of children an iterator yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildrenFilter(u8);

impl ChildrenFilter {
    pub const NEGATIVE_Z_ORDER_CHILDREN: Self = Self(1);
    pub const NORMAL_FLOW_CHILDREN: Self = Self(1 << 1);
    pub const POSITIVE_Z_ORDER_CHILDREN: Self = Self(1 << 2);
    pub const NORMAL_FLOW_AND_POSITIVE_Z_ORDER_CHILDREN: Self = Self(0b110);
    pub const ALL_CHILDREN: Self = Self(0b111);
    pub const NONE: Self = Self(0);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for ChildrenFilter {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

fn stacking_node(tree: &PaintLayerTree, root: PaintLayerId) -> Option<&PaintLayerStackingNode> {
    let node = tree.get(root)?.stacking_node()?;
    if node.z_order_lists_dirty() {
        warn!("iterating {root:?} with dirty z-order lists");
    }
    Some(node)
}

fn is_stacked(tree: &PaintLayerTree, layout: &LayoutTree, layer: PaintLayerId) -> bool {
    tree.get(layer)
        .and_then(|paint_layer| layout.get(paint_layer.layout_object()))
        .is_some_and(LayoutObject::is_stacked)
}

/// Back-to-front iterator over the children of a layer.
pub struct PaintOrderIterator<'tree> {
    tree: &'tree PaintLayerTree,
    layout: &'tree LayoutTree,
    node: Option<&'tree PaintLayerStackingNode>,
    remaining: ChildrenFilter,
    index: usize,
    next_normal_flow_child: Option<PaintLayerId>,
}

impl<'tree> PaintOrderIterator<'tree> {
    pub fn new(
        tree: &'tree PaintLayerTree,
        layout: &'tree LayoutTree,
        root: PaintLayerId,
        filter: ChildrenFilter,
    ) -> Self {
        Self {
            tree,
            layout,
            node: stacking_node(tree, root),
            remaining: filter,
            index: 0,
            next_normal_flow_child: tree.first_child(root),
        }
    }

    fn next_in_list(&mut self, group: ChildrenFilter, list: &'tree [PaintLayerId]) -> Option<PaintLayerId> {
        if let Some(child) = list.get(self.index) {
            self.index += 1;
            return Some(*child);
        }
        self.index = 0;
        self.remaining = self.remaining.without(group);
        None
    }
}

impl Iterator for PaintOrderIterator<'_> {
    type Item = PaintLayerId;

    fn next(&mut self) -> Option<PaintLayerId> {
        if self.remaining.contains(ChildrenFilter::NEGATIVE_Z_ORDER_CHILDREN) {
            let list = self.node.map_or(&[][..], PaintLayerStackingNode::neg_z_order_list);
            if let Some(child) = self.next_in_list(ChildrenFilter::NEGATIVE_Z_ORDER_CHILDREN, list) {
                return Some(child);
            }
        }

        if self.remaining.contains(ChildrenFilter::NORMAL_FLOW_CHILDREN) {
            while let Some(child) = self.next_normal_flow_child {
                self.next_normal_flow_child = self.tree.next_sibling(child);
                if !is_stacked(self.tree, self.layout, child) {
                    return Some(child);
                }
            }
            self.remaining = self.remaining.without(ChildrenFilter::NORMAL_FLOW_CHILDREN);
        }

        if self.remaining.contains(ChildrenFilter::POSITIVE_Z_ORDER_CHILDREN) {
            let list = self.node.map_or(&[][..], PaintLayerStackingNode::pos_z_order_list);
            if let Some(child) = self.next_in_list(ChildrenFilter::POSITIVE_Z_ORDER_CHILDREN, list) {
                return Some(child);
            }
        }
        None
    }
}

/// Front-to-back iterator over the children of a layer; the exact reverse
/// of [`PaintOrderIterator`].
pub struct PaintOrderReverseIterator<'tree> {
    tree: &'tree PaintLayerTree,
    layout: &'tree LayoutTree,
    node: Option<&'tree PaintLayerStackingNode>,
    remaining: ChildrenFilter,
    /// Entries of the current list not yet yielded.
    left: Option<usize>,
    previous_normal_flow_child: Option<PaintLayerId>,
}

impl<'tree> PaintOrderReverseIterator<'tree> {
    pub fn new(
        tree: &'tree PaintLayerTree,
        layout: &'tree LayoutTree,
        root: PaintLayerId,
        filter: ChildrenFilter,
    ) -> Self {
        Self {
            tree,
            layout,
            node: stacking_node(tree, root),
            remaining: filter,
            left: None,
            previous_normal_flow_child: tree.last_child(root),
        }
    }

    fn previous_in_list(&mut self, group: ChildrenFilter, list: &'tree [PaintLayerId]) -> Option<PaintLayerId> {
        let left = self.left.unwrap_or(list.len());
        if left > 0 {
            self.left = Some(left - 1);
            return list.get(left - 1).copied();
        }
        self.left = None;
        self.remaining = self.remaining.without(group);
        None
    }
}

impl Iterator for PaintOrderReverseIterator<'_> {
    type Item = PaintLayerId;

    fn next(&mut self) -> Option<PaintLayerId> {
        if self.remaining.contains(ChildrenFilter::POSITIVE_Z_ORDER_CHILDREN) {
            let list = self.node.map_or(&[][..], PaintLayerStackingNode::pos_z_order_list);
            if let Some(child) = self.previous_in_list(ChildrenFilter::POSITIVE_Z_ORDER_CHILDREN, list) {
                return Some(child);
            }
        }

        if self.remaining.contains(ChildrenFilter::NORMAL_FLOW_CHILDREN) {
            while let Some(child) = self.previous_normal_flow_child {
                self.previous_normal_flow_child = self.tree.previous_sibling(child);
                if !is_stacked(self.tree, self.layout, child) {
                    return Some(child);
                }
            }
            self.remaining = self.remaining.without(ChildrenFilter::NORMAL_FLOW_CHILDREN);
        }

        if self.remaining.contains(ChildrenFilter::NEGATIVE_Z_ORDER_CHILDREN) {
            let list = self.node.map_or(&[][..], PaintLayerStackingNode::neg_z_order_list);
            if let Some(child) = self.previous_in_list(ChildrenFilter::NEGATIVE_Z_ORDER_CHILDREN, list) {
                return Some(child);
            }
        }
        None
    }
}
