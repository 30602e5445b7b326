//! A document: the DOM plus its layout tree and document-level state.

use crate::dom::{DomNodeId, DomTree};
use crate::object::{LayoutObjectId, LayoutObjectKind};
use crate::style::ComputedStyle;
use crate::tree::LayoutTree;
use anyhow::{Result, bail};
use log::debug;
use strata_geometry::SizeF;

/// The DOM and layout state scroll anchoring and painting read.
#[derive(Debug)]
pub struct Document {
    pub dom: DomTree,
    pub layout: LayoutTree,
    focused_element: Option<DomNodeId>,
    active_find_match: Option<DomNodeId>,
    top_layer: Vec<DomNodeId>,
    fullscreen_element: Option<DomNodeId>,
}

impl Document {
    /// An empty document whose view has `view_size`.
    pub fn new(view_size: SizeF) -> Self {
        Self {
            dom: DomTree::new(),
            layout: LayoutTree::new(view_size),
            focused_element: None,
            active_find_match: None,
            top_layer: Vec::new(),
            fullscreen_element: None,
        }
    }

    /// Create a layout object for `node` (or an anonymous one) under `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if `node` already has a layout object or `parent` is stale.
    pub fn attach_layout_object(
        &mut self,
        node: Option<DomNodeId>,
        kind: LayoutObjectKind,
        style: ComputedStyle,
        parent: LayoutObjectId,
    ) -> Result<LayoutObjectId> {
        if let Some(node) = node {
            if self.dom.node(node).is_none() {
                bail!("DOM node {node:?} does not exist");
            }
            if let Some(existing) = self.dom.layout_object(node) {
                bail!("DOM node {node:?} already has layout object {existing:?}");
            }
        }
        let id = self.layout.create_object(kind, node, style);
        self.layout.append_child(parent, id)?;
        if let Some(node) = node {
            self.dom.set_layout_object(node, Some(id));
            if self.top_layer.contains(&node) {
                self.layout.object_mut(id)?.in_top_layer = true;
            }
        }
        Ok(id)
    }

    /// Destroy a layout subtree, unlinking it from the DOM.
    ///
    /// Returns the destroyed ids so owners of per-object state (paint
    /// layers, scroll anchors) can drop their references.
    ///
    /// # Errors
    ///
    /// Returns an error for stale ids or the view.
    pub fn detach_layout_subtree(&mut self, object: LayoutObjectId) -> Result<Vec<LayoutObjectId>> {
        let nodes: Vec<DomNodeId> = self
            .layout
            .descendants(object)
            .into_iter()
            .filter_map(|id| self.layout.get(id).and_then(|entry| entry.node()))
            .collect();
        let removed = self.layout.remove(object)?;
        for node in nodes {
            self.dom.set_layout_object(node, None);
        }
        debug!("detached {} layout objects", removed.len());
        Ok(removed)
    }

    pub fn focused_element(&self) -> Option<DomNodeId> {
        self.focused_element
    }

    pub fn set_focused_element(&mut self, node: Option<DomNodeId>) {
        self.focused_element = node;
    }

    /// The currently highlighted find-in-page result.
    pub fn active_find_match(&self) -> Option<DomNodeId> {
        self.active_find_match
    }

    pub fn set_active_find_match(&mut self, node: Option<DomNodeId>) {
        self.active_find_match = node;
    }

    /// Top-layer elements, bottom-most first.
    pub fn top_layer(&self) -> &[DomNodeId] {
        &self.top_layer
    }

    /// Layout objects of the top-layer elements, in top-layer order.
    pub fn top_layer_objects(&self) -> Vec<LayoutObjectId> {
        self.top_layer
            .iter()
            .filter_map(|node| self.dom.layout_object(*node))
            .collect()
    }

    /// Move `node` to the top of the top layer.
    pub fn add_to_top_layer(&mut self, node: DomNodeId) {
        self.top_layer.retain(|entry| *entry != node);
        self.top_layer.push(node);
        self.set_in_top_layer(node, true);
    }

    pub fn remove_from_top_layer(&mut self, node: DomNodeId) {
        let before = self.top_layer.len();
        self.top_layer.retain(|entry| *entry != node);
        if self.top_layer.len() != before {
            self.set_in_top_layer(node, false);
        }
    }

    pub fn fullscreen_element(&self) -> Option<DomNodeId> {
        self.fullscreen_element
    }

    /// Enter or leave fullscreen. The fullscreen element lives in the top layer.
    pub fn set_fullscreen_element(&mut self, node: Option<DomNodeId>) {
        if let Some(previous) = self.fullscreen_element.take() {
            self.remove_from_top_layer(previous);
        }
        if let Some(node) = node {
            self.add_to_top_layer(node);
        }
        self.fullscreen_element = node;
    }

    fn set_in_top_layer(&mut self, node: DomNodeId, in_top_layer: bool) {
        if let Some(object) = self
            .dom
            .layout_object(node)
            .and_then(|id| self.layout.get_mut(id))
        {
            object.in_top_layer = in_top_layer;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_layer_membership_follows_the_dom_node() -> Result<()> {
        let mut document = Document::new(SizeF::new(800.0, 600.0));
        let body = document.dom.create_element("body");
        let root = document.dom.document();
        document.dom.append_child(root, body)?;
        let dialog = document.dom.create_element("dialog");
        document.dom.append_child(body, dialog)?;

        document.add_to_top_layer(dialog);
        let view = document.layout.view();
        let object = document.attach_layout_object(
            Some(dialog),
            LayoutObjectKind::Block,
            ComputedStyle::default(),
            view,
        )?;
        assert!(document.layout.object(object)?.is_in_top_layer());
        assert!(document.layout.object(object)?.is_stacking_context());
        assert_eq!(document.top_layer_objects(), vec![object]);

        document.remove_from_top_layer(dialog);
        assert!(!document.layout.object(object)?.is_in_top_layer());
        Ok(())
    }

    #[test]
    fn detaching_clears_dom_links() -> Result<()> {
        let mut document = Document::new(SizeF::new(800.0, 600.0));
        let div = document.dom.create_element("div");
        let root = document.dom.document();
        document.dom.append_child(root, div)?;
        let view = document.layout.view();
        let object =
            document.attach_layout_object(Some(div), LayoutObjectKind::Block, ComputedStyle::default(), view)?;
        assert!(
            document
                .attach_layout_object(Some(div), LayoutObjectKind::Block, ComputedStyle::default(), view)
                .is_err()
        );

        assert_eq!(document.detach_layout_subtree(object)?, vec![object]);
        assert_eq!(document.dom.layout_object(div), None);
        Ok(())
    }

    #[test]
    fn fullscreen_replaces_the_previous_element() {
        let mut document = Document::new(SizeF::new(800.0, 600.0));
        let first = document.dom.create_element("video");
        let second = document.dom.create_element("div");
        document.set_fullscreen_element(Some(first));
        document.set_fullscreen_element(Some(second));
        assert_eq!(document.top_layer(), &[second]);
        document.set_fullscreen_element(None);
        assert!(document.top_layer().is_empty());
    }
}
