//! A minimal DOM: elements, text, pseudo-elements and shadow roots.

use crate::object::LayoutObjectId;
use anyhow::{Result, anyhow, bail};
use indextree::{Arena, Node, NodeId};
use smallvec::SmallVec;

/// Handle to a DOM node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomNodeId(NodeId);

/// Which generated box a pseudo-element stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoId {
    Before,
    After,
    Marker,
}

/// Element attributes that selectors and focus care about.
#[derive(Debug, Clone, Default)]
pub struct ElementData {
    /// Lower-case tag name.
    pub tag_name: String,
    /// The `id` attribute.
    pub id: Option<String>,
    /// The `class` attribute, split on whitespace.
    pub classes: SmallVec<String, 2>,
    /// `contenteditable` or a text control.
    pub editable: bool,
}

/// What kind of node this is.
#[derive(Debug, Clone, Default)]
pub enum NodeData {
    #[default]
    Document,
    Element(ElementData),
    Text(String),
    PseudoElement(PseudoId),
    ShadowRoot,
}

/// A node in the arena.
#[derive(Debug, Clone, Default)]
pub struct DomNode {
    pub data: NodeData,
    /// The layout object generated for this node, if any.
    pub layout_object: Option<LayoutObjectId>,
}

/// Arena-backed DOM. The document node is the root.
#[derive(Debug)]
pub struct DomTree {
    arena: Arena<DomNode>,
    root: NodeId,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// An empty document.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        Self {
            root: arena.new_node(DomNode::default()),
            arena,
        }
    }

    /// The document node.
    pub fn document(&self) -> DomNodeId {
        DomNodeId(self.root)
    }

    fn new_node(&mut self, data: NodeData) -> DomNodeId {
        DomNodeId(self.arena.new_node(DomNode {
            data,
            layout_object: None,
        }))
    }

    /// Create a detached element with the given tag.
    pub fn create_element(&mut self, tag_name: &str) -> DomNodeId {
        self.new_node(NodeData::Element(ElementData {
            tag_name: tag_name.to_ascii_lowercase(),
            ..ElementData::default()
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> DomNodeId {
        self.new_node(NodeData::Text(text.to_owned()))
    }

    /// Create a pseudo-element under `host`.
    ///
    /// # Errors
    ///
    /// Returns an error if `host` is not an element.
    pub fn create_pseudo_element(&mut self, host: DomNodeId, pseudo: PseudoId) -> Result<DomNodeId> {
        self.element(host)
            .ok_or_else(|| anyhow!("pseudo-element host {host:?} is not an element"))?;
        let node = self.new_node(NodeData::PseudoElement(pseudo));
        host.0.checked_append(node.0, &mut self.arena)?;
        Ok(node)
    }

    /// Attach a shadow root to `host`.
    ///
    /// # Errors
    ///
    /// Returns an error if `host` is not an element or already has a shadow root.
    pub fn attach_shadow_root(&mut self, host: DomNodeId) -> Result<DomNodeId> {
        self.element(host)
            .ok_or_else(|| anyhow!("shadow host {host:?} is not an element"))?;
        if self.shadow_root(host).is_some() {
            bail!("{host:?} already hosts a shadow root");
        }
        let root = self.new_node(NodeData::ShadowRoot);
        host.0.checked_append(root.0, &mut self.arena)?;
        Ok(root)
    }

    /// The shadow root hosted by `host`.
    pub fn shadow_root(&self, host: DomNodeId) -> Option<DomNodeId> {
        host.0
            .children(&self.arena)
            .find(|child| matches!(self.arena[*child].get().data, NodeData::ShadowRoot))
            .map(DomNodeId)
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if either node was removed or the append would create a cycle.
    pub fn append_child(&mut self, parent: DomNodeId, child: DomNodeId) -> Result<()> {
        self.check_live(parent)?;
        self.check_live(child)?;
        child.0.detach(&mut self.arena);
        parent.0.checked_append(child.0, &mut self.arena)?;
        Ok(())
    }

    /// Insert `child` right before `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error if either node was removed or `reference` has no parent.
    pub fn insert_before(&mut self, reference: DomNodeId, child: DomNodeId) -> Result<()> {
        self.check_live(reference)?;
        self.check_live(child)?;
        if self.parent(reference).is_none() {
            bail!("reference node {reference:?} is detached");
        }
        child.0.detach(&mut self.arena);
        reference.0.checked_insert_before(child.0, &mut self.arena)?;
        Ok(())
    }

    /// Detach `node` (and its subtree) from its parent.
    ///
    /// # Errors
    ///
    /// Returns an error if the node was removed.
    pub fn detach(&mut self, node: DomNodeId) -> Result<()> {
        self.check_live(node)?;
        node.0.detach(&mut self.arena);
        Ok(())
    }

    fn check_live(&self, node: DomNodeId) -> Result<()> {
        match self.arena.get(node.0) {
            Some(entry) if !entry.is_removed() => Ok(()),
            _ => Err(anyhow!("stale DOM node {node:?}")),
        }
    }

    fn element_mut(&mut self, node: DomNodeId) -> Result<&mut ElementData> {
        match self.arena.get_mut(node.0).map(|entry| &mut entry.get_mut().data) {
            Some(NodeData::Element(element)) => Ok(element),
            _ => Err(anyhow!("{node:?} is not an element")),
        }
    }

    /// Set the `id` attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if `node` is not an element.
    pub fn set_id(&mut self, node: DomNodeId, id: &str) -> Result<()> {
        self.element_mut(node)?.id = Some(id.to_owned());
        Ok(())
    }

    /// Add a class to the `class` attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if `node` is not an element.
    pub fn add_class(&mut self, node: DomNodeId, class: &str) -> Result<()> {
        let element = self.element_mut(node)?;
        if !element.classes.iter().any(|existing| existing == class) {
            element.classes.push(class.to_owned());
        }
        Ok(())
    }

    /// Mark an element as editable.
    ///
    /// # Errors
    ///
    /// Returns an error if `node` is not an element.
    pub fn set_editable(&mut self, node: DomNodeId, editable: bool) -> Result<()> {
        self.element_mut(node)?.editable = editable;
        Ok(())
    }

    /// Arena entry for `node`.
    pub fn node(&self, node: DomNodeId) -> Option<&DomNode> {
        self.arena
            .get(node.0)
            .filter(|entry| !entry.is_removed())
            .map(Node::get)
    }

    /// Element data, if `node` is an element.
    pub fn element(&self, node: DomNodeId) -> Option<&ElementData> {
        match self.node(node).map(|entry| &entry.data) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    /// True for pseudo-element nodes.
    pub fn is_pseudo_element(&self, node: DomNodeId) -> bool {
        matches!(
            self.node(node).map(|entry| &entry.data),
            Some(NodeData::PseudoElement(_))
        )
    }

    /// The layout object generated for `node`.
    pub fn layout_object(&self, node: DomNodeId) -> Option<LayoutObjectId> {
        self.node(node).and_then(|entry| entry.layout_object)
    }

    pub(crate) fn set_layout_object(&mut self, node: DomNodeId, object: Option<LayoutObjectId>) {
        if let Some(entry) = self.arena.get_mut(node.0) {
            entry.get_mut().layout_object = object;
        }
    }

    /// Parent node in the arena; the shadow root for shadow children.
    pub fn parent(&self, node: DomNodeId) -> Option<DomNodeId> {
        self.arena.get(node.0)?.parent().map(DomNodeId)
    }

    /// Parent in the flat tree: shadow roots are transparent, so the
    /// parent of a shadow root's child is the host.
    pub fn flat_tree_parent(&self, node: DomNodeId) -> Option<DomNodeId> {
        let parent = self.parent(node)?;
        if matches!(self.node(parent)?.data, NodeData::ShadowRoot) {
            return self.parent(parent);
        }
        Some(parent)
    }

    /// The nearest ancestor element, stopping at shadow roots.
    pub fn parent_element(&self, node: DomNodeId) -> Option<DomNodeId> {
        let parent = self.parent(node)?;
        self.element(parent).map(|_| parent)
    }

    /// Child nodes in order.
    pub fn children(&self, node: DomNodeId) -> impl Iterator<Item = DomNodeId> + '_ {
        node.0.children(&self.arena).map(DomNodeId)
    }

    /// Child elements in order. Shadow roots, text and pseudo-elements are skipped.
    pub fn element_children(&self, node: DomNodeId) -> impl Iterator<Item = DomNodeId> + '_ {
        self.children(node)
            .filter(move |child| self.element(*child).is_some())
    }

    /// True when `node` lives below a shadow root.
    pub fn is_in_shadow_tree(&self, node: DomNodeId) -> bool {
        node.0
            .ancestors(&self.arena)
            .skip(1)
            .any(|ancestor| matches!(self.arena[ancestor].get().data, NodeData::ShadowRoot))
    }

    /// True when `node` is attached to the document.
    pub fn is_connected(&self, node: DomNodeId) -> bool {
        self.node(node).is_some() && node.0.ancestors(&self.arena).any(|ancestor| ancestor == self.root)
    }

    /// Elements of the document tree scope in tree order. Shadow trees are
    /// not entered.
    pub fn document_elements(&self) -> Vec<DomNodeId> {
        let mut elements = Vec::new();
        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            if matches!(self.arena[current].get().data, NodeData::ShadowRoot) {
                continue;
            }
            if matches!(self.arena[current].get().data, NodeData::Element(_)) {
                elements.push(DomNodeId(current));
            }
            let children: Vec<NodeId> = current.children(&self.arena).collect();
            stack.extend(children.into_iter().rev());
        }
        elements
    }

    /// Connected elements whose id is `id`, in tree order.
    pub fn elements_with_id(&self, id: &str) -> Vec<DomNodeId> {
        self.document_elements()
            .into_iter()
            .filter(|element| {
                self.element(*element)
                    .and_then(|data| data.id.as_deref())
                    .is_some_and(|candidate| candidate == id)
            })
            .collect()
    }

    /// True when more than one element in the document uses `id`.
    pub fn contains_multiple_elements_with_id(&self, id: &str) -> bool {
        self.elements_with_id(id).len() > 1
    }

    /// 1-based position among element siblings, as used by `:nth-child`.
    pub fn element_index(&self, node: DomNodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.element_children(parent)
            .position(|sibling| sibling == node)
            .map(|index| index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build() -> Result<(DomTree, DomNodeId, DomNodeId)> {
        let mut dom = DomTree::new();
        let body = dom.create_element("BODY");
        dom.append_child(dom.document(), body)?;
        let div = dom.create_element("div");
        dom.append_child(body, div)?;
        Ok((dom, body, div))
    }

    #[test]
    fn tags_are_lower_cased() -> Result<()> {
        let (dom, body, _) = build()?;
        assert_eq!(dom.element(body).map(|data| data.tag_name.as_str()), Some("body"));
        Ok(())
    }

    #[test]
    fn duplicate_ids_are_detected() -> Result<()> {
        let (mut dom, body, div) = build()?;
        dom.set_id(div, "x")?;
        assert!(!dom.contains_multiple_elements_with_id("x"));
        let other = dom.create_element("span");
        dom.set_id(other, "x")?;
        assert!(!dom.contains_multiple_elements_with_id("x"));
        dom.append_child(body, other)?;
        assert!(dom.contains_multiple_elements_with_id("x"));
        Ok(())
    }

    #[test]
    fn shadow_trees_are_a_separate_scope() -> Result<()> {
        let (mut dom, _, div) = build()?;
        let shadow = dom.attach_shadow_root(div)?;
        let inner = dom.create_element("p");
        dom.append_child(shadow, inner)?;
        assert!(dom.is_in_shadow_tree(inner));
        assert!(!dom.is_in_shadow_tree(div));
        assert_eq!(dom.flat_tree_parent(inner), Some(div));
        assert!(!dom.document_elements().contains(&inner));
        assert_eq!(dom.element_children(div).count(), 0);
        Ok(())
    }

    #[test]
    fn element_index_counts_only_elements() -> Result<()> {
        let (mut dom, body, div) = build()?;
        let text = dom.create_text("hello");
        dom.insert_before(div, text)?;
        let second = dom.create_element("div");
        dom.append_child(body, second)?;
        assert_eq!(dom.element_index(div), Some(1));
        assert_eq!(dom.element_index(second), Some(2));
        Ok(())
    }
}
