//! The layout tree arena: containing blocks and coordinate mapping.

use crate::dom::DomNodeId;
use crate::object::{LayoutObject, LayoutObjectId, LayoutObjectKind};
use crate::style::{ComputedStyle, Overflow};
use anyhow::{Result, anyhow, bail};
use indextree::{Arena, Node};
use log::trace;
use std::mem;
use strata_geometry::{PointF, RectF, ScrollOffset, SizeF};

/// Arena of layout objects rooted at the view.
#[derive(Debug)]
pub struct LayoutTree {
    arena: Arena<LayoutObject>,
    view: LayoutObjectId,
}

impl LayoutTree {
    /// A tree holding only the view, sized to the frame.
    pub fn new(view_size: SizeF) -> Self {
        let mut arena = Arena::new();
        let mut view = LayoutObject::new(
            LayoutObjectKind::View,
            None,
            ComputedStyle::default().with_overflow(Overflow::Auto),
        );
        view.size = view_size;
        view.needs_layout = false;
        let view = LayoutObjectId(arena.new_node(view));
        Self { arena, view }
    }

    /// The root of the tree.
    #[inline]
    pub fn view(&self) -> LayoutObjectId {
        self.view
    }

    /// Look up a live object.
    pub fn get(&self, id: LayoutObjectId) -> Option<&LayoutObject> {
        self.arena
            .get(id.0)
            .filter(|node| !node.is_removed())
            .map(Node::get)
    }

    /// Look up a live object for mutation.
    pub fn get_mut(&mut self, id: LayoutObjectId) -> Option<&mut LayoutObject> {
        self.arena
            .get_mut(id.0)
            .filter(|node| !node.is_removed())
            .map(Node::get_mut)
    }

    /// Like [`Self::get`], failing on stale ids.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` was removed or never existed.
    pub fn object(&self, id: LayoutObjectId) -> Result<&LayoutObject> {
        self.get(id)
            .ok_or_else(|| anyhow!("layout object {id:?} does not exist"))
    }

    /// Like [`Self::get_mut`], failing on stale ids.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` was removed or never existed.
    pub fn object_mut(&mut self, id: LayoutObjectId) -> Result<&mut LayoutObject> {
        self.get_mut(id)
            .ok_or_else(|| anyhow!("layout object {id:?} does not exist"))
    }

    /// Create a detached object.
    pub fn create_object(
        &mut self,
        kind: LayoutObjectKind,
        node: Option<DomNodeId>,
        style: ComputedStyle,
    ) -> LayoutObjectId {
        LayoutObjectId(self.arena.new_node(LayoutObject::new(kind, node, style)))
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error for stale ids or if the append would create a cycle.
    pub fn append_child(&mut self, parent: LayoutObjectId, child: LayoutObjectId) -> Result<()> {
        self.object(parent)?;
        self.object(child)?;
        parent.0.checked_append(child.0, &mut self.arena)?;
        Ok(())
    }

    /// Insert `child` before `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error for stale ids, for a parentless `reference`, or if
    /// the insertion would create a cycle.
    pub fn insert_before(&mut self, reference: LayoutObjectId, child: LayoutObjectId) -> Result<()> {
        if self.parent(reference).is_none() {
            bail!("cannot insert before {reference:?}: it has no parent");
        }
        self.object(child)?;
        reference.0.checked_insert_before(child.0, &mut self.arena)?;
        Ok(())
    }

    /// Unlink `id` and its subtree from the tree and free them.
    ///
    /// Returns the removed ids in pre-order.
    ///
    /// # Errors
    ///
    /// Returns an error for stale ids or when asked to remove the view.
    pub fn remove(&mut self, id: LayoutObjectId) -> Result<Vec<LayoutObjectId>> {
        if id == self.view {
            bail!("the view cannot be removed");
        }
        self.object(id)?;
        let removed = self.descendants(id);
        id.0.remove_subtree(&mut self.arena);
        trace!("removed {} layout objects under {id:?}", removed.len());
        Ok(removed)
    }

    /// Replace the style of `id`, returning the old one.
    ///
    /// Sets the anchoring-disabling bit when position or size affecting
    /// properties changed.
    ///
    /// # Errors
    ///
    /// Returns an error for stale ids.
    pub fn set_style(&mut self, id: LayoutObjectId, style: ComputedStyle) -> Result<ComputedStyle> {
        let object = self.object_mut(id)?;
        if style.scroll_anchor_disabling_property_changed(&object.style) {
            object.scroll_anchor_disabling_style_changed = true;
        }
        object.needs_layout = true;
        Ok(mem::replace(&mut object.style, style))
    }

    /// Forget pending anchoring-disabling style changes, after layout.
    pub fn clear_scroll_anchor_disabling_style_changes(&mut self) {
        for node in self.arena.iter_mut() {
            if !node.is_removed() {
                node.get_mut().scroll_anchor_disabling_style_changed = false;
            }
        }
    }

    /// Set the layout result of `id`.
    ///
    /// # Errors
    ///
    /// Returns an error for stale ids.
    pub fn set_geometry(&mut self, id: LayoutObjectId, location: PointF, size: SizeF) -> Result<()> {
        let object = self.object_mut(id)?;
        object.location = location;
        object.size = size;
        object.needs_layout = false;
        Ok(())
    }

    /// Set both overflow rects of `id`, in its local coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error for stale ids.
    pub fn set_overflow(
        &mut self,
        id: LayoutObjectId,
        visual_overflow: Option<RectF>,
        scrollable_overflow: Option<RectF>,
    ) -> Result<()> {
        let object = self.object_mut(id)?;
        object.visual_overflow = visual_overflow;
        object.scrollable_overflow = scrollable_overflow;
        Ok(())
    }

    /// Record the committed scroll offset of a scroll container.
    ///
    /// # Errors
    ///
    /// Returns an error for stale ids or objects that do not scroll.
    pub fn set_scroll_offset(&mut self, id: LayoutObjectId, offset: ScrollOffset) -> Result<()> {
        let object = self.object_mut(id)?;
        if !object.is_scroll_container() {
            bail!("{id:?} is not a scroll container");
        }
        object.scroll_offset = offset;
        Ok(())
    }

    pub fn parent(&self, id: LayoutObjectId) -> Option<LayoutObjectId> {
        self.arena.get(id.0)?.parent().map(LayoutObjectId)
    }

    pub fn next_sibling(&self, id: LayoutObjectId) -> Option<LayoutObjectId> {
        self.arena.get(id.0)?.next_sibling().map(LayoutObjectId)
    }

    pub fn children(&self, id: LayoutObjectId) -> impl Iterator<Item = LayoutObjectId> + '_ {
        id.0.children(&self.arena).map(LayoutObjectId)
    }

    /// `id` and everything below it, in pre-order.
    pub fn descendants(&self, id: LayoutObjectId) -> Vec<LayoutObjectId> {
        id.0.descendants(&self.arena).map(LayoutObjectId).collect()
    }

    /// Parent chain starting at the parent of `id`.
    pub fn ancestors(&self, id: LayoutObjectId) -> impl Iterator<Item = LayoutObjectId> + '_ {
        id.0.ancestors(&self.arena).skip(1).map(LayoutObjectId)
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_descendant_of(&self, id: LayoutObjectId, ancestor: LayoutObjectId) -> bool {
        id.0.ancestors(&self.arena).any(|node| node == ancestor.0)
    }

    /// The object whose box `id` is positioned against.
    ///
    /// Differs from the parent for out-of-flow boxes and column spanners.
    pub fn container(&self, id: LayoutObjectId) -> Option<LayoutObjectId> {
        self.container_skipping(id, None).0
    }

    /// Like [`Self::container`], also reporting whether `ancestor` was
    /// passed over on the way up.
    pub fn container_skipping(
        &self,
        id: LayoutObjectId,
        ancestor: Option<LayoutObjectId>,
    ) -> (Option<LayoutObjectId>, bool) {
        let Some(object) = self.get(id) else {
            return (None, false);
        };
        let Some(parent) = self.parent(id) else {
            return (None, false);
        };
        let style = object.style();
        let accepts: fn(&LayoutObject) -> bool = if object.is_fixed_positioned() {
            LayoutObject::can_contain_fixed_position_objects
        } else if style.is_out_of_flow_positioned() {
            LayoutObject::can_contain_absolute_position_objects
        } else if style.column_span_all && self.get(parent).is_some_and(LayoutObject::is_flow_thread) {
            LayoutObject::is_box_but_not_flow_thread
        } else {
            return (Some(parent), false);
        };

        let mut skipped = false;
        let mut current = Some(parent);
        while let Some(candidate) = current {
            let Some(candidate_object) = self.get(candidate) else {
                break;
            };
            if accepts(candidate_object) {
                return (Some(candidate), skipped);
            }
            if Some(candidate) == ancestor {
                skipped = true;
            }
            current = self.parent(candidate);
        }
        (Some(self.view), skipped)
    }

    /// Nearest containing-block ancestor that scrolls its overflow.
    pub fn enclosing_scroll_container(&self, id: LayoutObjectId) -> Option<LayoutObjectId> {
        let mut current = self.container(id);
        while let Some(candidate) = current {
            if self.get(candidate)?.is_scroll_container() {
                return Some(candidate);
            }
            current = self.container(candidate);
        }
        None
    }

    /// Map one step from `id`'s local space into its container's scrolled space.
    fn map_to_container(&self, id: LayoutObjectId, rect: RectF) -> Option<(LayoutObjectId, RectF)> {
        let object = self.get(id)?;
        let container = self.container(id)?;
        let container_object = self.get(container)?;
        let location = object.location.to_offset();
        let mut mapped = match (object.kind(), container_object.column_layout()) {
            (LayoutObjectKind::FlowThread, Some(columns)) => {
                columns.flow_thread_to_visual(&rect).translated(location)
            }
            _ => rect.translated(location),
        };
        let scrolls_with_container = !(container_object.is_view() && object.is_fixed_positioned());
        if container_object.is_scroll_container() && scrolls_with_container {
            mapped.offset(-container_object.scroll_offset);
        }
        Some((container, mapped))
    }

    /// Map `rect`, in `id`'s local coordinates, into the view's coordinates.
    ///
    /// CSS transforms are not applied; the property trees handle them.
    pub fn local_to_absolute_rect(&self, id: LayoutObjectId, rect: RectF) -> RectF {
        let mut current = id;
        let mut mapped = rect;
        while let Some((container, next)) = self.map_to_container(current, mapped) {
            current = container;
            mapped = next;
        }
        mapped
    }

    /// The view-space position of `id`'s border-box origin.
    pub fn absolute_origin(&self, id: LayoutObjectId) -> PointF {
        self.local_to_absolute_rect(id, RectF::ZERO).origin()
    }

    /// Map `rect`, in `id`'s local coordinates, into `ancestor`'s scrolled
    /// coordinate space.
    pub fn map_rect_to_ancestor(
        &self,
        id: LayoutObjectId,
        rect: RectF,
        ancestor: LayoutObjectId,
    ) -> RectF {
        let absolute = self.local_to_absolute_rect(id, rect);
        let origin = self.absolute_origin(ancestor);
        absolute.translated(-origin.to_offset())
    }

    /// Border box of `id` in the view's coordinates.
    pub fn absolute_border_box(&self, id: LayoutObjectId) -> RectF {
        let local = self.get(id).map_or(RectF::ZERO, LayoutObject::border_box_rect);
        self.local_to_absolute_rect(id, local)
    }
}

impl LayoutObject {
    fn is_box_but_not_flow_thread(&self) -> bool {
        self.is_box() && !self.is_flow_thread()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ColumnLayout;
    use crate::style::Position;

    fn block(tree: &mut LayoutTree, parent: LayoutObjectId, style: ComputedStyle) -> Result<LayoutObjectId> {
        let id = tree.create_object(LayoutObjectKind::Block, None, style);
        tree.append_child(parent, id)?;
        Ok(id)
    }

    #[test]
    fn absolute_objects_skip_static_ancestors() -> Result<()> {
        let mut tree = LayoutTree::new(SizeF::new(800.0, 600.0));
        let view = tree.view();
        let positioned = block(&mut tree, view, ComputedStyle::default().with_position(Position::Relative))?;
        let plain = block(&mut tree, positioned, ComputedStyle::default())?;
        let absolute = block(&mut tree, plain, ComputedStyle::default().with_position(Position::Absolute))?;

        assert_eq!(tree.container(absolute), Some(positioned));
        assert_eq!(tree.container_skipping(absolute, Some(plain)), (Some(positioned), true));
        assert_eq!(tree.container_skipping(absolute, Some(view)), (Some(positioned), false));
        assert_eq!(tree.container(plain), Some(positioned));
        Ok(())
    }

    #[test]
    fn fixed_objects_do_not_move_with_the_view() -> Result<()> {
        let mut tree = LayoutTree::new(SizeF::new(800.0, 600.0));
        let view = tree.view();
        let flow = block(&mut tree, view, ComputedStyle::default())?;
        tree.set_geometry(flow, PointF::new(0.0, 100.0), SizeF::new(800.0, 50.0))?;
        let fixed = block(&mut tree, flow, ComputedStyle::default().with_position(Position::Fixed))?;
        tree.set_geometry(fixed, PointF::new(10.0, 10.0), SizeF::new(20.0, 20.0))?;
        tree.set_scroll_offset(view, ScrollOffset::new(0.0, 40.0))?;

        assert_eq!(tree.absolute_origin(flow), PointF::new(0.0, 60.0));
        assert_eq!(tree.absolute_origin(fixed), PointF::new(10.0, 10.0));
        Ok(())
    }

    #[test]
    fn nested_scrollers_map_into_ancestor_space() -> Result<()> {
        let mut tree = LayoutTree::new(SizeF::new(800.0, 600.0));
        let view = tree.view();
        let scroller = block(&mut tree, view, ComputedStyle::default().with_overflow(Overflow::Scroll))?;
        tree.set_geometry(scroller, PointF::new(50.0, 50.0), SizeF::new(200.0, 200.0))?;
        let child = block(&mut tree, scroller, ComputedStyle::default())?;
        tree.set_geometry(child, PointF::new(0.0, 300.0), SizeF::new(200.0, 20.0))?;
        tree.set_scroll_offset(scroller, ScrollOffset::new(0.0, 250.0))?;

        let local = tree.map_rect_to_ancestor(child, RectF::new(0.0, 0.0, 200.0, 20.0), scroller);
        assert_eq!(local, RectF::new(0.0, 50.0, 200.0, 20.0));
        assert_eq!(tree.enclosing_scroll_container(child), Some(scroller));
        Ok(())
    }

    #[test]
    fn flow_thread_content_maps_through_columns() -> Result<()> {
        let mut tree = LayoutTree::new(SizeF::new(800.0, 600.0));
        let view = tree.view();
        let columns = ColumnLayout {
            count: 2,
            column_width: 100.0,
            column_height: 50.0,
            gap: 20.0,
        };
        let multicol = tree.create_object(LayoutObjectKind::MultiColumn(columns), None, ComputedStyle::default());
        tree.append_child(view, multicol)?;
        let flow_thread = tree.create_object(LayoutObjectKind::FlowThread, None, ComputedStyle::default());
        tree.append_child(multicol, flow_thread)?;
        let content = block(&mut tree, flow_thread, ComputedStyle::default())?;
        tree.set_geometry(content, PointF::new(0.0, 60.0), SizeF::new(100.0, 10.0))?;

        assert_eq!(tree.absolute_border_box(content), RectF::new(120.0, 10.0, 100.0, 10.0));
        Ok(())
    }

    #[test]
    fn removed_ids_become_stale() -> Result<()> {
        let mut tree = LayoutTree::new(SizeF::new(800.0, 600.0));
        let view = tree.view();
        let parent = block(&mut tree, view, ComputedStyle::default())?;
        let child = block(&mut tree, parent, ComputedStyle::default())?;
        assert_eq!(tree.remove(parent)?, vec![parent, child]);
        assert!(tree.get(child).is_none());
        assert!(tree.object(parent).is_err());
        assert!(tree.remove(view).is_err());
        Ok(())
    }

    #[test]
    fn geometry_changes_mark_style_as_anchor_disabling() -> Result<()> {
        let mut tree = LayoutTree::new(SizeF::new(800.0, 600.0));
        let view = tree.view();
        let id = block(&mut tree, view, ComputedStyle::default())?;
        tree.set_style(id, ComputedStyle::default().with_opacity(0.5))?;
        assert!(!tree.object(id)?.scroll_anchor_disabling_style_changed());
        tree.set_style(id, ComputedStyle::default().with_position(Position::Relative))?;
        assert!(tree.object(id)?.scroll_anchor_disabling_style_changed());
        tree.clear_scroll_anchor_disabling_style_changes();
        assert!(!tree.object(id)?.scroll_anchor_disabling_style_changed());
        Ok(())
    }
}
