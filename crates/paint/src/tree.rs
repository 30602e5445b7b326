//! The paint layer tree arena.
//!
//! Layers mirror the subset of the layout tree that needs its own layer.
//! A layer's tree parent is the nearest layout ancestor with a layer; the
//! containing layer (see [`PaintLayerTree::containing_layer`]) follows
//! containing blocks instead.

use crate::clipper::ClipRectsCache;
use crate::layer::{PaintLayer, PaintLayerId};
use crate::stacking_node::PaintLayerStackingNode;
use anyhow::{Result, anyhow, bail};
use indextree::{Arena, Node};
use log::{debug, trace, warn};
use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::iter;
use strata_layout_tree::{
    ComputedStyle, LayoutObject, LayoutObjectId, LayoutObjectKind, LayoutTree, PaintLayerType,
    Visibility,
};

#[derive(Debug, Default)]
pub struct PaintLayerTree {
    arena: Arena<PaintLayer>,
    root: Option<PaintLayerId>,
    layers_by_object: HashMap<LayoutObjectId, PaintLayerId>,
    pub(crate) clip_rects_cache: RefCell<ClipRectsCache>,
}

impl PaintLayerTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a layer for every layout object that needs one, in layout
    /// tree order, and compute the descendant-dependent flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout tree changes shape under the walk.
    pub fn build_from_layout_tree(layout: &LayoutTree) -> Result<Self> {
        let _span = tracing::debug_span!("build_paint_layer_tree").entered();
        let mut tree = Self::new();
        for object in layout.descendants(layout.view()) {
            if layout.object(object)?.layer_type_required() == PaintLayerType::NoPaintLayer {
                continue;
            }
            let layer = tree.create_layer(layout, object)?;
            if let Some(parent) = tree.enclosing_layer_of_ancestors(layout, object) {
                tree.add_child(layout, parent, layer, None)?;
            }
        }
        tree.update_descendant_dependent_flags(layout);
        debug!("built {} paint layers", tree.len());
        Ok(tree)
    }

    #[inline]
    pub fn root(&self) -> Option<PaintLayerId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.layers_by_object.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers_by_object.is_empty()
    }

    pub fn get(&self, id: PaintLayerId) -> Option<&PaintLayer> {
        self.arena
            .get(id.0)
            .filter(|node| !node.is_removed())
            .map(Node::get)
    }

    pub fn get_mut(&mut self, id: PaintLayerId) -> Option<&mut PaintLayer> {
        self.arena
            .get_mut(id.0)
            .filter(|node| !node.is_removed())
            .map(Node::get_mut)
    }

    fn layer(&self, id: PaintLayerId) -> Result<&PaintLayer> {
        self.get(id).ok_or_else(|| anyhow!("paint layer {id:?} does not exist"))
    }

    pub fn layer_for_object(&self, object: LayoutObjectId) -> Option<PaintLayerId> {
        self.layers_by_object.get(&object).copied()
    }

    pub fn parent(&self, id: PaintLayerId) -> Option<PaintLayerId> {
        self.arena.get(id.0)?.parent().map(PaintLayerId)
    }

    pub fn first_child(&self, id: PaintLayerId) -> Option<PaintLayerId> {
        self.arena.get(id.0)?.first_child().map(PaintLayerId)
    }

    pub fn last_child(&self, id: PaintLayerId) -> Option<PaintLayerId> {
        self.arena.get(id.0)?.last_child().map(PaintLayerId)
    }

    pub fn next_sibling(&self, id: PaintLayerId) -> Option<PaintLayerId> {
        self.arena.get(id.0)?.next_sibling().map(PaintLayerId)
    }

    pub fn previous_sibling(&self, id: PaintLayerId) -> Option<PaintLayerId> {
        self.arena.get(id.0)?.previous_sibling().map(PaintLayerId)
    }

    pub fn children(&self, id: PaintLayerId) -> impl Iterator<Item = PaintLayerId> + '_ {
        id.0.children(&self.arena).map(PaintLayerId)
    }

    /// `id` and everything below it, in pre-order.
    pub fn descendants(&self, id: PaintLayerId) -> Vec<PaintLayerId> {
        id.0.descendants(&self.arena).map(PaintLayerId).collect()
    }

    /// Parent chain starting at the parent of `id`.
    pub fn ancestors(&self, id: PaintLayerId) -> impl Iterator<Item = PaintLayerId> + '_ {
        id.0.ancestors(&self.arena).skip(1).map(PaintLayerId)
    }

    fn object_of<'layout>(&self, layout: &'layout LayoutTree, id: PaintLayerId) -> Option<&'layout LayoutObject> {
        layout.get(self.get(id)?.layout_object())
    }

    /// Nearest strict layout ancestor of `object` that owns a layer.
    fn enclosing_layer_of_ancestors(&self, layout: &LayoutTree, object: LayoutObjectId) -> Option<PaintLayerId> {
        layout
            .ancestors(object)
            .find_map(|ancestor| self.layer_for_object(ancestor))
    }

    /// Create a detached layer for `object`.
    ///
    /// The layer of the view becomes the root.
    ///
    /// # Errors
    ///
    /// Returns an error for stale objects and objects that already have a
    /// layer.
    pub fn create_layer(&mut self, layout: &LayoutTree, object: LayoutObjectId) -> Result<PaintLayerId> {
        let layout_object = layout.object(object)?;
        if let Some(existing) = self.layer_for_object(object) {
            bail!("{object:?} already has paint layer {existing:?}");
        }
        let is_root = layout_object.is_view();
        let layer = PaintLayer::new(object, layout_object.layer_type_required(), is_root);
        let id = PaintLayerId(self.arena.new_node(layer));
        self.layers_by_object.insert(object, id);
        if is_root {
            self.root = Some(id);
        }
        trace!("created paint layer {id:?} for {object:?}");
        Ok(id)
    }

    /// Insert `child` under `parent`, before `before` or last.
    ///
    /// # Errors
    ///
    /// Returns an error for stale ids, an attached `child`, a `before`
    /// that is not a child of `parent`, or an insertion that would create
    /// a cycle.
    pub fn add_child(
        &mut self,
        layout: &LayoutTree,
        parent: PaintLayerId,
        child: PaintLayerId,
        before: Option<PaintLayerId>,
    ) -> Result<()> {
        self.layer(parent)?;
        self.layer(child)?;
        if self.parent(child).is_some() {
            bail!("{child:?} is already attached");
        }
        match before {
            Some(before) => {
                if self.parent(before) != Some(parent) {
                    bail!("{before:?} is not a child of {parent:?}");
                }
                before.0.checked_insert_before(child.0, &mut self.arena)?;
            }
            None => parent.0.checked_append(child.0, &mut self.arena)?,
        }

        if self.is_stacked(layout, child) || self.first_child(child).is_some() {
            self.dirty_stacking_context_z_order_lists(layout, child);
        }
        self.set_needs_descendant_dependent_flags_update(child);
        self.set_needs_repaint(child);
        self.clear_clip_rects_cache(child);
        Ok(())
    }

    /// Detach `child` from `parent`, keeping the child's subtree.
    ///
    /// # Errors
    ///
    /// Returns an error if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, layout: &LayoutTree, parent: PaintLayerId, child: PaintLayerId) -> Result<()> {
        if self.parent(child) != Some(parent) {
            bail!("{child:?} is not a child of {parent:?}");
        }
        if self.is_stacked(layout, child) || self.first_child(child).is_some() {
            self.dirty_stacking_context_z_order_lists(layout, child);
        }
        child.0.detach(&mut self.arena);
        self.set_needs_descendant_dependent_flags_update(parent);
        self.set_needs_repaint(parent);
        self.clear_clip_rects_cache(child);
        Ok(())
    }

    /// Remove `layer` alone, moving its children into its place.
    ///
    /// # Errors
    ///
    /// Returns an error for stale ids and for the root layer.
    pub fn destroy_layer(&mut self, layout: &LayoutTree, layer: PaintLayerId) -> Result<()> {
        let object = self.layer(layer)?.layout_object();
        if self.root == Some(layer) {
            bail!("the root paint layer cannot be destroyed");
        }
        let children: Vec<_> = self.children(layer).collect();
        if let Some(parent) = self.parent(layer) {
            let next = self.next_sibling(layer);
            self.remove_child(layout, parent, layer)?;
            for child in children {
                self.remove_child(layout, layer, child)?;
                self.add_child(layout, parent, child, next)?;
            }
        }
        self.layers_by_object.remove(&object);
        self.clip_rects_cache.borrow_mut().forget_layer(layer);
        layer.0.remove(&mut self.arena);
        trace!("destroyed paint layer {layer:?}");
        Ok(())
    }

    /// Drop the layers of layout objects that were removed from the layout
    /// tree, together with their subtrees.
    pub fn remove_layers_for_removed_objects(&mut self, layout: &LayoutTree, removed: &[LayoutObjectId]) {
        for object in removed {
            let Some(layer) = self.layer_for_object(*object) else {
                continue;
            };
            let detached = self
                .parent(layer)
                .map(|parent| self.remove_child(layout, parent, layer));
            if let Some(Err(error)) = detached {
                warn!("removing {layer:?}: {error}");
            }
            for gone in self.descendants(layer) {
                if let Some(paint_layer) = self.get(gone) {
                    self.layers_by_object.remove(&paint_layer.layout_object());
                }
                self.clip_rects_cache.borrow_mut().forget_layer(gone);
            }
            if self.root == Some(layer) {
                self.root = None;
            }
            layer.0.remove_subtree(&mut self.arena);
        }
    }

    /// Create or destroy the layer of `object` after its style changed.
    ///
    /// Returns the object's layer afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error for stale objects or a new layer with no ancestor
    /// layer to attach to.
    pub fn update_layer_for_object(
        &mut self,
        layout: &LayoutTree,
        object: LayoutObjectId,
    ) -> Result<Option<PaintLayerId>> {
        let required = layout.object(object)?.layer_type_required();
        match (self.layer_for_object(object), required) {
            (None, PaintLayerType::NoPaintLayer) => Ok(None),
            (Some(layer), PaintLayerType::NoPaintLayer) => {
                self.destroy_layer(layout, layer)?;
                Ok(None)
            }
            (Some(layer), layer_type) => {
                if let Some(paint_layer) = self.get_mut(layer) {
                    paint_layer.layer_type = layer_type;
                }
                self.set_needs_descendant_dependent_flags_update(layer);
                Ok(Some(layer))
            }
            (None, _) => self.insert_layer_for_object(layout, object).map(Some),
        }
    }

    fn insert_layer_for_object(&mut self, layout: &LayoutTree, object: LayoutObjectId) -> Result<PaintLayerId> {
        let parent = self
            .enclosing_layer_of_ancestors(layout, object)
            .ok_or_else(|| anyhow!("{object:?} has no ancestor paint layer"))?;
        let layer = self.create_layer(layout, object)?;

        let tree_order: HashMap<LayoutObjectId, usize> = layout
            .descendants(layout.view())
            .into_iter()
            .enumerate()
            .map(|(index, id)| (id, index))
            .collect();
        let position = |id: LayoutObjectId| tree_order.get(&id).copied().unwrap_or(usize::MAX);
        let object_position = position(object);

        let mut adopted = Vec::new();
        let mut before = None;
        for child in self.children(parent) {
            let Some(child_object) = self.get(child).map(PaintLayer::layout_object) else {
                continue;
            };
            if layout.is_descendant_of(child_object, object) {
                adopted.push(child);
            } else if before.is_none() && position(child_object) > object_position {
                before = Some(child);
            }
        }

        self.add_child(layout, parent, layer, before)?;
        for child in adopted {
            self.remove_child(layout, parent, child)?;
            self.add_child(layout, layer, child, None)?;
        }
        Ok(layer)
    }

    /// Dirty z-order lists whose membership or order depends on `layer`'s
    /// style. Returns whether anything was dirtied.
    pub fn style_did_change(
        &mut self,
        layout: &LayoutTree,
        layer: PaintLayerId,
        old_style: Option<&ComputedStyle>,
    ) -> bool {
        let Some(object) = self.object_of(layout, layer) else {
            return false;
        };
        let (was_stacking_context, was_stacked, old_z_index) = old_style.map_or((false, false, 0), |old| {
            (
                object.is_stacking_context_for(old),
                object.is_stacked_for(old),
                if object.is_view() { 0 } else { old.effective_z_index() },
            )
        });
        let unchanged = object.is_stacking_context() == was_stacking_context
            && object.is_stacked() == was_stacked
            && object.effective_z_index() == old_z_index;
        self.set_needs_descendant_dependent_flags_update(layer);
        if unchanged {
            return false;
        }

        self.dirty_stacking_context_z_order_lists(layout, layer);
        if let Some(node) = self.get_mut(layer).and_then(|paint_layer| paint_layer.stacking_node.as_mut()) {
            node.dirty_z_order_lists();
        }
        true
    }

    fn is_stacked(&self, layout: &LayoutTree, id: PaintLayerId) -> bool {
        self.object_of(layout, id).is_none_or(LayoutObject::is_stacked)
    }

    /// The layer of the containing block chain.
    ///
    /// Out-of-flow boxes skip ancestors that cannot contain them; floats
    /// inside inlines and column spanners follow their containing block.
    pub fn containing_layer(&self, layout: &LayoutTree, id: PaintLayerId) -> Option<PaintLayerId> {
        let object_id = self.get(id)?.layout_object();
        let object = layout.get(object_id)?;
        if object.is_out_of_flow_positioned() {
            let can_contain: fn(&LayoutObject) -> bool = if object.is_fixed_positioned() {
                LayoutObject::can_contain_fixed_position_objects
            } else {
                LayoutObject::can_contain_absolute_position_objects
            };
            return self
                .ancestors(id)
                .find(|ancestor| self.object_of(layout, *ancestor).is_some_and(can_contain));
        }

        let parent = self.parent(id);
        let parent_is_block = parent
            .and_then(|parent| self.object_of(layout, parent))
            .is_some_and(is_layout_block);
        if (parent.is_none() || parent_is_block) && !object.style().column_span_all {
            return parent;
        }
        let container = layout.container(object_id)?;
        iter::once(container)
            .chain(layout.ancestors(container))
            .find_map(|ancestor| self.layer_for_object(ancestor))
    }

    /// `id` or its nearest ancestor that paints itself.
    pub fn enclosing_self_painting_layer(&self, id: PaintLayerId) -> Option<PaintLayerId> {
        iter::once(id)
            .chain(self.ancestors(id))
            .find(|layer| self.get(*layer).is_some_and(PaintLayer::is_self_painting_layer))
    }

    /// Nearest strict ancestor whose object is a stacking context.
    pub fn ancestor_stacking_context(&self, layout: &LayoutTree, id: PaintLayerId) -> Option<PaintLayerId> {
        self.ancestors(id).find(|ancestor| {
            self.object_of(layout, *ancestor)
                .is_some_and(LayoutObject::is_stacking_context)
        })
    }

    /// Nearest containing layer that scrolls its overflow.
    pub fn ancestor_scroll_container_layer(&self, layout: &LayoutTree, id: PaintLayerId) -> Option<PaintLayerId> {
        let mut current = self.containing_layer(layout, id);
        while let Some(candidate) = current {
            if self
                .object_of(layout, candidate)
                .is_some_and(LayoutObject::is_scroll_container)
            {
                return Some(candidate);
            }
            current = self.containing_layer(layout, candidate);
        }
        None
    }

    /// Dirty the z-order lists of the stacking context `id` is ordered in.
    pub fn dirty_stacking_context_z_order_lists(&mut self, layout: &LayoutTree, id: PaintLayerId) {
        let Some(context) = self.ancestor_stacking_context(layout, id) else {
            return;
        };
        if let Some(node) = self.get_mut(context).and_then(|layer| layer.stacking_node.as_mut()) {
            node.dirty_z_order_lists();
        }
    }

    /// Mark `id` and its ancestors for [`Self::update_descendant_dependent_flags`].
    pub fn set_needs_descendant_dependent_flags_update(&mut self, id: PaintLayerId) {
        let chain: Vec<_> = iter::once(id).chain(self.ancestors(id)).collect();
        for layer in chain {
            let Some(paint_layer) = self.get_mut(layer) else {
                break;
            };
            if paint_layer.needs_descendant_dependent_flags_update && layer != id {
                break;
            }
            paint_layer.needs_descendant_dependent_flags_update = true;
        }
    }

    /// Mark `id` for repaint and its ancestors as having a descendant that
    /// needs it.
    pub fn set_needs_repaint(&mut self, id: PaintLayerId) {
        if let Some(layer) = self.get_mut(id) {
            layer.needs_repaint = true;
        }
        let ancestors: Vec<_> = self.ancestors(id).collect();
        for ancestor in ancestors {
            let Some(layer) = self.get_mut(ancestor) else {
                break;
            };
            if layer.descendant_needs_repaint {
                break;
            }
            layer.descendant_needs_repaint = true;
        }
    }

    /// Recompute the flags that depend on descendants for every marked
    /// layer, and allocate or drop stacking nodes to match the objects.
    pub fn update_descendant_dependent_flags(&mut self, layout: &LayoutTree) {
        if let Some(root) = self.root {
            self.update_descendant_dependent_flags_for(layout, root);
        }
    }

    fn update_descendant_dependent_flags_for(&mut self, layout: &LayoutTree, id: PaintLayerId) {
        if !self
            .get(id)
            .is_some_and(PaintLayer::needs_descendant_dependent_flags_update)
        {
            return;
        }
        let children: Vec<_> = self.children(id).collect();
        let mut has_visible_descendant = false;
        let mut has_self_painting_layer_descendant = false;
        let mut has_stacked_descendant = false;
        for child in children {
            self.update_descendant_dependent_flags_for(layout, child);
            let Some(child_layer) = self.get(child) else {
                continue;
            };
            has_visible_descendant |= child_layer.has_visible_content || child_layer.has_visible_descendant;
            has_self_painting_layer_descendant |=
                child_layer.is_self_painting || child_layer.has_self_painting_layer_descendant;
            let child_object = self.object_of(layout, child);
            has_stacked_descendant |= child_object.is_some_and(LayoutObject::is_stacked)
                || (!child_object.is_some_and(LayoutObject::is_stacking_context)
                    && child_layer.has_stacked_descendant_in_current_stacking_context);
        }

        let enclosing_pagination_layer = self.ancestors(id).find(|ancestor| {
            self.object_of(layout, *ancestor)
                .is_some_and(LayoutObject::is_flow_thread)
        });
        let object = self.object_of(layout, id);
        let Some(layer) = self.get_mut(id) else {
            return;
        };
        layer.has_visible_descendant = has_visible_descendant;
        layer.has_self_painting_layer_descendant = has_self_painting_layer_descendant;
        layer.has_stacked_descendant_in_current_stacking_context = has_stacked_descendant;
        layer.needs_descendant_dependent_flags_update = false;
        let Some(object) = object else {
            return;
        };

        layer.has_visible_content = object.style().visibility == Visibility::Visible;
        let (scrolls_x, scrolls_y) = object.user_scrollable_axes();
        layer.is_self_painting = layer.layer_type == PaintLayerType::NormalPaintLayer
            || object.has_overlay_overflow_controls()
            || (object.is_scroll_container() && (scrolls_x || scrolls_y));
        match (object.is_stacking_context(), layer.stacking_node.is_some()) {
            (true, false) => layer.stacking_node = Some(Box::new(PaintLayerStackingNode::new())),
            (false, true) => layer.stacking_node = None,
            _ => {}
        }

        let transform = object.style().transform;
        if transform.is_some() || enclosing_pagination_layer.is_some() {
            let rare = layer.ensure_rare_data();
            rare.transform = transform;
            rare.enclosing_pagination_layer = enclosing_pagination_layer;
        } else {
            layer.rare = None;
        }
    }

    /// Rebuild every dirty z-order list.
    ///
    /// `top_layer` lists the top-layer objects bottom-most first.
    pub fn update_z_order_lists(&mut self, layout: &LayoutTree, top_layer: &[LayoutObjectId]) {
        let Some(root) = self.root else {
            return;
        };
        for id in self.descendants(root) {
            let Some(mut node) = self.get_mut(id).and_then(|layer| layer.stacking_node.take()) else {
                continue;
            };
            let reorder = if node.z_order_lists_dirty() {
                node.rebuild_z_order_lists(self, layout, id, top_layer)
            } else {
                Vec::new()
            };
            if let Some(layer) = self.get_mut(id) {
                layer.stacking_node = Some(node);
            }
            for (layer, needs_reorder) in reorder {
                if let Some(paint_layer) = self.get_mut(layer) {
                    paint_layer.needs_reorder_overlay_overflow_controls = needs_reorder;
                }
            }
        }
    }

    /// Whether any stacking node still has dirty lists.
    pub fn has_dirty_z_order_lists(&self) -> bool {
        self.arena
            .iter()
            .filter(|node| !node.is_removed())
            .filter_map(|node| node.get().stacking_node())
            .any(PaintLayerStackingNode::z_order_lists_dirty)
    }

    pub fn clip_rects_cache(&self) -> Ref<'_, ClipRectsCache> {
        self.clip_rects_cache.borrow()
    }

    /// Drop cached clip rects of `id` and its descendants.
    pub fn clear_clip_rects_cache(&self, id: PaintLayerId) {
        let mut cache = self.clip_rects_cache.borrow_mut();
        for layer in self.descendants(id) {
            cache.forget_layer(layer);
        }
    }
}

fn is_layout_block(object: &LayoutObject) -> bool {
    matches!(
        object.kind(),
        LayoutObjectKind::View
            | LayoutObjectKind::Block
            | LayoutObjectKind::InlineBlock
            | LayoutObjectKind::MultiColumn(_)
            | LayoutObjectKind::FlowThread
    )
}
