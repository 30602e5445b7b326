//! Clip rects of a layer relative to a clipping root.
//!
//! The background rect holds every clip above the layer; the foreground
//! rect adds the layer's own overflow clip and is what descendants are
//! clipped by. Projection between spaces is left to [`GeometryMapper`];
//! this module only chooses which property-tree states bound the query.

use crate::fragment::FragmentData;
use crate::layer::PaintLayerId;
use crate::tree::PaintLayerTree;
use log::{trace, warn};
use std::collections::HashMap;
use strata_geometry::{ClipRect, PointF, RectF, ScrollOffset};
use strata_layout_tree::{LayoutObject, LayoutTree};
use strata_property_trees::{GeometryMapper, PropertyTreeState, PropertyTrees};

/// Width reserved for overlay scrollbars when they are excluded from the
/// overflow clip.
pub const OVERLAY_SCROLLBAR_THICKNESS: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OverlayScrollbarClipBehavior {
    #[default]
    IgnoreOverlayScrollbarSize,
    /// Hit testing must not hit content under overlay scrollbars.
    ExcludeOverlayScrollbarSizeForHitTesting,
}

/// The clipping root and flags of a clip-rect query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRectsContext {
    pub root_layer: PaintLayerId,
    pub root_fragment: FragmentData,
    pub overlay_scrollbar_clip_behavior: OverlayScrollbarClipBehavior,
    /// Whether the root layer's own clips apply to the query.
    pub respect_root_layer_clip: bool,
    pub sub_pixel_accumulation: ScrollOffset,
}

impl ClipRectsContext {
    pub fn new(root_layer: PaintLayerId, root_fragment: FragmentData) -> Self {
        Self {
            root_layer,
            root_fragment,
            overlay_scrollbar_clip_behavior: OverlayScrollbarClipBehavior::default(),
            respect_root_layer_clip: true,
            sub_pixel_accumulation: ScrollOffset::ZERO,
        }
    }

    /// A context rooted at the first fragment of `root_layer`.
    pub fn for_layer(tree: &PaintLayerTree, root_layer: PaintLayerId) -> Option<Self> {
        let fragment = *tree.get(root_layer)?.first_fragment()?;
        Some(Self::new(root_layer, fragment))
    }

    #[must_use]
    pub fn ignoring_root_layer_clip(mut self) -> Self {
        self.respect_root_layer_clip = false;
        self
    }

    #[must_use]
    pub fn with_overlay_scrollbar_clip_behavior(mut self, behavior: OverlayScrollbarClipBehavior) -> Self {
        self.overlay_scrollbar_clip_behavior = behavior;
        self
    }

    #[must_use]
    pub fn with_sub_pixel_accumulation(mut self, accumulation: ScrollOffset) -> Self {
        self.sub_pixel_accumulation = accumulation;
        self
    }

    fn cache_flags(&self) -> u8 {
        let mut flags = 0;
        if self.respect_root_layer_clip {
            flags |= 1;
        }
        if self.overlay_scrollbar_clip_behavior
            == OverlayScrollbarClipBehavior::ExcludeOverlayScrollbarSizeForHitTesting
        {
            flags |= 1 << 1;
        }
        flags
    }
}

/// Clip rects of one fragment, in the root layer's space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerClipRects {
    /// Origin of the fragment's border box.
    pub layer_offset: PointF,
    pub layer_bounds: RectF,
    pub background_rect: ClipRect,
    pub foreground_rect: ClipRect,
    /// The foreground clip only exists so mask painting of embedded
    /// content has a rounded clip to intersect with.
    pub foreground_clips_masks_only: bool,
}

impl LayerClipRects {
    /// The clip for descendants painted in a normal or a mask phase.
    pub fn foreground_rect_for_phase(&self, painting_mask: bool) -> ClipRect {
        if self.foreground_clips_masks_only && !painting_mask {
            self.background_rect
        } else {
            self.foreground_rect
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ClipRectsCacheKey {
    layer: PaintLayerId,
    root_layer: PaintLayerId,
    fragment_index: u32,
    root_fragment_index: u32,
    flags: u8,
}

/// Clip rects keyed by layer, root, fragment and flags, valid for one
/// property-tree generation.
#[derive(Debug, Default)]
pub struct ClipRectsCache {
    entries: HashMap<ClipRectsCacheKey, (u64, LayerClipRects)>,
}

impl ClipRectsCache {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop entries computed for `layer` or rooted at it.
    pub(crate) fn forget_layer(&mut self, layer: PaintLayerId) {
        self.entries
            .retain(|key, _| key.layer != layer && key.root_layer != layer);
    }

    fn get(&self, key: &ClipRectsCacheKey, generation: u64) -> Option<LayerClipRects> {
        self.entries
            .get(key)
            .filter(|(cached_generation, _)| *cached_generation == generation)
            .map(|(_, rects)| *rects)
    }

    fn insert(&mut self, key: ClipRectsCacheKey, generation: u64, rects: LayerClipRects) {
        self.entries.insert(key, (generation, rects));
    }
}

/// Computes clip rects for one layer.
pub struct PaintLayerClipper<'tree> {
    tree: &'tree PaintLayerTree,
    layout: &'tree LayoutTree,
    properties: &'tree PropertyTrees,
    layer: PaintLayerId,
}

impl<'tree> PaintLayerClipper<'tree> {
    pub fn new(
        tree: &'tree PaintLayerTree,
        layout: &'tree LayoutTree,
        properties: &'tree PropertyTrees,
        layer: PaintLayerId,
    ) -> Self {
        Self {
            tree,
            layout,
            properties,
            layer,
        }
    }

    fn object(&self) -> Option<&'tree LayoutObject> {
        self.layout.get(self.tree.get(self.layer)?.layout_object())
    }

    /// Property-tree state the clips above the layer are accumulated up to.
    fn destination_state(context: &ClipRectsContext) -> Option<PropertyTreeState> {
        let root = context.root_fragment.local_border_box_properties()?;
        if context.respect_root_layer_clip {
            return context.root_fragment.pre_clip_properties();
        }
        Some(PropertyTreeState::new(
            root.transform,
            context.root_fragment.contents_clip()?,
            root.effect,
        ))
    }

    fn should_clip_overflow_along_either_axis(&self, context: &ClipRectsContext, object: &LayoutObject) -> bool {
        if self.layer == context.root_layer && !context.respect_root_layer_clip {
            return false;
        }
        object.should_clip_overflow_along_either_axis() || Self::clips_for_masks_only(object)
    }

    /// Embedded content with rounded corners always gets a foreground
    /// clip for its mask, overflow or not.
    fn clips_for_masks_only(object: &LayoutObject) -> bool {
        object.is_layout_embedded_content()
            && object.has_border_radius()
            && !object.should_clip_overflow_along_either_axis()
    }

    /// The layer's paintable area. The view covers at least the viewport,
    /// which can outgrow its overflow when browser controls move.
    fn local_visual_rect(object: &LayoutObject) -> RectF {
        let visual = object.visual_overflow_rect();
        if object.is_view() {
            return visual.union(&object.border_box_rect());
        }
        visual
    }

    fn layer_offset(&self, context: &ClipRectsContext, fragment: &FragmentData) -> Option<PointF> {
        let local = fragment.local_border_box_properties()?;
        let root = context.root_fragment.local_border_box_properties()?;
        let mut offset = fragment.paint_offset;
        if self.layer != context.root_layer {
            offset = GeometryMapper::source_to_destination_projection(self.properties, local.transform, root.transform)
                .map_point(offset);
        }
        Some(offset - context.root_fragment.paint_offset.to_offset() + context.sub_pixel_accumulation)
    }

    fn background_clip_rect(&self, context: &ClipRectsContext, fragment: &FragmentData) -> Option<ClipRect> {
        let source = fragment.local_border_box_properties()?;
        let destination = Self::destination_state(context)?;
        if self.layer == context.root_layer && !context.respect_root_layer_clip {
            return Some(ClipRect::infinite());
        }
        let mut clip = ClipRect::from(GeometryMapper::local_to_ancestor_clip_rect(
            self.properties,
            &source,
            &destination,
        ));
        clip.move_by(context.sub_pixel_accumulation - context.root_fragment.paint_offset.to_offset());
        Some(clip)
    }

    /// Background and foreground rects of `fragment`.
    ///
    /// Returns `None`, computing nothing, when pre-paint has not produced
    /// property-tree state for the fragment or the root.
    pub fn calculate_rects(&self, context: &ClipRectsContext, fragment: &FragmentData) -> Option<LayerClipRects> {
        let key = ClipRectsCacheKey {
            layer: self.layer,
            root_layer: context.root_layer,
            fragment_index: fragment.fragment_index,
            root_fragment_index: context.root_fragment.fragment_index,
            flags: context.cache_flags(),
        };
        let cacheable = context.sub_pixel_accumulation.is_zero();
        let generation = self.properties.generation();
        let cached = cacheable
            .then(|| self.tree.clip_rects_cache.borrow().get(&key, generation))
            .flatten();
        if cached.is_some() {
            return cached;
        }

        let rects = self.compute_rects(context, fragment)?;
        if cacheable {
            self.tree.clip_rects_cache.borrow_mut().insert(key, generation, rects);
        }
        Some(rects)
    }

    fn compute_rects(&self, context: &ClipRectsContext, fragment: &FragmentData) -> Option<LayerClipRects> {
        if !fragment.has_local_border_box_properties() || !context.root_fragment.has_local_border_box_properties() {
            warn!("{:?} has no property-tree state yet; skipping clip rects", self.layer);
            return None;
        }
        let _span = tracing::trace_span!("calculate_rects", layer = ?self.layer).entered();
        let object = self.object()?;
        let layer_offset = self.layer_offset(context, fragment)?;
        let layer_bounds = RectF::from_origin_size(layer_offset, object.size);
        let mut background_rect = self.background_clip_rect(context, fragment)?;
        let mut foreground_rect = background_rect;
        let mut foreground_clips_masks_only = false;

        if self.should_clip_overflow_along_either_axis(context, object) {
            let mut overflow_clip = if Self::clips_for_masks_only(object) {
                foreground_clips_masks_only = true;
                object.border_box_rect()
            } else {
                object.overflow_clip_rect()
            };
            if context.overlay_scrollbar_clip_behavior
                == OverlayScrollbarClipBehavior::ExcludeOverlayScrollbarSizeForHitTesting
                && object.is_scroll_container()
                && object.style().overlay_scrollbars
            {
                overflow_clip.width = (overflow_clip.width - OVERLAY_SCROLLBAR_THICKNESS).max(0.0);
                overflow_clip.height = (overflow_clip.height - OVERLAY_SCROLLBAR_THICKNESS).max(0.0);
            }
            foreground_rect.intersect_rect(&overflow_clip.translated(layer_offset.to_offset()));
            if object.has_border_radius() {
                foreground_rect.set_has_radius(true);
            }
        }

        if !background_rect.is_infinite() {
            let bounds = Self::local_visual_rect(object).translated(layer_offset.to_offset());
            background_rect.intersect_rect(&bounds);
        }
        trace!(
            "{:?}: background {:?}, foreground {:?}",
            self.layer,
            background_rect.rect(),
            foreground_rect.rect()
        );
        Some(LayerClipRects {
            layer_offset,
            layer_bounds,
            background_rect,
            foreground_rect,
            foreground_clips_masks_only,
        })
    }

    /// Clips above the layer's first fragment, in the root's space.
    pub fn calculate_background_clip_rect(&self, context: &ClipRectsContext) -> Option<ClipRect> {
        let fragment = self.tree.get(self.layer)?.first_fragment()?;
        let mut background = self.background_clip_rect(context, fragment)?;
        if background.is_infinite() {
            return Some(background);
        }
        let object = self.object()?;
        let offset = self.layer_offset(context, fragment)?;
        background.intersect_rect(&Self::local_visual_rect(object).translated(offset.to_offset()));
        Some(background)
    }

    /// The clips between the layer and `clipping_root`, in the layer's own
    /// border-box space. Infinite when nothing clips.
    pub fn local_clip_rect(&self, clipping_root: PaintLayerId) -> Option<RectF> {
        let context = ClipRectsContext::for_layer(self.tree, clipping_root)?;
        let clip = self.calculate_background_clip_rect(&context)?;
        if clip.is_infinite() {
            return Some(*clip.rect());
        }
        let fragment = self.tree.get(self.layer)?.first_fragment()?;
        let local = fragment.local_border_box_properties()?;
        let root = context.root_fragment.local_border_box_properties()?;
        let in_root_space = clip
            .rect()
            .translated(context.root_fragment.paint_offset.to_offset());
        let projection = GeometryMapper::source_to_destination_projection(self.properties, root.transform, local.transform);
        Some(
            projection
                .map_rect(&in_root_space)
                .translated(-fragment.paint_offset.to_offset()),
        )
    }
}
