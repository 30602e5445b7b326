//! Pre-paint: property trees and per-fragment geometry.
//!
//! Walks the layout tree in pre-order. Every object is placed in the
//! contents context of its container, so an absolutely positioned box
//! escapes the clips of static ancestors between it and its containing
//! block. Objects with a paint layer get their [`FragmentData`] written.

use crate::fragment::FragmentData;
use crate::tree::PaintLayerTree;
use log::{debug, warn};
use smallvec::SmallVec;
use std::collections::HashMap;
use strata_geometry::{PointF, Transform2D};
use strata_layout_tree::{ColumnLayout, LayoutObject, LayoutObjectId, LayoutTree};
use strata_property_trees::{
    ClipKind, ClipNodeId, EffectNodeId, PropertyTreeState, PropertyTrees, TransformKind,
    TransformNodeId,
};

#[derive(Debug, Clone, Copy, PartialEq)]
struct PaintContext {
    transform: TransformNodeId,
    clip: ClipNodeId,
    effect: EffectNodeId,
    /// Border-box origin in `transform` space.
    paint_offset: PointF,
}

impl PaintContext {
    const fn state(&self) -> PropertyTreeState {
        PropertyTreeState::new(self.transform, self.clip, self.effect)
    }
}

#[derive(Debug, Clone, Copy)]
struct ObjectContexts {
    border_box: PaintContext,
    contents: PaintContext,
}

/// Builds property trees for one frame.
pub struct PrePaintTreeBuilder<'tree> {
    layout: &'tree LayoutTree,
    properties: &'tree mut PropertyTrees,
    contexts: HashMap<LayoutObjectId, ObjectContexts>,
}

impl<'tree> PrePaintTreeBuilder<'tree> {
    pub fn new(layout: &'tree LayoutTree, properties: &'tree mut PropertyTrees) -> Self {
        Self {
            layout,
            properties,
            contexts: HashMap::new(),
        }
    }

    /// Walk the whole layout tree under `root_state` and store the
    /// fragments of every layer.
    pub fn update(mut self, layers: &mut PaintLayerTree, root_state: PropertyTreeState) {
        let _span = tracing::info_span!("pre_paint").entered();
        let root = PaintContext {
            transform: root_state.transform,
            clip: root_state.clip,
            effect: root_state.effect,
            paint_offset: PointF::ZERO,
        };
        let layout = self.layout;
        let mut written = 0_usize;
        for id in layout.descendants(layout.view()) {
            let Some(object) = layout.get(id) else {
                continue;
            };
            let fragments = self.build_object(id, object, root);
            if let Some(layer) = layers.layer_for_object(id).and_then(|layer| layers.get_mut(layer)) {
                layer.fragments = fragments;
                written += 1;
            }
        }
        debug!(
            "pre-paint wrote {written} layers, {} transform and {} clip nodes",
            self.properties.transform_count(),
            self.properties.clip_count()
        );
    }

    /// The context `id` is placed in, and the multi-column layout its
    /// container fragments it with.
    fn placement(
        &self,
        id: LayoutObjectId,
        object: &LayoutObject,
        root: PaintContext,
    ) -> (PaintContext, Option<ColumnLayout>) {
        let Some(container) = self.layout.container(id) else {
            return (root, None);
        };
        let Some(contexts) = self.contexts.get(&container) else {
            warn!("{id:?} is placed before its container {container:?}");
            return (root, None);
        };
        let container_object = self.layout.get(container);
        if container_object.is_some_and(LayoutObject::is_view) && object.is_fixed_positioned() {
            return (contexts.border_box, None);
        }
        let columns = container_object
            .filter(|container_object| container_object.is_flow_thread())
            .and_then(|_| self.layout.container(container))
            .and_then(|multicol| self.layout.get(multicol))
            .and_then(LayoutObject::column_layout);
        (contexts.contents, columns)
    }

    fn build_object(
        &mut self,
        id: LayoutObjectId,
        object: &LayoutObject,
        root: PaintContext,
    ) -> SmallVec<FragmentData, 1> {
        let (parent, columns) = self.placement(id, object, root);
        let location = object.location.to_offset();
        let mut fragments = SmallVec::new();

        let Some(columns) = columns else {
            let mut context = parent;
            context.paint_offset = parent.paint_offset + location;
            let (fragment, contexts) = self.build_fragment(object, context, 0);
            self.contexts.insert(id, contexts);
            fragments.push(fragment);
            return fragments;
        };

        let flow_thread_rect = object.border_box_rect().translated(location);
        for (index, _) in columns.fragments(&flow_thread_rect) {
            let mut context = parent;
            let column_clip = columns
                .flow_thread_to_visual(&columns.flow_thread_portion(index))
                .translated(parent.paint_offset.to_offset());
            context.clip = self.properties.add_clip(
                parent.clip,
                parent.transform,
                column_clip,
                false,
                ClipKind::FragmentClip,
            );
            context.paint_offset = parent.paint_offset + location + columns.column_translation(index);
            let (fragment, contexts) = self.build_fragment(object, context, index);
            // Descendants of a fragmented box are placed in its first fragment.
            self.contexts.entry(id).or_insert(contexts);
            fragments.push(fragment);
        }
        fragments
    }

    fn build_fragment(
        &mut self,
        object: &LayoutObject,
        placed: PaintContext,
        fragment_index: u32,
    ) -> (FragmentData, ObjectContexts) {
        let style = object.style();
        let mut context = placed;
        if let Some(transform) = style.transform {
            let matrix = Transform2D::from_offset(context.paint_offset.to_offset()).multiply(&transform);
            context.transform = self
                .properties
                .add_transform(context.transform, matrix, TransformKind::CssTransform);
            context.paint_offset = PointF::ZERO;
        }

        let pre_clip = context.clip;
        let pre_effect = context.effect;
        let offset = context.paint_offset.to_offset();
        if let Some(clip) = object.css_clip() {
            context.clip = self.properties.add_clip(
                context.clip,
                context.transform,
                clip.translated(offset),
                false,
                ClipKind::CssClip,
            );
        }
        if style.opacity < 1.0 {
            context.effect = self
                .properties
                .add_effect(context.effect, context.transform, context.clip, style.opacity);
        }
        let border_box = context;

        let mut contents = context;
        if object.should_clip_overflow_along_either_axis() {
            contents.clip = self.properties.add_clip(
                contents.clip,
                contents.transform,
                object.overflow_clip_rect().translated(offset),
                object.has_border_radius(),
                ClipKind::OverflowClip,
            );
        }
        if object.is_scroll_container() {
            contents.transform = self.properties.add_transform(
                contents.transform,
                Transform2D::from_offset(-object.scroll_offset),
                TransformKind::ScrollTranslation,
            );
        }

        let fragment = FragmentData::new(
            fragment_index,
            border_box.paint_offset,
            border_box.state(),
            pre_clip,
            pre_effect,
            contents.state(),
        );
        (fragment, ObjectContexts { border_box, contents })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test code")]
mod tests {
    use super::*;
    use strata_geometry::{RectF, ScrollOffset, SizeF};
    use strata_property_trees::GeometryMapper;
    use strata_layout_tree::{ComputedStyle, Document, LayoutObjectKind, Overflow, Position};

    fn positioned(document: &mut Document, parent: LayoutObjectId, location: PointF) -> LayoutObjectId {
        let object = document
            .attach_layout_object(
                None,
                LayoutObjectKind::Block,
                ComputedStyle::default().with_position(Position::Relative),
                parent,
            )
            .unwrap();
        document
            .layout
            .set_geometry(object, location, SizeF::new(50.0, 50.0))
            .unwrap();
        object
    }

    #[test]
    fn paint_offsets_accumulate_and_scroll_translation_applies_to_contents() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut document = Document::new(SizeF::new(400.0, 400.0));
        let view = document.layout.view();
        let scroller = document
            .attach_layout_object(
                None,
                LayoutObjectKind::Block,
                ComputedStyle::default().with_overflow(Overflow::Auto),
                view,
            )
            .unwrap();
        document
            .layout
            .set_geometry(scroller, PointF::new(10.0, 20.0), SizeF::new(100.0, 100.0))
            .unwrap();
        document
            .layout
            .set_overflow(scroller, None, Some(RectF::new(0.0, 0.0, 100.0, 400.0)))
            .unwrap();
        document
            .layout
            .set_scroll_offset(scroller, ScrollOffset::new(0.0, 30.0))
            .unwrap();
        let child = positioned(&mut document, scroller, PointF::new(5.0, 5.0));

        let mut layers = PaintLayerTree::build_from_layout_tree(&document.layout).unwrap();
        let mut properties = PropertyTrees::new();
        PrePaintTreeBuilder::new(&document.layout, &mut properties).update(&mut layers, PropertyTreeState::ROOT);

        let scroller_fragment = *layers
            .get(layers.layer_for_object(scroller).unwrap())
            .unwrap()
            .first_fragment()
            .unwrap();
        assert_eq!(scroller_fragment.paint_offset, PointF::new(10.0, 20.0));
        let child_fragment = *layers
            .get(layers.layer_for_object(child).unwrap())
            .unwrap()
            .first_fragment()
            .unwrap();
        assert_eq!(child_fragment.paint_offset, PointF::new(15.0, 25.0));
        let child_state = child_fragment.local_border_box_properties().unwrap();
        assert_eq!(Some(child_state), scroller_fragment.contents_properties());
        let projection = GeometryMapper::source_to_destination_projection(
            &properties,
            child_state.transform,
            TransformNodeId::ROOT,
        );
        assert_eq!(projection.map_point(child_fragment.paint_offset), PointF::new(15.0, -5.0));
    }

    #[test]
    fn column_fragments_are_offset_by_width_and_gap() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut document = Document::new(SizeF::new(400.0, 400.0));
        let view = document.layout.view();
        let columns = ColumnLayout {
            count: 2,
            column_width: 100.0,
            column_height: 100.0,
            gap: 10.0,
        };
        let multicol = document
            .attach_layout_object(None, LayoutObjectKind::MultiColumn(columns), ComputedStyle::default(), view)
            .unwrap();
        let flow_thread = document
            .attach_layout_object(None, LayoutObjectKind::FlowThread, ComputedStyle::default(), multicol)
            .unwrap();
        let spanning = document
            .attach_layout_object(
                None,
                LayoutObjectKind::Block,
                ComputedStyle::default().with_position(Position::Relative),
                flow_thread,
            )
            .unwrap();
        document
            .layout
            .set_geometry(spanning, PointF::new(0.0, 80.0), SizeF::new(100.0, 40.0))
            .unwrap();

        let mut layers = PaintLayerTree::build_from_layout_tree(&document.layout).unwrap();
        let mut properties = PropertyTrees::new();
        PrePaintTreeBuilder::new(&document.layout, &mut properties).update(&mut layers, PropertyTreeState::ROOT);

        let layer = layers.get(layers.layer_for_object(spanning).unwrap()).unwrap();
        let fragments = layer.fragments();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].paint_offset, PointF::new(0.0, 80.0));
        assert_eq!(fragments[1].paint_offset, PointF::new(110.0, -20.0));
        assert_eq!(fragments[1].fragment_index, 1);
        assert_ne!(fragments[0].pre_clip, fragments[1].pre_clip);
        assert!(layer.enclosing_pagination_layer().is_some());
    }
}
