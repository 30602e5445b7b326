#![allow(clippy::unwrap_used, reason = "test code")]

use strata_geometry::{PointF, RectF, SizeF};
use strata_layout_tree::{ComputedStyle, Document, LayoutObjectId, LayoutObjectKind, Overflow, Position};
use strata_paint::{
    ClipRectsContext, FragmentData, OverlayScrollbarClipBehavior, PaintLayerClipper, PaintLayerTree,
    PrePaintTreeBuilder,
};
use strata_property_trees::{PropertyTreeState, PropertyTrees};

fn block(
    document: &mut Document,
    parent: LayoutObjectId,
    style: ComputedStyle,
    location: PointF,
    size: SizeF,
) -> LayoutObjectId {
    let object = document
        .attach_layout_object(None, LayoutObjectKind::Block, style, parent)
        .unwrap();
    document.layout.set_geometry(object, location, size).unwrap();
    object
}

fn hidden() -> ComputedStyle {
    ComputedStyle::default().with_overflow(Overflow::Hidden)
}

fn relative() -> ComputedStyle {
    ComputedStyle::default().with_position(Position::Relative)
}

struct Painted {
    document: Document,
    layers: PaintLayerTree,
    properties: PropertyTrees,
}

impl Painted {
    fn new(document: Document) -> Self {
        let mut layers = PaintLayerTree::build_from_layout_tree(&document.layout).unwrap();
        let mut properties = PropertyTrees::new();
        PrePaintTreeBuilder::new(&document.layout, &mut properties).update(&mut layers, PropertyTreeState::ROOT);
        Self {
            document,
            layers,
            properties,
        }
    }

    fn clipper(&self, object: LayoutObjectId) -> PaintLayerClipper<'_> {
        let layer = self.layers.layer_for_object(object).unwrap();
        PaintLayerClipper::new(&self.layers, &self.document.layout, &self.properties, layer)
    }

    fn root_context(&self) -> ClipRectsContext {
        ClipRectsContext::for_layer(&self.layers, self.layers.root().unwrap()).unwrap()
    }

    fn fragment(&self, object: LayoutObjectId) -> FragmentData {
        let layer = self.layers.layer_for_object(object).unwrap();
        *self.layers.get(layer).unwrap().first_fragment().unwrap()
    }
}

fn contains(outer: &RectF, inner: &RectF) -> bool {
    inner.x >= outer.x
        && inner.y >= outer.y
        && inner.max_x() <= outer.max_x()
        && inner.max_y() <= outer.max_y()
}

fn nested_clippers() -> (Painted, [LayoutObjectId; 3]) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut document = Document::new(SizeF::new(400.0, 400.0));
    let view = document.layout.view();
    let outer = block(&mut document, view, hidden(), PointF::new(10.0, 10.0), SizeF::new(200.0, 200.0));
    let inner = block(&mut document, outer, hidden(), PointF::new(20.0, 20.0), SizeF::new(100.0, 100.0));
    let leaf = block(&mut document, inner, relative(), PointF::ZERO, SizeF::new(300.0, 300.0));
    (Painted::new(document), [outer, inner, leaf])
}

#[test]
fn nested_overflow_clips_narrow_toward_the_leaf() {
    let (painted, [outer, inner, leaf]) = nested_clippers();
    let context = painted.root_context();

    let outer_rects = painted
        .clipper(outer)
        .calculate_rects(&context, &painted.fragment(outer))
        .unwrap();
    assert_eq!(*outer_rects.foreground_rect.rect(), RectF::new(10.0, 10.0, 200.0, 200.0));
    assert_eq!(outer_rects.layer_offset, PointF::new(10.0, 10.0));

    let inner_rects = painted
        .clipper(inner)
        .calculate_rects(&context, &painted.fragment(inner))
        .unwrap();
    assert_eq!(*inner_rects.background_rect.rect(), RectF::new(30.0, 30.0, 100.0, 100.0));
    assert_eq!(*inner_rects.foreground_rect.rect(), RectF::new(30.0, 30.0, 100.0, 100.0));

    let leaf_rects = painted
        .clipper(leaf)
        .calculate_rects(&context, &painted.fragment(leaf))
        .unwrap();
    assert_eq!(*leaf_rects.background_rect.rect(), RectF::new(30.0, 30.0, 100.0, 100.0));
    assert!(contains(outer_rects.foreground_rect.rect(), inner_rects.foreground_rect.rect()));
    assert!(contains(inner_rects.foreground_rect.rect(), leaf_rects.background_rect.rect()));
}

#[test]
fn nothing_clips_when_the_root_clip_is_ignored() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut document = Document::new(SizeF::new(400.0, 400.0));
    let view = document.layout.view();
    let free = block(&mut document, view, relative(), PointF::new(5.0, 5.0), SizeF::new(50.0, 50.0));
    let clipping = block(&mut document, view, hidden(), PointF::new(100.0, 0.0), SizeF::new(50.0, 50.0));
    let painted = Painted::new(document);
    let context = painted.root_context().ignoring_root_layer_clip();

    let free_rects = painted
        .clipper(free)
        .calculate_rects(&context, &painted.fragment(free))
        .unwrap();
    assert!(free_rects.background_rect.is_infinite());
    assert!(free_rects.foreground_rect.is_infinite());

    let clipping_rects = painted
        .clipper(clipping)
        .calculate_rects(&context, &painted.fragment(clipping))
        .unwrap();
    assert!(clipping_rects.background_rect.is_infinite());
    assert_eq!(
        *clipping_rects.foreground_rect.rect(),
        RectF::new(100.0, 0.0, 50.0, 50.0)
    );

    let root = painted.layers.root().unwrap();
    let root_rects = PaintLayerClipper::new(&painted.layers, &painted.document.layout, &painted.properties, root)
        .calculate_rects(&context, &context.root_fragment)
        .unwrap();
    assert!(root_rects.foreground_rect.is_infinite());
}

#[test]
fn rounded_overflow_clips_carry_the_radius_bit() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut document = Document::new(SizeF::new(400.0, 400.0));
    let view = document.layout.view();
    let rounded = block(
        &mut document,
        view,
        hidden().with_border_radius(8.0),
        PointF::ZERO,
        SizeF::new(50.0, 50.0),
    );
    let painted = Painted::new(document);
    let rects = painted
        .clipper(rounded)
        .calculate_rects(&painted.root_context(), &painted.fragment(rounded))
        .unwrap();
    assert!(rects.foreground_rect.has_radius());
    assert!(!rects.background_rect.has_radius());
}

#[test]
fn hit_testing_excludes_overlay_scrollbars() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut document = Document::new(SizeF::new(400.0, 400.0));
    let view = document.layout.view();
    let mut style = ComputedStyle::default().with_overflow(Overflow::Auto);
    style.overlay_scrollbars = true;
    let scroller = block(&mut document, view, style, PointF::ZERO, SizeF::new(100.0, 100.0));
    let painted = Painted::new(document);
    let context = painted
        .root_context()
        .with_overlay_scrollbar_clip_behavior(OverlayScrollbarClipBehavior::ExcludeOverlayScrollbarSizeForHitTesting);
    let rects = painted
        .clipper(scroller)
        .calculate_rects(&context, &painted.fragment(scroller))
        .unwrap();
    assert_eq!(*rects.foreground_rect.rect(), RectF::new(0.0, 0.0, 90.0, 90.0));
}

#[test]
fn local_clip_rect_is_in_the_layer_space() {
    let (painted, [outer, _, leaf]) = nested_clippers();
    let outer_layer = painted.layers.layer_for_object(outer).unwrap();
    let local = painted.clipper(leaf).local_clip_rect(outer_layer).unwrap();
    // The inner clip at (30, 30) in root space starts at the leaf origin.
    assert_eq!(local, RectF::new(0.0, 0.0, 100.0, 100.0));
}

#[test]
fn cached_rects_are_reused_until_invalidated() {
    let (painted, [_, inner, _]) = nested_clippers();
    let context = painted.root_context();
    let clipper = painted.clipper(inner);
    let first = clipper.calculate_rects(&context, &painted.fragment(inner)).unwrap();
    assert!(!painted.layers.clip_rects_cache().is_empty());
    assert_eq!(clipper.calculate_rects(&context, &painted.fragment(inner)), Some(first));

    painted
        .layers
        .clear_clip_rects_cache(painted.layers.root().unwrap());
    assert!(painted.layers.clip_rects_cache().is_empty());
}

#[test]
fn layers_without_pre_paint_state_report_nothing() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut document = Document::new(SizeF::new(400.0, 400.0));
    let view = document.layout.view();
    let object = block(&mut document, view, relative(), PointF::ZERO, SizeF::new(10.0, 10.0));
    let layers = PaintLayerTree::build_from_layout_tree(&document.layout).unwrap();
    let properties = PropertyTrees::new();
    let layer = layers.layer_for_object(object).unwrap();
    let root = layers.root().unwrap();

    assert!(ClipRectsContext::for_layer(&layers, root).is_none());
    let context = ClipRectsContext::new(root, FragmentData::without_properties(0, PointF::ZERO));
    let clipper = PaintLayerClipper::new(&layers, &document.layout, &properties, layer);
    assert!(
        clipper
            .calculate_rects(&context, &FragmentData::without_properties(0, PointF::ZERO))
            .is_none()
    );
    assert!(clipper.local_clip_rect(root).is_none());
}
