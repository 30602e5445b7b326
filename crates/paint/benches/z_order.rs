//! Criterion benchmarks for z-order list rebuilds and paint-order walks.
//!
//! Builds a flat tree: the view with N relatively positioned children whose
//! z-indices cycle through negative, zero and positive values, then measures
//! a full rebuild of the root's lists and one walk in paint order.

#![allow(clippy::unwrap_used, reason = "bench code")]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use strata_geometry::{PointF, SizeF};
use strata_layout_tree::{ComputedStyle, Document, LayoutObjectKind, Position};
use strata_paint::{ChildrenFilter, PaintLayerTree, PaintOrderIterator};

fn build_flat_tree(count: i32) -> Document {
    let mut document = Document::new(SizeF::new(1024.0, 768.0));
    let view = document.layout.view();
    for index in 0..count {
        let style = ComputedStyle::default()
            .with_position(Position::Relative)
            .with_z_index(index % 7 - 3);
        let object = document
            .attach_layout_object(None, LayoutObjectKind::Block, style, view)
            .unwrap();
        document
            .layout
            .set_geometry(object, PointF::ZERO, SizeF::new(10.0, 10.0))
            .unwrap();
    }
    document
}

fn bench_z_order(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("z_order");
    for count in [100, 1_000, 5_000] {
        let document = build_flat_tree(count);
        let mut layers = PaintLayerTree::build_from_layout_tree(&document.layout).unwrap();
        let first_child = layers.first_child(layers.root().unwrap()).unwrap();

        group.bench_with_input(BenchmarkId::new("rebuild", count), &count, |bencher, _| {
            bencher.iter(|| {
                layers.dirty_stacking_context_z_order_lists(&document.layout, first_child);
                layers.update_z_order_lists(&document.layout, &[]);
                black_box(layers.has_dirty_z_order_lists());
            });
        });

        let root = layers.root().unwrap();
        group.bench_with_input(BenchmarkId::new("paint_order_walk", count), &count, |bencher, _| {
            bencher.iter(|| {
                let walked = PaintOrderIterator::new(&layers, &document.layout, root, ChildrenFilter::ALL_CHILDREN).count();
                black_box(walked);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_z_order);
criterion_main!(benches);
