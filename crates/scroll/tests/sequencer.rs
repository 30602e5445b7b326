#![allow(clippy::unwrap_used, reason = "test code")]

use std::cell::RefCell;
use std::rc::Rc;
use strata_geometry::{PointF, RectF, ScrollOffset, SizeF};
use strata_layout_tree::{ComputedStyle, Document, LayoutObjectKind, Overflow};
use strata_scroll::{
    BoxScroller, ScrollAlignment, ScrollBehavior, ScrollEventQueue, ScrollGranularity,
    ScrollIntoViewParams, ScrollType, ScrollableArea, SmoothScrollSequencer, service_scroll_animation,
};

fn scrollers() -> (Rc<RefCell<BoxScroller>>, Rc<RefCell<BoxScroller>>, Rc<RefCell<SmoothScrollSequencer>>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut document = Document::new(SizeF::new(400.0, 400.0));
    let view = document.layout.view();
    let mut boxes = Vec::new();
    for index in 0..2 {
        let object = document
            .attach_layout_object(
                None,
                LayoutObjectKind::Block,
                ComputedStyle::default().with_overflow(Overflow::Auto),
                view,
            )
            .unwrap();
        document
            .layout
            .set_geometry(object, PointF::new(0.0, index as f32 * 100.0), SizeF::new(100.0, 100.0))
            .unwrap();
        document
            .layout
            .set_overflow(object, None, Some(RectF::new(0.0, 0.0, 100.0, 500.0)))
            .unwrap();
        boxes.push(object);
    }
    let document = Rc::new(RefCell::new(document));
    let sequencer = SmoothScrollSequencer::new();
    let events = ScrollEventQueue::new();
    let first = BoxScroller::new(&document, boxes[0], events.clone()).unwrap();
    let second = BoxScroller::new(&document, boxes[1], events).unwrap();
    for scroller in [&first, &second] {
        scroller
            .borrow_mut()
            .set_smooth_scroll_sequencer(Some(Rc::clone(&sequencer)));
    }
    (first, second, sequencer)
}

fn sequenced() -> ScrollIntoViewParams {
    ScrollIntoViewParams {
        align_y: ScrollAlignment::Start,
        behavior: ScrollBehavior::Smooth,
        is_for_scroll_sequence: true,
        ..ScrollIntoViewParams::default()
    }
}

#[test]
fn queued_scrolls_run_one_after_another() {
    let (first, second, sequencer) = scrollers();
    first
        .borrow_mut()
        .scroll_into_view(&RectF::new(0.0, 200.0, 10.0, 10.0), &sequenced());
    second
        .borrow_mut()
        .scroll_into_view(&RectF::new(0.0, 300.0, 10.0, 10.0), &sequenced());
    assert_eq!(sequencer.borrow().len(), 2);
    assert_eq!(first.borrow().scroll_offset(), ScrollOffset::ZERO);

    SmoothScrollSequencer::run_queued_animations(&sequencer);
    assert!(first.borrow().has_running_animation());
    assert!(!second.borrow().has_running_animation());

    let first_area: Rc<RefCell<dyn ScrollableArea>> = Rc::<RefCell<BoxScroller>>::clone(&first);
    assert!(service_scroll_animation(&first_area, 1000));
    assert_eq!(first.borrow().scroll_offset(), ScrollOffset::new(0.0, 200.0));
    assert_eq!(first.borrow().last_scroll_type(), Some(ScrollType::Sequenced));
    assert!(second.borrow().has_running_animation());

    let second_area: Rc<RefCell<dyn ScrollableArea>> = Rc::<RefCell<BoxScroller>>::clone(&second);
    assert!(service_scroll_animation(&second_area, 1000));
    assert_eq!(second.borrow().scroll_offset(), ScrollOffset::new(0.0, 300.0));
    assert!(!sequencer.borrow().is_running());
}

#[test]
fn user_scroll_aborts_the_sequence() {
    let (first, second, sequencer) = scrollers();
    first
        .borrow_mut()
        .scroll_into_view(&RectF::new(0.0, 200.0, 10.0, 10.0), &sequenced());
    second
        .borrow_mut()
        .scroll_into_view(&RectF::new(0.0, 300.0, 10.0, 10.0), &sequenced());
    SmoothScrollSequencer::run_queued_animations(&sequencer);

    second
        .borrow_mut()
        .user_scroll(ScrollGranularity::Pixel, ScrollOffset::new(0.0, 20.0), None);
    assert!(sequencer.borrow().is_empty());
    assert!(!sequencer.borrow().is_running());
    assert!(!first.borrow().has_running_animation());
    assert_eq!(second.borrow().scroll_offset(), ScrollOffset::new(0.0, 20.0));
}

#[test]
fn non_finite_scroll_leaves_the_sequence_running() {
    let (first, second, sequencer) = scrollers();
    first
        .borrow_mut()
        .scroll_into_view(&RectF::new(0.0, 200.0, 10.0, 10.0), &sequenced());
    second
        .borrow_mut()
        .scroll_into_view(&RectF::new(0.0, 300.0, 10.0, 10.0), &sequenced());
    SmoothScrollSequencer::run_queued_animations(&sequencer);

    second.borrow_mut().set_scroll_offset(
        ScrollOffset::new(0.0, f32::NAN),
        ScrollType::Programmatic,
        ScrollBehavior::Instant,
        None,
    );
    assert!(sequencer.borrow().is_running());
    assert!(first.borrow().has_running_animation());
    assert_eq!(second.borrow().scroll_offset(), ScrollOffset::ZERO);

    let first_area: Rc<RefCell<dyn ScrollableArea>> = Rc::<RefCell<BoxScroller>>::clone(&first);
    assert!(service_scroll_animation(&first_area, 1000));
    assert_eq!(first.borrow().scroll_offset(), ScrollOffset::new(0.0, 200.0));
    assert!(second.borrow().has_running_animation());
}

#[test]
fn immediate_scroll_into_view_aligns_the_target() {
    let (first, _, sequencer) = scrollers();
    let params = ScrollIntoViewParams {
        align_y: ScrollAlignment::Center,
        behavior: ScrollBehavior::Instant,
        ..ScrollIntoViewParams::default()
    };
    let moved = first
        .borrow_mut()
        .scroll_into_view(&RectF::new(0.0, 240.0, 10.0, 20.0), &params);
    assert_eq!(first.borrow().scroll_offset(), ScrollOffset::new(0.0, 200.0));
    assert_eq!(moved, RectF::new(0.0, 40.0, 10.0, 20.0));
    assert!(sequencer.borrow().is_empty());
}
