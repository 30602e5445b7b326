#![allow(clippy::unwrap_used, reason = "test code")]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use strata_geometry::{RectF, ScrollOffset, SizeF};
use strata_layout_tree::Document;
use strata_scroll::{
    BoxScroller, RootFrameViewport, ScrollBehavior, ScrollCallback, ScrollCompletionMode,
    ScrollEventQueue, ScrollGranularity, ScrollType, ScrollableArea, ViewState, ViewportEvent,
    ViewportToScrollFirst, VisualViewport, LEGACY_VISUAL_VIEWPORT_OFFSET, service_scroll_animation,
};

struct Viewports {
    events: ScrollEventQueue,
    layout: Rc<RefCell<BoxScroller>>,
    visual: Rc<RefCell<VisualViewport>>,
    root: Rc<RefCell<RootFrameViewport>>,
}

/// A 200x200 frame whose layout viewport scrolls over [0, 1000] on both
/// axes, and a 100x100 visual viewport that pans over [0, 100].
fn viewports() -> Viewports {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut document = Document::new(SizeF::new(200.0, 200.0));
    let view = document.layout.view();
    document
        .layout
        .set_overflow(view, None, Some(RectF::new(0.0, 0.0, 1200.0, 1200.0)))
        .unwrap();
    let document = Rc::new(RefCell::new(document));
    let events = ScrollEventQueue::new();
    let layout = BoxScroller::layout_viewport(&document, events.clone()).unwrap();
    let visual = VisualViewport::new(SizeF::new(100.0, 100.0), events.clone());
    visual.borrow_mut().set_contents_size(SizeF::new(200.0, 200.0));
    let layout_area: Rc<RefCell<dyn ScrollableArea>> = Rc::<RefCell<BoxScroller>>::clone(&layout);
    let root = RootFrameViewport::new(Rc::clone(&visual), layout_area);
    events.take();
    Viewports {
        events,
        layout,
        visual,
        root,
    }
}

fn recorder() -> (Rc<RefCell<Vec<ScrollCompletionMode>>>, ScrollCallback) {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    (calls, Box::new(move |mode| sink.borrow_mut().push(mode)))
}

#[test]
fn anchoring_fills_the_layout_viewport_first() {
    let viewports = viewports();
    let (calls, callback) = recorder();
    viewports.root.borrow_mut().set_scroll_offset(
        ScrollOffset::new(150.0, 0.0),
        ScrollType::Anchoring,
        ScrollBehavior::Instant,
        Some(callback),
    );
    assert_eq!(viewports.layout.borrow().scroll_offset(), ScrollOffset::new(150.0, 0.0));
    assert_eq!(viewports.visual.borrow().scroll_offset(), ScrollOffset::ZERO);
    assert_eq!(viewports.root.borrow().scroll_offset(), ScrollOffset::new(150.0, 0.0));
    assert_eq!(*calls.borrow(), vec![ScrollCompletionMode::Finished]);
}

#[test]
fn distribution_conserves_the_target() {
    let viewports = viewports();
    viewports.root.borrow_mut().set_scroll_offset(
        ScrollOffset::new(1050.0, 30.0),
        ScrollType::Programmatic,
        ScrollBehavior::Instant,
        None,
    );
    assert_eq!(viewports.visual.borrow().scroll_offset(), ScrollOffset::new(100.0, 30.0));
    assert_eq!(viewports.layout.borrow().scroll_offset(), ScrollOffset::new(950.0, 0.0));

    let unconsumed = viewports.root.borrow_mut().distribute_scroll_between_viewports(
        ScrollOffset::new(1500.0, 30.0),
        ScrollType::Programmatic,
        ScrollBehavior::Instant,
        ViewportToScrollFirst::Layout,
        None,
    );
    assert_eq!(viewports.root.borrow().scroll_offset(), ScrollOffset::new(1100.0, 30.0));
    assert_eq!(unconsumed, ScrollOffset::new(400.0, 0.0));
}

#[test]
fn layout_viewport_event_fires_before_visual_viewport_event() {
    let viewports = viewports();
    viewports.root.borrow_mut().set_scroll_offset(
        ScrollOffset::new(1050.0, 30.0),
        ScrollType::Programmatic,
        ScrollBehavior::Instant,
        None,
    );
    assert_eq!(
        viewports.events.take(),
        vec![ViewportEvent::LayoutViewportScroll, ViewportEvent::VisualViewportScroll]
    );
}

#[test]
fn zero_delta_requests_leave_animations_running() {
    let viewports = viewports();
    let (animation_calls, animation_done) = recorder();
    viewports.visual.borrow_mut().set_scroll_offset(
        ScrollOffset::new(50.0, 0.0),
        ScrollType::Programmatic,
        ScrollBehavior::Smooth,
        Some(animation_done),
    );
    assert!(viewports.visual.borrow().has_running_animation());

    let (calls, callback) = recorder();
    let current = viewports.root.borrow().scroll_offset();
    viewports.root.borrow_mut().set_scroll_offset(
        current,
        ScrollType::Programmatic,
        ScrollBehavior::Instant,
        Some(callback),
    );
    assert_eq!(*calls.borrow(), vec![ScrollCompletionMode::ZeroDelta]);

    let (user_calls, user_callback) = recorder();
    let result = viewports.root.borrow_mut().user_scroll(
        ScrollGranularity::Pixel,
        ScrollOffset::new(-10.0, -10.0),
        Some(user_callback),
    );
    assert_eq!(*user_calls.borrow(), vec![ScrollCompletionMode::ZeroDelta]);
    assert!(!result.did_scroll());
    assert_eq!(result.unused_scroll_delta_x, -10.0);
    assert!(viewports.visual.borrow().has_running_animation());
    assert!(animation_calls.borrow().is_empty());

    let visual: Rc<RefCell<dyn ScrollableArea>> = Rc::<RefCell<VisualViewport>>::clone(&viewports.visual);
    assert!(service_scroll_animation(&visual, 1000));
    assert_eq!(*animation_calls.borrow(), vec![ScrollCompletionMode::Finished]);
    assert_eq!(viewports.visual.borrow().scroll_offset(), ScrollOffset::new(50.0, 0.0));
}

#[test]
fn user_scroll_spills_from_visual_to_layout_viewport() {
    let viewports = viewports();
    let (calls, callback) = recorder();
    let result = viewports.root.borrow_mut().user_scroll(
        ScrollGranularity::Pixel,
        ScrollOffset::new(0.0, 300.0),
        Some(callback),
    );
    assert!(result.did_scroll_y);
    assert_eq!(result.unused_scroll_delta_y, 0.0);
    assert_eq!(viewports.visual.borrow().scroll_offset(), ScrollOffset::new(0.0, 100.0));
    assert_eq!(viewports.layout.borrow().scroll_offset(), ScrollOffset::new(0.0, 200.0));
    assert_eq!(*calls.borrow(), vec![ScrollCompletionMode::Finished]);
}

#[test]
fn user_scroll_interrupts_a_smooth_scroll() {
    let viewports = viewports();
    let (animation_calls, animation_done) = recorder();
    viewports.root.borrow_mut().set_scroll_offset(
        ScrollOffset::new(0.0, 500.0),
        ScrollType::Programmatic,
        ScrollBehavior::Smooth,
        Some(animation_done),
    );
    assert!(viewports.root.borrow().has_running_animation());
    viewports
        .root
        .borrow_mut()
        .user_scroll(ScrollGranularity::Line, ScrollOffset::new(0.0, 1.0), None);
    assert!(!viewports.root.borrow().has_running_animation());
    assert_eq!(*animation_calls.borrow(), vec![ScrollCompletionMode::InterruptedByScroll]);
}

#[test]
fn restore_to_anchor_reaches_the_target() {
    let viewports = viewports();
    viewports.visual.borrow_mut().set_location(ScrollOffset::new(100.0, 100.0));
    viewports
        .root
        .borrow_mut()
        .restore_to_anchor(ScrollOffset::new(300.5, 40.0));
    assert_eq!(viewports.root.borrow().scroll_offset(), ScrollOffset::new(300.5, 40.0));
}

#[test]
fn history_restore_applies_once_and_handles_legacy_entries() {
    let viewports = viewports();
    viewports
        .root
        .borrow_mut()
        .set_pending_history_restore_scroll_offset(ViewState {
            scroll_offset: ScrollOffset::new(0.0, 330.0),
            visual_viewport_scroll_offset: LEGACY_VISUAL_VIEWPORT_OFFSET,
            page_scale_factor: 0.0,
        });
    assert!(viewports.root.borrow_mut().apply_pending_history_restore_scroll_offset());
    assert_eq!(viewports.layout.borrow().scroll_offset(), ScrollOffset::new(0.0, 330.0));
    assert_eq!(viewports.visual.borrow().scroll_offset(), ScrollOffset::ZERO);
    assert!(!viewports.root.borrow_mut().apply_pending_history_restore_scroll_offset());
}

#[test]
fn completion_barrier_reports_interruption() {
    let viewports = viewports();
    let interrupted = Rc::new(Cell::new(None));
    let sink = Rc::clone(&interrupted);
    viewports.root.borrow_mut().set_scroll_offset(
        ScrollOffset::new(150.0, 150.0),
        ScrollType::Programmatic,
        ScrollBehavior::Smooth,
        Some(Box::new(move |mode| sink.set(Some(mode)))),
    );
    assert_eq!(interrupted.get(), None);
    viewports.root.borrow_mut().cancel_programmatic_scroll_animation();
    assert_eq!(interrupted.get(), Some(ScrollCompletionMode::InterruptedByScroll));
}
