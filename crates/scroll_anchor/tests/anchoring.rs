#![allow(clippy::unwrap_used, reason = "test code")]

use std::cell::RefCell;
use std::rc::Rc;
use strata_geometry::{PointF, RectF, ScrollOffset, SizeF, WritingMode};
use strata_layout_tree::{
    ComputedStyle, Document, DomNodeId, LayoutObjectId, LayoutObjectKind, Overflow,
};
use strata_scroll::{
    BoxScroller, RootFrameViewport, ScrollBehavior, ScrollEventQueue, ScrollType, ScrollableArea,
    VisualViewport,
};
use strata_scroll_anchor::{AnchoringAdjustmentQueue, ScrollAnchor, SerializedAnchor};

type Element = (DomNodeId, LayoutObjectId);

/// Builds `<html><body>...</body></html>` with one layout object per
/// element, in a 200x200 frame.
struct Markup {
    document: Document,
    body: Element,
}

impl Markup {
    fn new(writing_mode: WritingMode) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut document = Document::new(SizeF::new(200.0, 200.0));
        let view = document.layout.view();
        document
            .layout
            .set_style(
                view,
                ComputedStyle::default()
                    .with_overflow(Overflow::Auto)
                    .with_writing_mode(writing_mode),
            )
            .unwrap();
        let html = document.dom.create_element("html");
        let root = document.dom.document();
        document.dom.append_child(root, html).unwrap();
        let html_box = document
            .attach_layout_object(Some(html), LayoutObjectKind::Block, ComputedStyle::default(), view)
            .unwrap();
        let mut markup = Self {
            document,
            body: (html, html_box),
        };
        markup.body = markup.element((html, html_box), "body", None, RectF::ZERO);
        markup
    }

    fn element(&mut self, parent: Element, tag: &str, id: Option<&str>, rect: RectF) -> Element {
        let node = self.document.dom.create_element(tag);
        self.document.dom.append_child(parent.0, node).unwrap();
        if let Some(id) = id {
            self.document.dom.set_id(node, id).unwrap();
        }
        let object = self
            .document
            .attach_layout_object(Some(node), LayoutObjectKind::Block, ComputedStyle::default(), parent.1)
            .unwrap();
        self.document
            .layout
            .set_geometry(object, rect.origin(), rect.size())
            .unwrap();
        (node, object)
    }

    fn block(&mut self, id: Option<&str>, rect: RectF) -> Element {
        let body = self.body;
        self.element(body, "div", id, rect)
    }

    /// Size html and body to `extent`, which is also the frame's
    /// scrollable overflow.
    fn finish(mut self, extent: SizeF) -> Page {
        let view = self.document.layout.view();
        let html = self.document.layout.parent(self.body.1).unwrap();
        for object in [html, self.body.1] {
            self.document
                .layout
                .set_geometry(object, PointF::ZERO, extent)
                .unwrap();
        }
        self.document
            .layout
            .set_overflow(view, None, Some(RectF::from_origin_size(PointF::ZERO, extent)))
            .unwrap();
        let document = Rc::new(RefCell::new(self.document));
        let scroller = BoxScroller::layout_viewport(&document, ScrollEventQueue::new()).unwrap();
        let queue = AnchoringAdjustmentQueue::new();
        let area: Rc<RefCell<dyn ScrollableArea>> = Rc::<RefCell<BoxScroller>>::clone(&scroller);
        let anchor = ScrollAnchor::new(area, &document, queue.clone());
        Page {
            document,
            scroller,
            anchor,
            queue,
        }
    }
}

struct Page {
    document: Rc<RefCell<Document>>,
    scroller: Rc<RefCell<BoxScroller>>,
    anchor: ScrollAnchor,
    queue: AnchoringAdjustmentQueue,
}

impl Page {
    fn scroll_to(&self, offset: ScrollOffset) {
        self.scroller.borrow_mut().set_scroll_offset(
            offset,
            ScrollType::Programmatic,
            ScrollBehavior::Instant,
            None,
        );
    }

    fn offset(&self) -> ScrollOffset {
        self.scroller.borrow().scroll_offset()
    }

    fn object_with_id(&self, id: &str) -> LayoutObjectId {
        object_with_id(&self.document.borrow(), id)
    }
}

fn object_with_id(document: &Document, id: &str) -> LayoutObjectId {
    let node = document.dom.elements_with_id(id)[0];
    document.dom.layout_object(node).unwrap()
}

/// `#block1` and `#block2`, 100px each, then a 1000px spacer.
fn two_blocks() -> Page {
    let mut markup = Markup::new(WritingMode::HorizontalTb);
    markup.block(Some("block1"), RectF::new(0.0, 0.0, 200.0, 100.0));
    markup.block(Some("block2"), RectF::new(0.0, 100.0, 200.0, 100.0));
    markup.block(None, RectF::new(0.0, 200.0, 200.0, 1000.0));
    markup.finish(SizeF::new(200.0, 1200.0))
}

fn serialized(selector: &str, x: f32, y: f32) -> SerializedAnchor {
    SerializedAnchor::new(selector.to_owned(), PointF::new(x, y))
}

#[test]
fn partially_visible_block_serializes_by_id() {
    let mut page = two_blocks();
    page.scroll_to(ScrollOffset::new(0.0, 150.0));
    let anchor = page.anchor.get_serialized_anchor();
    assert_eq!(anchor, serialized("#block2", 0.0, -50.0));
    assert_eq!(page.anchor.saved_selector(), "#block2");
    assert_eq!(page.anchor.anchor_object(), Some(page.object_with_id("block2")));
}

#[test]
fn serializing_twice_gives_the_same_anchor() {
    let mut page = two_blocks();
    page.scroll_to(ScrollOffset::new(0.0, 150.0));
    let first = page.anchor.get_serialized_anchor();
    let second = page.anchor.get_serialized_anchor();
    assert_eq!(first, second);
    assert_eq!(page.offset(), ScrollOffset::new(0.0, 150.0));
}

#[test]
fn anonymous_positions_serialize_by_index() {
    let mut markup = Markup::new(WritingMode::HorizontalTb);
    markup.block(Some("block1"), RectF::new(0.0, 0.0, 200.0, 100.0));
    let (node, _) = markup.block(Some("block2"), RectF::new(0.0, 100.0, 200.0, 100.0));
    let second = markup.document.dom.layout_object(node).unwrap();
    markup
        .document
        .layout
        .set_style(second, ComputedStyle::default().with_overflow_anchor_none())
        .unwrap();
    markup.block(None, RectF::new(0.0, 200.0, 200.0, 1000.0));
    let mut page = markup.finish(SizeF::new(200.0, 1200.0));

    page.scroll_to(ScrollOffset::new(0.0, 150.0));
    let anchor = page.anchor.get_serialized_anchor();
    assert_eq!(anchor, serialized("html>body>:nth-child(3)", 0.0, 50.0));
}

#[test]
fn restore_scrolls_the_anchor_into_place() {
    let mut page = two_blocks();
    assert!(page.anchor.restore_anchor(&serialized("#block2", 0.0, 0.0)));
    assert_eq!(page.offset(), ScrollOffset::new(0.0, 100.0));
    assert_eq!(page.anchor.anchor_object(), Some(page.object_with_id("block2")));
    assert_eq!(page.anchor.saved_selector(), "#block2");
    assert_eq!(page.scroller.borrow().last_scroll_type(), Some(ScrollType::Anchoring));
}

#[test]
fn restore_with_an_existing_anchor_only_compares_selectors() {
    let mut page = two_blocks();
    assert!(page.anchor.restore_anchor(&serialized("#block2", 0.0, 0.0)));
    assert!(page.anchor.restore_anchor(&serialized("#block2", 0.0, 40.0)));
    assert!(!page.anchor.restore_anchor(&serialized("#block1", 0.0, 0.0)));
    assert_eq!(page.offset(), ScrollOffset::new(0.0, 100.0));
}

#[test]
fn unmatched_or_malformed_selectors_do_not_restore() {
    let mut page = two_blocks();
    for selector in ["article", "", "foobar", "#block99", "##"] {
        assert!(
            !page.anchor.restore_anchor(&serialized(selector, 0.0, 0.0)),
            "{selector:?} restored"
        );
        assert_eq!(page.offset(), ScrollOffset::ZERO);
        assert_eq!(page.anchor.anchor_object(), None);
    }
}

#[test]
fn restore_at_the_top_keeps_the_offset() {
    let mut page = two_blocks();
    assert!(page.anchor.restore_anchor(&serialized("#block1", 0.0, 0.0)));
    assert_eq!(page.offset(), ScrollOffset::ZERO);
    assert_eq!(page.anchor.anchor_object(), Some(page.object_with_id("block1")));
}

#[test]
fn restored_anchor_is_kept_through_layout() {
    let mut page = two_blocks();
    assert!(page.anchor.restore_anchor(&serialized("#block2", 0.0, 0.0)));

    page.anchor.notify_before_layout();
    assert!(page.anchor.is_queued());
    assert!(page.queue.contains(page.document.borrow().layout.view()));

    // #block1 grows to 200px and pushes everything after it down.
    {
        let mut document = page.document.borrow_mut();
        let body = document.layout.parent(object_with_id(&document, "block1")).unwrap();
        let children: Vec<LayoutObjectId> = document.layout.children(body).collect();
        let rects = [
            RectF::new(0.0, 0.0, 200.0, 200.0),
            RectF::new(0.0, 200.0, 200.0, 100.0),
            RectF::new(0.0, 300.0, 200.0, 1000.0),
        ];
        for (child, rect) in children.into_iter().zip(rects) {
            document.layout.set_geometry(child, rect.origin(), rect.size()).unwrap();
        }
    }

    assert_eq!(page.anchor.compute_adjustment(), ScrollOffset::new(0.0, 100.0));
    page.anchor.adjust();
    assert_eq!(page.offset(), ScrollOffset::new(0.0, 200.0));
    assert_eq!(page.anchor.adjustment_count(), 1);
    assert_eq!(page.anchor.get_serialized_anchor(), serialized("#block2", 0.0, 0.0));
}

#[test]
fn vertical_lr_measures_along_the_horizontal_axis() {
    let mut markup = Markup::new(WritingMode::VerticalLr);
    markup.block(Some("block1"), RectF::new(0.0, 0.0, 100.0, 200.0));
    markup.block(Some("block2"), RectF::new(100.0, 0.0, 100.0, 200.0));
    markup.block(None, RectF::new(200.0, 0.0, 1000.0, 200.0));
    let mut page = markup.finish(SizeF::new(1200.0, 200.0));

    page.scroll_to(ScrollOffset::new(150.0, 0.0));
    assert_eq!(page.anchor.get_serialized_anchor(), serialized("#block2", -50.0, 0.0));
}

#[test]
fn editable_focus_wins_over_the_walk() {
    let mut markup = Markup::new(WritingMode::HorizontalTb);
    markup.block(Some("block1"), RectF::new(0.0, 0.0, 200.0, 100.0));
    markup.block(Some("block2"), RectF::new(0.0, 100.0, 200.0, 100.0));
    let spacer = markup.block(None, RectF::new(0.0, 200.0, 200.0, 1000.0));
    let editor = markup.element(spacer, "div", Some("editor"), RectF::new(0.0, 20.0, 200.0, 30.0));
    markup.document.dom.set_editable(editor.0, true).unwrap();
    markup.document.set_focused_element(Some(editor.0));
    let mut page = markup.finish(SizeF::new(200.0, 1200.0));

    page.scroll_to(ScrollOffset::new(0.0, 150.0));
    page.anchor.find_anchor();
    assert_eq!(page.anchor.anchor_object(), Some(editor.1));
    assert_eq!(page.anchor.saved_relative_offset(), PointF::new(0.0, 70.0));
}

#[test]
fn root_frame_viewport_adjusts_the_layout_viewport() {
    let page = two_blocks();
    let visual = VisualViewport::new(SizeF::new(100.0, 100.0), ScrollEventQueue::new());
    visual.borrow_mut().set_contents_size(SizeF::new(200.0, 200.0));
    let layout: Rc<RefCell<dyn ScrollableArea>> = Rc::<RefCell<BoxScroller>>::clone(&page.scroller);
    let root = RootFrameViewport::new(visual, layout);
    let area: Rc<RefCell<dyn ScrollableArea>> = Rc::<RefCell<RootFrameViewport>>::clone(&root);
    let queue = AnchoringAdjustmentQueue::new();
    let mut anchor = ScrollAnchor::new(area, &page.document, queue.clone());

    page.scroll_to(ScrollOffset::new(0.0, 150.0));
    anchor.notify_before_layout();
    assert_eq!(anchor.anchor_object(), Some(page.object_with_id("block2")));
    assert_eq!(anchor.saved_relative_offset(), PointF::new(0.0, -50.0));
    assert_eq!(queue.len(), 1);

    {
        let mut document = page.document.borrow_mut();
        let block2 = object_with_id(&document, "block2");
        document
            .layout
            .set_geometry(block2, PointF::new(0.0, 130.0), SizeF::new(200.0, 100.0))
            .unwrap();
    }
    anchor.adjust();
    assert_eq!(page.offset(), ScrollOffset::new(0.0, 180.0));
    assert_eq!(root.borrow().scroll_offset(), ScrollOffset::new(0.0, 180.0));
}
