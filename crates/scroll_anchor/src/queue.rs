use std::cell::RefCell;
use std::rc::Rc;
use strata_layout_tree::LayoutObjectId;

/// Scrollers with an anchoring adjustment pending for the frame, keyed by
/// scroller box. A root frame viewport is keyed by its layout viewport.
#[derive(Debug, Clone, Default)]
pub struct AnchoringAdjustmentQueue {
    scrollers: Rc<RefCell<Vec<LayoutObjectId>>>,
}

impl AnchoringAdjustmentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `scroller` unless it is already pending.
    pub fn enqueue(&self, scroller: LayoutObjectId) {
        let mut scrollers = self.scrollers.borrow_mut();
        if !scrollers.contains(&scroller) {
            scrollers.push(scroller);
        }
    }

    pub fn dequeue(&self, scroller: LayoutObjectId) {
        self.scrollers.borrow_mut().retain(|pending| *pending != scroller);
    }

    pub fn contains(&self, scroller: LayoutObjectId) -> bool {
        self.scrollers.borrow().contains(&scroller)
    }

    /// Take every pending scroller in the order they were queued.
    pub fn take(&self) -> Vec<LayoutObjectId> {
        self.scrollers.take()
    }

    pub fn len(&self) -> usize {
        self.scrollers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.scrollers.borrow().is_empty()
    }
}
