use std::cell::RefCell;
use std::rc::Rc;
use strata_layout_tree::LayoutObjectId;

/// A DOM event raised by a scroll or viewport change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportEvent {
    /// `scroll` on the window, from the layout viewport.
    LayoutViewportScroll,
    /// `scroll` on an element scroller.
    ElementScroll(LayoutObjectId),
    /// `scroll` on `window.visualViewport`.
    VisualViewportScroll,
    /// `resize` on `window.visualViewport`.
    VisualViewportResize,
}

/// The frame-wide queue scroll events are dispatched from, in order.
#[derive(Debug, Clone, Default)]
pub struct ScrollEventQueue {
    events: Rc<RefCell<Vec<ViewportEvent>>>,
}

impl ScrollEventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `event`. Identical events already pending are coalesced.
    pub fn enqueue(&self, event: ViewportEvent) {
        let mut events = self.events.borrow_mut();
        if !events.contains(&event) {
            events.push(event);
        }
    }

    /// Take every pending event, oldest first.
    pub fn take(&self) -> Vec<ViewportEvent> {
        self.events.take()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_events_coalesce() {
        let queue = ScrollEventQueue::new();
        queue.enqueue(ViewportEvent::LayoutViewportScroll);
        queue.enqueue(ViewportEvent::VisualViewportScroll);
        queue.enqueue(ViewportEvent::LayoutViewportScroll);
        assert_eq!(
            queue.take(),
            vec![ViewportEvent::LayoutViewportScroll, ViewportEvent::VisualViewportScroll]
        );
        assert!(queue.is_empty());
    }
}
