//! Runs queued scroll-into-view steps one after another.

use crate::scrollable_area::ScrollableArea;
use crate::types::{ScrollBehavior, ScrollCallback, ScrollType};
use log::{debug, warn};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use strata_geometry::ScrollOffset;

struct SequencedScroll {
    area: Weak<RefCell<dyn ScrollableArea>>,
    offset: ScrollOffset,
    behavior: ScrollBehavior,
}

/// A FIFO of pending scrolls. Each step starts when the previous one
/// completes, in whatever way it completes.
///
/// Any non-sequenced explicit scroll aborts the whole sequence.
#[derive(Default)]
pub struct SmoothScrollSequencer {
    queue: VecDeque<SequencedScroll>,
    current: Option<Weak<RefCell<dyn ScrollableArea>>>,
    generation: u64,
    dispatching: bool,
    advance_requested: bool,
}

impl SmoothScrollSequencer {
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn queue_animation(
        &mut self,
        area: Weak<RefCell<dyn ScrollableArea>>,
        offset: ScrollOffset,
        behavior: ScrollBehavior,
    ) {
        self.queue.push_back(SequencedScroll {
            area,
            offset,
            behavior,
        });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether a step is in flight.
    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// Drop every queued step and stop the step in flight. Completion
    /// callbacks of aborted steps do not advance the sequence.
    pub fn abort_animations(this: &Rc<RefCell<Self>>) {
        let current = {
            let Ok(mut sequencer) = this.try_borrow_mut() else {
                warn!("sequencer busy while aborting");
                return;
            };
            if sequencer.queue.is_empty() && sequencer.current.is_none() {
                return;
            }
            sequencer.generation = sequencer.generation.wrapping_add(1);
            sequencer.queue.clear();
            sequencer.advance_requested = false;
            sequencer.current.take()
        };
        debug!("aborting sequenced scrolls");
        // The area that triggered the abort is already borrowed and
        // cancels its own animation.
        let current = current.and_then(|area| area.upgrade());
        if let Some(area) = current {
            if let Ok(mut area) = area.try_borrow_mut() {
                area.cancel_programmatic_scroll_animation();
            }
        }
    }

    /// Start the next queued step, and keep going for as long as steps
    /// complete synchronously.
    pub fn run_queued_animations(this: &Rc<RefCell<Self>>) {
        loop {
            let (next, generation) = {
                let mut sequencer = this.borrow_mut();
                sequencer.advance_requested = false;
                let Some(next) = sequencer.queue.pop_front() else {
                    sequencer.current = None;
                    return;
                };
                sequencer.current = Some(Weak::clone(&next.area));
                sequencer.dispatching = true;
                (next, sequencer.generation)
            };
            let started = next.area.upgrade().is_some_and(|area| {
                let callback = Self::advance_callback(this, generation);
                let Ok(mut area) = area.try_borrow_mut() else {
                    warn!("sequenced scroll target busy; skipping");
                    return false;
                };
                area.set_scroll_offset(next.offset, ScrollType::Sequenced, next.behavior, Some(callback));
                true
            });
            let mut sequencer = this.borrow_mut();
            sequencer.dispatching = false;
            if sequencer.generation != generation {
                return;
            }
            if started && !sequencer.advance_requested {
                return;
            }
        }
    }

    fn advance_callback(this: &Rc<RefCell<Self>>, generation: u64) -> ScrollCallback {
        let weak = Rc::downgrade(this);
        Box::new(move |_mode| {
            let Some(sequencer) = weak.upgrade() else {
                return;
            };
            {
                let Ok(mut state) = sequencer.try_borrow_mut() else {
                    return;
                };
                if state.generation != generation {
                    return;
                }
                if state.dispatching {
                    state.advance_requested = true;
                    return;
                }
            }
            Self::run_queued_animations(&sequencer);
        })
    }
}
