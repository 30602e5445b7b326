//! Join two scroll completions into one callback.

use crate::types::{ScrollCallback, ScrollCompletionMode};
use std::cell::RefCell;
use std::rc::Rc;

struct BarrierState {
    remaining: u8,
    mode: Option<ScrollCompletionMode>,
    callback: Option<ScrollCallback>,
}

/// Split `callback` into two callbacks. `callback` runs once, after both
/// halves ran, with the combined completion mode.
pub fn split_callback(callback: ScrollCallback) -> (ScrollCallback, ScrollCallback) {
    let state = Rc::new(RefCell::new(BarrierState {
        remaining: 2,
        mode: None,
        callback: Some(callback),
    }));
    (half(Rc::clone(&state)), half(state))
}

fn half(state: Rc<RefCell<BarrierState>>) -> ScrollCallback {
    Box::new(move |mode| {
        let ready = {
            let mut barrier = state.borrow_mut();
            barrier.remaining = barrier.remaining.saturating_sub(1);
            barrier.mode = Some(barrier.mode.map_or(mode, |previous| previous.combine(mode)));
            if barrier.remaining == 0 {
                barrier.callback.take().zip(barrier.mode)
            } else {
                None
            }
        };
        if let Some((callback, mode)) = ready {
            callback(mode);
        }
    })
}
