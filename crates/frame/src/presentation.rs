//! Presentation-time callbacks.
//!
//! Callbacks requested between two presented frames share one
//! registration with the compositor and run together, oldest first, when
//! it reports the frame.

use core::mem;
use log::trace;
use std::time::Instant;

pub type PresentationCallback = Box<dyn FnOnce(Instant)>;

#[derive(Default)]
pub struct PresentationCallbacks {
    pending: Vec<PresentationCallback>,
    registered: bool,
    registrations: u64,
}

impl PresentationCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `callback` for the next presented frame. Returns true when
    /// this call made a new registration.
    pub fn request(&mut self, callback: PresentationCallback) -> bool {
        self.pending.push(callback);
        if self.registered {
            return false;
        }
        self.registered = true;
        self.registrations += 1;
        trace!("registered presentation callback batch {}", self.registrations);
        true
    }

    /// Whether a registration is waiting for a presented frame.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Registrations made so far.
    pub fn registrations(&self) -> u64 {
        self.registrations
    }

    /// Run every pending callback with the presentation `time`, in the
    /// order they were requested. Returns how many ran.
    pub fn did_present(&mut self, time: Instant) -> usize {
        self.registered = false;
        let callbacks = mem::take(&mut self.pending);
        let count = callbacks.len();
        for callback in callbacks {
            callback(time);
        }
        count
    }
}
