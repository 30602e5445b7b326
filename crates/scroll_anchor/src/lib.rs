//! Scroll anchoring for scrollable areas.
//!
//! Each scroller owns a [`ScrollAnchor`]. Anchors that choose a node before
//! layout register their scroller with the frame's
//! [`AnchoringAdjustmentQueue`]; the frame drains it after layout and lets
//! each anchor [`ScrollAnchor::adjust`] its scroller. A [`SerializedAnchor`]
//! carries the anchor across navigations by selector.
#![allow(clippy::float_cmp, reason = "a zero block offset is an exact value, not a computed one")]

mod anchor;
mod queue;
mod selector;
mod serialize;

pub use anchor::{Corner, ScrollAnchor, WalkStatus};
pub use queue::AnchoringAdjustmentQueue;
pub use selector::{DomElement, query_selector_all};
pub use serialize::{MAX_SERIALIZED_SELECTOR_LENGTH, SerializedAnchor, compute_unique_selector};
