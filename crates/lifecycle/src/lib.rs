//! Document lifecycle state machine.
//!
//! Every document owns exactly one [`DocumentLifecycle`]. The pipeline
//! advances it through style, layout, compositing inputs, pre-paint and
//! paint; other components consult it to assert that a mutation is legal
//! in the current phase. Transitions can be frozen or constrained for a
//! scope with the RAII guards in [`scopes`].

mod document_lifecycle;
pub mod scopes;
mod state;

pub use document_lifecycle::DocumentLifecycle;
pub use scopes::{
    CheckNoTransitionScope, DeprecatedTransitionScope, DetachScope, DisallowTransitionScope,
    PostponeTransitionScope,
};
pub use state::LifecycleState;
