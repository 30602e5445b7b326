//! RAII guards that constrain lifecycle transitions for a scope.
//!
//! Counted guards ([`DisallowTransitionScope`], [`DetachScope`]) nest.
//! Flag guards ([`PostponeTransitionScope`], [`CheckNoTransitionScope`])
//! do not; opening a second one while the first is alive is a bug.

use crate::document_lifecycle::{DeprecatedTransition, DocumentLifecycle};
use crate::state::LifecycleState;

/// Disables every transition, including `Stopping`, while alive.
#[derive(Debug)]
pub struct DisallowTransitionScope<'doc> {
    lifecycle: &'doc DocumentLifecycle,
}

impl<'doc> DisallowTransitionScope<'doc> {
    /// Enter the scope.
    #[must_use = "transitions are allowed again as soon as the scope is dropped"]
    pub fn new(lifecycle: &'doc DocumentLifecycle) -> Self {
        lifecycle.increment_no_transition_count();
        Self { lifecycle }
    }
}

impl Drop for DisallowTransitionScope<'_> {
    fn drop(&mut self) {
        self.lifecycle.decrement_no_transition_count();
    }
}

/// Marks the document as detaching layout objects.
#[derive(Debug)]
pub struct DetachScope<'doc> {
    lifecycle: &'doc DocumentLifecycle,
}

impl<'doc> DetachScope<'doc> {
    /// Enter the scope.
    #[must_use = "the detach region ends as soon as the scope is dropped"]
    pub fn new(lifecycle: &'doc DocumentLifecycle) -> Self {
        lifecycle.increment_detach_count();
        Self { lifecycle }
    }
}

impl Drop for DetachScope<'_> {
    fn drop(&mut self) {
        self.lifecycle.decrement_detach_count();
    }
}

/// Marks the whole lifecycle as postponed, e.g. while paused in a debugger.
#[derive(Debug)]
pub struct PostponeTransitionScope<'doc> {
    lifecycle: &'doc DocumentLifecycle,
}

impl<'doc> PostponeTransitionScope<'doc> {
    /// Enter the scope.
    #[must_use = "the postponement ends as soon as the scope is dropped"]
    pub fn new(lifecycle: &'doc DocumentLifecycle) -> Self {
        lifecycle.set_postponed(true);
        Self { lifecycle }
    }
}

impl Drop for PostponeTransitionScope<'_> {
    fn drop(&mut self) {
        self.lifecycle.set_postponed(false);
    }
}

/// Only no-op transitions are accepted while alive; anything else is a
/// hard failure in every build.
#[derive(Debug)]
pub struct CheckNoTransitionScope<'doc> {
    lifecycle: &'doc DocumentLifecycle,
}

impl<'doc> CheckNoTransitionScope<'doc> {
    /// Enter the scope.
    #[must_use = "the check ends as soon as the scope is dropped"]
    pub fn new(lifecycle: &'doc DocumentLifecycle) -> Self {
        lifecycle.set_check_no_transition(true);
        Self { lifecycle }
    }
}

impl Drop for CheckNoTransitionScope<'_> {
    fn drop(&mut self) {
        self.lifecycle.set_check_no_transition(false);
    }
}

/// Whitelists one otherwise illegal rewind for the duration of the scope.
///
/// Registrations stack; only the innermost one is consulted.
#[derive(Debug)]
pub struct DeprecatedTransitionScope<'doc> {
    lifecycle: &'doc DocumentLifecycle,
    transition: DeprecatedTransition,
}

impl<'doc> DeprecatedTransitionScope<'doc> {
    /// Allow `from -> to` until the scope is dropped.
    #[must_use = "the whitelisted transition is removed as soon as the scope is dropped"]
    pub fn new(lifecycle: &'doc DocumentLifecycle, from: LifecycleState, to: LifecycleState) -> Self {
        let transition = DeprecatedTransition { from, to };
        lifecycle.push_deprecated_transition(transition);
        Self {
            lifecycle,
            transition,
        }
    }
}

impl Drop for DeprecatedTransitionScope<'_> {
    fn drop(&mut self) {
        self.lifecycle.pop_deprecated_transition(self.transition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_disallow_scopes_unwind_to_allowed() {
        let lifecycle = DocumentLifecycle::new();
        {
            let outer = DisallowTransitionScope::new(&lifecycle);
            {
                let inner = DisallowTransitionScope::new(&lifecycle);
                assert!(lifecycle.state_transition_disallowed());
                drop(inner);
            }
            assert!(lifecycle.state_transition_disallowed());
            drop(outer);
        }
        assert!(!lifecycle.state_transition_disallowed());
        assert!(lifecycle.can_advance_to(LifecycleState::Inactive));
    }

    #[test]
    fn detach_scope_allows_layout_tree_mutation() {
        let lifecycle = DocumentLifecycle::new();
        assert!(!lifecycle.state_allows_layout_tree_mutations());
        let scope = DetachScope::new(&lifecycle);
        assert!(lifecycle.in_detach());
        assert!(lifecycle.state_allows_layout_tree_mutations());
        drop(scope);
        assert!(!lifecycle.in_detach());
    }

    #[test]
    fn postpone_scope_toggles_the_flag() {
        let lifecycle = DocumentLifecycle::new();
        let scope = PostponeTransitionScope::new(&lifecycle);
        assert!(lifecycle.lifecycle_postponed());
        drop(scope);
        assert!(!lifecycle.lifecycle_postponed());
    }

    #[test]
    fn check_no_transition_permits_no_op_advance() {
        let lifecycle = DocumentLifecycle::new();
        lifecycle.advance_to(LifecycleState::Inactive);
        lifecycle.advance_to(LifecycleState::StyleClean);
        let scope = CheckNoTransitionScope::new(&lifecycle);
        lifecycle.advance_to(LifecycleState::StyleClean);
        assert_eq!(lifecycle.state(), LifecycleState::StyleClean);
        drop(scope);
        assert!(!lifecycle.check_no_transition());
    }

    #[test]
    #[should_panic(expected = "while transitions are checked")]
    fn check_no_transition_rejects_real_changes() {
        let lifecycle = DocumentLifecycle::new();
        lifecycle.advance_to(LifecycleState::Inactive);
        let _scope = CheckNoTransitionScope::new(&lifecycle);
        lifecycle.advance_to(LifecycleState::StyleClean);
    }

    #[test]
    fn deprecated_transition_whitelists_exact_pair() {
        let lifecycle = DocumentLifecycle::new();
        lifecycle.advance_to(LifecycleState::Inactive);
        lifecycle.advance_to(LifecycleState::StyleClean);
        lifecycle.advance_to(LifecycleState::InPerformLayout);
        assert!(!lifecycle.can_rewind_to(LifecycleState::StyleClean));
        {
            let _scope = DeprecatedTransitionScope::new(
                &lifecycle,
                LifecycleState::InPerformLayout,
                LifecycleState::StyleClean,
            );
            assert!(lifecycle.can_rewind_to(LifecycleState::StyleClean));
            assert!(!lifecycle.can_rewind_to(LifecycleState::VisualUpdatePending));
            lifecycle.ensure_state_at_most(LifecycleState::StyleClean);
        }
        assert_eq!(lifecycle.state(), LifecycleState::StyleClean);
    }

    #[test]
    fn only_the_innermost_deprecated_transition_counts() {
        let lifecycle = DocumentLifecycle::new();
        lifecycle.advance_to(LifecycleState::Inactive);
        lifecycle.advance_to(LifecycleState::StyleClean);
        lifecycle.advance_to(LifecycleState::InPerformLayout);
        let _outer = DeprecatedTransitionScope::new(
            &lifecycle,
            LifecycleState::InPerformLayout,
            LifecycleState::StyleClean,
        );
        let _inner = DeprecatedTransitionScope::new(
            &lifecycle,
            LifecycleState::InPaint,
            LifecycleState::LayoutClean,
        );
        assert!(!lifecycle.can_rewind_to(LifecycleState::StyleClean));
    }
}
