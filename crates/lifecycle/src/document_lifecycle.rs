//! The per-document lifecycle and its transition rules.

use crate::state::LifecycleState;
use log::warn;
use std::cell::{Cell, RefCell};

/// A transition explicitly whitelisted by a [`crate::DeprecatedTransitionScope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeprecatedTransition {
    pub(crate) from: LifecycleState,
    pub(crate) to: LifecycleState,
}

/// Lifecycle of one document.
///
/// All counters and flags use interior mutability so that scoped guards
/// can hold a shared borrow while the pipeline keeps advancing the state
/// through the same reference.
#[derive(Debug)]
pub struct DocumentLifecycle {
    state: Cell<LifecycleState>,
    detach_count: Cell<u32>,
    disallow_transition_count: Cell<u32>,
    life_cycle_postponed: Cell<bool>,
    check_no_transition: Cell<bool>,
    deprecated_transitions: RefCell<Vec<DeprecatedTransition>>,
}

impl Default for DocumentLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLifecycle {
    /// A lifecycle in the `Uninitialized` state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Cell::new(LifecycleState::Uninitialized),
            detach_count: Cell::new(0),
            disallow_transition_count: Cell::new(0),
            life_cycle_postponed: Cell::new(false),
            check_no_transition: Cell::new(false),
            deprecated_transitions: RefCell::new(Vec::new()),
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// True between activation and the start of shutdown.
    pub fn is_active(&self) -> bool {
        let state = self.state.get();
        state > LifecycleState::Inactive && state < LifecycleState::Stopping
    }

    /// True while any [`crate::DisallowTransitionScope`] is alive.
    #[inline]
    pub fn state_transition_disallowed(&self) -> bool {
        self.disallow_transition_count.get() > 0
    }

    /// True while any [`crate::DetachScope`] is alive.
    #[inline]
    pub fn in_detach(&self) -> bool {
        self.detach_count.get() > 0
    }

    /// True while a [`crate::PostponeTransitionScope`] is alive.
    #[inline]
    pub fn lifecycle_postponed(&self) -> bool {
        self.life_cycle_postponed.get()
    }

    /// True while a [`crate::CheckNoTransitionScope`] is alive.
    #[inline]
    pub fn check_no_transition(&self) -> bool {
        self.check_no_transition.get()
    }

    /// DOM tree mutations are forbidden in the middle of a phase.
    pub fn state_allows_tree_mutations(&self) -> bool {
        !matches!(
            self.state.get(),
            LifecycleState::InStyleRecalc
                | LifecycleState::InPerformLayout
                | LifecycleState::InCompositingInputsUpdate
                | LifecycleState::InPrePaint
                | LifecycleState::InPaint
        )
    }

    /// Layout tree structure may only change during style recalc or detach.
    pub fn state_allows_layout_tree_mutations(&self) -> bool {
        self.in_detach() || self.state.get() == LifecycleState::InStyleRecalc
    }

    /// States in which nodes may be detached from the layout tree.
    pub fn state_allows_detach(&self) -> bool {
        matches!(
            self.state.get(),
            LifecycleState::VisualUpdatePending
                | LifecycleState::InStyleRecalc
                | LifecycleState::StyleClean
                | LifecycleState::LayoutClean
                | LifecycleState::CompositingInputsClean
                | LifecycleState::PrePaintClean
                | LifecycleState::PaintClean
                | LifecycleState::Stopping
                | LifecycleState::Inactive
        )
    }

    /// Layout may be invalidated outside of layout, pre-paint and paint.
    pub fn state_allows_layout_invalidation(&self) -> bool {
        !matches!(
            self.state.get(),
            LifecycleState::InPerformLayout
                | LifecycleState::InCompositingInputsUpdate
                | LifecycleState::InPrePaint
                | LifecycleState::InPaint
        )
    }

    /// Whether `next_state` is a legal forward transition from the current state.
    pub fn can_advance_to(&self, next_state: LifecycleState) -> bool {
        if self.state_transition_disallowed() {
            return false;
        }

        // We can stop from anywhere.
        if next_state == LifecycleState::Stopping {
            return true;
        }

        self.state.get().successors().contains(&next_state)
    }

    /// Whether the lifecycle may rewind to `next_state`.
    pub fn can_rewind_to(&self, next_state: LifecycleState) -> bool {
        if self.state_transition_disallowed() {
            return false;
        }

        let state = self.state.get();
        // This transition is bogus, but it has been explicitly allowed.
        let whitelisted = self
            .deprecated_transitions
            .borrow()
            .last()
            .is_some_and(|top| top.from == state && top.to == next_state);
        if whitelisted {
            return true;
        }

        state.is_settled()
    }

    /// Move the lifecycle forward to `next_state`.
    ///
    /// An illegal transition trips a debug assertion. Release builds log
    /// it and still take the new state.
    ///
    /// # Panics
    ///
    /// Panics in every build when the state would change while a
    /// [`crate::CheckNoTransitionScope`] is alive.
    pub fn advance_to(&self, next_state: LifecycleState) {
        let state = self.state.get();
        let legal = self.can_advance_to(next_state);
        debug_assert!(
            legal,
            "Cannot advance document lifecycle from {state} to {next_state}."
        );
        if !legal {
            warn!("Illegal document lifecycle transition from {state} to {next_state}");
        }
        assert!(
            state == next_state || !self.check_no_transition.get(),
            "Document lifecycle changed from {state} to {next_state} while transitions are checked"
        );
        tracing::trace!(from = state.as_str(), to = next_state.as_str(), "advance_to");
        self.state.set(next_state);
    }

    /// Rewind to at most `state`; no-op if already at or before it.
    ///
    /// # Panics
    ///
    /// Panics in every build when the state would change while a
    /// [`crate::CheckNoTransitionScope`] is alive.
    pub fn ensure_state_at_most(&self, state: LifecycleState) {
        debug_assert!(
            matches!(
                state,
                LifecycleState::VisualUpdatePending
                    | LifecycleState::StyleClean
                    | LifecycleState::LayoutClean
            ),
            "Cannot rewind the document lifecycle to {state}."
        );
        let current = self.state.get();
        if current <= state {
            return;
        }
        let legal = self.can_rewind_to(state);
        debug_assert!(
            legal,
            "Cannot rewind document lifecycle from {current} to {state}."
        );
        if !legal {
            warn!("Illegal document lifecycle rewind from {current} to {state}");
        }
        assert!(
            current == state || !self.check_no_transition.get(),
            "Document lifecycle rewound from {current} to {state} while transitions are checked"
        );
        tracing::trace!(from = current.as_str(), to = state.as_str(), "ensure_state_at_most");
        self.state.set(state);
    }

    /// Enter a nested transition-disallowed region.
    pub fn increment_no_transition_count(&self) {
        self.disallow_transition_count
            .set(self.disallow_transition_count.get().saturating_add(1));
    }

    /// Leave a nested transition-disallowed region.
    ///
    /// Decrementing without a matching increment is an underflow and trips
    /// a debug assertion; release builds clamp at zero.
    pub fn decrement_no_transition_count(&self) {
        let count = self.disallow_transition_count.get();
        debug_assert!(count > 0, "Disallowed transition count underflow");
        self.disallow_transition_count.set(count.saturating_sub(1));
    }

    /// Enter a nested detach region.
    pub fn increment_detach_count(&self) {
        self.detach_count
            .set(self.detach_count.get().saturating_add(1));
    }

    /// Leave a nested detach region.
    pub fn decrement_detach_count(&self) {
        let count = self.detach_count.get();
        debug_assert!(count > 0, "Detach count underflow");
        self.detach_count.set(count.saturating_sub(1));
    }

    pub(crate) fn set_postponed(&self, postponed: bool) {
        debug_assert!(
            self.life_cycle_postponed.get() != postponed,
            "PostponeTransitionScope does not nest"
        );
        self.life_cycle_postponed.set(postponed);
    }

    pub(crate) fn set_check_no_transition(&self, check: bool) {
        debug_assert!(
            self.check_no_transition.get() != check,
            "CheckNoTransitionScope does not nest"
        );
        self.check_no_transition.set(check);
    }

    pub(crate) fn push_deprecated_transition(&self, transition: DeprecatedTransition) {
        self.deprecated_transitions.borrow_mut().push(transition);
    }

    pub(crate) fn pop_deprecated_transition(&self, transition: DeprecatedTransition) {
        let popped = self.deprecated_transitions.borrow_mut().pop();
        debug_assert_eq!(popped, Some(transition), "Deprecated transitions must pop in order");
    }
}
