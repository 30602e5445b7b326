#![allow(clippy::unwrap_used, reason = "test code")]

use std::panic;
use strata_lifecycle::{DisallowTransitionScope, DocumentLifecycle, LifecycleState};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Drive a fresh lifecycle to `target` through legal transitions only.
fn lifecycle_in(target: LifecycleState) -> DocumentLifecycle {
    use LifecycleState::*;

    let lifecycle = DocumentLifecycle::new();
    if target == Uninitialized {
        return lifecycle;
    }
    if target == Stopping || target == Stopped {
        lifecycle.advance_to(Stopping);
        if target == Stopped {
            lifecycle.advance_to(Stopped);
        }
        return lifecycle;
    }
    if target == VisualUpdatePending {
        lifecycle.advance_to(Inactive);
        lifecycle.advance_to(StyleClean);
        lifecycle.ensure_state_at_most(VisualUpdatePending);
        return lifecycle;
    }
    let path = [
        Inactive,
        StyleClean,
        InPerformLayout,
        AfterPerformLayout,
        LayoutClean,
        InCompositingInputsUpdate,
        CompositingInputsClean,
        InPrePaint,
        PrePaintClean,
        InPaint,
        PaintClean,
    ];
    if target == InStyleRecalc {
        lifecycle.advance_to(Inactive);
        lifecycle.advance_to(StyleClean);
        lifecycle.advance_to(InStyleRecalc);
        return lifecycle;
    }
    for state in path {
        lifecycle.advance_to(state);
        if state == target {
            break;
        }
    }
    lifecycle
}

#[test]
fn every_state_is_reachable_through_legal_transitions() {
    init_logger();
    for state in LifecycleState::ALL {
        assert_eq!(lifecycle_in(state).state(), state);
    }
}

#[test]
fn advance_is_legal_exactly_for_table_entries() {
    init_logger();
    for from in LifecycleState::ALL {
        for to in LifecycleState::ALL {
            let lifecycle = lifecycle_in(from);
            let expected = to == LifecycleState::Stopping || from.successors().contains(&to);
            assert_eq!(
                lifecycle.can_advance_to(to),
                expected,
                "{from} -> {to} legality mismatch"
            );
        }
    }
}

#[test]
fn listed_transitions_succeed() {
    init_logger();
    for from in LifecycleState::ALL {
        for &to in from.successors() {
            let lifecycle = lifecycle_in(from);
            lifecycle.advance_to(to);
            assert_eq!(lifecycle.state(), to);
        }
    }
}

#[test]
#[cfg(debug_assertions)]
fn unlisted_transitions_assert() {
    init_logger();
    let previous_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    for from in LifecycleState::ALL {
        for to in LifecycleState::ALL {
            if to == LifecycleState::Stopping || from.successors().contains(&to) {
                continue;
            }
            let outcome = panic::catch_unwind(|| lifecycle_in(from).advance_to(to));
            assert!(outcome.is_err(), "{from} -> {to} should have been rejected");
        }
    }
    panic::set_hook(previous_hook);
}

#[test]
fn scenario_lifecycle_cannot_skip_to_paint() {
    init_logger();
    let lifecycle = DocumentLifecycle::new();
    lifecycle.advance_to(LifecycleState::Inactive);
    lifecycle.advance_to(LifecycleState::StyleClean);
    lifecycle.advance_to(LifecycleState::InPerformLayout);
    assert_eq!(lifecycle.state(), LifecycleState::InPerformLayout);
    assert!(!lifecycle.can_advance_to(LifecycleState::InPaint));

    #[cfg(debug_assertions)]
    {
        let outcome = panic::catch_unwind(|| {
            let skipped = lifecycle_in(LifecycleState::InPerformLayout);
            skipped.advance_to(LifecycleState::InPaint);
        });
        assert!(outcome.is_err());
    }
}

#[test]
fn disallow_scope_nesting_restores_transitions() {
    init_logger();
    let lifecycle = lifecycle_in(LifecycleState::StyleClean);
    let depth = 5;
    let mut scopes = Vec::new();
    for _ in 0..depth {
        scopes.push(DisallowTransitionScope::new(&lifecycle));
        assert!(lifecycle.state_transition_disallowed());
    }
    while let Some(scope) = scopes.pop() {
        assert!(lifecycle.state_transition_disallowed());
        drop(scope);
    }
    assert!(!lifecycle.state_transition_disallowed());
    assert!(lifecycle.can_advance_to(LifecycleState::InPerformLayout));
}

#[test]
#[cfg(debug_assertions)]
fn decrement_without_increment_is_an_underflow() {
    init_logger();
    let outcome = panic::catch_unwind(|| {
        let lifecycle = DocumentLifecycle::new();
        lifecycle.increment_no_transition_count();
        lifecycle.decrement_no_transition_count();
        lifecycle.decrement_no_transition_count();
    });
    assert!(outcome.is_err());
}
