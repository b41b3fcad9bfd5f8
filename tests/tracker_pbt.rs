//! Property-based tests for the mastery tracker
//!
//! - observe keeps p_mastery inside [0, 1] for any valid input
//! - repeated correct answers never lower mastery when p_transit > 0
//! - a zero Bayes denominator only happens on degenerate inputs
//! - next_difficulty moves at most one band per call

use proptest::prelude::*;

use pal_tutor::tutor::bkt;
use pal_tutor::tutor::{
    next_difficulty, observe_with, Attempt, BktParams, Difficulty, MasteryState,
};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_f64_0_1() -> impl Strategy<Value = f64> {
    (0u64..=1000u64).prop_map(|v| v as f64 / 1000.0)
}

fn arb_params() -> impl Strategy<Value = BktParams> {
    (arb_f64_0_1(), arb_f64_0_1(), arb_f64_0_1(), arb_f64_0_1()).prop_map(
        |(p_init, p_transit, p_slip, p_guess)| BktParams {
            p_init,
            p_transit,
            p_slip,
            p_guess,
        },
    )
}

fn arb_difficulty() -> impl Strategy<Value = Difficulty> {
    prop_oneof![
        Just(Difficulty::Easy),
        Just(Difficulty::Medium),
        Just(Difficulty::Hard),
    ]
}

fn arb_attempt() -> impl Strategy<Value = Attempt> {
    (any::<bool>(), arb_difficulty()).prop_map(|(correct, difficulty)| Attempt {
        correct,
        difficulty,
    })
}

fn arb_state() -> impl Strategy<Value = MasteryState> {
    (
        arb_f64_0_1(),
        proptest::collection::vec(arb_attempt(), 0..12),
        arb_difficulty(),
    )
        .prop_map(|(p, attempts, difficulty)| MasteryState::restore(p, attempts, difficulty).unwrap())
}

fn band(d: Difficulty) -> i32 {
    match d {
        Difficulty::Easy => 0,
        Difficulty::Medium => 1,
        Difficulty::Hard => 2,
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn observe_stays_in_unit_interval(
        state in arb_state(),
        params in arb_params(),
        correct in any::<bool>(),
    ) {
        let next = observe_with(&params, &state, correct).unwrap();
        prop_assert!(next.p_mastery() >= 0.0 && next.p_mastery() <= 1.0);
        prop_assert!(!next.p_mastery().is_nan());
        prop_assert_eq!(next.attempts().len(), state.attempts().len() + 1);
        prop_assert_eq!(next.current_difficulty(), state.current_difficulty());
    }

    #[test]
    fn correct_answers_are_monotone(
        p0 in arb_f64_0_1(),
        params in arb_params(),
        steps in 1usize..30,
    ) {
        prop_assume!(params.p_transit > 0.0);
        let mut state = MasteryState::new(p0).unwrap();
        for _ in 0..steps {
            let next = observe_with(&params, &state, true).unwrap();
            // slip > 1 - guess makes a correct answer evidence against mastery
            if params.p_slip + params.p_guess <= 1.0 {
                prop_assert!(next.p_mastery() >= state.p_mastery() - 1e-12,
                    "{} -> {}", state.p_mastery(), next.p_mastery());
            }
            state = next;
        }
    }

    #[test]
    fn fallback_only_on_degenerate_inputs(
        p in arb_f64_0_1(),
        params in arb_params(),
        correct in any::<bool>(),
    ) {
        let update = bkt::update(p, correct, &params);
        if update.fallback {
            prop_assert!(bkt::is_degenerate(p, &params),
                "fallback hit with p={p}, slip={}, guess={}", params.p_slip, params.p_guess);
        }
    }

    #[test]
    fn difficulty_moves_at_most_one_band(state in arb_state(), streak in 1usize..4) {
        let next = next_difficulty(&state, streak);
        prop_assert!((band(next) - band(state.current_difficulty())).abs() <= 1);
    }

    #[test]
    fn difficulty_is_deterministic(state in arb_state()) {
        prop_assert_eq!(next_difficulty(&state, 2), next_difficulty(&state.clone(), 2));
    }

    #[test]
    fn invalid_prior_is_rejected(p in prop_oneof![-10.0f64..-0.0001, 1.0001f64..10.0]) {
        prop_assert!(MasteryState::new(p).is_err());
    }
}

#[test]
fn zero_prior_incorrect_observation_returns_transit() {
    let params = BktParams {
        p_init: 0.0,
        p_transit: 0.15,
        p_slip: 0.0,
        p_guess: 0.0,
    };
    let state = MasteryState::new(0.0).unwrap();
    let next = observe_with(&params, &state, false).unwrap();
    assert!((next.p_mastery() - 0.15).abs() < 1e-12);
}
