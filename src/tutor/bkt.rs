//! Bayesian Knowledge Tracing update rule
//!
//! Two steps per observed answer:
//! 1. Bayes posterior of mastery given the answer (slip / guess likelihoods)
//! 2. Learning transition: a non-mastered learner may pick the skill up on
//!    this opportunity, whatever the answer was
//!
//! Everything here is a pure function of its inputs.

use super::config::BktParams;

/// Result of one BKT step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BktUpdate {
    /// Mastery after evidence, before the learning transition.
    pub posterior: f64,
    /// Mastery after the learning transition.
    pub p_mastery: f64,
    /// True when the Bayes denominator was zero and the prior was carried over.
    pub fallback: bool,
}

/// Likelihood pair `(P(obs | mastered), P(obs | not mastered))`.
fn likelihoods(correct: bool, params: &BktParams) -> (f64, f64) {
    if correct {
        (1.0 - params.p_slip, params.p_guess)
    } else {
        (params.p_slip, 1.0 - params.p_guess)
    }
}

pub fn posterior(p_mastery: f64, correct: bool, params: &BktParams) -> (f64, bool) {
    let (given_mastery, given_not) = likelihoods(correct, params);
    let evidence_mastered = p_mastery * given_mastery;
    let denominator = evidence_mastered + (1.0 - p_mastery) * given_not;

    if denominator <= 0.0 {
        return (p_mastery, true);
    }
    (evidence_mastered / denominator, false)
}

pub fn learn(p_post: f64, p_transit: f64) -> f64 {
    p_post + (1.0 - p_post) * p_transit
}

/// Full BKT step. Inputs are assumed validated; the output is clamped to
/// [0, 1] to absorb rounding only.
pub fn update(p_mastery: f64, correct: bool, params: &BktParams) -> BktUpdate {
    let (p_post, fallback) = posterior(p_mastery, correct, params);
    if fallback {
        tracing::warn!(
            p_mastery,
            correct,
            p_slip = params.p_slip,
            p_guess = params.p_guess,
            "BKT evidence has zero likelihood, keeping prior"
        );
    }

    BktUpdate {
        posterior: p_post,
        p_mastery: learn(p_post, params.p_transit).clamp(0.0, 1.0),
        fallback,
    }
}

/// Whether a zero Bayes denominator is explainable by boundary inputs:
/// a boundary slip or guess, combined with either a boundary prior or
/// both slip and guess on the boundary.
pub fn is_degenerate(p_mastery: f64, params: &BktParams) -> bool {
    let boundary = |v: f64| v == 0.0 || v == 1.0;
    let slip = boundary(params.p_slip);
    let guess = boundary(params.p_guess);
    (slip || guess) && (boundary(p_mastery) || (slip && guess))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-4;

    fn params(p_transit: f64, p_slip: f64, p_guess: f64) -> BktParams {
        BktParams {
            p_init: 0.3,
            p_transit,
            p_slip,
            p_guess,
        }
    }

    #[test]
    fn correct_answer_worked_example() {
        let result = update(0.3, true, &params(0.1, 0.1, 0.2));
        assert!((result.posterior - 0.27 / 0.41).abs() < EPS);
        assert!((result.p_mastery - 0.6927).abs() < EPS, "got {}", result.p_mastery);
        assert!(!result.fallback);
    }

    #[test]
    fn incorrect_answer_lowers_posterior() {
        let result = update(0.5, false, &params(0.0, 0.1, 0.2));
        // 0.05 / (0.05 + 0.4)
        assert!((result.posterior - 0.05 / 0.45).abs() < 1e-12);
        assert_eq!(result.p_mastery, result.posterior);
    }

    #[test]
    fn transit_applies_after_wrong_answer() {
        let result = update(0.5, false, &params(0.2, 0.1, 0.2));
        let expected = result.posterior + (1.0 - result.posterior) * 0.2;
        assert!((result.p_mastery - expected).abs() < 1e-12);
    }

    #[test]
    fn zero_prior_wrong_answer_yields_transit() {
        // 0 / (0 + 1): well defined, posterior stays 0
        let result = update(0.0, false, &params(0.25, 0.0, 0.0));
        assert!(!result.fallback);
        assert_eq!(result.posterior, 0.0);
        assert_eq!(result.p_mastery, 0.25);
    }

    #[test]
    fn zero_denominator_falls_back_to_prior() {
        // guess = 1 makes a wrong answer impossible without mastery
        let p = params(0.25, 0.0, 1.0);
        let result = update(0.0, false, &p);
        assert!(result.fallback);
        assert!(is_degenerate(0.0, &p));
        assert_eq!(result.posterior, 0.0);
        assert_eq!(result.p_mastery, 0.25);
    }

    #[test]
    fn certain_mastery_with_zero_slip_wrong_answer() {
        let p = params(0.1, 0.0, 0.3);
        let result = update(1.0, false, &p);
        // 0 / (0 + 0) once p = 1 and slip = 0
        assert!(result.fallback);
        assert!(is_degenerate(1.0, &p));
        assert_eq!(result.p_mastery, 1.0);
    }

    #[test]
    fn impossible_evidence_with_interior_prior() {
        // slip = 1 and guess = 0: a correct answer cannot happen
        let p = params(0.1, 1.0, 0.0);
        let result = update(0.5, true, &p);
        assert!(result.fallback);
        assert!(is_degenerate(0.5, &p));
        assert!(!is_degenerate(0.5, &params(0.1, 1.0, 0.3)));
    }

    #[test]
    fn boundary_prior_without_zero_denominator() {
        let result = update(0.0, true, &params(0.0, 0.1, 0.2));
        assert!(!result.fallback);
        assert_eq!(result.p_mastery, 0.0);

        let result = update(1.0, true, &params(0.0, 0.1, 0.2));
        assert!(!result.fallback);
        assert_eq!(result.p_mastery, 1.0);
    }
}
