//! Score for a progress row, recomputed from its best similarity and attempt count.

/// Attempts after which the penalty curve switches to its gentler tail.
const PENALTY_KNEE: u32 = 8;
/// Share of the base score a player can lose to attempts at most.
const MAX_PENALTY_RATIO: f64 = 0.85;

pub fn calculate_score(best_similarity: f64, attempts_used: u32) -> u32 {
    let similarity = best_similarity.clamp(0.0, 1.0);
    let base = similarity * 1000.0;

    let attempts = f64::from(attempts_used);
    let penalty = if attempts_used <= PENALTY_KNEE {
        attempts.powf(2.2)
    } else {
        let knee = f64::from(PENALTY_KNEE);
        knee.powf(2.2) + (attempts - knee).powf(2.3) * 30.0
    };
    let penalty = penalty.min(MAX_PENALTY_RATIO * base);

    (base - penalty).max(0.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_first_guess_scores_999() {
        assert_eq!(calculate_score(1.0, 1), 999);
    }

    #[test]
    fn zero_similarity_scores_zero() {
        for attempts in 1..=13 {
            assert_eq!(calculate_score(0.0, attempts), 0);
        }
    }

    #[test]
    fn score_never_increases_with_attempts() {
        for step in 0..=20 {
            let similarity = f64::from(step) / 20.0;
            let mut previous = calculate_score(similarity, 1);
            for attempts in 2..=13 {
                let current = calculate_score(similarity, attempts);
                assert!(
                    current <= previous,
                    "similarity {similarity}: {current} > {previous} at attempt {attempts}"
                );
                previous = current;
            }
        }
    }

    #[test]
    fn penalty_is_capped_at_85_percent() {
        for step in 0..=100 {
            let similarity = f64::from(step) / 100.0;
            for attempts in 1..=13 {
                let floor = 0.15 * similarity * 1000.0;
                assert!(f64::from(calculate_score(similarity, attempts)) >= floor - 0.5);
            }
        }
    }

    #[test]
    fn late_attempts_use_the_tail_curve() {
        // 8^2.2 + 1^2.3 * 30 = 97.0 + 30
        let score = calculate_score(1.0, 9);
        assert_eq!(score, (1000.0 - 8f64.powf(2.2) - 30.0).round() as u32);
        // Low similarity hits the floor quickly.
        assert_eq!(calculate_score(0.2, 13), 30);
    }
}
