use rand::Rng;

/// Chance of re-offering the bonus once the player has already used one.
pub const REOFFER_PROBABILITY: f64 = 0.4;

/// Decides whether a new progress row carries a bonus-attempt offer.
///
/// Never on a player's first challenge; always the first time they become eligible;
/// afterwards with [`REOFFER_PROBABILITY`].
pub fn should_offer<R: Rng + ?Sized>(
    completed_challenges: u64,
    prior_bonus_uses: u64,
    rng: &mut R,
) -> bool {
    if completed_challenges == 0 {
        return false;
    }
    if prior_bonus_uses == 0 {
        return true;
    }
    rng.random_bool(REOFFER_PROBABILITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn first_challenge_never_offers() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(!should_offer(0, 0, &mut rng));
        assert!(!should_offer(0, 3, &mut rng));
    }

    #[test]
    fn first_eligibility_always_offers() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..100 {
            assert!(should_offer(1, 0, &mut rng));
        }
    }

    #[test]
    fn reoffer_rate_is_close_to_forty_percent() {
        let mut rng = StdRng::seed_from_u64(42);
        let samples = 20_000;
        let offered = (0..samples)
            .filter(|_| should_offer(5, 1, &mut rng))
            .count();
        let rate = offered as f64 / samples as f64;
        assert!((rate - REOFFER_PROBABILITY).abs() < 0.02, "rate was {rate}");
    }
}
