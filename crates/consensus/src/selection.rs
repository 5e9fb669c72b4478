use rand::Rng;

use crate::validator::Validator;

/// The roster holds no selectable stake, either because it is empty or
/// because every member's stake is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("validator roster holds no selectable stake")]
pub struct EmptyRosterError;

/// Total stake carried by the roster.
pub fn total_stake(validators: &[Validator]) -> u64 {
    validators.iter().map(|v| v.stake).sum()
}

/// Pick a proposer with probability proportional to stake.
///
/// One uniform draw in `[0, total_stake)` is walked through the cumulative
/// stake distribution, so a validator holding `stake` units wins with
/// probability exactly `stake / total_stake`. Zero-stake validators own an
/// empty slice of the draw range and can never win.
pub fn select_proposer<'a, R: Rng + ?Sized>(
    rng: &mut R,
    validators: &'a [Validator],
) -> Result<&'a Validator, EmptyRosterError> {
    let total = total_stake(validators);
    if total == 0 {
        return Err(EmptyRosterError);
    }

    let draw = rng.gen_range(0..total);
    let mut cumulative = 0u64;
    for validator in validators {
        cumulative += validator.stake;
        if draw < cumulative {
            return Ok(validator);
        }
    }

    // The cumulative walk covers the whole draw range; falling through can
    // only mean an empty roster, which the stake guard already rejected.
    validators.last().ok_or(EmptyRosterError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn roster(stakes: &[u64]) -> Vec<Validator> {
        stakes
            .iter()
            .enumerate()
            .map(|(i, &stake)| Validator::new([i as u8 + 1; 32], stake))
            .collect()
    }

    #[test]
    fn test_empty_roster_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_proposer(&mut rng, &[]), Err(EmptyRosterError));
    }

    #[test]
    fn test_all_zero_stake_roster_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let validators = roster(&[0, 0, 0]);
        assert_eq!(
            select_proposer(&mut rng, &validators),
            Err(EmptyRosterError)
        );
    }

    #[test]
    fn test_single_validator_always_wins() {
        let mut rng = StdRng::seed_from_u64(7);
        let validators = roster(&[500]);
        for _ in 0..100 {
            let winner = select_proposer(&mut rng, &validators).unwrap();
            assert_eq!(winner.id, validators[0].id);
        }
    }

    #[test]
    fn test_zero_stake_member_never_wins() {
        let mut rng = StdRng::seed_from_u64(42);
        let validators = roster(&[100, 0, 100]);
        for _ in 0..5_000 {
            let winner = select_proposer(&mut rng, &validators).unwrap();
            assert_ne!(winner.id, validators[1].id);
        }
    }

    #[test]
    fn test_every_staked_member_is_reachable() {
        let mut rng = StdRng::seed_from_u64(3);
        let validators = roster(&[1, 1, 1, 1]);
        let mut seen = HashMap::new();
        for _ in 0..2_000 {
            let winner = select_proposer(&mut rng, &validators).unwrap();
            *seen.entry(winner.id).or_insert(0u32) += 1;
        }
        assert_eq!(seen.len(), validators.len());
    }

    #[test]
    fn test_selection_frequency_tracks_stake() {
        let mut rng = StdRng::seed_from_u64(9_812_345);
        let validators = roster(&[100, 400, 500]);
        let draws = 20_000u32;

        let mut counts = HashMap::new();
        for _ in 0..draws {
            let winner = select_proposer(&mut rng, &validators).unwrap();
            *counts.entry(winner.id).or_insert(0u32) += 1;
        }

        let total = total_stake(&validators) as f64;
        for validator in &validators {
            let expected = validator.stake as f64 / total;
            let observed = counts.get(&validator.id).copied().unwrap_or(0) as f64 / draws as f64;
            assert!(
                (observed - expected).abs() < 0.02,
                "stake {} expected {expected:.3} observed {observed:.3}",
                validator.stake
            );
        }
    }

    #[test]
    fn test_same_seed_replays_same_winners() {
        let validators = roster(&[10, 20, 30, 40]);

        let mut first = StdRng::seed_from_u64(77);
        let mut second = StdRng::seed_from_u64(77);
        for _ in 0..200 {
            let a = select_proposer(&mut first, &validators).unwrap();
            let b = select_proposer(&mut second, &validators).unwrap();
            assert_eq!(a.id, b.id);
        }
    }
}
