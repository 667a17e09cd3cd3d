use log::debug;
use rand::seq::index;
use rand::Rng;

use crate::waveform::Chunk;
use crate::MosaicError;

/// Totals accumulated over one refinement run.
#[derive(Clone, Copy, Debug, Default)]
pub struct RefineStats {
    /// Accepted swaps.
    pub swaps: u64,
    /// Swap trials, accepted or not.
    pub trials: u64,
}

/// Snapshot handed to the progress observer after every trial.
///
/// `consecutive_failures` is the live termination counter; observers may
/// average or smooth it for display but must not feed anything back.
#[derive(Clone, Copy, Debug)]
pub struct RefineUpdate {
    pub consecutive_failures: u32,
    pub swaps: u64,
    pub trials: u64,
}

/// Greedy pairwise hill climb over the arrangement.
///
/// Each trial draws two distinct positions and swaps their chunks iff the
/// swap strictly lowers the summed per-position error against the target.
/// Equal-cost moves are rejected; there is no annealing. The loop stops
/// once `max_failures` consecutive trials have been rejected, so the total
/// error is non-increasing across the whole run and the multiset of
/// chunks in the arrangement never changes.
///
/// `max_failures = 0` performs no trials. Fewer than two positions leave
/// nothing to swap; the arrangement is returned unchanged.
pub fn refine(
    target: &[Chunk],
    arrangement: &mut [Chunk],
    max_failures: u32,
    rng: &mut impl Rng,
    mut observe: impl FnMut(RefineUpdate),
) -> Result<RefineStats, MosaicError> {
    if target.len() != arrangement.len() {
        return Err(MosaicError::SequenceLengthMismatch {
            target: target.len(),
            candidate: arrangement.len(),
        });
    }

    let mut stats = RefineStats::default();
    if max_failures == 0 || target.len() < 2 {
        return Ok(stats);
    }

    let mut failures = 0u32;
    while failures < max_failures {
        let pair = index::sample(rng, target.len(), 2);
        let (i, k) = (pair.index(0), pair.index(1));

        let current = arrangement[i].mean_squared_error(&target[i])?
            + arrangement[k].mean_squared_error(&target[k])?;
        let swapped = arrangement[k].mean_squared_error(&target[i])?
            + arrangement[i].mean_squared_error(&target[k])?;

        if swapped < current {
            arrangement.swap(i, k);
            failures = 0;
            stats.swaps += 1;
        } else {
            failures += 1;
        }
        stats.trials += 1;

        observe(RefineUpdate {
            consecutive_failures: failures,
            swaps: stats.swaps,
            trials: stats.trials,
        });
    }

    debug!(
        "refinement stopped after {} trials with {} accepted swaps",
        stats.trials, stats.swaps
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn chunk(values: &[f32]) -> Chunk {
        Chunk::from_samples(values.to_vec(), 2)
    }

    fn total_cost(target: &[Chunk], arrangement: &[Chunk]) -> f64 {
        target
            .iter()
            .zip(arrangement)
            .map(|(t, r)| r.mean_squared_error(t).unwrap())
            .sum()
    }

    fn sortable(chunks: &[Chunk]) -> Vec<Vec<u32>> {
        let mut keys: Vec<Vec<u32>> = chunks
            .iter()
            .map(|c| c.samples().iter().map(|s| s.to_bits()).collect())
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn swapped_pair_is_recovered_exactly() {
        let target = vec![chunk(&[1.0, 1.0]), chunk(&[5.0, 5.0])];
        let mut arrangement = vec![chunk(&[5.0, 5.0]), chunk(&[1.0, 1.0])];
        let mut rng = StdRng::seed_from_u64(3);

        let stats = refine(&target, &mut arrangement, 8, &mut rng, |_| {}).unwrap();

        assert_eq!(arrangement, target);
        assert_eq!(stats.swaps, 1);
        assert_eq!(total_cost(&target, &arrangement), 0.0);
    }

    #[test]
    fn total_cost_never_increases() {
        let mut rng = StdRng::seed_from_u64(11);
        let target: Vec<Chunk> = (0..16).map(|n| chunk(&[n as f32, -(n as f32)])).collect();
        let mut arrangement: Vec<Chunk> =
            (0..16).rev().map(|n| chunk(&[n as f32, n as f32])).collect();

        let before = total_cost(&target, &arrangement);
        refine(&target, &mut arrangement, 50, &mut rng, |_| {}).unwrap();
        let after = total_cost(&target, &arrangement);

        assert!(after <= before);
    }

    #[test]
    fn arrangement_keeps_the_same_multiset_of_chunks() {
        let mut rng = StdRng::seed_from_u64(23);
        let target: Vec<Chunk> = (0..12).map(|n| chunk(&[n as f32, 0.0])).collect();
        let mut arrangement: Vec<Chunk> =
            (0..12).map(|n| chunk(&[0.25 * n as f32, 1.0])).collect();

        let before = sortable(&arrangement);
        refine(&target, &mut arrangement, 40, &mut rng, |_| {}).unwrap();
        assert_eq!(sortable(&arrangement), before);
    }

    #[test]
    fn fixed_seed_gives_identical_runs() {
        let target: Vec<Chunk> = (0..10).map(|n| chunk(&[n as f32, n as f32])).collect();
        let initial: Vec<Chunk> = (0..10)
            .rev()
            .map(|n| chunk(&[n as f32, -(n as f32)]))
            .collect();

        let mut first = initial.clone();
        let mut first_updates = Vec::new();
        let first_stats = refine(
            &target,
            &mut first,
            25,
            &mut StdRng::seed_from_u64(41),
            |update| first_updates.push(update.consecutive_failures),
        )
        .unwrap();

        let mut second = initial;
        let mut second_updates = Vec::new();
        let second_stats = refine(
            &target,
            &mut second,
            25,
            &mut StdRng::seed_from_u64(41),
            |update| second_updates.push(update.consecutive_failures),
        )
        .unwrap();

        assert_eq!(first, second);
        assert_eq!(first_updates, second_updates);
        assert_eq!(first_stats.trials, second_stats.trials);
        assert_eq!(first_stats.swaps, second_stats.swaps);
    }

    #[test]
    fn zero_patience_performs_no_trials() {
        let target = vec![chunk(&[1.0, 1.0]), chunk(&[5.0, 5.0])];
        let mut arrangement = vec![chunk(&[5.0, 5.0]), chunk(&[1.0, 1.0])];
        let initial = arrangement.clone();
        let mut rng = StdRng::seed_from_u64(3);

        let stats = refine(&target, &mut arrangement, 0, &mut rng, |_| {}).unwrap();

        assert_eq!(arrangement, initial);
        assert_eq!(stats.trials, 0);
    }

    #[test]
    fn single_position_is_left_alone() {
        let target = vec![chunk(&[1.0, 1.0])];
        let mut arrangement = vec![chunk(&[5.0, 5.0])];
        let mut rng = StdRng::seed_from_u64(3);

        let stats = refine(&target, &mut arrangement, 10, &mut rng, |_| {}).unwrap();
        assert_eq!(stats.trials, 0);
        assert_eq!(arrangement, vec![chunk(&[5.0, 5.0])]);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let target = vec![chunk(&[1.0, 1.0])];
        let mut arrangement: Vec<Chunk> = Vec::new();
        let mut rng = StdRng::seed_from_u64(3);

        let err = refine(&target, &mut arrangement, 10, &mut rng, |_| {}).unwrap_err();
        assert!(matches!(err, MosaicError::SequenceLengthMismatch { .. }));
    }

    #[test]
    fn mismatched_chunk_shapes_fail_loudly() {
        let target = vec![chunk(&[1.0, 1.0]), chunk(&[2.0, 2.0])];
        let mut arrangement = vec![
            Chunk::from_samples(vec![1.0, 1.0, 1.0, 1.0], 2),
            Chunk::from_samples(vec![2.0, 2.0, 2.0, 2.0], 2),
        ];
        let mut rng = StdRng::seed_from_u64(3);

        let err = refine(&target, &mut arrangement, 10, &mut rng, |_| {}).unwrap_err();
        assert!(matches!(err, MosaicError::ShapeMismatch { .. }));
    }
}
