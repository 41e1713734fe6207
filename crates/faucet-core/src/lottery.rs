//! Weighted random selection for the Pool B lottery.

use rand::{CryptoRng, Rng};

/// Pure cumulative-sum scan: returns the index whose cumulative weight range
/// contains `point`. Ties favor the lower index. `None` when the total
/// weight is zero.
///
/// `point` must be in `[0, sum)`; larger values select the last positive
/// weight.
pub fn weighted_index(weights: &[u64], point: u64) -> Option<usize> {
    let sum: u64 = weights.iter().sum();
    if sum == 0 {
        return None;
    }
    let mut cumulative = 0u64;
    let mut last_positive = None;
    for (i, &w) in weights.iter().enumerate() {
        if w == 0 {
            continue;
        }
        cumulative += w;
        last_positive = Some(i);
        if point < cumulative {
            return Some(i);
        }
    }
    last_positive
}

/// Draw an index with probability proportional to its weight, using a
/// cryptographically secure uniform integer in `[0, sum)`.
pub fn draw_weighted<R: Rng + CryptoRng>(weights: &[u64], rng: &mut R) -> Option<usize> {
    let sum: u64 = weights.iter().sum();
    if sum == 0 {
        return None;
    }
    weighted_index(weights, rng.gen_range(0..sum))
}
