//! Three-pool block reward calculation.
//!
//! Pool B is a weighted lottery over raw share counts; Pool A pays the
//! remaining contributors proportionally after the winner's shares are
//! penalized; Pool C tops up the lowest-earning non-winners. All arithmetic
//! is integer micro-tokens; fractions truncate and the remainder is burned,
//! so the distributed total never exceeds the combined budgets.

use crate::lottery::draw_weighted;
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Per-block budgets in micro-tokens.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RewardBudgets {
    pub pool_a_micro: u64,
    pub pool_b_micro: u64,
    pub pool_c_micro: u64,
}

impl RewardBudgets {
    pub fn total(&self) -> u64 {
        self.pool_a_micro + self.pool_b_micro + self.pool_c_micro
    }
}

/// Compute rewards for a closed block, drawing the lottery winner from `rng`.
///
/// `shares_by_address` maps normalized addresses to raw share counts
/// (each >= 1). Addresses with no reward are absent from the result.
pub fn calculate_rewards<R: Rng + CryptoRng>(
    shares_by_address: &BTreeMap<String, u64>,
    budgets: &RewardBudgets,
    rng: &mut R,
) -> BTreeMap<String, u64> {
    let weights: Vec<u64> = shares_by_address.values().copied().collect();
    let winner = draw_weighted(&weights, rng);
    debug!(
        miners = shares_by_address.len(),
        winner = ?winner.and_then(|w| shares_by_address.keys().nth(w)),
        "lottery drawn"
    );
    calculate_rewards_with_winner(shares_by_address, budgets, winner)
}

/// Deterministic core of the calculation. `winner` indexes the addresses in
/// their sorted (map) order; `None` means the lottery had no candidates.
pub fn calculate_rewards_with_winner(
    shares_by_address: &BTreeMap<String, u64>,
    budgets: &RewardBudgets,
    winner: Option<usize>,
) -> BTreeMap<String, u64> {
    let addresses: Vec<&str> = shares_by_address.keys().map(String::as_str).collect();
    let raw: Vec<u64> = shares_by_address.values().copied().collect();
    let mut rewards: BTreeMap<String, u64> = BTreeMap::new();

    let total_raw: u64 = raw.iter().sum();
    if total_raw == 0 {
        return rewards;
    }

    // Pool B: the winner takes the whole budget.
    if let Some(w) = winner {
        if budgets.pool_b_micro > 0 {
            *rewards.entry(addresses[w].to_string()).or_default() += budgets.pool_b_micro;
        }
    }

    // Pool A: proportional over adjusted shares. The winner's raw count is
    // reduced by min(loserShares, total/2) and then halved; anyone left at
    // zero drops out of the pool.
    let mut adjusted = raw.clone();
    if let Some(w) = winner {
        let loser_shares = total_raw - raw[w];
        let penalty = loser_shares.min(total_raw / 2);
        adjusted[w] = raw[w].saturating_sub(penalty) / 2;
    }
    let total_adjusted: u64 = adjusted.iter().sum();
    if budgets.pool_a_micro > 0 && total_adjusted > 0 {
        for (i, &adj) in adjusted.iter().enumerate() {
            if adj == 0 {
                continue;
            }
            let share =
                (adj as u128 * budgets.pool_a_micro as u128 / total_adjusted as u128) as u64;
            if share > 0 {
                *rewards.entry(addresses[i].to_string()).or_default() += share;
            }
        }
    }

    // Pool C: spread over the lowest-earning non-winners. The covered prefix
    // grows until filling it evenly would overshoot a strictly higher tier.
    if budgets.pool_c_micro > 0 {
        let mut non_winners: Vec<(u64, &str)> = addresses
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != winner)
            .map(|(_, addr)| (rewards.get(*addr).copied().unwrap_or(0), *addr))
            .collect();
        // addresses arrive sorted, and the sort is stable, so ties keep
        // address order
        non_winners.sort_by_key(|&(earned, _)| earned);

        let n = non_winners.len();
        if n > 0 {
            let c = budgets.pool_c_micro;
            let mut m = n;
            for i in 1..n {
                let prev = non_winners[i - 1].0;
                let next = non_winners[i].0;
                if next > prev && prev + c.div_ceil(i as u64) > next {
                    m = i;
                    break;
                }
            }
            let base = c / m as u64;
            let extra = (c % m as u64) as usize;
            for (idx, &(_, addr)) in non_winners.iter().take(m).enumerate() {
                let amount = base + u64::from(idx < extra);
                if amount > 0 {
                    *rewards.entry(addr.to_string()).or_default() += amount;
                }
            }
        }
    }

    rewards
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const C: &str = "0xcccccccccccccccccccccccccccccccccccccccc";

    fn shares(entries: &[(&str, u64)]) -> BTreeMap<String, u64> {
        entries
            .iter()
            .map(|&(addr, n)| (addr.to_string(), n))
            .collect()
    }

    fn budgets(a: u64, b: u64, c: u64) -> RewardBudgets {
        RewardBudgets {
            pool_a_micro: a,
            pool_b_micro: b,
            pool_c_micro: c,
        }
    }

    #[test]
    fn empty_block_pays_nothing() {
        let rewards =
            calculate_rewards_with_winner(&BTreeMap::new(), &budgets(50_000_000, 50_000_000, 0), None);
        assert!(rewards.is_empty());
    }

    #[test]
    fn single_miner_takes_both_pools() {
        // 3 shares: lottery win plus adjusted share max(0, (3 - min(0, 1)) / 2) = 1
        let rewards = calculate_rewards_with_winner(
            &shares(&[(A, 3)]),
            &budgets(50_000_000, 50_000_000, 0),
            Some(0),
        );
        assert_eq!(rewards.get(A).copied(), Some(100_000_000));
        assert_eq!(rewards.len(), 1);
    }

    #[test]
    fn lottery_win_penalizes_pool_a_share() {
        // A: 9 shares wins the lottery; adjusted A = (9 - min(1, 5)) / 2 = 4, B = 1
        let rewards = calculate_rewards_with_winner(
            &shares(&[(A, 9), (B, 1)]),
            &budgets(50_000_000, 50_000_000, 0),
            Some(0),
        );
        assert_eq!(rewards.get(A).copied(), Some(90_000_000));
        assert_eq!(rewards.get(B).copied(), Some(10_000_000));
    }

    #[test]
    fn small_winner_drops_out_of_pool_a() {
        // B: 1 share wins; adjusted B = max(0, (1 - min(9, 5)) / 2) = 0, so A
        // takes the whole proportional pool
        let rewards = calculate_rewards_with_winner(
            &shares(&[(A, 9), (B, 1)]),
            &budgets(50_000_000, 50_000_000, 0),
            Some(1),
        );
        assert_eq!(rewards.get(A).copied(), Some(50_000_000));
        assert_eq!(rewards.get(B).copied(), Some(50_000_000));
    }

    #[test]
    fn pool_c_splits_evenly_across_equal_tiers() {
        // No winner and no A/B budget: all three sit at 0 and split C evenly.
        let rewards = calculate_rewards_with_winner(
            &shares(&[(A, 1), (B, 1), (C, 4)]),
            &budgets(0, 0, 9_000_000),
            None,
        );
        assert_eq!(rewards.get(A).copied(), Some(3_000_000));
        assert_eq!(rewards.get(B).copied(), Some(3_000_000));
        assert_eq!(rewards.get(C).copied(), Some(3_000_000));
    }

    #[test]
    fn pool_c_covers_prefix_up_to_a_reachable_tier() {
        // Pool A truncation leaves A and B at 0 while C earns exactly
        // 6_000_000: 12_000_001 * 6_000_001 / 12_000_003 = 6_000_000 and
        // 1 * 6_000_001 / 12_000_003 = 0. Tiers are (0, 0, 6e6) with
        // C = 9_000_000: filling the two zero tiers with ceil(9e6/2) does
        // not overshoot 6e6, so all three split C at 3_000_000 each.
        let rewards = calculate_rewards_with_winner(
            &shares(&[(A, 1), (B, 1), (C, 12_000_001)]),
            &budgets(6_000_001, 0, 9_000_000),
            None,
        );
        assert_eq!(rewards.get(A).copied(), Some(3_000_000));
        assert_eq!(rewards.get(B).copied(), Some(3_000_000));
        assert_eq!(rewards.get(C).copied(), Some(9_000_000));
    }

    #[test]
    fn pool_c_stops_before_overshooting_a_higher_tier() {
        // Tiers (0, 10_000_000) built the same way: 10_000_001 shares against
        // 1 share with pool A = 10_000_001 leaves A at 0 and C at 10e6.
        let tiers = shares(&[(A, 1), (C, 10_000_001)]);

        // C budget 2e6 fits under the higher tier: both are covered.
        let under = calculate_rewards_with_winner(&tiers, &budgets(10_000_001, 0, 2_000_000), None);
        assert_eq!(under.get(A).copied(), Some(1_000_000));
        assert_eq!(under.get(C).copied(), Some(11_000_000));

        // C budget 30e6 would fill the bottom past 10e6: the prefix stops at
        // the single lowest earner, who takes the whole budget.
        let over = calculate_rewards_with_winner(&tiers, &budgets(10_000_001, 0, 30_000_000), None);
        assert_eq!(over.get(A).copied(), Some(30_000_000));
        assert_eq!(over.get(C).copied(), Some(10_000_000));
    }

    #[test]
    fn pool_c_excludes_the_lottery_winner() {
        let rewards = calculate_rewards_with_winner(
            &shares(&[(A, 1), (B, 1)]),
            &budgets(0, 20_000_000, 30_000_000),
            Some(1),
        );
        // B won the lottery, so the sole non-winner takes all of C.
        assert_eq!(rewards.get(A).copied(), Some(30_000_000));
        assert_eq!(rewards.get(B).copied(), Some(20_000_000));
    }

    #[test]
    fn pool_c_remainder_goes_to_lowest() {
        // C = 10 over three equal non-winners: base 3 each, first one extra
        let rewards =
            calculate_rewards_with_winner(&shares(&[(A, 1), (B, 1), (C, 1)]), &budgets(0, 0, 10), None);
        assert_eq!(rewards.get(A).copied(), Some(4));
        assert_eq!(rewards.get(B).copied(), Some(3));
        assert_eq!(rewards.get(C).copied(), Some(3));
    }

    #[test]
    fn distributed_total_never_exceeds_budgets() {
        let cases: Vec<(Vec<(&str, u64)>, RewardBudgets, Option<usize>)> = vec![
            (vec![(A, 3)], budgets(50_000_000, 50_000_000, 0), Some(0)),
            (
                vec![(A, 9), (B, 1)],
                budgets(50_000_000, 50_000_000, 9_000_000),
                Some(0),
            ),
            (
                vec![(A, 7), (B, 5), (C, 2)],
                budgets(33_333_333, 50_000_000, 1_000_001),
                Some(1),
            ),
            (vec![(A, 1), (B, 1), (C, 1)], budgets(10, 0, 10), None),
        ];
        for (entries, b, winner) in cases {
            let rewards = calculate_rewards_with_winner(&shares(&entries), &b, winner);
            let total: u64 = rewards.values().sum();
            assert!(
                total <= b.total(),
                "distributed {total} exceeds budget {}",
                b.total()
            );
        }
    }

    #[test]
    fn rng_entry_point_matches_forced_winner_for_sole_candidate() {
        let map = shares(&[(A, 5)]);
        let b = budgets(50_000_000, 50_000_000, 0);
        let drawn = calculate_rewards(&map, &b, &mut rand::rngs::OsRng);
        let forced = calculate_rewards_with_winner(&map, &b, Some(0));
        assert_eq!(drawn, forced);
    }
}
