//! Plan limit resolution, including the history-derived `custom` token limit.

use super::blocks::Block;
use crate::config::{Plan, PlanLimits};

/// Token limits of the fixed plans; a block close to one of these is taken
/// to have hit a limit.
const KNOWN_TOKEN_LIMITS: [u64; 3] = [19_000, 88_000, 220_000];

/// Fraction of a known limit that counts as hitting it.
const LIMIT_HIT_THRESHOLD: f64 = 0.95;

/// Floor for the derived custom limit.
const MIN_CUSTOM_TOKENS: u64 = 19_000;

pub fn resolve(plan: Plan, blocks: &[Block]) -> PlanLimits {
    let mut limits = plan.limits();
    if plan == Plan::Custom {
        limits.tokens = p90_token_limit(blocks);
    }
    limits
}

/// 90th percentile of completed session totals.
///
/// Sessions that came close to a known limit are preferred as the sample;
/// if none did, every completed session counts.
pub fn p90_token_limit(blocks: &[Block]) -> u64 {
    let completed: Vec<u64> = blocks
        .iter()
        .filter(|b| !b.is_gap && !b.is_active && b.total_tokens > 0)
        .map(|b| b.total_tokens)
        .collect();

    let hits: Vec<u64> = completed
        .iter()
        .copied()
        .filter(|&tokens| {
            KNOWN_TOKEN_LIMITS
                .iter()
                .any(|&limit| tokens as f64 >= limit as f64 * LIMIT_HIT_THRESHOLD)
        })
        .collect();

    let mut sample = if hits.is_empty() { completed } else { hits };
    if sample.is_empty() {
        return Plan::CUSTOM_DEFAULT_TOKENS;
    }
    sample.sort_unstable();

    let p90 = percentile(&sample, 0.9).round() as u64;
    p90.max(MIN_CUSTOM_TOKENS)
}

/// Linear-interpolated percentile of a sorted, non-empty slice.
fn percentile(sorted: &[u64], q: f64) -> f64 {
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] as f64 + (sorted[hi] as f64 - sorted[lo] as f64) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done(tokens: u64) -> Block {
        Block {
            total_tokens: tokens,
            ..Default::default()
        }
    }

    #[test]
    fn test_fixed_plans_ignore_history() {
        let blocks = vec![done(500_000)];
        assert_eq!(resolve(Plan::Pro, &blocks).tokens, 19_000);
        assert_eq!(resolve(Plan::Max20, &blocks).tokens, 220_000);
    }

    #[test]
    fn test_custom_without_history_uses_default() {
        assert_eq!(resolve(Plan::Custom, &[]).tokens, Plan::CUSTOM_DEFAULT_TOKENS);
        assert!((resolve(Plan::Custom, &[]).cost - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_custom_prefers_limit_hitting_sessions() {
        let blocks = vec![done(1_000), done(2_000), done(85_000), done(90_000)];
        // sample = [85_000, 90_000] -> 85_000 + 0.9 * 5_000
        assert_eq!(p90_token_limit(&blocks), 89_500);
    }

    #[test]
    fn test_custom_interpolates_over_hits() {
        let blocks: Vec<Block> = (1..=10).map(|i| done(i * 3_000)).collect();
        // hits are 21k, 24k, 27k, 30k; rank 2.7 -> 27_000 + 0.7 * 3_000
        assert_eq!(p90_token_limit(&blocks), 29_100);
    }

    #[test]
    fn test_custom_is_floored() {
        assert_eq!(p90_token_limit(&[done(100), done(200)]), MIN_CUSTOM_TOKENS);
    }

    #[test]
    fn test_active_and_gap_blocks_excluded() {
        let blocks = vec![
            Block {
                is_active: true,
                total_tokens: 200_000,
                ..Default::default()
            },
            Block {
                is_gap: true,
                total_tokens: 200_000,
                ..Default::default()
            },
        ];
        assert_eq!(p90_token_limit(&blocks), Plan::CUSTOM_DEFAULT_TOKENS);
    }
}
