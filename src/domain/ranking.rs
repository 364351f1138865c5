//! Cross-sectional ranking by current and prior momentum score.
//!
//! Both orderings use a stable sort, so securities with equal scores keep their
//! input order. Equal scores are common in the source data and the table must
//! not reshuffle them between refreshes.

use crate::domain::security::SecurityRecord;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedRecord {
    pub record: SecurityRecord,
    /// 1-based position by `score` descending.
    pub rank: usize,
    /// 1-based position by `prior_score` descending.
    pub prior_rank: usize,
    /// `prior_rank - rank`; positive means the security moved up.
    pub rank_change: i64,
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Positions (1-based) of each element of `keys` when stably sorted descending.
fn positions_descending(keys: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| descending(keys[a], keys[b]));

    let mut positions = vec![0; keys.len()];
    for (pos, idx) in order.into_iter().enumerate() {
        positions[idx] = pos + 1;
    }
    positions
}

/// Rank records by `score`, attaching the week-over-week rank change.
///
/// Records without a finite `score` and `prior_score` are dropped before ranking.
/// Output is ordered by `rank` ascending.
pub fn rank(records: &[SecurityRecord]) -> Vec<RankedRecord> {
    let rankable: Vec<&SecurityRecord> = records.iter().filter(|r| r.is_rankable()).collect();

    let scores: Vec<f64> = rankable.iter().map(|r| r.score.unwrap_or_default()).collect();
    let prior_scores: Vec<f64> = rankable
        .iter()
        .map(|r| r.prior_score.unwrap_or_default())
        .collect();

    let ranks = positions_descending(&scores);
    let prior_ranks = positions_descending(&prior_scores);

    let mut ranked: Vec<RankedRecord> = rankable
        .into_iter()
        .enumerate()
        .map(|(i, record)| RankedRecord {
            record: record.clone(),
            rank: ranks[i],
            prior_rank: prior_ranks[i],
            rank_change: prior_ranks[i] as i64 - ranks[i] as i64,
        })
        .collect();

    ranked.sort_by_key(|r| r.rank);
    ranked
}

/// Records whose category matches, ignoring case and surrounding whitespace.
pub fn filter_by_category(records: &[SecurityRecord], category: &str) -> Vec<SecurityRecord> {
    let wanted = category.trim().to_lowercase();
    records
        .iter()
        .filter(|r| r.category.trim().to_lowercase() == wanted)
        .cloned()
        .collect()
}

/// The `n` biggest climbers, largest positive `rank_change` first.
pub fn top_movers(ranked: &[RankedRecord], n: usize) -> Vec<RankedRecord> {
    let mut movers: Vec<RankedRecord> = ranked
        .iter()
        .filter(|r| r.rank_change > 0)
        .cloned()
        .collect();
    movers.sort_by(|a, b| b.rank_change.cmp(&a.rank_change));
    movers.truncate(n);
    movers
}
