//! Candidate selection
//!
//! Scores year-eligible shows for a slot and draws one by weighted random
//! choice. Scores are weights, not a hard ranking: a popular show that fits
//! the hour's genre bias on the target network is far more likely to be
//! drawn, but any eligible show can come up.
//!
//! Pool policy: candidates whose genres match the hour's bias are tried
//! first; if that pool carries no weight the non-matching remainder is used;
//! as a last resort the whole year-eligible pool is drawn from. Returns
//! `None` only when every pool is empty, which the slot filler handles by
//! splitting the slot or forcing a fallback.

use rand::distributions::{Distribution, WeightedIndex};
use rand_chacha::ChaCha8Rng;

use super::bias;
use crate::models::{ContentKey, Movie, Show};

/// Network affinity multiplier
const NETWORK_FACTOR: f64 = 2.0;
/// Base multiplier for a genre-bias match
const GENRE_BASE_FACTOR: f64 = 1.5;
/// Additional multiplier per rank position above the worst
const GENRE_RANK_STEP: f64 = 0.2;
/// Multiplier when the show shares a genre with the previous slot's pick
const ADJACENCY_FACTOR: f64 = 1.25;

/// Everything the scoring function knows about the slot being filled
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    /// Network the channel replays
    pub network: &'a str,
    /// Preferred genres for the slot's decade and hour, ranked best first
    pub preferred: &'a [&'static str],
    /// Genres of the immediately preceding slot's pick
    pub prev_genres: Option<&'a [String]>,
}

/// Weight for a weighted random draw; higher = more likely
pub fn score_show(show: &Show, ctx: &SelectionContext) -> f64 {
    let mut score = show.popularity;

    if !ctx.network.is_empty() && show.airs_on(ctx.network) {
        score *= NETWORK_FACTOR;
    }

    // Only the best-ranked matching genre applies
    if let Some(rank) = bias::best_rank(ctx.preferred, &show.genres) {
        let position_bonus = (ctx.preferred.len() - rank) as f64 * GENRE_RANK_STEP;
        score *= GENRE_BASE_FACTOR + position_bonus;
    }

    if let Some(prev) = ctx.prev_genres {
        if prev.iter().any(|g| show.has_genre(g)) {
            score *= ADJACENCY_FACTOR;
        }
    }

    score
}

/// Draw one show from the pool by weighted random choice.
///
/// The pool cascade is: genre-bias matches, then non-matches, then the whole
/// pool. A pool whose total weight is zero is skipped.
pub fn select_show<'a>(
    pool: &[&'a Show],
    ctx: &SelectionContext,
    rng: &mut ChaCha8Rng,
) -> Option<&'a Show> {
    let (primary, secondary): (Vec<&Show>, Vec<&Show>) = pool
        .iter()
        .copied()
        .partition(|s| bias::best_rank(ctx.preferred, &s.genres).is_some());

    for candidates in [&primary[..], &secondary[..], pool] {
        if candidates.is_empty() {
            continue;
        }
        let weights: Vec<f64> = candidates.iter().map(|s| score_show(s, ctx)).collect();
        let Ok(dist) = WeightedIndex::new(&weights) else {
            // zero or invalid total weight, fall through to the next pool
            continue;
        };
        return Some(candidates[dist.sample(rng)]);
    }

    None
}

/// Rank the whole pool by repeated weighted draws without replacement.
///
/// Used when the caller may have to skip the first picks (a drawn show with
/// no unseen episodes left) and wants the next-most-likely candidates in
/// draw order.
pub fn ranked_draw<'a>(
    pool: &[&'a Show],
    ctx: &SelectionContext,
    rng: &mut ChaCha8Rng,
) -> Vec<&'a Show> {
    let mut remaining: Vec<&Show> = pool.to_vec();
    let mut weights: Vec<f64> = remaining.iter().map(|s| score_show(s, ctx)).collect();
    let mut ordered = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let idx = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            // all remaining weights are zero, take them in pool order
            Err(_) => 0,
        };
        ordered.push(remaining.swap_remove(idx));
        weights.swap_remove(idx);
    }

    ordered
}

/// Pick the movie whose release year sits closest to the broadcast year,
/// among unseen movies that fit within `max_secs`.
///
/// Falls back to the full fitting pool when nothing was released by the
/// broadcast year. Returns `None` when every fitting movie has been seen.
pub fn choose_movie<'a, F>(
    movies: &'a [Movie],
    year: i32,
    max_secs: u32,
    is_seen: F,
) -> Option<&'a Movie>
where
    F: Fn(&ContentKey) -> bool,
{
    let fitting: Vec<&Movie> = movies.iter().filter(|m| m.runtime() <= max_secs).collect();

    let released: Vec<&Movie> = fitting
        .iter()
        .copied()
        .filter(|m| m.release_year <= year)
        .collect();
    let pool = if released.is_empty() { fitting } else { released };

    pool.into_iter()
        .filter(|m| !is_seen(&m.key()))
        .min_by_key(|m| (year - m.release_year).abs())
}

// ============================================================================
// Tests
// ============================================================================
