//! Time-of-day genre bias
//!
//! Preferred-genre tables keyed by decade and hour band, reflecting what the
//! era's networks actually programmed: family blocks in the early evening,
//! news at 6, drama and crime after 9, talk shows late. Lookup picks the
//! closest decade to the broadcast year, then the band containing the hour.

use chrono::{Datelike, NaiveDate};

/// Genres assumed when no band covers the hour (overnight, early morning)
pub const FALLBACK_GENRES: &[&str] = &["comedy", "drama", "family"];

/// One hour band: [start_hour, end_hour) with preferred genres ranked best
/// first
struct HourBand {
    start: u32,
    end: u32,
    genres: &'static [&'static str],
}

struct DecadeBias {
    decade: i32,
    bands: &'static [HourBand],
}

const BIAS_1950S: &[HourBand] = &[
    HourBand { start: 6, end: 18, genres: &["local", "family"] },
    HourBand { start: 18, end: 19, genres: &["news", "family"] },
    HourBand { start: 19, end: 21, genres: &["family", "comedy"] },
    HourBand { start: 21, end: 23, genres: &["variety", "drama"] },
    HourBand { start: 23, end: 24, genres: &["rerun", "talk"] },
];

const BIAS_1960S: &[HourBand] = &[
    HourBand { start: 6, end: 18, genres: &["local", "family", "comedy"] },
    HourBand { start: 18, end: 19, genres: &["news", "family", "comedy"] },
    HourBand { start: 19, end: 21, genres: &["comedy", "western", "family", "drama"] },
    HourBand { start: 21, end: 23, genres: &["drama", "crime", "variety", "thriller"] },
    HourBand { start: 23, end: 24, genres: &["talk", "rerun", "variety"] },
];

const BIAS_1970S: &[HourBand] = &[
    HourBand { start: 6, end: 18, genres: &["local", "family", "comedy"] },
    HourBand { start: 18, end: 19, genres: &["news", "family", "comedy"] },
    HourBand { start: 19, end: 21, genres: &["comedy", "family", "drama", "western"] },
    HourBand { start: 21, end: 23, genres: &["drama", "crime", "thriller", "comedy"] },
    HourBand { start: 23, end: 24, genres: &["talk", "rerun", "drama"] },
];

const BIAS_1980S: &[HourBand] = &[
    HourBand { start: 6, end: 18, genres: &["local", "family", "comedy"] },
    HourBand { start: 18, end: 19, genres: &["news", "family", "comedy"] },
    HourBand { start: 19, end: 21, genres: &["comedy", "family", "drama", "sitcom"] },
    HourBand { start: 21, end: 23, genres: &["drama", "crime", "thriller", "action"] },
    HourBand { start: 23, end: 24, genres: &["talk", "rerun", "variety", "drama"] },
];

const BIAS_BY_DECADE: &[DecadeBias] = &[
    DecadeBias { decade: 1950, bands: BIAS_1950S },
    DecadeBias { decade: 1960, bands: BIAS_1960S },
    DecadeBias { decade: 1970, bands: BIAS_1970S },
    DecadeBias { decade: 1980, bands: BIAS_1980S },
];

/// Preferred genres for the broadcast date and hour, ranked best first.
///
/// Picks the decade closest to the date's year, then the hour band covering
/// `hour`; hours outside every band fall back to [`FALLBACK_GENRES`].
pub fn preferred_genres(date: NaiveDate, hour: u32) -> &'static [&'static str] {
    let year = date.year();
    let table = BIAS_BY_DECADE
        .iter()
        .min_by_key(|d| (d.decade - year).abs())
        .expect("bias table is non-empty");

    table
        .bands
        .iter()
        .find(|b| b.start <= hour && hour < b.end)
        .map(|b| b.genres)
        .unwrap_or(FALLBACK_GENRES)
}

/// Rank of the best-ranked matching genre, if any of `genres` appears in the
/// preferred list. Lower rank = stronger preference.
pub fn best_rank(preferred: &[&str], genres: &[String]) -> Option<usize> {
    preferred
        .iter()
        .position(|p| genres.iter().any(|g| g.eq_ignore_ascii_case(p)))
}
