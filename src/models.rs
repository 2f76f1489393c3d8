// Core data structures for the retrocast scheduling engine

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel identifier
pub type ChannelId = i64;
/// Show identifier
pub type ShowId = i64;
/// Episode, movie or special identifier (unique within its media table)
pub type MediaId = i64;
/// Commercial identifier
pub type CommercialId = i64;

// ============================================================================
// Media Kind / Content Key
// ============================================================================

/// Which media table a content item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Show,
    Movie,
    Special,
}

impl MediaKind {
    /// Table-name style identifier, used as the key prefix in the rotation ledger
    pub fn id(&self) -> &'static str {
        match self {
            Self::Show => "shows",
            Self::Movie => "movies",
            Self::Special => "specials",
        }
    }

    /// Parse from a table-name identifier
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "shows" | "episodes" => Some(Self::Show),
            "movies" => Some(Self::Movie),
            "specials" => Some(Self::Special),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Stable identity of a playable content item across media tables.
///
/// Rendered as `shows_123` / `movies_7`, matching the keys stored in the
/// rotation ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentKey {
    pub kind: MediaKind,
    pub id: MediaId,
}

impl ContentKey {
    pub fn new(kind: MediaKind, id: MediaId) -> Self {
        Self { kind, id }
    }

    pub fn episode(id: MediaId) -> Self {
        Self::new(MediaKind::Show, id)
    }

    pub fn movie(id: MediaId) -> Self {
        Self::new(MediaKind::Movie, id)
    }

    pub fn special(id: MediaId) -> Self {
        Self::new(MediaKind::Special, id)
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind, self.id)
    }
}

// ============================================================================
// Show
// ============================================================================

/// Reference data for a series: genre tags, allowed slot durations, air-year
/// range, network affinities. Immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Show {
    pub id: ShowId,
    pub title: String,
    /// Lowercase genre tags
    pub genres: Vec<String>,
    /// Allowed nominal durations in seconds (e.g. 1800, 3600)
    pub durations: Vec<u32>,
    pub start_year: i32,
    pub end_year: i32,
    /// Lowercase network names the show originally aired on
    pub networks: Vec<String>,
    pub syndicated: bool,
    pub popularity: f64,
}

impl Show {
    /// Whether the show was on the air during `year`
    pub fn active_in(&self, year: i32) -> bool {
        self.start_year <= year && year <= self.end_year
    }

    /// Whether the show is available for rerun scheduling in `year`:
    /// currently airing, or finished and syndicated.
    pub fn airable_in(&self, year: i32) -> bool {
        self.active_in(year) || (self.syndicated && self.end_year <= year)
    }

    pub fn airs_on(&self, network: &str) -> bool {
        self.networks.iter().any(|n| n.eq_ignore_ascii_case(network))
    }

    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g.eq_ignore_ascii_case(genre))
    }

    /// Of the allowed durations, the one closest to `slot_secs`.
    /// Ties break toward the smaller duration.
    pub fn pick_duration(&self, slot_secs: u32) -> Option<u32> {
        self.durations
            .iter()
            .copied()
            .min_by_key(|d| (d.abs_diff(slot_secs), *d))
    }

    /// A show fits a slot when its closest duration does not exceed it
    pub fn fits_slot(&self, slot_secs: u32) -> bool {
        matches!(self.pick_duration(slot_secs), Some(d) if d <= slot_secs)
    }
}

// ============================================================================
// Break Markers
// ============================================================================

/// A point where a program's own footage pauses for a commercial break,
/// produced offline by black-frame detection. Seconds into the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakMarker {
    pub break_point: u32,
    pub resume_point: u32,
}

impl BreakMarker {
    pub fn new(break_point: u32, resume_point: u32) -> Self {
        Self {
            break_point,
            resume_point,
        }
    }

    /// Footage swallowed by the break itself (black frames, bumpers)
    pub fn gap(&self) -> u32 {
        self.resume_point.saturating_sub(self.break_point)
    }
}

// ============================================================================
// Episode
// ============================================================================

/// A single episode of a show, with trim points and internal break markers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: MediaId,
    pub show_id: ShowId,
    pub air_date: NaiveDate,
    pub season_number: i32,
    pub number: i32,
    /// Seasonal tag such as `christmas`; `any` for regular episodes
    pub season: String,
    /// Trim points, seconds into the source media
    pub start_point: u32,
    pub end_point: u32,
    /// Internal commercial-break markers, ordered by break point
    pub breaks: Vec<BreakMarker>,
    pub file: String,
}

impl Episode {
    pub fn key(&self) -> ContentKey {
        ContentKey::episode(self.id)
    }

    /// Wall-clock span of the trimmed source
    pub fn runtime(&self) -> u32 {
        self.end_point.saturating_sub(self.start_point)
    }

    /// Runtime minus the footage consumed by the episode's own break gaps.
    /// This is the quantity commercial fill is computed against.
    pub fn true_runtime(&self) -> u32 {
        let gaps: u32 = self.breaks.iter().map(BreakMarker::gap).sum();
        self.runtime().saturating_sub(gaps)
    }

    pub fn air_year(&self) -> i32 {
        self.air_date.year()
    }
}

// ============================================================================
// Movie / Special
// ============================================================================

/// A feature movie. Movies have no internal break markers; breaks are
/// inserted only before and after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: MediaId,
    pub title: String,
    pub genres: Vec<String>,
    pub release_year: i32,
    /// Seasonal tag such as `christmas`; `any` otherwise
    pub season: String,
    pub rating: String,
    pub start_point: u32,
    pub end_point: u32,
    pub file: String,
}

impl Movie {
    pub fn key(&self) -> ContentKey {
        ContentKey::movie(self.id)
    }

    pub fn runtime(&self) -> u32 {
        self.end_point.saturating_sub(self.start_point)
    }

    /// Runtime rounded up to whole slot units of `base_secs`
    pub fn rounded_duration(&self, base_secs: u32) -> u32 {
        if base_secs == 0 {
            return self.runtime();
        }
        self.runtime().div_ceil(base_secs) * base_secs
    }
}

/// A one-off special broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Special {
    pub id: MediaId,
    pub title: String,
    pub genres: Vec<String>,
    pub air_year: i32,
    pub season: String,
    pub start_point: u32,
    pub end_point: u32,
    pub file: String,
}

impl Special {
    pub fn key(&self) -> ContentKey {
        ContentKey::special(self.id)
    }

    pub fn runtime(&self) -> u32 {
        self.end_point.saturating_sub(self.start_point)
    }
}

// ============================================================================
// Commercial
// ============================================================================

/// A single commercial inside a concatenated reel file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commercial {
    pub id: CommercialId,
    pub air_year: i32,
    /// Cut points inside the reel file, seconds
    pub start_point: u32,
    pub end_point: u32,
    pub file: String,
}

impl Commercial {
    pub fn duration(&self) -> u32 {
        self.end_point.saturating_sub(self.start_point)
    }
}

// ============================================================================
// Content Item
// ============================================================================

/// A playable content item assigned to a slot.
///
/// The variants expose a uniform accessor surface so slot filling and
/// playlist assembly never branch on the media table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ContentItem {
    Episode { show: Show, episode: Episode },
    Movie(Movie),
    Special(Special),
}

impl ContentItem {
    pub fn key(&self) -> ContentKey {
        match self {
            Self::Episode { episode, .. } => episode.key(),
            Self::Movie(m) => m.key(),
            Self::Special(s) => s.key(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Episode { show, .. } => &show.title,
            Self::Movie(m) => &m.title,
            Self::Special(s) => &s.title,
        }
    }

    pub fn file(&self) -> &str {
        match self {
            Self::Episode { episode, .. } => &episode.file,
            Self::Movie(m) => &m.file,
            Self::Special(s) => &s.file,
        }
    }

    pub fn genres(&self) -> &[String] {
        match self {
            Self::Episode { show, .. } => &show.genres,
            Self::Movie(m) => &m.genres,
            Self::Special(s) => &s.genres,
        }
    }

    pub fn show_id(&self) -> Option<ShowId> {
        match self {
            Self::Episode { show, .. } => Some(show.id),
            _ => None,
        }
    }

    pub fn start_point(&self) -> u32 {
        match self {
            Self::Episode { episode, .. } => episode.start_point,
            Self::Movie(m) => m.start_point,
            Self::Special(s) => s.start_point,
        }
    }

    pub fn end_point(&self) -> u32 {
        match self {
            Self::Episode { episode, .. } => episode.end_point,
            Self::Movie(m) => m.end_point,
            Self::Special(s) => s.end_point,
        }
    }

    /// Internal break markers; empty for movies and specials
    pub fn breaks(&self) -> &[BreakMarker] {
        match self {
            Self::Episode { episode, .. } => &episode.breaks,
            _ => &[],
        }
    }

    pub fn runtime(&self) -> u32 {
        self.end_point().saturating_sub(self.start_point())
    }

    /// Runtime minus internal break gaps
    pub fn true_runtime(&self) -> u32 {
        match self {
            Self::Episode { episode, .. } => episode.true_runtime(),
            _ => self.runtime(),
        }
    }

    /// Year the item aired or was released, used for commercial matching
    pub fn air_year(&self) -> i32 {
        match self {
            Self::Episode { episode, .. } => episode.air_year(),
            Self::Movie(m) => m.release_year,
            Self::Special(s) => s.air_year,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn show_with_durations(durations: Vec<u32>) -> Show {
        Show {
            id: 1,
            title: "Test Show".into(),
            genres: vec!["comedy".into()],
            durations,
            start_year: 1970,
            end_year: 1975,
            networks: vec!["cbs".into()],
            syndicated: false,
            popularity: 1.0,
        }
    }

    #[test]
    fn test_content_key_display() {
        assert_eq!(ContentKey::episode(12).to_string(), "shows_12");
        assert_eq!(ContentKey::movie(7).to_string(), "movies_7");
        assert_eq!(ContentKey::special(3).to_string(), "specials_3");
    }

    #[test]
    fn test_media_kind_roundtrip() {
        assert_eq!(MediaKind::from_id("shows"), Some(MediaKind::Show));
        assert_eq!(MediaKind::from_id("movies"), Some(MediaKind::Movie));
        assert_eq!(MediaKind::from_id("unknown"), None);
    }

    #[test]
    fn test_pick_duration_closest() {
        let show = show_with_durations(vec![1800, 3600]);
        assert_eq!(show.pick_duration(1800), Some(1800));
        assert_eq!(show.pick_duration(3600), Some(3600));
        assert_eq!(show.pick_duration(2000), Some(1800));
    }

    #[test]
    fn test_pick_duration_ties_toward_smaller() {
        let show = show_with_durations(vec![1800, 3600]);
        // 2700 is equidistant from both options
        assert_eq!(show.pick_duration(2700), Some(1800));
    }

    #[test]
    fn test_fits_slot() {
        let show = show_with_durations(vec![3600]);
        assert!(show.fits_slot(3600));
        assert!(!show.fits_slot(1800));
    }

    #[test]
    fn test_airable_in_syndication() {
        let mut show = show_with_durations(vec![1800]);
        show.syndicated = true;
        assert!(show.airable_in(1973)); // active
        assert!(show.airable_in(1980)); // ended, syndicated
        show.syndicated = false;
        assert!(!show.airable_in(1980));
    }

    #[test]
    fn test_true_runtime_subtracts_break_gaps() {
        let episode = Episode {
            id: 1,
            show_id: 1,
            air_date: NaiveDate::from_ymd_opt(1972, 9, 15).unwrap(),
            season_number: 1,
            number: 1,
            season: "any".into(),
            start_point: 10,
            end_point: 1510,
            breaks: vec![BreakMarker::new(500, 520), BreakMarker::new(1000, 1030)],
            file: "ep.mp4".into(),
        };
        assert_eq!(episode.runtime(), 1500);
        assert_eq!(episode.true_runtime(), 1500 - 20 - 30);
    }

    #[test]
    fn test_movie_rounded_duration() {
        let movie = Movie {
            id: 1,
            title: "Feature".into(),
            genres: vec!["drama".into()],
            release_year: 1968,
            season: "any".into(),
            rating: "PG".into(),
            start_point: 0,
            end_point: 5400,
            file: "movie.mp4".into(),
        };
        assert_eq!(movie.rounded_duration(1800), 5400);
        let shorter = Movie {
            end_point: 5000,
            ..movie
        };
        assert_eq!(shorter.rounded_duration(1800), 5400);
    }

    #[test]
    fn test_content_item_uniform_accessors() {
        let show = show_with_durations(vec![1800]);
        let episode = Episode {
            id: 4,
            show_id: show.id,
            air_date: NaiveDate::from_ymd_opt(1971, 3, 2).unwrap(),
            season_number: 2,
            number: 5,
            season: "any".into(),
            start_point: 0,
            end_point: 1440,
            breaks: vec![BreakMarker::new(700, 710)],
            file: "s02e05.mp4".into(),
        };
        let item = ContentItem::Episode { show, episode };
        assert_eq!(item.key().to_string(), "shows_4");
        assert_eq!(item.breaks().len(), 1);
        assert_eq!(item.runtime(), 1440);
        assert_eq!(item.true_runtime(), 1430);
        assert_eq!(item.air_year(), 1971);
    }
}
