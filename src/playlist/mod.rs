//! Playlist assembly
//!
//! Merges a filled schedule with packed commercials into the final ordered
//! list of playable segments. Every content item becomes an alternating run
//! of commercial groups and program pieces: one group before the first
//! piece, one after each internal break, one after the last piece. An item
//! with B internal breaks therefore yields B + 1 program pieces and B + 2
//! commercial groups.
//!
//! Holiday mode is a content-policy branch, not an optimization: internal
//! breaks are ignored so the program plays uncut, and each commercial group
//! keeps only its first commercial to thin the ad load.

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use tracing::warn;

use crate::catalog::CatalogReader;
use crate::commercials;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::{BreakMarker, Commercial, CommercialId};
use crate::scheduler::engine::SlotFill;

// ============================================================================
// Scheduled Segment
// ============================================================================

/// What a segment plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Program,
    Commercial,
}

/// One playable segment: a file plus the cut points to play within it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledSegment {
    pub ordinal: usize,
    pub kind: SegmentKind,
    pub file: String,
    pub start_cut: u32,
    pub stop_cut: u32,
}

impl ScheduledSegment {
    pub fn duration(&self) -> u32 {
        self.stop_cut.saturating_sub(self.start_cut)
    }
}

// ============================================================================
// Playlist Assembler
// ============================================================================

/// Builds the final segment sequence for a filled schedule
pub struct PlaylistAssembler<'a> {
    catalog: &'a dyn CatalogReader,
    config: &'a EngineConfig,
}

impl<'a> PlaylistAssembler<'a> {
    pub fn new(catalog: &'a dyn CatalogReader, config: &'a EngineConfig) -> Self {
        Self { catalog, config }
    }

    /// Assemble segments for the filled slots, in slot order
    pub fn assemble(
        &self,
        fills: &[SlotFill],
        holiday: bool,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<ScheduledSegment>> {
        let mut segments = Vec::new();
        for fill in fills {
            self.append_item(fill, holiday, rng, &mut segments)?;
        }

        if let Some(signoff) = &self.config.playlist.signoff {
            push_segment(
                &mut segments,
                SegmentKind::Program,
                signoff.file.clone(),
                0,
                signoff.duration_secs,
            );
        }

        Ok(segments)
    }

    fn append_item(
        &self,
        fill: &SlotFill,
        holiday: bool,
        rng: &mut ChaCha8Rng,
        segments: &mut Vec<ScheduledSegment>,
    ) -> Result<()> {
        let content = &fill.content;
        let breaks: &[BreakMarker] = if holiday { &[] } else { content.breaks() };
        let group_count = breaks.len() + 2;

        // Residual air time to fill with commercials. Holiday programming
        // mirrors the content runtime instead of the slot residue.
        let target = if holiday {
            content.true_runtime()
        } else {
            fill.slot.duration_secs.saturating_sub(content.true_runtime())
        };

        let mut groups = self.pack_for_item(content.air_year(), target, group_count, rng)?;
        if holiday {
            for group in &mut groups.1 {
                group.truncate(1);
            }
        }
        let (by_id, groups) = groups;

        // Opening commercial group
        push_group(segments, &groups[0], &by_id);

        // Program pieces with a commercial group after each one
        let start = content.start_point();
        let end = content.end_point();
        let mut cuts: Vec<(u32, u32)> = Vec::with_capacity(breaks.len() + 1);
        if breaks.is_empty() {
            cuts.push((start, end));
        } else {
            cuts.push((start, breaks[0].break_point + 1));
            for pair in breaks.windows(2) {
                cuts.push((pair[0].resume_point, pair[1].break_point + 1));
            }
            cuts.push((breaks[breaks.len() - 1].resume_point, end));
        }

        for (i, (piece_start, piece_stop)) in cuts.into_iter().enumerate() {
            push_segment(
                segments,
                SegmentKind::Program,
                content.file().to_string(),
                piece_start,
                piece_stop,
            );
            push_group(segments, &groups[i + 1], &by_id);
        }

        Ok(())
    }

    /// Fetch the eligible commercial pool for the item's era and pack it
    #[allow(clippy::type_complexity)]
    fn pack_for_item(
        &self,
        air_year: i32,
        target: u32,
        group_count: usize,
        rng: &mut ChaCha8Rng,
    ) -> Result<(HashMap<CommercialId, Commercial>, Vec<Vec<CommercialId>>)> {
        if target == 0 {
            return Ok((HashMap::new(), vec![Vec::new(); group_count]));
        }

        let lookback = self.config.commercials.lookback_years;
        let pool = self
            .catalog
            .commercials(target, air_year - lookback, air_year)?;

        if pool.is_empty() {
            // non-fatal: the break groups simply run short
            warn!(
                air_year,
                target_secs = target,
                "no commercials eligible for break fill, groups will be under-filled"
            );
            return Ok((HashMap::new(), vec![Vec::new(); group_count]));
        }

        let pairs: Vec<(CommercialId, u32)> = pool.iter().map(|c| (c.id, c.duration())).collect();
        let selected =
            commercials::search(&pairs, target, self.config.commercials.max_attempts, rng);
        let groups = commercials::stripe(&selected, group_count);

        let by_id = pool.into_iter().map(|c| (c.id, c)).collect();
        Ok((by_id, groups))
    }
}

fn push_group(
    segments: &mut Vec<ScheduledSegment>,
    group: &[CommercialId],
    by_id: &HashMap<CommercialId, Commercial>,
) {
    for id in group {
        if let Some(c) = by_id.get(id) {
            push_segment(
                segments,
                SegmentKind::Commercial,
                c.file.clone(),
                c.start_point,
                c.end_point,
            );
        }
    }
}

fn push_segment(
    segments: &mut Vec<ScheduledSegment>,
    kind: SegmentKind,
    file: String,
    start_cut: u32,
    stop_cut: u32,
) {
    let ordinal = segments.len();
    segments.push(ScheduledSegment {
        ordinal,
        kind,
        file,
        start_cut,
        stop_cut,
    });
}

// ============================================================================
// M3U Rendering
// ============================================================================

/// Render segments as an extended M3U playlist with start/stop directives,
/// the format the channel players consume
pub fn write_m3u<W: Write>(segments: &[ScheduledSegment], mut out: W) -> std::io::Result<()> {
    writeln!(out, "#EXTM3U")?;
    for segment in segments {
        writeln!(out, "#EXTVLCOPT:start-time={}", segment.start_cut)?;
        writeln!(out, "#EXTVLCOPT:stop-time={}", segment.stop_cut)?;
        writeln!(out, "{}", segment.file)?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::models::{BreakMarker, ContentItem, Episode, Movie, Show};
    use crate::scheduler::slots::TimeSlot;
    use chrono::NaiveDate;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(3)
    }

    fn slot(duration: u32) -> TimeSlot {
        let start = NaiveDate::from_ymd_opt(1972, 9, 15)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap();
        TimeSlot::new(3, start, duration)
    }

    fn episode_item(breaks: Vec<BreakMarker>, end_point: u32) -> ContentItem {
        let show = Show {
            id: 1,
            title: "Test Show".into(),
            genres: vec!["comedy".into()],
            durations: vec![1800],
            start_year: 1970,
            end_year: 1975,
            networks: vec!["cbs".into()],
            syndicated: false,
            popularity: 1.0,
        };
        let episode = Episode {
            id: 9,
            show_id: 1,
            air_date: NaiveDate::from_ymd_opt(1972, 3, 1).unwrap(),
            season_number: 1,
            number: 1,
            season: "any".into(),
            start_point: 0,
            end_point,
            breaks,
            file: "test_show.mp4".into(),
        };
        ContentItem::Episode { show, episode }
    }

    fn fill(content: ContentItem, slot_secs: u32) -> SlotFill {
        SlotFill {
            slot: slot(slot_secs),
            content,
            chosen_secs: slot_secs,
            forced: false,
        }
    }

    fn catalog_with_commercials(durations: &[u32]) -> MemoryCatalog {
        let mut catalog = MemoryCatalog::new();
        for (i, d) in durations.iter().enumerate() {
            catalog.add_commercial(crate::models::Commercial {
                id: i as i64 + 1,
                air_year: 1972,
                start_point: 0,
                end_point: *d,
                file: format!("reel_{}.mp4", i + 1),
            });
        }
        catalog
    }

    #[test]
    fn test_no_breaks_two_commercial_groups() {
        let catalog = catalog_with_commercials(&[60, 60, 60, 60, 60]);
        let config = EngineConfig::default();
        let assembler = PlaylistAssembler::new(&catalog, &config);

        // 1500 s episode in an 1800 s slot leaves 300 s to fill
        let fills = vec![fill(episode_item(Vec::new(), 1500), 1800)];
        let segments = assembler.assemble(&fills, false, &mut rng()).unwrap();

        let programs: Vec<_> = segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Program)
            .collect();
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].start_cut, 0);
        assert_eq!(programs[0].stop_cut, 1500);

        // commercials fill the residue exactly
        let ad_total: u32 = segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Commercial)
            .map(ScheduledSegment::duration)
            .sum();
        assert_eq!(ad_total, 300);

        // ordinals are dense and ordered
        for (i, s) in segments.iter().enumerate() {
            assert_eq!(s.ordinal, i);
        }
    }

    #[test]
    fn test_breaks_produce_pieces_and_groups() {
        let catalog = catalog_with_commercials(&[30, 30, 30, 30, 30, 30, 30, 30, 30, 30]);
        let config = EngineConfig::default();
        let assembler = PlaylistAssembler::new(&catalog, &config);

        let breaks = vec![BreakMarker::new(500, 510), BreakMarker::new(1000, 1020)];
        let fills = vec![fill(episode_item(breaks, 1530), 1800)];
        let segments = assembler.assemble(&fills, false, &mut rng()).unwrap();

        let programs: Vec<_> = segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Program)
            .collect();
        assert_eq!(programs.len(), 3);
        // cut arithmetic: resume point to break point + 1
        assert_eq!((programs[0].start_cut, programs[0].stop_cut), (0, 501));
        assert_eq!((programs[1].start_cut, programs[1].stop_cut), (510, 1001));
        assert_eq!((programs[2].start_cut, programs[2].stop_cut), (1020, 1530));
    }

    #[test]
    fn test_holiday_ignores_breaks_and_thins_ads() {
        let catalog = catalog_with_commercials(&[60, 60, 60, 60, 60, 60]);
        let config = EngineConfig::default();
        let assembler = PlaylistAssembler::new(&catalog, &config);

        let breaks = vec![
            BreakMarker::new(400, 410),
            BreakMarker::new(800, 810),
            BreakMarker::new(1200, 1210),
        ];
        let fills = vec![fill(episode_item(breaks, 1530), 1800)];
        let segments = assembler.assemble(&fills, true, &mut rng()).unwrap();

        let programs: Vec<_> = segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Program)
            .collect();
        let ads: Vec<_> = segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Commercial)
            .collect();

        // one uncut piece, at most one commercial in each of the two groups
        assert_eq!(programs.len(), 1);
        assert_eq!((programs[0].start_cut, programs[0].stop_cut), (0, 1530));
        assert!(ads.len() <= 2);
    }

    #[test]
    fn test_empty_pool_proceeds_underfilled() {
        let catalog = MemoryCatalog::new();
        let config = EngineConfig::default();
        let assembler = PlaylistAssembler::new(&catalog, &config);

        let fills = vec![fill(episode_item(Vec::new(), 1500), 1800)];
        let segments = assembler.assemble(&fills, false, &mut rng()).unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::Program);
    }

    #[test]
    fn test_movie_fills_slot_residue() {
        let catalog = catalog_with_commercials(&[120, 120, 120, 60, 60]);
        let config = EngineConfig::default();
        let assembler = PlaylistAssembler::new(&catalog, &config);

        let movie = ContentItem::Movie(Movie {
            id: 2,
            title: "Feature".into(),
            genres: vec!["drama".into()],
            release_year: 1972,
            season: "any".into(),
            rating: "PG".into(),
            start_point: 0,
            end_point: 5100,
            file: "feature.mp4".into(),
        });
        let fills = vec![fill(movie, 5400)];
        let segments = assembler.assemble(&fills, false, &mut rng()).unwrap();

        let total: u32 = segments.iter().map(ScheduledSegment::duration).sum();
        assert_eq!(total, 5400);
    }

    #[test]
    fn test_signoff_appended() {
        let catalog = MemoryCatalog::new();
        let mut config = EngineConfig::default();
        config.playlist.signoff = Some(crate::config::SignoffConfig {
            file: "signoff/high_flight.mp4".into(),
            duration_secs: 120,
        });
        let assembler = PlaylistAssembler::new(&catalog, &config);

        let fills = vec![fill(episode_item(Vec::new(), 1500), 1800)];
        let segments = assembler.assemble(&fills, false, &mut rng()).unwrap();
        let last = segments.last().unwrap();
        assert_eq!(last.file, "signoff/high_flight.mp4");
        assert_eq!(last.duration(), 120);
    }

    #[test]
    fn test_write_m3u_directive_pairs() {
        let segments = vec![
            ScheduledSegment {
                ordinal: 0,
                kind: SegmentKind::Commercial,
                file: "reel.mp4".into(),
                start_cut: 30,
                stop_cut: 75,
            },
            ScheduledSegment {
                ordinal: 1,
                kind: SegmentKind::Program,
                file: "show.mp4".into(),
                start_cut: 0,
                stop_cut: 1500,
            },
        ];

        let mut buf = Vec::new();
        write_m3u(&segments, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("#EXTM3U\n"));
        assert_eq!(text.matches("#EXTVLCOPT:start-time=").count(), 2);
        assert_eq!(text.matches("#EXTVLCOPT:stop-time=").count(), 2);
        assert!(text.contains("start-time=30\n#EXTVLCOPT:stop-time=75\nreel.mp4"));
    }
}
