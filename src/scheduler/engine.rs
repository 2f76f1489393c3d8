//! Schedule assembly engine
//!
//! Orchestrates slot building, candidate selection, the rotation ledger and
//! playlist assembly for one (channel, day) request. Slot filling is a small
//! state machine: a pending slot either gets content and becomes `Filled`,
//! or splits into base-granularity sub-slots and re-enters pending, or lands
//! in `ForcedFallback` where a designated filler movie takes the slot.
//! Recursion depth is bounded by slot_duration / base_granularity, so the
//! machine always terminates.
//!
//! Ledger writes are strictly additive. A fill records its broadcast-log
//! entry immediately and nothing rolls it back; a later fallback elsewhere
//! in the day leaves earlier fills untouched.

use chrono::{Datelike, NaiveDate, NaiveTime};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use super::bias;
use super::error::SchedulerError;
use super::selector::{self, SelectionContext};
use super::slots::{FixedSlot, SlotBuilder, TimeSlot};
use crate::catalog::CatalogReader;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::ledger::RotationLedger;
use crate::models::{ChannelId, ContentItem, Episode, MediaId, Show, ShowId};
use crate::playlist::{PlaylistAssembler, ScheduledSegment};

// ============================================================================
// Request / Fill Types
// ============================================================================

/// One (channel, day) assembly request
#[derive(Debug, Clone)]
pub struct AssemblyRequest {
    pub channel: ChannelId,
    /// Network the channel replays, for affinity scoring
    pub network: String,
    pub date: NaiveDate,
    pub start: NaiveTime,
    /// End time; at or before `start` means the window crosses midnight
    pub end: NaiveTime,
    pub fixed_slots: Vec<FixedSlot>,
    /// Explicit seed for reproducible assembly; derived from the date when
    /// absent, so re-running the same day yields the same schedule
    pub seed: Option<u64>,
}

impl AssemblyRequest {
    pub fn new(channel: ChannelId, network: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            channel,
            network: network.into(),
            date,
            start: NaiveTime::from_hms_opt(18, 0, 0).expect("valid literal time"),
            end: NaiveTime::from_hms_opt(23, 0, 0).expect("valid literal time"),
            fixed_slots: Vec::new(),
            seed: None,
        }
    }

    pub fn with_window(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_fixed_slots(mut self, fixed: Vec<FixedSlot>) -> Self {
        self.fixed_slots = fixed;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn effective_seed(&self) -> u64 {
        // the date's day number gives a stable per-day default
        self.seed
            .unwrap_or_else(|| self.date.num_days_from_ce() as u64)
    }
}

/// A slot with its chosen content
#[derive(Debug, Clone)]
pub struct SlotFill {
    pub slot: TimeSlot,
    pub content: ContentItem,
    /// Nominal duration the content was booked at
    pub chosen_secs: u32,
    /// True when the fill came from the fallback path
    pub forced: bool,
}

/// Lifecycle of a slot inside the filling machine
#[derive(Debug)]
enum SlotState {
    Filled(SlotFill),
    Split(Vec<TimeSlot>),
    ForcedFallback(SlotFill),
}

/// Per-request mutable state threaded through slot filling
struct DayContext {
    channel: ChannelId,
    network: String,
    year: i32,
    shows: Vec<Show>,
    /// Shows already placed today, kept out of later open slots
    used_shows: HashSet<ShowId>,
    /// Genres of the previous slot's pick, for adjacency scoring
    prev_genres: Option<Vec<String>>,
    /// Pinned shows swapped out after running dry, effective for the rest
    /// of the run
    replacements: HashMap<ShowId, ShowId>,
}

// ============================================================================
// Schedule Engine
// ============================================================================

/// The schedule assembly engine.
///
/// Storage handles are injected; their lifecycle belongs to the caller.
/// A request either completes a full day's schedule or fails outright,
/// never yielding a partial segment list.
pub struct ScheduleEngine<'a> {
    catalog: &'a dyn CatalogReader,
    ledger: &'a mut dyn RotationLedger,
    config: EngineConfig,
}

impl<'a> ScheduleEngine<'a> {
    pub fn new(
        catalog: &'a dyn CatalogReader,
        ledger: &'a mut dyn RotationLedger,
        config: EngineConfig,
    ) -> Self {
        Self {
            catalog,
            ledger,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Assemble a complete day's playable segment list for one channel
    pub fn assemble_schedule(
        &mut self,
        request: &AssemblyRequest,
    ) -> Result<Vec<ScheduledSegment>> {
        let mut rng = ChaCha8Rng::seed_from_u64(request.effective_seed());
        let fills = self.fill_day_with_rng(request, &mut rng)?;

        let assembler = PlaylistAssembler::new(self.catalog, &self.config);
        let segments = assembler.assemble(&fills, false, &mut rng)?;

        info!(
            channel = request.channel,
            date = %request.date,
            slots = fills.len(),
            segments = segments.len(),
            "assembled schedule"
        );
        Ok(segments)
    }

    /// Fill the day's slots without assembling the playlist. Exposed for
    /// callers that only need the slot-to-content mapping (guide rendering,
    /// dry runs).
    pub fn fill_day(&mut self, request: &AssemblyRequest) -> Result<Vec<SlotFill>> {
        let mut rng = ChaCha8Rng::seed_from_u64(request.effective_seed());
        self.fill_day_with_rng(request, &mut rng)
    }

    /// Build a seasonal lineup: shuffle the season's episodes, movies and
    /// specials, take items until the requested duration is covered, then
    /// assemble in holiday mode (uncut programs, thinned ad load).
    pub fn assemble_holiday_lineup(
        &mut self,
        channel: ChannelId,
        date: NaiveDate,
        start: NaiveTime,
        duration_secs: u32,
        season: &str,
        seed: Option<u64>,
    ) -> Result<Vec<ScheduledSegment>> {
        let mut rng =
            ChaCha8Rng::seed_from_u64(seed.unwrap_or_else(|| date.num_days_from_ce() as u64));

        let mut items: Vec<ContentItem> = Vec::new();
        for (show, episode) in self.catalog.seasonal_episodes(season)? {
            items.push(ContentItem::Episode { show, episode });
        }
        for movie in self.catalog.seasonal_movies(season)? {
            items.push(ContentItem::Movie(movie));
        }
        for special in self.catalog.seasonal_specials(season)? {
            items.push(ContentItem::Special(special));
        }

        if items.is_empty() {
            warn!(season, "no seasonal content in catalog, lineup is empty");
            return Ok(Vec::new());
        }
        items.shuffle(&mut rng);

        let mut fills = Vec::new();
        let mut cursor = date.and_time(start);
        let mut covered = 0u32;
        for item in items {
            if covered >= duration_secs {
                break;
            }
            let runtime = item.true_runtime();
            let slot = TimeSlot::new(channel, cursor, runtime);
            cursor += chrono::Duration::seconds(i64::from(runtime));
            covered += runtime;
            fills.push(SlotFill {
                slot,
                chosen_secs: runtime,
                content: item,
                forced: false,
            });
        }

        let assembler = PlaylistAssembler::new(self.catalog, &self.config);
        let segments = assembler.assemble(&fills, true, &mut rng)?;
        info!(
            channel,
            season,
            items = fills.len(),
            "assembled holiday lineup"
        );
        Ok(segments)
    }

    fn fill_day_with_rng(
        &mut self,
        request: &AssemblyRequest,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<SlotFill>> {
        let builder = SlotBuilder::with_menu(
            self.config.slots.base_secs,
            self.config.slots.durations.clone(),
            self.config.slots.weights.clone(),
        );
        let slots = builder.build(
            request.channel,
            request.date,
            request.start,
            request.end,
            &request.fixed_slots,
            rng,
        )?;

        let mut day = DayContext {
            channel: request.channel,
            network: request.network.to_lowercase(),
            year: request.date.year(),
            shows: self.catalog.shows_airable_in_year(request.date.year())?,
            used_shows: HashSet::new(),
            prev_genres: None,
            replacements: HashMap::new(),
        };

        let mut fills = Vec::new();
        for slot in slots {
            self.resolve_slot(slot, &mut day, rng, &mut fills)?;
        }
        Ok(fills)
    }

    /// Drive one slot to `Filled` or `ForcedFallback`, splitting as needed
    fn resolve_slot(
        &mut self,
        slot: TimeSlot,
        day: &mut DayContext,
        rng: &mut ChaCha8Rng,
        fills: &mut Vec<SlotFill>,
    ) -> Result<()> {
        match self.step(&slot, day, rng)? {
            SlotState::Filled(fill) | SlotState::ForcedFallback(fill) => {
                day.prev_genres = Some(fill.content.genres().to_vec());
                fills.push(fill);
                Ok(())
            }
            SlotState::Split(sub_slots) => {
                for sub in sub_slots {
                    self.resolve_slot(sub, day, rng, fills)?;
                }
                Ok(())
            }
        }
    }

    /// One state transition for a pending slot
    fn step(
        &mut self,
        slot: &TimeSlot,
        day: &mut DayContext,
        rng: &mut ChaCha8Rng,
    ) -> Result<SlotState> {
        if let Some(pinned) = slot.pinned {
            if let Some(fill) = self.fill_pinned(slot, pinned, day, rng)? {
                return Ok(SlotState::Filled(fill));
            }
            // the pinned show and its replacements are dry, fall through to
            // open selection
        }

        if let Some(fill) = self.select_for_slot(slot, day, rng)? {
            return Ok(SlotState::Filled(fill));
        }

        let base = self.config.slots.base_secs;
        if slot.duration_secs > base {
            let err = SchedulerError::no_candidate(slot.start, slot.duration_secs);
            debug!(%err, "splitting slot to base granularity");
            return Ok(SlotState::Split(split_slot(slot, base)));
        }

        match self.forced_fallback(slot, day, rng)? {
            Some(fill) => Ok(SlotState::ForcedFallback(fill)),
            None => Err(SchedulerError::unfillable(slot.start, slot.duration_secs).into()),
        }
    }

    /// Fill a slot pinned to a specific show, swapping in a replacement show
    /// when the pinned one has no unseen episodes left
    fn fill_pinned(
        &mut self,
        slot: &TimeSlot,
        pinned: ShowId,
        day: &mut DayContext,
        rng: &mut ChaCha8Rng,
    ) -> Result<Option<SlotFill>> {
        let mut show_id = pinned;
        while let Some(next) = day.replacements.get(&show_id) {
            show_id = *next;
        }

        let Some(mut show) = self.catalog.show(show_id)? else {
            warn!(show_id, "pinned show missing from catalog");
            return Ok(None);
        };

        let mut episodes = self.catalog.episodes(show.id)?;
        let mut unseen = self.ledger.unseen_episodes(day.channel, &episodes)?;

        if unseen.is_empty() {
            let Some(replacement) = self.find_replacement(&show, slot, day, rng)? else {
                warn!(
                    show = show.id,
                    "pinned show is out of episodes and no replacement qualifies"
                );
                return Ok(None);
            };
            info!(
                retired = show.id,
                replacement = replacement.id,
                "rotating in replacement show for recurring slot"
            );
            day.replacements.insert(show.id, replacement.id);
            episodes = self.catalog.episodes(replacement.id)?;
            unseen = self.ledger.unseen_episodes(day.channel, &episodes)?;
            show = replacement;
            if unseen.is_empty() {
                return Ok(None);
            }
        }

        let episode = pick_episode(&episodes, &unseen, slot.date(), rng);
        Ok(Some(self.commit_episode(slot, show, episode, day)?))
    }

    /// Candidate show qualifying to take over a retired recurring slot:
    /// syndicated, fits the slot, never aired on this channel, and still
    /// has unseen episodes
    fn find_replacement(
        &self,
        retiring: &Show,
        slot: &TimeSlot,
        day: &DayContext,
        rng: &mut ChaCha8Rng,
    ) -> Result<Option<Show>> {
        let mut candidates = Vec::new();
        for show in &day.shows {
            if show.id == retiring.id || !show.syndicated || !show.fits_slot(slot.duration_secs) {
                continue;
            }
            if self.ledger.show_has_aired(day.channel, show.id)? {
                continue;
            }
            let episodes = self.catalog.episodes(show.id)?;
            if !self.ledger.unseen_episodes(day.channel, &episodes)?.is_empty() {
                candidates.push(show.clone());
            }
        }
        Ok(candidates.choose(rng).cloned())
    }

    /// Open selection: weighted draw over the year-eligible pool, skipping
    /// shows with nothing unseen left
    fn select_for_slot(
        &mut self,
        slot: &TimeSlot,
        day: &mut DayContext,
        rng: &mut ChaCha8Rng,
    ) -> Result<Option<SlotFill>> {
        let min_secs =
            (f64::from(slot.duration_secs) * self.config.fill.min_fill_fraction).ceil() as u32;

        let pool: Vec<&Show> = day
            .shows
            .iter()
            .filter(|s| !day.used_shows.contains(&s.id))
            .filter(|s| {
                s.pick_duration(slot.duration_secs)
                    .is_some_and(|d| d <= slot.duration_secs && d >= min_secs)
            })
            .collect();
        if pool.is_empty() {
            return Ok(None);
        }

        let preferred = bias::preferred_genres(slot.date(), slot.hour());
        let ctx = SelectionContext {
            network: &day.network,
            preferred,
            prev_genres: day.prev_genres.as_deref(),
        };
        let ranked = selector::ranked_draw(&pool, &ctx, rng);

        let mut picked: Option<(Show, Episode)> = None;
        for show in ranked {
            let episodes = self.catalog.episodes(show.id)?;
            let unseen = self.ledger.unseen_episodes(day.channel, &episodes)?;
            if unseen.is_empty() {
                continue;
            }
            let episode = pick_episode(&episodes, &unseen, slot.date(), rng);
            picked = Some((show.clone(), episode));
            break;
        }

        match picked {
            Some((show, episode)) => Ok(Some(self.commit_episode(slot, show, episode, day)?)),
            None => Ok(None),
        }
    }

    /// Record the fill in the ledger and produce the slot assignment
    fn commit_episode(
        &mut self,
        slot: &TimeSlot,
        show: Show,
        episode: Episode,
        day: &mut DayContext,
    ) -> Result<SlotFill> {
        self.ledger
            .record_aired(day.channel, Some(show.id), &episode.key(), slot.start)?;
        day.used_shows.insert(show.id);

        let chosen_secs = show
            .pick_duration(slot.duration_secs)
            .unwrap_or(slot.duration_secs);
        debug!(
            slot = %slot.start,
            show = show.id,
            episode = episode.id,
            chosen_secs,
            "slot filled"
        );
        Ok(SlotFill {
            slot: slot.clone(),
            content: ContentItem::Episode { show, episode },
            chosen_secs,
            forced: false,
        })
    }

    /// Last resort for a base-granularity slot: book a filler movie.
    /// A forced repeat of an already-aired movie is degraded behavior and
    /// logged; its ledger entry already exists and is not duplicated.
    fn forced_fallback(
        &mut self,
        slot: &TimeSlot,
        day: &mut DayContext,
        _rng: &mut ChaCha8Rng,
    ) -> Result<Option<SlotFill>> {
        let movies = self.catalog.movies(&self.config.fill.filler_ratings)?;

        let mut seen = HashSet::new();
        for movie in &movies {
            if self.ledger.has_aired(day.channel, &movie.key())? {
                seen.insert(movie.key());
            }
        }

        if let Some(movie) =
            selector::choose_movie(&movies, day.year, slot.duration_secs, |k| seen.contains(k))
        {
            warn!(slot = %slot.start, movie = movie.id, "forced fallback to filler movie");
            self.ledger
                .record_aired(day.channel, None, &movie.key(), slot.start)?;
            return Ok(Some(SlotFill {
                slot: slot.clone(),
                content: ContentItem::Movie(movie.clone()),
                chosen_secs: slot.duration_secs,
                forced: true,
            }));
        }

        if self.config.fill.allow_forced_repeats {
            if let Some(movie) =
                selector::choose_movie(&movies, day.year, slot.duration_secs, |_| false)
            {
                warn!(
                    slot = %slot.start,
                    movie = movie.id,
                    "all filler movies already aired, forcing a repeat"
                );
                return Ok(Some(SlotFill {
                    slot: slot.clone(),
                    content: ContentItem::Movie(movie.clone()),
                    chosen_secs: slot.duration_secs,
                    forced: true,
                }));
            }
        }

        Ok(None)
    }
}

/// Subdivide a slot into base-granularity sub-slots; a remainder shorter
/// than the base becomes the final sub-slot
fn split_slot(slot: &TimeSlot, base_secs: u32) -> Vec<TimeSlot> {
    let mut subs = Vec::new();
    let mut cursor = slot.start;
    let mut remaining = slot.duration_secs;
    while remaining > 0 {
        let secs = remaining.min(base_secs);
        subs.push(TimeSlot::new(slot.channel, cursor, secs));
        cursor += chrono::Duration::seconds(i64::from(secs));
        remaining -= secs;
    }
    subs
}

/// Random unseen episode, preferring those that had aired by the broadcast
/// date
fn pick_episode(
    episodes: &[Episode],
    unseen: &[MediaId],
    on: NaiveDate,
    rng: &mut ChaCha8Rng,
) -> Episode {
    let unseen_set: HashSet<&MediaId> = unseen.iter().collect();
    let pool: Vec<&Episode> = episodes
        .iter()
        .filter(|e| unseen_set.contains(&e.id))
        .collect();
    let dated: Vec<&Episode> = pool
        .iter()
        .copied()
        .filter(|e| e.air_date <= on)
        .collect();
    let from = if dated.is_empty() { &pool } else { &dated };
    (*from.choose(rng).expect("unseen episode pool is non-empty")).clone()
}

// ============================================================================
// Tests
// ============================================================================
