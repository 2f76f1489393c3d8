//! Time slot generation
//!
//! Converts a (start, end, granularity) request plus optional pinned slots
//! into an ordered, contiguous, gap-free sequence of time windows. Filler
//! slot durations are drawn from a weighted menu, clipped so they never
//! overshoot the next boundary. Windows crossing midnight are normalized by
//! rolling the end (and any fixed slot before the start) into the next day.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use rand::distributions::{Distribution, WeightedIndex};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::error::{SchedulerError, SchedulerResult};
use crate::models::{ChannelId, ShowId};

const DAY_SECS: i64 = 86_400;

// ============================================================================
// Time Slot
// ============================================================================

/// A fixed time window on a channel's daily schedule awaiting content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub channel: ChannelId,
    pub start: NaiveDateTime,
    pub duration_secs: u32,
    /// Show pinned to this slot by the day's fixed schedule, if any
    pub pinned: Option<ShowId>,
}

impl TimeSlot {
    pub fn new(channel: ChannelId, start: NaiveDateTime, duration_secs: u32) -> Self {
        Self {
            channel,
            start,
            duration_secs,
            pinned: None,
        }
    }

    pub fn end(&self) -> NaiveDateTime {
        self.start + chrono::Duration::seconds(i64::from(self.duration_secs))
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn day_of_week(&self) -> Weekday {
        self.start.weekday()
    }

    pub fn hour(&self) -> u32 {
        use chrono::Timelike;
        self.start.time().hour()
    }
}

/// A pinned window within the day, optionally tied to a specific show
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub show: Option<ShowId>,
}

impl FixedSlot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start,
            end,
            show: None,
        }
    }

    pub fn with_show(mut self, show: ShowId) -> Self {
        self.show = Some(show);
        self
    }
}

// ============================================================================
// Slot Builder
// ============================================================================

/// Builds the ordered slot sequence for one channel-day
#[derive(Debug, Clone)]
pub struct SlotBuilder {
    base_secs: u32,
    durations: Vec<u32>,
    weights: Vec<f64>,
}

impl SlotBuilder {
    /// Builder with a single fixed granularity
    pub fn new(base_secs: u32) -> Self {
        Self {
            base_secs,
            durations: vec![base_secs],
            weights: vec![1.0],
        }
    }

    /// Builder drawing filler durations from a weighted menu.
    /// An empty weight list biases toward shorter durations (1/(i+1)).
    pub fn with_menu(base_secs: u32, durations: Vec<u32>, weights: Vec<f64>) -> Self {
        let weights = if weights.is_empty() {
            (0..durations.len()).map(|i| 1.0 / (i as f64 + 1.0)).collect()
        } else {
            weights
        };
        Self {
            base_secs,
            durations,
            weights,
        }
    }

    pub fn base_secs(&self) -> u32 {
        self.base_secs
    }

    fn validate(&self) -> SchedulerResult<()> {
        if self.base_secs == 0 || self.durations.is_empty() || self.durations.contains(&0) {
            return Err(SchedulerError::invalid_granularity(self.base_secs));
        }
        if self.durations.len() != self.weights.len() {
            return Err(SchedulerError::WeightMismatch {
                durations: self.durations.len(),
                weights: self.weights.len(),
            });
        }
        Ok(())
    }

    /// Normalize a wall-clock window onto `date`, rolling the end into the
    /// next day when it is at or before the start.
    pub fn normalize_window(
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> SchedulerResult<(NaiveDateTime, NaiveDateTime)> {
        let start_dt = date.and_time(start);
        let mut end_dt = date.and_time(end);
        if end_dt <= start_dt {
            end_dt += chrono::Duration::seconds(DAY_SECS);
        }
        if end_dt <= start_dt {
            return Err(SchedulerError::invalid_range(start_dt, end_dt));
        }
        Ok((start_dt, end_dt))
    }

    /// Produce the ordered slot list covering [start, end) with no gaps or
    /// overlaps, splicing fixed slots in verbatim.
    pub fn build(
        &self,
        channel: ChannelId,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        fixed: &[FixedSlot],
        rng: &mut ChaCha8Rng,
    ) -> SchedulerResult<Vec<TimeSlot>> {
        self.validate()?;
        let (start_dt, end_dt) = Self::normalize_window(date, start, end)?;

        // Anchor each fixed slot onto the window, rolling past midnight when
        // it precedes the window start.
        let mut anchored: Vec<(NaiveDateTime, u32, Option<ShowId>)> = Vec::new();
        for f in fixed {
            let mut f_start = date.and_time(f.start);
            if f_start < start_dt {
                f_start += chrono::Duration::seconds(DAY_SECS);
            }
            let mut f_end = date.and_time(f.end);
            while f_end <= f_start {
                f_end += chrono::Duration::seconds(DAY_SECS);
            }
            if f_start < start_dt || f_end > end_dt {
                return Err(SchedulerError::fixed_slot_out_of_window(
                    f_start, start_dt, end_dt,
                ));
            }
            let secs = (f_end - f_start).num_seconds() as u32;
            anchored.push((f_start, secs, f.show));
        }
        anchored.sort_by_key(|(s, _, _)| *s);

        let mut slots = Vec::new();
        let mut cursor = start_dt;
        for (f_start, f_secs, f_show) in anchored {
            self.fill_gap(channel, cursor, f_start, &mut slots, rng)?;
            slots.push(TimeSlot {
                channel,
                start: f_start,
                duration_secs: f_secs,
                pinned: f_show,
            });
            cursor = f_start + chrono::Duration::seconds(i64::from(f_secs));
        }
        self.fill_gap(channel, cursor, end_dt, &mut slots, rng)?;

        Ok(slots)
    }

    /// Fill [from, to) with weighted random filler slots, clipping the last
    /// one so it never overshoots.
    fn fill_gap(
        &self,
        channel: ChannelId,
        from: NaiveDateTime,
        to: NaiveDateTime,
        out: &mut Vec<TimeSlot>,
        rng: &mut ChaCha8Rng,
    ) -> SchedulerResult<()> {
        let dist = WeightedIndex::new(&self.weights)
            .map_err(|_| SchedulerError::invalid_granularity(self.base_secs))?;

        let mut cursor = from;
        while cursor < to {
            let mut secs = self.durations[dist.sample(rng)];
            let remaining = (to - cursor).num_seconds();
            if i64::from(secs) > remaining {
                secs = remaining as u32;
            }
            out.push(TimeSlot::new(channel, cursor, secs));
            cursor += chrono::Duration::seconds(i64::from(secs));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(1972, 9, 15).unwrap()
    }

    fn assert_contiguous(slots: &[TimeSlot]) {
        for pair in slots.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start, "gap between slots");
        }
    }

    #[test]
    fn test_fixed_granularity_slots() {
        let builder = SlotBuilder::new(1800);
        let slots = builder
            .build(5, date(), hm(18, 0), hm(23, 0), &[], &mut rng())
            .unwrap();

        assert_eq!(slots.len(), 10);
        assert!(slots.iter().all(|s| s.duration_secs == 1800));
        assert_contiguous(&slots);
        assert_eq!(slots[0].start, date().and_time(hm(18, 0)));
        assert_eq!(slots.last().unwrap().end(), date().and_time(hm(23, 0)));
    }

    #[test]
    fn test_weighted_menu_covers_window_exactly() {
        let builder = SlotBuilder::with_menu(1800, vec![1800, 3600], vec![0.8, 0.3]);
        let slots = builder
            .build(5, date(), hm(18, 0), hm(23, 0), &[], &mut rng())
            .unwrap();

        let total: u32 = slots.iter().map(|s| s.duration_secs).sum();
        assert_eq!(total, 5 * 3600);
        assert_contiguous(&slots);
    }

    #[test]
    fn test_midnight_crossing_normalization() {
        let builder = SlotBuilder::new(1800);
        let slots = builder
            .build(5, date(), hm(18, 0), hm(1, 0), &[], &mut rng())
            .unwrap();

        let total: u32 = slots.iter().map(|s| s.duration_secs).sum();
        assert_eq!(total, 7 * 3600);
        assert_contiguous(&slots);
        // last slot ends at 01:00 the next day
        let end = slots.last().unwrap().end();
        assert_eq!(end.date(), date().succ_opt().unwrap());
    }

    #[test]
    fn test_equal_start_end_spans_full_day() {
        let builder = SlotBuilder::new(3600);
        let slots = builder
            .build(5, date(), hm(8, 0), hm(8, 0), &[], &mut rng())
            .unwrap();
        let total: u32 = slots.iter().map(|s| s.duration_secs).sum();
        assert_eq!(total, 86_400);
    }

    #[test]
    fn test_fixed_slots_spliced_verbatim() {
        let builder = SlotBuilder::with_menu(1800, vec![1800, 3600], vec![]);
        let fixed = vec![
            FixedSlot::new(hm(19, 0), hm(20, 0)).with_show(42),
            FixedSlot::new(hm(21, 30), hm(22, 0)).with_show(43),
        ];
        let slots = builder
            .build(5, date(), hm(18, 0), hm(23, 0), &fixed, &mut rng())
            .unwrap();

        assert_contiguous(&slots);
        let pinned: Vec<_> = slots.iter().filter(|s| s.pinned.is_some()).collect();
        assert_eq!(pinned.len(), 2);
        assert_eq!(pinned[0].start, date().and_time(hm(19, 0)));
        assert_eq!(pinned[0].duration_secs, 3600);
        assert_eq!(pinned[0].pinned, Some(42));
        assert_eq!(pinned[1].duration_secs, 1800);
    }

    #[test]
    fn test_fixed_slot_outside_window_rejected() {
        let builder = SlotBuilder::new(1800);
        let fixed = vec![FixedSlot::new(hm(16, 0), hm(17, 0))];
        let err = builder
            .build(5, date(), hm(18, 0), hm(23, 0), &fixed, &mut rng())
            .unwrap_err();
        assert!(matches!(err, SchedulerError::FixedSlotOutOfWindow { .. }));
    }

    #[test]
    fn test_fixed_slot_after_midnight() {
        let builder = SlotBuilder::new(1800);
        let fixed = vec![FixedSlot::new(hm(0, 0), hm(0, 30)).with_show(9)];
        let slots = builder
            .build(5, date(), hm(18, 0), hm(1, 0), &fixed, &mut rng())
            .unwrap();

        assert_contiguous(&slots);
        let pinned = slots.iter().find(|s| s.pinned == Some(9)).unwrap();
        assert_eq!(pinned.start.date(), date().succ_opt().unwrap());
    }

    #[test]
    fn test_zero_granularity_rejected() {
        let builder = SlotBuilder::new(0);
        let err = builder
            .build(5, date(), hm(18, 0), hm(23, 0), &[], &mut rng())
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidGranularity { .. }));
    }

    #[test]
    fn test_build_deterministic_under_seed() {
        let builder = SlotBuilder::with_menu(1800, vec![1800, 3600], vec![0.8, 0.3]);
        let a = builder
            .build(5, date(), hm(18, 0), hm(23, 0), &[], &mut rng())
            .unwrap();
        let b = builder
            .build(5, date(), hm(18, 0), hm(23, 0), &[], &mut rng())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_slot_accessors() {
        let slot = TimeSlot::new(5, date().and_time(hm(20, 0)), 1800);
        assert_eq!(slot.hour(), 20);
        assert_eq!(slot.day_of_week(), Weekday::Fri);
        assert_eq!(slot.end(), date().and_time(hm(20, 30)));
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    proptest! {
        #[test]
        fn slots_are_contiguous_and_exact(seed in 0u64..500, hours in 1u32..10) {
            let builder = SlotBuilder::with_menu(1800, vec![1800, 3600], vec![0.8, 0.3]);
            let date = NaiveDate::from_ymd_opt(1975, 6, 1).unwrap();
            let start = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
            let end_h = (12 + hours) % 24;
            let end = NaiveTime::from_hms_opt(end_h, 0, 0).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            let slots = builder.build(1, date, start, end, &[], &mut rng).unwrap();
            let total: u32 = slots.iter().map(|s| s.duration_secs).sum();
            prop_assert_eq!(total, hours * 3600);
            for pair in slots.windows(2) {
                prop_assert_eq!(pair[0].end(), pair[1].start);
            }
        }
    }
}
