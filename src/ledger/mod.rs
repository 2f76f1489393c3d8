//! Rotation ledger
//!
//! Durable record of what has aired per channel, used to keep content from
//! repeating across broadcast cycles. Entries are append-only: a record is
//! written exactly once per successful slot fill and never mutated or rolled
//! back. Inserting the same (channel, content) pair twice signals a
//! scheduling bug upstream and is surfaced as a hard conflict rather than
//! silently ignored.
//!
//! The trait / SQLite / in-memory triple mirrors the storage layout used for
//! the catalog: production runs on SQLite so rotation survives restarts,
//! tests run on the memory ledger.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

use crate::models::{ChannelId, ContentKey, Episode, MediaId, MediaKind, ShowId};

/// Ledger-specific errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Duplicate rotation record for the same (channel, content) pair.
    /// Always a logic bug upstream, never recovered.
    #[error("rotation record already exists for channel {channel} and {content}")]
    WriteConflict {
        channel: ChannelId,
        content: ContentKey,
    },

    /// Underlying storage failure
    #[error("ledger storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// One broadcast-log entry
#[derive(Debug, Clone, PartialEq)]
pub struct RotationRecord {
    pub channel: ChannelId,
    pub show: Option<ShowId>,
    pub content: ContentKey,
    pub played_at: NaiveDateTime,
}

/// Tracks which content has already aired per channel
pub trait RotationLedger {
    /// Whether this content has aired on the channel
    fn has_aired(&self, channel: ChannelId, content: &ContentKey) -> Result<bool, LedgerError>;

    /// Whether any episode of the show has aired on the channel
    fn show_has_aired(&self, channel: ChannelId, show: ShowId) -> Result<bool, LedgerError>;

    /// Append a broadcast-log entry. Duplicate (channel, content) pairs are
    /// rejected with [`LedgerError::WriteConflict`].
    fn record_aired(
        &mut self,
        channel: ChannelId,
        show: Option<ShowId>,
        content: &ContentKey,
        played_at: NaiveDateTime,
    ) -> Result<(), LedgerError>;

    /// All entries for a channel, oldest first
    fn history(&self, channel: ChannelId) -> Result<Vec<RotationRecord>, LedgerError>;

    /// Of the given episodes, the ids not yet aired on the channel
    fn unseen_episodes(
        &self,
        channel: ChannelId,
        episodes: &[Episode],
    ) -> Result<Vec<MediaId>, LedgerError> {
        let mut unseen = Vec::new();
        for ep in episodes {
            if !self.has_aired(channel, &ep.key())? {
                unseen.push(ep.id);
            }
        }
        Ok(unseen)
    }
}

// ============================================================================
// SQLite Ledger
// ============================================================================

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Durable SQLite-backed ledger
pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    /// Open (and initialize if needed) a ledger database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// In-memory SQLite ledger, mainly for tests
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, LedgerError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS broadcast_log (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                channel_id  INTEGER NOT NULL,
                show_id     INTEGER,
                media_kind  TEXT NOT NULL,
                media_id    INTEGER NOT NULL,
                played_at   TEXT NOT NULL,
                UNIQUE (channel_id, media_kind, media_id)
            );
            CREATE INDEX IF NOT EXISTS idx_broadcast_log_channel_show
                ON broadcast_log (channel_id, show_id);",
        )?;
        Ok(Self { conn })
    }

    fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

impl RotationLedger for SqliteLedger {
    fn has_aired(&self, channel: ChannelId, content: &ContentKey) -> Result<bool, LedgerError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM broadcast_log
             WHERE channel_id = ?1 AND media_kind = ?2 AND media_id = ?3",
            params![channel, content.kind.id(), content.id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn show_has_aired(&self, channel: ChannelId, show: ShowId) -> Result<bool, LedgerError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM broadcast_log WHERE channel_id = ?1 AND show_id = ?2",
            params![channel, show],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn record_aired(
        &mut self,
        channel: ChannelId,
        show: Option<ShowId>,
        content: &ContentKey,
        played_at: NaiveDateTime,
    ) -> Result<(), LedgerError> {
        let result = self.conn.execute(
            "INSERT INTO broadcast_log (channel_id, show_id, media_kind, media_id, played_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                channel,
                show,
                content.kind.id(),
                content.id,
                played_at.format(TIME_FORMAT).to_string()
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if Self::is_unique_violation(&e) => Err(LedgerError::WriteConflict {
                channel,
                content: *content,
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn history(&self, channel: ChannelId) -> Result<Vec<RotationRecord>, LedgerError> {
        let mut stmt = self.conn.prepare(
            "SELECT show_id, media_kind, media_id, played_at
             FROM broadcast_log WHERE channel_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![channel], |row| {
            let show: Option<ShowId> = row.get(0)?;
            let kind: String = row.get(1)?;
            let media_id: MediaId = row.get(2)?;
            let played_at: String = row.get(3)?;
            Ok((show, kind, media_id, played_at))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (show, kind, media_id, played_at) = row?;
            let kind = MediaKind::from_id(&kind).unwrap_or(MediaKind::Show);
            let played_at = NaiveDateTime::parse_from_str(&played_at, TIME_FORMAT)
                .map_err(|_| rusqlite::Error::InvalidQuery)?;
            records.push(RotationRecord {
                channel,
                show,
                content: ContentKey::new(kind, media_id),
                played_at,
            });
        }
        Ok(records)
    }

    fn unseen_episodes(
        &self,
        channel: ChannelId,
        episodes: &[Episode],
    ) -> Result<Vec<MediaId>, LedgerError> {
        let mut stmt = self.conn.prepare(
            "SELECT media_id FROM broadcast_log
             WHERE channel_id = ?1 AND media_kind = 'shows'",
        )?;
        let aired: HashSet<MediaId> = stmt
            .query_map(params![channel], |row| row.get(0))?
            .collect::<Result<_, _>>()?;

        Ok(episodes
            .iter()
            .filter(|ep| !aired.contains(&ep.id))
            .map(|ep| ep.id)
            .collect())
    }
}

// ============================================================================
// Memory Ledger
// ============================================================================

/// Volatile in-memory ledger for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryLedger {
    aired: HashMap<ChannelId, HashSet<ContentKey>>,
    records: Vec<RotationRecord>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RotationLedger for MemoryLedger {
    fn has_aired(&self, channel: ChannelId, content: &ContentKey) -> Result<bool, LedgerError> {
        Ok(self
            .aired
            .get(&channel)
            .is_some_and(|set| set.contains(content)))
    }

    fn show_has_aired(&self, channel: ChannelId, show: ShowId) -> Result<bool, LedgerError> {
        Ok(self
            .records
            .iter()
            .any(|r| r.channel == channel && r.show == Some(show)))
    }

    fn record_aired(
        &mut self,
        channel: ChannelId,
        show: Option<ShowId>,
        content: &ContentKey,
        played_at: NaiveDateTime,
    ) -> Result<(), LedgerError> {
        let set = self.aired.entry(channel).or_default();
        if !set.insert(*content) {
            return Err(LedgerError::WriteConflict {
                channel,
                content: *content,
            });
        }
        self.records.push(RotationRecord {
            channel,
            show,
            content: *content,
            played_at,
        });
        Ok(())
    }

    fn history(&self, channel: ChannelId) -> Result<Vec<RotationRecord>, LedgerError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.channel == channel)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn played_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1972, 9, 15)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap()
    }

    fn episode(id: MediaId, show_id: ShowId) -> Episode {
        Episode {
            id,
            show_id,
            air_date: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
            season_number: 1,
            number: id as i32,
            season: "any".into(),
            start_point: 0,
            end_point: 1500,
            breaks: Vec::new(),
            file: format!("ep_{id}.mp4"),
        }
    }

    fn exercise_ledger(ledger: &mut dyn RotationLedger) {
        let key = ContentKey::episode(10);
        assert!(!ledger.has_aired(3, &key).unwrap());

        ledger.record_aired(3, Some(1), &key, played_at()).unwrap();
        assert!(ledger.has_aired(3, &key).unwrap());
        assert!(ledger.show_has_aired(3, 1).unwrap());
        // other channels are unaffected
        assert!(!ledger.has_aired(4, &key).unwrap());

        // duplicate insert is a conflict, not a silent no-op
        let err = ledger.record_aired(3, Some(1), &key, played_at()).unwrap_err();
        assert!(matches!(err, LedgerError::WriteConflict { .. }));

        // movies and episodes with the same numeric id do not collide
        ledger
            .record_aired(3, None, &ContentKey::movie(10), played_at())
            .unwrap();

        let history = ledger.history(3).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, key);

        let episodes = vec![episode(10, 1), episode(11, 1), episode(12, 1)];
        let unseen = ledger.unseen_episodes(3, &episodes).unwrap();
        assert_eq!(unseen, vec![11, 12]);
    }

    #[test]
    fn test_memory_ledger() {
        let mut ledger = MemoryLedger::new();
        exercise_ledger(&mut ledger);
    }

    #[test]
    fn test_sqlite_ledger() {
        let mut ledger = SqliteLedger::open_in_memory().unwrap();
        exercise_ledger(&mut ledger);
    }

    #[test]
    fn test_sqlite_ledger_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let mut ledger = SqliteLedger::open(&path).unwrap();
            ledger
                .record_aired(7, Some(2), &ContentKey::episode(5), played_at())
                .unwrap();
        }

        let ledger = SqliteLedger::open(&path).unwrap();
        assert!(ledger.has_aired(7, &ContentKey::episode(5)).unwrap());
    }
}
