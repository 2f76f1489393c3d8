//! retrocast - Historical Television Network Simulator
//!
//! Assembles a day's broadcast timeline for simulated channels: picks
//! era-appropriate shows, episodes and movies for time slots, fills the
//! residual air time with commercials matched to a target duration, and
//! emits an ordered playlist of cut segments, while a durable rotation
//! ledger keeps content from repeating across broadcast cycles.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and tunable defaults
//! - [`models`] - Core data structures and the content sum type
//! - [`catalog`] - Read-only media catalog access (SQLite, in-memory)
//! - [`ledger`] - Durable per-channel rotation ledger
//! - [`scheduler`] - Slot building, candidate selection, slot filling
//! - [`commercials`] - Commercial bin packing and break distribution
//! - [`playlist`] - Final segment assembly and M3U rendering
//! - [`error`] - Unified error types
//!
//! # Example
//!
//! ```no_run
//! use retrocast::catalog::SqliteCatalog;
//! use retrocast::config::EngineConfig;
//! use retrocast::ledger::SqliteLedger;
//! use retrocast::scheduler::{AssemblyRequest, ScheduleEngine};
//! use chrono::NaiveDate;
//!
//! fn main() -> anyhow::Result<()> {
//!     let catalog = SqliteCatalog::open("catalog.db")?;
//!     let mut ledger = SqliteLedger::open("ledger.db")?;
//!     let mut engine = ScheduleEngine::new(&catalog, &mut ledger, EngineConfig::default());
//!
//!     let date = NaiveDate::from_ymd_opt(1972, 9, 15).unwrap();
//!     let request = AssemblyRequest::new(7, "CBS", date).with_seed(42);
//!     let segments = engine.assemble_schedule(&request)?;
//!     retrocast::playlist::write_m3u(&segments, std::io::stdout())?;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod commercials;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod playlist;
pub mod scheduler;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{CatalogReader, MemoryCatalog, SqliteCatalog};
    pub use crate::commercials::pack_commercials;
    pub use crate::config::EngineConfig;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::ledger::{MemoryLedger, RotationLedger, SqliteLedger};
    pub use crate::models::{ContentItem, ContentKey, MediaKind};
    pub use crate::playlist::{write_m3u, ScheduledSegment, SegmentKind};
    pub use crate::scheduler::{AssemblyRequest, FixedSlot, ScheduleEngine, TimeSlot};
}

// Direct re-exports for convenience
pub use commercials::pack_commercials;
pub use scheduler::{AssemblyRequest, ScheduleEngine};
