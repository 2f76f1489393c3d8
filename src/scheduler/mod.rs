//! Schedule assembly for simulated broadcast channels
//!
//! This module turns a (channel, day) request into a filled broadcast
//! schedule: an ordered sequence of time slots, each assigned a concrete
//! episode or movie that fits the slot, matches the era, and has not aired
//! on the channel before.
//!
//! # Overview
//!
//! Slot filling runs as a synchronous pipeline per channel-day. Each fill
//! updates the rotation ledger, which the next slot's candidate pool depends
//! on (adjacency scoring, unseen-episode sets), so slots resolve strictly in
//! order. Every randomized choice draws from one seeded ChaCha8 RNG, making
//! a full day's assembly reproducible.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                       ScheduleEngine                          │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────┐   │
//! │  │    Slot     │  │  Candidate   │  │     Rotation       │   │
//! │  │   Builder   │  │  Selector    │  │     Ledger         │   │
//! │  └──────┬──────┘  └──────┬───────┘  └─────────┬──────────┘   │
//! │         │                │                     │              │
//! │         └────────────────┼─────────────────────┘              │
//! │                          │                                    │
//! │                   ┌──────▼──────┐      ┌─────────────────┐   │
//! │                   │ Slot-Filling│─────▶│    Playlist     │   │
//! │                   │State Machine│      │    Assembler    │   │
//! │                   └─────────────┘      └─────────────────┘   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`slots`] - Time slot generation with pinned-slot splicing
//! - [`bias`] - Decade and hour keyed genre preference tables
//! - [`selector`] - Candidate scoring and weighted random draws
//! - [`engine`] - The slot-filling state machine and entry points
//! - [`error`] - Scheduler error taxonomy
//!
//! # Quick Start
//!
//! ```ignore
//! use retrocast::catalog::SqliteCatalog;
//! use retrocast::config::EngineConfig;
//! use retrocast::ledger::SqliteLedger;
//! use retrocast::scheduler::engine::{AssemblyRequest, ScheduleEngine};
//! use chrono::NaiveDate;
//!
//! let catalog = SqliteCatalog::open("catalog.db")?;
//! let mut ledger = SqliteLedger::open("ledger.db")?;
//! let mut engine = ScheduleEngine::new(&catalog, &mut ledger, EngineConfig::default());
//!
//! let request = AssemblyRequest::new(7, "CBS", NaiveDate::from_ymd_opt(1972, 9, 15).unwrap())
//!     .with_seed(42);
//! let segments = engine.assemble_schedule(&request)?;
//! for segment in &segments {
//!     println!("{:>4} {:?} {}", segment.ordinal, segment.kind, segment.file);
//! }
//! ```

pub mod bias;
pub mod engine;
pub mod error;
pub mod selector;
pub mod slots;

// Re-export main types
pub use engine::{AssemblyRequest, ScheduleEngine, SlotFill};
pub use error::{SchedulerError, SchedulerResult};
pub use selector::SelectionContext;
pub use slots::{FixedSlot, SlotBuilder, TimeSlot};
