//! Liftlog - SQLite-backed workout recording session engine
//!
//! Manages an in-progress exercise-logging session with durable persistence,
//! a pause/suspend-tolerant elapsed timer, and best-ever statistics that stay
//! consistent as set data is created, edited, or deleted. Headless: meant to
//! be driven by a presentation layer through [`Recorder`].

pub mod db;
pub mod error;
pub mod records;
pub mod recorder;
pub mod timer;
pub mod types;

pub use db::Database;
pub use error::Error;
pub use recorder::{EntrySnapshot, PreviousPerformance, Recorder, SessionSnapshot, WorkoutSummary};
pub use timer::{Timer, TimerStatus};
pub use types::{
    EntryId, ExerciseEntry, Metric, PersonalRecord, RecordId, SessionId, SetId, SetRecord,
    WorkoutSession, WorkoutStatus,
};
