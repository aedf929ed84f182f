//! Domain types and IDs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerStatus;

/// Unique workout session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique exercise entry identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique set record identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SetId(pub String);

impl SetId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique personal record identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutStatus {
    Recording,
    Completed,
}

impl WorkoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutStatus::Recording => "recording",
            WorkoutStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "recording" => Some(WorkoutStatus::Recording),
            "completed" => Some(WorkoutStatus::Completed),
            _ => None,
        }
    }
}

/// Personal record metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    MaxWeight,
    MaxReps,
    MaxVolume,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::MaxWeight, Metric::MaxReps, Metric::MaxVolume];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::MaxWeight => "max_weight",
            Metric::MaxReps => "max_reps",
            Metric::MaxVolume => "max_volume",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "max_weight" => Some(Metric::MaxWeight),
            "max_reps" => Some(Metric::MaxReps),
            "max_volume" => Some(Metric::MaxVolume),
            _ => None,
        }
    }
}

/// One logged workout, recording or completed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: SessionId,
    pub status: WorkoutStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub timer_status: TimerStatus,
    pub elapsed_seconds: i64,
    pub timer_anchor: Option<DateTime<Utc>>,
    pub memo: Option<String>,
    /// Local calendar date derived from completion; None while recording.
    pub workout_date: Option<NaiveDate>,
}

impl WorkoutSession {
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            status: WorkoutStatus::Recording,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            timer_status: TimerStatus::NotStarted,
            elapsed_seconds: 0,
            timer_anchor: None,
            memo: None,
            workout_date: None,
        }
    }
}

impl Default for WorkoutSession {
    fn default() -> Self {
        Self::new()
    }
}

/// One exercise placed within a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseEntry {
    pub id: EntryId,
    pub session_id: SessionId,
    pub exercise_id: String,
    pub display_order: i64,
    pub memo: Option<String>,
}

/// One logged attempt (weight x reps) within an entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRecord {
    pub id: SetId,
    pub entry_id: EntryId,
    pub set_number: i64,
    pub weight: Option<f64>,
    pub reps: Option<i64>,
    /// Recomputed from weight/reps on every update, never authored directly.
    pub estimated_max: Option<f64>,
}

impl SetRecord {
    /// Both operands present and positive.
    pub fn is_valid(&self) -> bool {
        matches!((self.weight, self.reps), (Some(w), Some(r)) if w > 0.0 && r > 0)
    }

    /// weight x reps for valid sets, 0 otherwise.
    pub fn volume(&self) -> f64 {
        match (self.weight, self.reps) {
            (Some(w), Some(r)) if w > 0.0 && r > 0 => w * r as f64,
            _ => 0.0,
        }
    }
}

/// Best-ever value for one (exercise, metric) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalRecord {
    pub id: RecordId,
    pub exercise_id: String,
    pub metric: Metric,
    pub value: f64,
    pub source_session_id: Option<SessionId>,
    pub achieved_at: DateTime<Utc>,
}

/// Epley-style single-set strength estimate.
///
/// None when either operand is non-positive; the weight itself for a single
/// rep; otherwise `w * (1 + r/30)` rounded to two decimal places.
pub fn estimated_max(weight: f64, reps: i64) -> Option<f64> {
    if weight <= 0.0 || reps <= 0 {
        return None;
    }
    if reps == 1 {
        return Some(weight);
    }
    let raw = weight * (1.0 + reps as f64 / 30.0);
    Some((raw * 100.0).round() / 100.0)
}

/// Parse an RFC 3339 timestamp persisted by the storage layer.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
