//! Personal record engine
//!
//! Three best-ever metrics per exercise: the heaviest single set, the most
//! reps in a single set, and the largest per-session volume. The upsert path
//! only ever moves values upward; `recalculate_for_exercise` is the repair
//! mechanism after retroactive edits or deletions.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::db::Database;
use crate::error::Result;
use crate::types::{Metric, PersonalRecord, RecordId, SessionId, SetRecord};

/// Candidate value for one metric from one session's sets. Only sets with
/// weight and reps both present and positive are considered.
fn candidate_value(metric: Metric, sets: &[SetRecord]) -> Option<f64> {
    let valid = sets.iter().filter(|s| s.is_valid());
    let value = match metric {
        Metric::MaxWeight => valid
            .filter_map(|s| s.weight)
            .fold(f64::NEG_INFINITY, f64::max),
        Metric::MaxReps => valid
            .filter_map(|s| s.reps)
            .max()
            .map(|r| r as f64)
            .unwrap_or(f64::NEG_INFINITY),
        Metric::MaxVolume => {
            let total: f64 = valid.map(|s| s.volume()).sum();
            if total > 0.0 {
                total
            } else {
                f64::NEG_INFINITY
            }
        }
    };
    (value > 0.0).then_some(value)
}

/// Compare one session's sets against the stored records for an exercise and
/// upsert every metric the session strictly beats. Returns the newly set
/// records; a losing or equal candidate leaves the stored row untouched.
pub fn check_and_update(
    db: &Database,
    exercise_id: &str,
    candidate_sets: &[SetRecord],
    source_session: &SessionId,
    now: DateTime<Utc>,
) -> Result<Vec<PersonalRecord>> {
    let mut achieved = Vec::new();

    for metric in Metric::ALL {
        let Some(value) = candidate_value(metric, candidate_sets) else {
            continue;
        };

        let current = db.get_record(exercise_id, metric)?;
        if let Some(existing) = &current {
            if value <= existing.value {
                continue;
            }
        }

        let record = PersonalRecord {
            id: current.map(|r| r.id).unwrap_or_default(),
            exercise_id: exercise_id.to_string(),
            metric,
            value,
            source_session_id: Some(source_session.clone()),
            achieved_at: now,
        };
        db.upsert_record(&record)?;
        debug!(exercise_id, metric = metric.as_str(), value, "new personal record");
        achieved.push(record);
    }

    Ok(achieved)
}

/// Full rebuild for one exercise: replay every completed session's valid
/// sets in completion order and recompute the three maxima from scratch.
/// Max volume is the largest per-session sum, never a running sum across
/// sessions. Only metrics with a positive recomputed value are stored.
pub fn recalculate_for_exercise(db: &Database, exercise_id: &str) -> Result<()> {
    let history = db.completed_exercise_history(exercise_id)?;

    let mut best: Vec<PersonalRecord> = Vec::new();
    for (session_id, completed_at, sets) in &history {
        for metric in Metric::ALL {
            let Some(value) = candidate_value(metric, sets) else {
                continue;
            };
            match best.iter_mut().find(|r| r.metric == metric) {
                Some(record) if value > record.value => {
                    record.value = value;
                    record.source_session_id = Some(session_id.clone());
                    record.achieved_at = *completed_at;
                }
                Some(_) => {}
                None => best.push(PersonalRecord {
                    id: RecordId::new(),
                    exercise_id: exercise_id.to_string(),
                    metric,
                    value,
                    source_session_id: Some(session_id.clone()),
                    achieved_at: *completed_at,
                }),
            }
        }
    }

    debug!(exercise_id, records = best.len(), "recalculated personal records");
    db.replace_records_for_exercise(exercise_id, &best)
}
