//! Session lifecycle manager
//!
//! The [`Recorder`] owns the database handle and the in-memory context for
//! the session being recorded. The presentation layer drives it through
//! these methods and reads back immutable snapshots; nothing else mutates
//! session state (single-writer discipline).
//!
//! On a storage failure the in-memory context is kept, not rolled back: the
//! working session stays available for retry and the error tells the caller
//! that storage is behind.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::records;
use crate::timer::{Timer, TimerStatus};
use crate::types::{
    estimated_max, EntryId, ExerciseEntry, PersonalRecord, SessionId, SetId, SetRecord,
    WorkoutSession, WorkoutStatus,
};

/// One exercise with its ordered sets, as held in memory and in snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySnapshot {
    pub entry: ExerciseEntry,
    pub sets: Vec<SetRecord>,
}

/// Read-only view of the session being recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session: WorkoutSession,
    pub entries: Vec<EntrySnapshot>,
    pub timer_status: TimerStatus,
    pub elapsed_seconds: i64,
}

/// Aggregates returned from completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub total_volume: f64,
    pub exercise_count: usize,
    pub set_count: usize,
    pub elapsed_seconds: i64,
    pub new_records: Vec<PersonalRecord>,
}

impl WorkoutSummary {
    fn empty() -> Self {
        Self {
            total_volume: 0.0,
            exercise_count: 0,
            set_count: 0,
            elapsed_seconds: 0,
            new_records: Vec::new(),
        }
    }
}

/// The most recent other completed session's sets for an exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviousPerformance {
    pub session_id: SessionId,
    pub completed_at: DateTime<Utc>,
    pub sets: Vec<SetRecord>,
}

/// State captured when a completed session is reopened. Discard restores
/// the session to exactly this: entries added afterwards are deleted and
/// the timer fields the completion recorded come back.
struct ContinuationBaseline {
    entry_ids: Vec<EntryId>,
    timer_status: TimerStatus,
    elapsed_seconds: i64,
}

/// In-memory aggregate for the session being recorded.
struct SessionContext {
    session: WorkoutSession,
    entries: Vec<EntrySnapshot>,
    timer: Timer,
    /// Present in continuation mode; None in fresh mode.
    baseline: Option<ContinuationBaseline>,
}

/// Session lifecycle manager
pub struct Recorder {
    db: Database,
    context: Option<SessionContext>,
}

impl Recorder {
    pub fn new(db: Database) -> Self {
        Self { db, context: None }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Whether a session is currently loaded.
    pub fn is_recording(&self) -> bool {
        self.context.is_some()
    }

    // --- Session start / continuation ---

    /// Begin recording. With a continuation id, reopen that completed
    /// session (its completed_at and workout_date stay claimed); otherwise
    /// restore the at-most-one session already in recording state, or
    /// create a fresh one.
    pub fn start_session(&mut self, continuation: Option<&SessionId>) -> Result<()> {
        match continuation {
            Some(id) => self.start_continuation(id),
            None => self.start_fresh_or_restore(),
        }
    }

    fn start_continuation(&mut self, id: &SessionId) -> Result<()> {
        let mut session = self
            .db
            .get_session(id)?
            .filter(|s| s.status == WorkoutStatus::Completed)
            .ok_or_else(|| Error::SessionNotFound { id: id.to_string() })?;

        let entries = self.load_entries(id)?;
        let baseline = ContinuationBaseline {
            entry_ids: entries.iter().map(|e| e.entry.id.clone()).collect(),
            timer_status: session.timer_status,
            elapsed_seconds: session.elapsed_seconds,
        };

        self.db.reopen_session(id)?;
        session.status = WorkoutStatus::Recording;
        session.timer_status = TimerStatus::NotStarted;
        session.elapsed_seconds = 0;
        session.timer_anchor = None;
        debug!(session_id = %id, "reopened session for continuation");

        self.context = Some(SessionContext {
            session,
            entries,
            timer: Timer::new(),
            baseline: Some(baseline),
        });
        Ok(())
    }

    fn start_fresh_or_restore(&mut self) -> Result<()> {
        if let Some(session) = self.db.find_recording_session()? {
            let entries = self.load_entries(&session.id)?;
            let timer = Timer::restore(
                session.timer_status,
                session.elapsed_seconds,
                session.timer_anchor,
            );
            debug!(session_id = %session.id, "restored recording session");
            self.context = Some(SessionContext {
                session,
                entries,
                timer,
                baseline: None,
            });
            return Ok(());
        }

        let session = WorkoutSession::new();
        self.db.insert_session(&session)?;
        debug!(session_id = %session.id, "created fresh session");
        self.context = Some(SessionContext {
            session,
            entries: Vec::new(),
            timer: Timer::new(),
            baseline: None,
        });
        Ok(())
    }

    fn load_entries(&self, session_id: &SessionId) -> Result<Vec<EntrySnapshot>> {
        let mut out = Vec::new();
        for entry in self.db.get_entries(session_id)? {
            let sets = self.db.get_sets(&entry.id)?;
            out.push(EntrySnapshot { entry, sets });
        }
        Ok(out)
    }

    // --- Mutations ---

    /// Add an exercise to the session. Idempotent: a duplicate exercise_id
    /// is a silent no-op returning None. A new entry starts with one blank
    /// set at number 1.
    pub fn add_exercise(&mut self, exercise_id: &str) -> Result<Option<EntryId>> {
        let db = &self.db;
        let ctx = self.context.as_mut().ok_or(Error::NoActiveSession)?;

        if ctx.entries.iter().any(|e| e.entry.exercise_id == exercise_id) {
            debug!(exercise_id, "exercise already in session, skipping");
            return Ok(None);
        }

        let next_order = ctx
            .entries
            .iter()
            .map(|e| e.entry.display_order)
            .max()
            .unwrap_or(0)
            + 1;
        let entry = ExerciseEntry {
            id: EntryId::new(),
            session_id: ctx.session.id.clone(),
            exercise_id: exercise_id.to_string(),
            display_order: next_order,
            memo: None,
        };
        let first_set = SetRecord {
            id: SetId::new(),
            entry_id: entry.id.clone(),
            set_number: 1,
            weight: None,
            reps: None,
            estimated_max: None,
        };

        db.insert_entry_with_first_set(&entry, &first_set)?;
        let id = entry.id.clone();
        ctx.entries.push(EntrySnapshot {
            entry,
            sets: vec![first_set],
        });
        Ok(Some(id))
    }

    /// Append a blank set with the next dense number.
    pub fn add_set(&mut self, entry_id: &EntryId) -> Result<SetId> {
        let db = &self.db;
        let ctx = self.context.as_mut().ok_or(Error::NoActiveSession)?;
        let entry = ctx
            .entries
            .iter_mut()
            .find(|e| e.entry.id == *entry_id)
            .ok_or_else(|| Error::EntryNotFound {
                id: entry_id.to_string(),
            })?;

        let set = SetRecord {
            id: SetId::new(),
            entry_id: entry_id.clone(),
            set_number: entry.sets.len() as i64 + 1,
            weight: None,
            reps: None,
            estimated_max: None,
        };
        db.insert_set(&set)?;
        let id = set.id.clone();
        entry.sets.push(set);
        Ok(id)
    }

    /// Partial update: a provided field overwrites, an omitted field keeps
    /// its current value. The estimated max is recomputed from the merged
    /// pair and is null whenever either operand is absent or non-positive.
    pub fn update_set(
        &mut self,
        set_id: &SetId,
        weight: Option<f64>,
        reps: Option<i64>,
    ) -> Result<()> {
        let db = &self.db;
        let ctx = self.context.as_mut().ok_or(Error::NoActiveSession)?;
        let set = ctx
            .entries
            .iter_mut()
            .flat_map(|e| e.sets.iter_mut())
            .find(|s| s.id == *set_id)
            .ok_or_else(|| Error::SetNotFound {
                id: set_id.to_string(),
            })?;

        let weight = weight.or(set.weight);
        let reps = reps.or(set.reps);
        let est = match (weight, reps) {
            (Some(w), Some(r)) => estimated_max(w, r),
            _ => None,
        };
        db.update_set_values(set_id, weight, reps, est)?;
        set.weight = weight;
        set.reps = reps;
        set.estimated_max = est;
        Ok(())
    }

    /// Delete a set; the entry's remaining sets renumber to a dense 1..N.
    pub fn delete_set(&mut self, set_id: &SetId) -> Result<()> {
        let db = &self.db;
        let ctx = self.context.as_mut().ok_or(Error::NoActiveSession)?;
        let entry = ctx
            .entries
            .iter_mut()
            .find(|e| e.sets.iter().any(|s| s.id == *set_id))
            .ok_or_else(|| Error::SetNotFound {
                id: set_id.to_string(),
            })?;

        db.delete_set_and_renumber(&entry.entry.id, set_id)?;
        entry.sets.retain(|s| s.id != *set_id);
        for (index, set) in entry.sets.iter_mut().enumerate() {
            set.set_number = index as i64 + 1;
        }
        Ok(())
    }

    /// Remove an exercise entry; its sets cascade away.
    pub fn remove_exercise(&mut self, entry_id: &EntryId) -> Result<()> {
        let db = &self.db;
        let ctx = self.context.as_mut().ok_or(Error::NoActiveSession)?;
        if !ctx.entries.iter().any(|e| e.entry.id == *entry_id) {
            return Err(Error::EntryNotFound {
                id: entry_id.to_string(),
            });
        }

        db.delete_entry(entry_id)?;
        ctx.entries.retain(|e| e.entry.id != *entry_id);
        Ok(())
    }

    /// Rewrite display order to match `order`, all-or-nothing.
    pub fn reorder_exercises(&mut self, order: &[EntryId]) -> Result<()> {
        let db = &self.db;
        let ctx = self.context.as_mut().ok_or(Error::NoActiveSession)?;
        for id in order {
            if !ctx.entries.iter().any(|e| e.entry.id == *id) {
                return Err(Error::EntryNotFound { id: id.to_string() });
            }
        }

        db.reorder_entries(order)?;
        for (index, id) in order.iter().enumerate() {
            if let Some(entry) = ctx.entries.iter_mut().find(|e| e.entry.id == *id) {
                entry.entry.display_order = index as i64 + 1;
            }
        }
        ctx.entries
            .sort_by_key(|e| e.entry.display_order);
        Ok(())
    }

    pub fn update_session_memo(&mut self, memo: Option<&str>) -> Result<()> {
        let db = &self.db;
        let ctx = self.context.as_mut().ok_or(Error::NoActiveSession)?;
        db.update_session_memo(&ctx.session.id, memo)?;
        ctx.session.memo = memo.map(String::from);
        Ok(())
    }

    pub fn update_entry_memo(&mut self, entry_id: &EntryId, memo: Option<&str>) -> Result<()> {
        let db = &self.db;
        let ctx = self.context.as_mut().ok_or(Error::NoActiveSession)?;
        let entry = ctx
            .entries
            .iter_mut()
            .find(|e| e.entry.id == *entry_id)
            .ok_or_else(|| Error::EntryNotFound {
                id: entry_id.to_string(),
            })?;

        db.update_entry_memo(entry_id, memo)?;
        entry.entry.memo = memo.map(String::from);
        Ok(())
    }

    // --- Completion / discard ---

    /// Finish the session: prune fully blank sets, compute aggregates over
    /// valid sets, and either finalize with a workout date and a personal
    /// record sweep, or - when not a single valid set remains - delete the
    /// session outright so a worthless row can never claim a calendar date.
    pub fn complete_workout(&mut self) -> Result<WorkoutSummary> {
        let mut ctx = self.context.take().ok_or(Error::NoActiveSession)?;
        match self.finish(&mut ctx) {
            Ok(summary) => Ok(summary),
            Err(e) => {
                // Keep the working session; the caller decides whether to
                // retry or discard.
                self.context = Some(ctx);
                Err(e)
            }
        }
    }

    fn finish(&self, ctx: &mut SessionContext) -> Result<WorkoutSummary> {
        let now = Utc::now();
        let session_id = ctx.session.id.clone();

        let pruned = self.db.prune_blank_sets(&session_id)?;
        if pruned > 0 {
            debug!(session_id = %session_id, pruned, "pruned blank sets");
        }
        for entry in &mut ctx.entries {
            entry
                .sets
                .retain(|s| !(s.weight.is_none() && s.reps.is_none()));
            for (index, set) in entry.sets.iter_mut().enumerate() {
                set.set_number = index as i64 + 1;
            }
        }

        let exercise_count = ctx.entries.len();
        let valid: Vec<&SetRecord> = ctx
            .entries
            .iter()
            .flat_map(|e| e.sets.iter())
            .filter(|s| s.is_valid())
            .collect();
        let set_count = valid.len();
        let total_volume: f64 = valid.iter().map(|s| s.volume()).sum();

        if set_count == 0 {
            // Nothing usable was logged. Deleting instead of completing
            // keeps workout_date null, so this session can never block a
            // real completion on the same date.
            self.db.delete_session(&session_id)?;
            debug!(session_id = %session_id, "deleted empty session on completion");
            return Ok(WorkoutSummary::empty());
        }

        let elapsed_seconds = ctx.timer.elapsed(now);
        // A running timer folds to paused: the stored row has no anchor, and
        // running without an anchor is not a state a live timer can hold.
        let timer_status = match ctx.timer.status() {
            TimerStatus::Running => TimerStatus::Paused,
            status => status,
        };
        let workout_date = now.with_timezone(&Local).date_naive();
        self.db.complete_session(
            &session_id,
            now,
            workout_date,
            elapsed_seconds,
            timer_status,
        )?;

        let mut new_records = Vec::new();
        for entry in &ctx.entries {
            let achieved = records::check_and_update(
                &self.db,
                &entry.entry.exercise_id,
                &entry.sets,
                &session_id,
                now,
            )?;
            new_records.extend(achieved);
        }

        debug!(
            session_id = %session_id,
            total_volume, set_count, exercise_count,
            records = new_records.len(),
            "completed workout"
        );
        Ok(WorkoutSummary {
            total_volume,
            exercise_count,
            set_count,
            elapsed_seconds,
            new_records,
        })
    }

    /// Abandon the session. In continuation mode only the entries added
    /// since reopening are deleted and the session returns to completed
    /// with its original completion time and recorded duration; a fresh
    /// session is deleted whole.
    pub fn discard_workout(&mut self) -> Result<()> {
        let ctx = self.context.take().ok_or(Error::NoActiveSession)?;
        let session_id = ctx.session.id.clone();

        let result = match &ctx.baseline {
            Some(baseline) => {
                let added: Vec<EntryId> = ctx
                    .entries
                    .iter()
                    .map(|e| e.entry.id.clone())
                    .filter(|id| !baseline.entry_ids.contains(id))
                    .collect();
                debug!(session_id = %session_id, added = added.len(), "discarding continuation");
                self.db.discard_continuation(
                    &session_id,
                    &added,
                    baseline.timer_status,
                    baseline.elapsed_seconds,
                )
            }
            None => {
                debug!(session_id = %session_id, "discarding session");
                self.db.delete_session(&session_id)
            }
        };

        if let Err(e) = result {
            self.context = Some(ctx);
            return Err(e);
        }
        Ok(())
    }

    /// Best-effort timer checkpoint, meant for backgrounding. Skipped when
    /// the session has no entries so an untouched session is never left
    /// behind as an orphan row worth restoring.
    pub fn save_draft(&self) -> Result<()> {
        let Some(ctx) = self.context.as_ref() else {
            return Ok(());
        };
        if ctx.entries.is_empty() {
            debug!(session_id = %ctx.session.id, "draft skipped for empty session");
            return Ok(());
        }
        self.persist_timer(&ctx.session.id, &ctx.timer)
    }

    // --- Timer surface ---

    pub fn start_timer(&mut self) -> Result<()> {
        let db = &self.db;
        let ctx = self.context.as_mut().ok_or(Error::NoActiveSession)?;
        let now = Utc::now();
        ctx.timer.start(now);
        ctx.session.timer_status = ctx.timer.status();
        if ctx.session.started_at.is_none() {
            ctx.session.started_at = Some(now);
            db.update_session_started(&ctx.session.id, now)?;
        }
        self.checkpoint_timer()
    }

    pub fn pause_timer(&mut self) -> Result<()> {
        let ctx = self.context.as_mut().ok_or(Error::NoActiveSession)?;
        ctx.timer.pause(Utc::now());
        ctx.session.timer_status = ctx.timer.status();
        self.checkpoint_timer()
    }

    pub fn resume_timer(&mut self) -> Result<()> {
        let ctx = self.context.as_mut().ok_or(Error::NoActiveSession)?;
        ctx.timer.resume(Utc::now());
        ctx.session.timer_status = ctx.timer.status();
        self.checkpoint_timer()
    }

    pub fn reset_timer(&mut self) -> Result<()> {
        let ctx = self.context.as_mut().ok_or(Error::NoActiveSession)?;
        ctx.timer.reset();
        ctx.session.timer_status = ctx.timer.status();
        self.checkpoint_timer()
    }

    /// Stop keeping time for this session; recording continues without a
    /// duration.
    pub fn discard_timer(&mut self) -> Result<()> {
        let ctx = self.context.as_mut().ok_or(Error::NoActiveSession)?;
        ctx.timer.discard();
        ctx.session.timer_status = ctx.timer.status();
        self.checkpoint_timer()
    }

    pub fn resume_timer_from_discarded(&mut self) -> Result<()> {
        let ctx = self.context.as_mut().ok_or(Error::NoActiveSession)?;
        ctx.timer.resume_from_discarded(Utc::now());
        ctx.session.timer_status = ctx.timer.status();
        self.checkpoint_timer()
    }

    /// Manual elapsed override, honored only while paused or discarded.
    pub fn set_elapsed(&mut self, seconds: i64) -> Result<()> {
        let ctx = self.context.as_mut().ok_or(Error::NoActiveSession)?;
        ctx.timer.set_elapsed(seconds);
        self.checkpoint_timer()
    }

    /// Foreground-return correction: fold the stale anchor into the base
    /// and re-anchor at now.
    pub fn on_foreground(&mut self) -> Result<()> {
        let ctx = self.context.as_mut().ok_or(Error::NoActiveSession)?;
        ctx.timer.reanchor(Utc::now());
        self.checkpoint_timer()
    }

    /// Persist timer fields after an in-memory transition. The transition
    /// stands either way; a failed write is logged and reported.
    fn checkpoint_timer(&self) -> Result<()> {
        match self.context.as_ref() {
            Some(ctx) => self.persist_timer(&ctx.session.id, &ctx.timer),
            None => Ok(()),
        }
    }

    fn persist_timer(&self, session_id: &SessionId, timer: &Timer) -> Result<()> {
        let result = self.db.update_timer_fields(
            session_id,
            timer.status(),
            timer.base_seconds(),
            timer.anchor(),
        );
        if let Err(e) = &result {
            warn!(session_id = %session_id, error = %e, "timer checkpoint failed");
        }
        result
    }

    // --- Read surface ---

    /// Read-only view of the current session, or None when nothing is
    /// being recorded.
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        let ctx = self.context.as_ref()?;
        Some(SessionSnapshot {
            session: ctx.session.clone(),
            entries: ctx.entries.clone(),
            timer_status: ctx.timer.status(),
            elapsed_seconds: ctx.timer.elapsed(Utc::now()),
        })
    }

    /// The most recent completed session's sets for an exercise, excluding
    /// the session currently being recorded.
    pub fn previous_performance(&self, exercise_id: &str) -> Result<Option<PreviousPerformance>> {
        let exclude = match self.context.as_ref() {
            Some(ctx) => ctx.session.id.clone(),
            None => SessionId::new(),
        };
        let found = self
            .db
            .latest_completed_session_for_exercise(exercise_id, &exclude)?;
        Ok(found.map(|(session_id, completed_at, sets)| PreviousPerformance {
            session_id,
            completed_at,
            sets,
        }))
    }

    /// Rebuild an exercise's stored records from its full completed history.
    pub fn recalculate_records(&self, exercise_id: &str) -> Result<()> {
        records::recalculate_for_exercise(&self.db, exercise_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metric;

    fn recorder() -> Recorder {
        Recorder::new(Database::open_memory().unwrap())
    }

    /// Start a session with one exercise and the given (weight, reps) sets.
    fn record_sets(rec: &mut Recorder, exercise: &str, sets: &[(Option<f64>, Option<i64>)]) {
        rec.start_session(None).unwrap();
        let entry_id = rec.add_exercise(exercise).unwrap().unwrap();
        let snapshot = rec.snapshot().unwrap();
        let mut set_ids: Vec<SetId> = snapshot.entries[0].sets.iter().map(|s| s.id.clone()).collect();
        while set_ids.len() < sets.len() {
            set_ids.push(rec.add_set(&entry_id).unwrap());
        }
        for (set_id, (w, r)) in set_ids.iter().zip(sets) {
            rec.update_set(set_id, *w, *r).unwrap();
        }
    }

    #[test]
    fn test_fresh_session_created_and_restored() {
        let mut rec = recorder();
        rec.start_session(None).unwrap();
        let id = rec.snapshot().unwrap().session.id;
        rec.add_exercise("squat").unwrap();

        // A second recorder over the same store restores the same session.
        let db2 = rec.db; // reuse the in-memory handle
        let mut rec2 = Recorder::new(db2);
        rec2.start_session(None).unwrap();
        let snapshot = rec2.snapshot().unwrap();
        assert_eq!(snapshot.session.id, id);
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.entries[0].sets.len(), 1);
    }

    #[test]
    fn test_continuation_of_missing_session_fails_cleanly() {
        let mut rec = recorder();
        let missing = SessionId::new();
        match rec.start_session(Some(&missing)) {
            Err(Error::SessionNotFound { id }) => assert_eq!(id, missing.to_string()),
            other => panic!("expected SessionNotFound, got {other:?}"),
        }
        assert!(!rec.is_recording());
        assert!(rec.db().find_recording_session().unwrap().is_none());
    }

    #[test]
    fn test_add_exercise_is_idempotent() {
        let mut rec = recorder();
        rec.start_session(None).unwrap();
        assert!(rec.add_exercise("squat").unwrap().is_some());
        assert!(rec.add_exercise("squat").unwrap().is_none());
        assert_eq!(rec.snapshot().unwrap().entries.len(), 1);
    }

    #[test]
    fn test_update_set_is_partial_and_recomputes_estimated_max() {
        let mut rec = recorder();
        rec.start_session(None).unwrap();
        rec.add_exercise("bench").unwrap();
        let set_id = rec.snapshot().unwrap().entries[0].sets[0].id.clone();

        // Weight alone on a blank set: no reps yet, so no estimate.
        rec.update_set(&set_id, Some(100.0), None).unwrap();
        let set = rec.snapshot().unwrap().entries[0].sets[0].clone();
        assert_eq!(set.weight, Some(100.0));
        assert_eq!(set.reps, None);
        assert_eq!(set.estimated_max, None);

        // Reps alone: the stored weight is kept and the estimate appears.
        rec.update_set(&set_id, None, Some(10)).unwrap();
        let set = rec.snapshot().unwrap().entries[0].sets[0].clone();
        assert_eq!(set.weight, Some(100.0));
        assert_eq!(set.estimated_max, Some(133.33));

        rec.update_set(&set_id, None, Some(1)).unwrap();
        let set = rec.snapshot().unwrap().entries[0].sets[0].clone();
        assert_eq!(set.estimated_max, Some(100.0));

        let stored = &rec.db().get_sets(&set.entry_id).unwrap()[0];
        assert_eq!(stored.weight, Some(100.0));
        assert_eq!(stored.reps, Some(1));
    }

    #[test]
    fn test_delete_set_keeps_numbers_dense() {
        let mut rec = recorder();
        rec.start_session(None).unwrap();
        let entry_id = rec.add_exercise("row").unwrap().unwrap();
        rec.add_set(&entry_id).unwrap();
        rec.add_set(&entry_id).unwrap();

        let victim = rec.snapshot().unwrap().entries[0].sets[1].id.clone();
        rec.delete_set(&victim).unwrap();

        let numbers: Vec<i64> = rec.snapshot().unwrap().entries[0]
            .sets
            .iter()
            .map(|s| s.set_number)
            .collect();
        assert_eq!(numbers, vec![1, 2]);

        let stored: Vec<i64> = rec
            .db()
            .get_sets(&entry_id)
            .unwrap()
            .iter()
            .map(|s| s.set_number)
            .collect();
        assert_eq!(stored, vec![1, 2]);
    }

    #[test]
    fn test_reorder_exercises() {
        let mut rec = recorder();
        rec.start_session(None).unwrap();
        let a = rec.add_exercise("squat").unwrap().unwrap();
        let b = rec.add_exercise("bench").unwrap().unwrap();

        rec.reorder_exercises(&[b.clone(), a.clone()]).unwrap();
        let order: Vec<String> = rec
            .snapshot()
            .unwrap()
            .entries
            .iter()
            .map(|e| e.entry.exercise_id.clone())
            .collect();
        assert_eq!(order, vec!["bench", "squat"]);
    }

    #[test]
    fn test_complete_prunes_and_aggregates() {
        // Scenario: sets (80,10), (null,null), (85,null) -> one valid set,
        // volume 800, exercise still counted.
        let mut rec = recorder();
        record_sets(
            &mut rec,
            "squat",
            &[(Some(80.0), Some(10)), (None, None), (Some(85.0), None)],
        );

        let summary = rec.complete_workout().unwrap();
        assert_eq!(summary.set_count, 1);
        assert_eq!(summary.total_volume, 800.0);
        assert_eq!(summary.exercise_count, 1);
        assert!(!rec.is_recording());
    }

    #[test]
    fn test_complete_empty_session_deletes_it() {
        let mut rec = recorder();
        record_sets(&mut rec, "squat", &[(None, None), (Some(85.0), None)]);
        let id = {
            // Snapshot before completion; the context is gone afterwards.
            rec.snapshot().unwrap().session.id
        };

        let summary = rec.complete_workout().unwrap();
        assert_eq!(summary.set_count, 0);
        assert_eq!(summary.total_volume, 0.0);
        assert!(summary.new_records.is_empty());

        assert!(rec.db().get_session(&id).unwrap().is_none());
        assert!(rec.db().get_records_for_exercise("squat").unwrap().is_empty());
    }

    #[test]
    fn test_complete_sets_records_and_date() {
        let mut rec = recorder();
        record_sets(&mut rec, "squat", &[(Some(100.0), Some(5))]);
        let id = rec.snapshot().unwrap().session.id;

        let summary = rec.complete_workout().unwrap();
        assert_eq!(summary.new_records.len(), 3);

        let stored = rec.db().get_session(&id).unwrap().unwrap();
        assert_eq!(stored.status, WorkoutStatus::Completed);
        assert!(stored.completed_at.is_some());
        assert_eq!(
            stored.workout_date,
            Some(Local::now().date_naive())
        );
        let pr = rec.db().get_record("squat", Metric::MaxWeight).unwrap().unwrap();
        assert_eq!(pr.value, 100.0);
        assert_eq!(pr.source_session_id, Some(id));
    }

    #[test]
    fn test_second_completion_same_date_is_rejected() {
        let mut rec = recorder();
        record_sets(&mut rec, "squat", &[(Some(100.0), Some(5))]);
        rec.complete_workout().unwrap();

        record_sets(&mut rec, "bench", &[(Some(60.0), Some(8))]);
        let second = rec.snapshot().unwrap().session.id;
        assert!(rec.complete_workout().is_err());

        // The working session is kept for the caller to retry or discard,
        // and only one stored row holds today's date.
        assert!(rec.is_recording());
        let stored = rec.db().get_session(&second).unwrap().unwrap();
        assert_eq!(stored.status, WorkoutStatus::Recording);
        assert_eq!(stored.workout_date, None);
        // No record write happened for the losing session.
        assert!(rec.db().get_records_for_exercise("bench").unwrap().is_empty());
    }

    #[test]
    fn test_discard_fresh_session_deletes_everything() {
        let mut rec = recorder();
        record_sets(&mut rec, "squat", &[(Some(100.0), Some(5))]);
        let id = rec.snapshot().unwrap().session.id;

        rec.discard_workout().unwrap();
        assert!(!rec.is_recording());
        assert!(rec.db().get_session(&id).unwrap().is_none());
    }

    #[test]
    fn test_continuation_discard_rolls_back_only_new_entries() {
        let mut rec = recorder();
        record_sets(&mut rec, "squat", &[(Some(100.0), Some(5))]);
        let id = rec.snapshot().unwrap().session.id;
        rec.start_timer().unwrap();
        rec.pause_timer().unwrap();
        rec.set_elapsed(90).unwrap();
        rec.complete_workout().unwrap();
        let original = rec.db().get_session(&id).unwrap().unwrap();
        assert_eq!(original.elapsed_seconds, 90);

        rec.start_session(Some(&id)).unwrap();
        rec.add_exercise("bench").unwrap();
        rec.start_timer().unwrap();
        rec.discard_workout().unwrap();

        let restored = rec.db().get_session(&id).unwrap().unwrap();
        assert_eq!(restored.status, WorkoutStatus::Completed);
        assert_eq!(restored.completed_at, original.completed_at);
        assert_eq!(restored.workout_date, original.workout_date);
        // The original duration survives the discard.
        assert_eq!(restored.elapsed_seconds, 90);
        assert_eq!(restored.timer_status, original.timer_status);
        assert!(restored.timer_anchor.is_none());

        let entries = rec.db().get_entries(&id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].exercise_id, "squat");
    }

    #[test]
    fn test_complete_folds_running_timer_to_paused() {
        let mut rec = recorder();
        record_sets(&mut rec, "squat", &[(Some(100.0), Some(5))]);
        let id = rec.snapshot().unwrap().session.id;
        rec.start_timer().unwrap();

        rec.complete_workout().unwrap();

        let stored = rec.db().get_session(&id).unwrap().unwrap();
        assert_eq!(stored.timer_status, TimerStatus::Paused);
        assert!(stored.timer_anchor.is_none());
    }

    #[test]
    fn test_save_draft_skips_empty_session() {
        let mut rec = recorder();
        rec.start_session(None).unwrap();
        rec.save_draft().unwrap();

        rec.add_exercise("squat").unwrap();
        rec.start_timer().unwrap();
        rec.save_draft().unwrap();

        let id = rec.snapshot().unwrap().session.id;
        let stored = rec.db().get_session(&id).unwrap().unwrap();
        assert_eq!(stored.timer_status, TimerStatus::Running);
        assert!(stored.timer_anchor.is_some());
    }

    #[test]
    fn test_timer_surface_persists_fields() {
        let mut rec = recorder();
        rec.start_session(None).unwrap();
        let id = rec.snapshot().unwrap().session.id;

        rec.start_timer().unwrap();
        assert!(rec.db().get_session(&id).unwrap().unwrap().started_at.is_some());

        rec.pause_timer().unwrap();
        let stored = rec.db().get_session(&id).unwrap().unwrap();
        assert_eq!(stored.timer_status, TimerStatus::Paused);
        assert!(stored.timer_anchor.is_none());

        rec.set_elapsed(90).unwrap();
        let stored = rec.db().get_session(&id).unwrap().unwrap();
        assert_eq!(stored.elapsed_seconds, 90);

        rec.discard_timer().unwrap();
        let stored = rec.db().get_session(&id).unwrap().unwrap();
        assert_eq!(stored.timer_status, TimerStatus::Discarded);
        assert_eq!(stored.elapsed_seconds, 0);

        rec.resume_timer_from_discarded().unwrap();
        assert_eq!(rec.snapshot().unwrap().timer_status, TimerStatus::Running);
    }

    #[test]
    fn test_previous_performance_excludes_current() {
        let mut rec = recorder();
        record_sets(&mut rec, "squat", &[(Some(100.0), Some(5))]);
        rec.complete_workout().unwrap();

        rec.start_session(None).unwrap();
        rec.add_exercise("squat").unwrap();
        let previous = rec.previous_performance("squat").unwrap().unwrap();
        assert_eq!(previous.sets.len(), 1);
        assert_eq!(previous.sets[0].weight, Some(100.0));

        assert!(rec.previous_performance("bench").unwrap().is_none());
    }

    #[test]
    fn test_mutations_require_active_session() {
        let mut rec = recorder();
        assert!(matches!(
            rec.add_exercise("squat"),
            Err(Error::NoActiveSession)
        ));
        assert!(matches!(rec.complete_workout(), Err(Error::NoActiveSession)));
        assert!(matches!(rec.discard_workout(), Err(Error::NoActiveSession)));
    }
}
