//! SQLite storage adapter
//!
//! Connection-per-call for file-backed databases (WAL mode, foreign keys,
//! busy timeout); in-memory databases keep one persistent connection behind
//! a mutex since every fresh `:memory:` connection would be a new database.
//! Typed rows are mapped at this boundary; nothing above it sees raw rows.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use tracing::info;

use crate::error::{Error, Result};
use crate::timer::TimerStatus;
use crate::types::{
    parse_datetime, EntryId, ExerciseEntry, Metric, PersonalRecord, RecordId, SessionId, SetId,
    SetRecord, WorkoutSession, WorkoutStatus,
};

/// Latest schema version; `PRAGMA user_version` of an up-to-date database.
const SCHEMA_VERSION: i64 = 3;

/// Ordered migration steps. Version N is the state after applying 1..=N.
/// Steps only ever add; a database at version k upgrades by applying the
/// tail k+1..=SCHEMA_VERSION.
const MIGRATIONS: [&str; SCHEMA_VERSION as usize] = [
    // v1: core tables
    r#"
    CREATE TABLE workout_sessions (
        id TEXT PRIMARY KEY,
        status TEXT NOT NULL DEFAULT 'recording',
        created_at TEXT NOT NULL,
        started_at TEXT,
        completed_at TEXT,
        timer_status TEXT NOT NULL DEFAULT 'not_started',
        elapsed_seconds INTEGER NOT NULL DEFAULT 0,
        timer_anchor TEXT,
        memo TEXT,
        workout_date TEXT
    );

    CREATE TABLE exercise_entries (
        id TEXT PRIMARY KEY,
        session_id TEXT NOT NULL REFERENCES workout_sessions(id) ON DELETE CASCADE,
        exercise_id TEXT NOT NULL,
        display_order INTEGER NOT NULL,
        memo TEXT
    );
    CREATE INDEX idx_entries_session ON exercise_entries(session_id, display_order);

    CREATE TABLE set_records (
        id TEXT PRIMARY KEY,
        entry_id TEXT NOT NULL REFERENCES exercise_entries(id) ON DELETE CASCADE,
        set_number INTEGER NOT NULL,
        weight REAL,
        reps INTEGER,
        estimated_max REAL
    );
    CREATE INDEX idx_sets_entry ON set_records(entry_id, set_number);
    "#,
    // v2: best-ever records, one row per (exercise, metric)
    r#"
    CREATE TABLE personal_records (
        id TEXT PRIMARY KEY,
        exercise_id TEXT NOT NULL,
        metric TEXT NOT NULL,
        value REAL NOT NULL,
        source_session_id TEXT,
        achieved_at TEXT NOT NULL,
        UNIQUE (exercise_id, metric)
    );
    "#,
    // v3: at most one recording session; at most one completed session per
    // calendar date (NULL dates never collide)
    r#"
    CREATE UNIQUE INDEX idx_sessions_recording
        ON workout_sessions(status) WHERE status = 'recording';
    CREATE UNIQUE INDEX idx_sessions_workout_date
        ON workout_sessions(workout_date) WHERE workout_date IS NOT NULL;
    "#,
];

/// Database handle with connection-per-call pattern
pub struct Database {
    path: PathBuf,
    /// In-memory databases keep a persistent connection; a fresh in-memory
    /// connection would be a fresh, empty database.
    memory_conn: Option<Mutex<Connection>>,
}

impl Database {
    /// Open database at path, creating and migrating as needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Self {
            path,
            memory_conn: None,
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Self {
            path: PathBuf::from(":memory:"),
            memory_conn: Some(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Get a connection - for file-based, opens new; for memory, returns ref
    pub(crate) fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        if let Some(ref mutex) = self.memory_conn {
            let mut conn = mutex.lock().unwrap();
            f(&mut conn)
        } else {
            let mut conn = Connection::open(&self.path)?;
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            f(&mut conn)
        }
    }

    // --- Migrations ---

    /// Walk the database forward to SCHEMA_VERSION. Each step's data changes
    /// commit in one transaction; the version counter is bumped afterwards in
    /// a separate write (PRAGMA writes do not join the transaction).
    fn migrate(&self) -> Result<()> {
        self.with_conn(|conn| {
            let mut current: i64 =
                conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

            if current > SCHEMA_VERSION {
                return Err(Error::SchemaTooNew {
                    found: current,
                    supported: SCHEMA_VERSION,
                });
            }

            while current < SCHEMA_VERSION {
                let next = current + 1;
                let step = migration_step(next)?;

                let tx = conn.transaction()?;
                tx.execute_batch(step)?;
                tx.commit()?;

                conn.pragma_update(None, "user_version", next)?;
                info!(version = next, "applied schema migration");
                current = next;
            }

            Ok(())
        })
    }

    // --- Sessions ---

    pub fn insert_session(&self, session: &WorkoutSession) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO workout_sessions
                    (id, status, created_at, started_at, completed_at,
                     timer_status, elapsed_seconds, timer_anchor, memo, workout_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    session.id.as_str(),
                    session.status.as_str(),
                    session.created_at.to_rfc3339(),
                    session.started_at.map(|t| t.to_rfc3339()),
                    session.completed_at.map(|t| t.to_rfc3339()),
                    session.timer_status.as_str(),
                    session.elapsed_seconds,
                    session.timer_anchor.map(|t| t.to_rfc3339()),
                    session.memo,
                    session.workout_date.map(|d| d.to_string()),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_session(&self, id: &SessionId) -> Result<Option<WorkoutSession>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM workout_sessions WHERE id = ?1"
            ))?;

            let result = stmt.query_row(params![id.as_str()], map_session_row);
            match result {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// The at-most-one session currently in recording state
    pub fn find_recording_session(&self) -> Result<Option<WorkoutSession>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM workout_sessions WHERE status = 'recording'"
            ))?;

            let result = stmt.query_row([], map_session_row);
            match result {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Flip a completed session back to recording for continuation. Keeps
    /// completed_at and workout_date so the date slot stays claimed, and
    /// resets the timer fields for a fresh timekeeping run.
    pub fn reopen_session(&self, id: &SessionId) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE workout_sessions
                 SET status = 'recording', timer_status = ?2,
                     elapsed_seconds = 0, timer_anchor = NULL
                 WHERE id = ?1",
                params![id.as_str(), TimerStatus::NotStarted.as_str()],
            )?;
            Ok(())
        })
    }

    pub fn update_timer_fields(
        &self,
        id: &SessionId,
        status: TimerStatus,
        elapsed_seconds: i64,
        anchor: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE workout_sessions
                 SET timer_status = ?2, elapsed_seconds = ?3, timer_anchor = ?4
                 WHERE id = ?1",
                params![
                    id.as_str(),
                    status.as_str(),
                    elapsed_seconds,
                    anchor.map(|t| t.to_rfc3339()),
                ],
            )?;
            Ok(())
        })
    }

    pub fn update_session_started(&self, id: &SessionId, started_at: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE workout_sessions SET started_at = ?2 WHERE id = ?1",
                params![id.as_str(), started_at.to_rfc3339()],
            )?;
            Ok(())
        })
    }

    pub fn update_session_memo(&self, id: &SessionId, memo: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE workout_sessions SET memo = ?2 WHERE id = ?1",
                params![id.as_str(), memo],
            )?;
            Ok(())
        })
    }

    /// Finalize a session. The partial unique index on workout_date makes a
    /// second completion onto the same calendar date fail here.
    pub fn complete_session(
        &self,
        id: &SessionId,
        completed_at: DateTime<Utc>,
        workout_date: NaiveDate,
        elapsed_seconds: i64,
        timer_status: TimerStatus,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE workout_sessions
                 SET status = 'completed', completed_at = ?2, workout_date = ?3,
                     elapsed_seconds = ?4, timer_status = ?5, timer_anchor = NULL
                 WHERE id = ?1",
                params![
                    id.as_str(),
                    completed_at.to_rfc3339(),
                    workout_date.to_string(),
                    elapsed_seconds,
                    timer_status.as_str(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn delete_session(&self, id: &SessionId) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM workout_sessions WHERE id = ?1",
                params![id.as_str()],
            )?;
            Ok(())
        })
    }

    /// Roll a continuation back: drop only the entries added after reopening
    /// (their sets cascade) and restore completed status together with the
    /// timer fields the session held before reopening, in one transaction.
    /// The original completed_at and workout_date were never touched.
    pub fn discard_continuation(
        &self,
        id: &SessionId,
        added: &[EntryId],
        timer_status: TimerStatus,
        elapsed_seconds: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            for entry_id in added {
                tx.execute(
                    "DELETE FROM exercise_entries WHERE id = ?1",
                    params![entry_id.as_str()],
                )?;
            }
            tx.execute(
                "UPDATE workout_sessions
                 SET status = 'completed', timer_status = ?2,
                     elapsed_seconds = ?3, timer_anchor = NULL
                 WHERE id = ?1",
                params![id.as_str(), timer_status.as_str(), elapsed_seconds],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    // --- Exercise entries ---

    /// Create an entry together with its initial blank set
    pub fn insert_entry_with_first_set(
        &self,
        entry: &ExerciseEntry,
        first_set: &SetRecord,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO exercise_entries (id, session_id, exercise_id, display_order, memo)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.id.as_str(),
                    entry.session_id.as_str(),
                    entry.exercise_id,
                    entry.display_order,
                    entry.memo,
                ],
            )?;
            tx.execute(
                "INSERT INTO set_records (id, entry_id, set_number, weight, reps, estimated_max)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    first_set.id.as_str(),
                    first_set.entry_id.as_str(),
                    first_set.set_number,
                    first_set.weight,
                    first_set.reps,
                    first_set.estimated_max,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_entries(&self, session_id: &SessionId) -> Result<Vec<ExerciseEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, exercise_id, display_order, memo
                 FROM exercise_entries WHERE session_id = ?1
                 ORDER BY display_order ASC",
            )?;

            let entries = stmt
                .query_map(params![session_id.as_str()], |row| {
                    Ok(ExerciseEntry {
                        id: EntryId(row.get(0)?),
                        session_id: SessionId(row.get(1)?),
                        exercise_id: row.get(2)?,
                        display_order: row.get(3)?,
                        memo: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(entries)
        })
    }

    pub fn delete_entry(&self, id: &EntryId) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM exercise_entries WHERE id = ?1",
                params![id.as_str()],
            )?;
            Ok(())
        })
    }

    pub fn update_entry_memo(&self, id: &EntryId, memo: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE exercise_entries SET memo = ?2 WHERE id = ?1",
                params![id.as_str(), memo],
            )?;
            Ok(())
        })
    }

    /// Bulk display_order rewrite, all-or-nothing
    pub fn reorder_entries(&self, order: &[EntryId]) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            for (index, entry_id) in order.iter().enumerate() {
                tx.execute(
                    "UPDATE exercise_entries SET display_order = ?2 WHERE id = ?1",
                    params![entry_id.as_str(), index as i64 + 1],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    // --- Set records ---

    pub fn insert_set(&self, set: &SetRecord) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO set_records (id, entry_id, set_number, weight, reps, estimated_max)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    set.id.as_str(),
                    set.entry_id.as_str(),
                    set.set_number,
                    set.weight,
                    set.reps,
                    set.estimated_max,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_sets(&self, entry_id: &EntryId) -> Result<Vec<SetRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, entry_id, set_number, weight, reps, estimated_max
                 FROM set_records WHERE entry_id = ?1
                 ORDER BY set_number ASC",
            )?;

            let sets = stmt
                .query_map(params![entry_id.as_str()], map_set_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(sets)
        })
    }

    pub fn update_set_values(
        &self,
        id: &SetId,
        weight: Option<f64>,
        reps: Option<i64>,
        estimated_max: Option<f64>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE set_records SET weight = ?2, reps = ?3, estimated_max = ?4 WHERE id = ?1",
                params![id.as_str(), weight, reps, estimated_max],
            )?;
            Ok(())
        })
    }

    /// Delete one set and renumber the survivors to a dense 1..N sequence,
    /// in one transaction.
    pub fn delete_set_and_renumber(&self, entry_id: &EntryId, set_id: &SetId) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM set_records WHERE id = ?1",
                params![set_id.as_str()],
            )?;

            let survivors: Vec<String> = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM set_records WHERE entry_id = ?1 ORDER BY set_number ASC",
                )?;
                let rows = stmt
                    .query_map(params![entry_id.as_str()], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            };

            for (index, id) in survivors.iter().enumerate() {
                tx.execute(
                    "UPDATE set_records SET set_number = ?2 WHERE id = ?1",
                    params![id, index as i64 + 1],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Drop sets where weight and reps are both absent, across the whole
    /// session, renumbering each entry's survivors to a dense 1..N. Returns
    /// how many sets were removed.
    pub fn prune_blank_sets(&self, session_id: &SessionId) -> Result<usize> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM set_records
                 WHERE weight IS NULL AND reps IS NULL
                   AND entry_id IN
                       (SELECT id FROM exercise_entries WHERE session_id = ?1)",
                params![session_id.as_str()],
            )?;

            if removed > 0 {
                let survivors: Vec<(String, String)> = {
                    let mut stmt = tx.prepare(
                        "SELECT s.id, s.entry_id FROM set_records s
                         JOIN exercise_entries e ON s.entry_id = e.id
                         WHERE e.session_id = ?1
                         ORDER BY s.entry_id ASC, s.set_number ASC",
                    )?;
                    let rows = stmt
                        .query_map(params![session_id.as_str()], |row| {
                            Ok((row.get(0)?, row.get(1)?))
                        })?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                };

                let mut number = 0i64;
                let mut current_entry: Option<&str> = None;
                for (set_id, entry_id) in &survivors {
                    if current_entry != Some(entry_id.as_str()) {
                        current_entry = Some(entry_id.as_str());
                        number = 0;
                    }
                    number += 1;
                    tx.execute(
                        "UPDATE set_records SET set_number = ?2 WHERE id = ?1",
                        params![set_id, number],
                    )?;
                }
            }

            tx.commit()?;
            Ok(removed)
        })
    }

    // --- Personal records ---

    pub fn get_record(&self, exercise_id: &str, metric: Metric) -> Result<Option<PersonalRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, exercise_id, metric, value, source_session_id, achieved_at
                 FROM personal_records WHERE exercise_id = ?1 AND metric = ?2",
            )?;

            let result = stmt.query_row(params![exercise_id, metric.as_str()], map_record_row);
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_records_for_exercise(&self, exercise_id: &str) -> Result<Vec<PersonalRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, exercise_id, metric, value, source_session_id, achieved_at
                 FROM personal_records WHERE exercise_id = ?1 ORDER BY metric ASC",
            )?;

            let records = stmt
                .query_map(params![exercise_id], map_record_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(records)
        })
    }

    pub fn upsert_record(&self, record: &PersonalRecord) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO personal_records
                    (id, exercise_id, metric, value, source_session_id, achieved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(exercise_id, metric) DO UPDATE SET
                    value = excluded.value,
                    source_session_id = excluded.source_session_id,
                    achieved_at = excluded.achieved_at",
                params![
                    record.id.as_str(),
                    record.exercise_id,
                    record.metric.as_str(),
                    record.value,
                    record.source_session_id.as_ref().map(|s| s.as_str()),
                    record.achieved_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    /// Replace every stored record for an exercise with a freshly recomputed
    /// set, all-or-nothing.
    pub fn replace_records_for_exercise(
        &self,
        exercise_id: &str,
        records: &[PersonalRecord],
    ) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM personal_records WHERE exercise_id = ?1",
                params![exercise_id],
            )?;
            for record in records {
                tx.execute(
                    "INSERT INTO personal_records
                        (id, exercise_id, metric, value, source_session_id, achieved_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        record.id.as_str(),
                        record.exercise_id,
                        record.metric.as_str(),
                        record.value,
                        record.source_session_id.as_ref().map(|s| s.as_str()),
                        record.achieved_at.to_rfc3339(),
                    ],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    // --- History ---

    /// Sets of every completed session containing this exercise, ordered by
    /// completion time, grouped per session.
    pub fn completed_exercise_history(
        &self,
        exercise_id: &str,
    ) -> Result<Vec<(SessionId, DateTime<Utc>, Vec<SetRecord>)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT w.id, w.completed_at,
                        s.id, s.entry_id, s.set_number, s.weight, s.reps, s.estimated_max
                 FROM set_records s
                 JOIN exercise_entries e ON s.entry_id = e.id
                 JOIN workout_sessions w ON e.session_id = w.id
                 WHERE e.exercise_id = ?1 AND w.status = 'completed'
                 ORDER BY w.completed_at ASC, s.set_number ASC",
            )?;

            let rows = stmt
                .query_map(params![exercise_id], |row| {
                    let session_id = SessionId(row.get(0)?);
                    let completed_at = parse_datetime(&row.get::<_, String>(1)?);
                    let set = SetRecord {
                        id: SetId(row.get(2)?),
                        entry_id: EntryId(row.get(3)?),
                        set_number: row.get(4)?,
                        weight: row.get(5)?,
                        reps: row.get(6)?,
                        estimated_max: row.get(7)?,
                    };
                    Ok((session_id, completed_at, set))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut grouped: Vec<(SessionId, DateTime<Utc>, Vec<SetRecord>)> = Vec::new();
            for (session_id, completed_at, set) in rows {
                match grouped.last_mut() {
                    Some((last_id, _, sets)) if *last_id == session_id => sets.push(set),
                    _ => grouped.push((session_id, completed_at, vec![set])),
                }
            }

            Ok(grouped)
        })
    }

    /// The most recent completed session (other than `exclude`) containing
    /// this exercise, with its sets.
    pub fn latest_completed_session_for_exercise(
        &self,
        exercise_id: &str,
        exclude: &SessionId,
    ) -> Result<Option<(SessionId, DateTime<Utc>, Vec<SetRecord>)>> {
        let mut history = self.completed_exercise_history(exercise_id)?;
        history.retain(|(id, _, _)| id != exclude);
        Ok(history.pop())
    }
}

const SESSION_COLUMNS: &str = "id, status, created_at, started_at, completed_at, \
     timer_status, elapsed_seconds, timer_anchor, memo, workout_date";

fn map_session_row(row: &rusqlite::Row) -> rusqlite::Result<WorkoutSession> {
    let status_str: String = row.get(1)?;
    let timer_str: String = row.get(5)?;
    let started: Option<String> = row.get(3)?;
    let completed: Option<String> = row.get(4)?;
    let anchor: Option<String> = row.get(7)?;
    let date: Option<String> = row.get(9)?;

    Ok(WorkoutSession {
        id: SessionId(row.get(0)?),
        status: WorkoutStatus::parse(&status_str).unwrap_or(WorkoutStatus::Recording),
        created_at: parse_datetime(&row.get::<_, String>(2)?),
        started_at: started.as_deref().map(parse_datetime),
        completed_at: completed.as_deref().map(parse_datetime),
        timer_status: TimerStatus::parse(&timer_str).unwrap_or(TimerStatus::NotStarted),
        elapsed_seconds: row.get(6)?,
        timer_anchor: anchor.as_deref().map(parse_datetime),
        memo: row.get(8)?,
        workout_date: date.and_then(|d| d.parse().ok()),
    })
}

fn map_set_row(row: &rusqlite::Row) -> rusqlite::Result<SetRecord> {
    Ok(SetRecord {
        id: SetId(row.get(0)?),
        entry_id: EntryId(row.get(1)?),
        set_number: row.get(2)?,
        weight: row.get(3)?,
        reps: row.get(4)?,
        estimated_max: row.get(5)?,
    })
}

fn map_record_row(row: &rusqlite::Row) -> rusqlite::Result<PersonalRecord> {
    let metric_str: String = row.get(2)?;
    let source: Option<String> = row.get(4)?;

    Ok(PersonalRecord {
        id: RecordId(row.get(0)?),
        exercise_id: row.get(1)?,
        metric: Metric::parse(&metric_str).unwrap_or(Metric::MaxWeight),
        value: row.get(3)?,
        source_session_id: source.map(SessionId),
        achieved_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn migration_step(version: i64) -> Result<&'static str> {
    let index = version - 1;
    if index < 0 || index >= MIGRATIONS.len() as i64 {
        return Err(Error::MissingMigration { version });
    }
    Ok(MIGRATIONS[index as usize])
}
