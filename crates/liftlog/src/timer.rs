//! Elapsed-time state machine, independent of storage
//!
//! The timer tracks recording time as `base_seconds` plus, while running,
//! the distance from a wall-clock anchor. Folding that distance back into
//! the base on every pause and on every foreground return keeps long
//! suspensions from accumulating clock drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timer state. `Discarded` is terminal for timekeeping only; the session
/// itself keeps recording without a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    NotStarted,
    Running,
    Paused,
    Discarded,
}

impl TimerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::NotStarted => "not_started",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Discarded => "discarded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(TimerStatus::NotStarted),
            "running" => Some(TimerStatus::Running),
            "paused" => Some(TimerStatus::Paused),
            "discarded" => Some(TimerStatus::Discarded),
            _ => None,
        }
    }
}

/// Pure timer state machine. All transitions take `now` explicitly so the
/// recorder can pass wall-clock time and tests can pass fixed instants.
/// Invalid transitions are silent no-ops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    status: TimerStatus,
    base_seconds: i64,
    anchor: Option<DateTime<Utc>>,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            status: TimerStatus::NotStarted,
            base_seconds: 0,
            anchor: None,
        }
    }

    /// Rebuild from persisted fields.
    pub fn restore(status: TimerStatus, elapsed_seconds: i64, anchor: Option<DateTime<Utc>>) -> Self {
        Self {
            status,
            base_seconds: elapsed_seconds,
            anchor,
        }
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn anchor(&self) -> Option<DateTime<Utc>> {
        self.anchor
    }

    /// Accumulated seconds excluding any distance from a live anchor; this
    /// is the value that persists alongside the anchor.
    pub fn base_seconds(&self) -> i64 {
        self.base_seconds
    }

    /// Seconds to display: the base while not running, the base plus the
    /// distance from the anchor while running.
    pub fn elapsed(&self, now: DateTime<Utc>) -> i64 {
        match (self.status, self.anchor) {
            (TimerStatus::Running, Some(anchor)) => {
                self.base_seconds + (now - anchor).num_seconds().max(0)
            }
            _ => self.base_seconds,
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.status != TimerStatus::NotStarted {
            return;
        }
        self.status = TimerStatus::Running;
        self.base_seconds = 0;
        self.anchor = Some(now);
    }

    pub fn pause(&mut self, now: DateTime<Utc>) {
        if self.status != TimerStatus::Running {
            return;
        }
        self.base_seconds = self.elapsed(now);
        self.status = TimerStatus::Paused;
        self.anchor = None;
    }

    pub fn resume(&mut self, now: DateTime<Utc>) {
        if self.status != TimerStatus::Paused {
            return;
        }
        self.status = TimerStatus::Running;
        self.anchor = Some(now);
    }

    pub fn reset(&mut self) {
        self.status = TimerStatus::NotStarted;
        self.base_seconds = 0;
        self.anchor = None;
    }

    /// Abandon timekeeping for this session. Recording continues without a
    /// duration.
    pub fn discard(&mut self) {
        self.status = TimerStatus::Discarded;
        self.base_seconds = 0;
        self.anchor = None;
    }

    pub fn resume_from_discarded(&mut self, now: DateTime<Utc>) {
        if self.status != TimerStatus::Discarded {
            return;
        }
        self.status = TimerStatus::Running;
        self.base_seconds = 0;
        self.anchor = Some(now);
    }

    /// Manual override, permitted only while paused or discarded.
    pub fn set_elapsed(&mut self, seconds: i64) {
        if !matches!(self.status, TimerStatus::Paused | TimerStatus::Discarded) {
            return;
        }
        self.base_seconds = seconds.max(0);
    }

    /// Foreground-return correction: while running, fold the distance from
    /// the stale anchor into the base and re-anchor at `now`. Tolerates
    /// clock skew across long suspensions instead of accumulating it.
    pub fn reanchor(&mut self, now: DateTime<Utc>) {
        if self.status != TimerStatus::Running {
            return;
        }
        self.base_seconds = self.elapsed(now);
        self.anchor = Some(now);
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        "2026-03-01T10:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_start_pause_resume() {
        let mut timer = Timer::new();
        timer.start(t0());
        assert_eq!(timer.status(), TimerStatus::Running);

        timer.pause(t0() + Duration::seconds(5));
        assert_eq!(timer.status(), TimerStatus::Paused);
        assert_eq!(timer.elapsed(t0() + Duration::seconds(60)), 5);

        timer.resume(t0() + Duration::seconds(60));
        assert_eq!(timer.elapsed(t0() + Duration::seconds(63)), 8);
    }

    #[test]
    fn test_suspension_correction_reanchors() {
        let mut timer = Timer::new();
        timer.start(t0());
        timer.pause(t0() + Duration::seconds(5));
        timer.resume(t0() + Duration::seconds(5));

        // Process suspended for 10s while running; on foreground return the
        // stale anchor folds into the base.
        let back = t0() + Duration::seconds(15);
        timer.reanchor(back);
        assert_eq!(timer.elapsed(back), 15);
        assert_eq!(timer.anchor(), Some(back));
    }

    #[test]
    fn test_discard_and_recover() {
        let mut timer = Timer::new();
        timer.start(t0());
        timer.discard();
        assert_eq!(timer.status(), TimerStatus::Discarded);
        assert_eq!(timer.elapsed(t0() + Duration::seconds(100)), 0);

        timer.resume_from_discarded(t0() + Duration::seconds(100));
        assert_eq!(timer.status(), TimerStatus::Running);
        assert_eq!(timer.elapsed(t0() + Duration::seconds(107)), 7);
    }

    #[test]
    fn test_set_elapsed_only_paused_or_discarded() {
        let mut timer = Timer::new();
        timer.set_elapsed(30);
        assert_eq!(timer.elapsed(t0()), 0);

        timer.start(t0());
        timer.set_elapsed(30);
        assert_eq!(timer.elapsed(t0()), 0);

        timer.pause(t0() + Duration::seconds(2));
        timer.set_elapsed(30);
        assert_eq!(timer.elapsed(t0() + Duration::seconds(2)), 30);

        timer.discard();
        timer.set_elapsed(45);
        assert_eq!(timer.elapsed(t0()), 45);
    }

    #[test]
    fn test_invalid_transitions_are_noops() {
        let mut timer = Timer::new();
        timer.pause(t0());
        assert_eq!(timer.status(), TimerStatus::NotStarted);
        timer.resume(t0());
        assert_eq!(timer.status(), TimerStatus::NotStarted);
        timer.resume_from_discarded(t0());
        assert_eq!(timer.status(), TimerStatus::NotStarted);

        timer.start(t0());
        let anchor = timer.anchor();
        timer.start(t0() + Duration::seconds(10));
        assert_eq!(timer.anchor(), anchor);
    }

    #[test]
    fn test_restore_round_trip() {
        let timer = Timer::restore(TimerStatus::Paused, 120, None);
        assert_eq!(timer.status(), TimerStatus::Paused);
        assert_eq!(timer.elapsed(t0()), 120);

        let running = Timer::restore(TimerStatus::Running, 60, Some(t0()));
        assert_eq!(running.elapsed(t0() + Duration::seconds(10)), 70);
    }
}
