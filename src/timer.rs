//! Rest-timer state machine.
//!
//! One countdown per exercise, used between sets. The machine itself is
//! pure: every operation takes the wall clock as an argument and
//! returns the side effects it wants as [`TimerIntent`]s, which the
//! component layer feeds into storage and the notifier. Remaining time
//! is always recomputed from the absolute deadline, never decremented,
//! so backgrounding or device sleep cannot drift the countdown.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::util::HOUR_MS;

/// Persisted records older than this are discarded on restore.
pub const FRESHNESS_WINDOW_MS: i64 = 6 * HOUR_MS;

#[derive(Debug, PartialEq, Eq)]
pub enum TimerError {
    AlreadyRunning,
    NotRunning,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerError::AlreadyRunning => write!(f, "Timer already running"),
            TimerError::NotRunning => write!(f, "Timer not running"),
        }
    }
}

impl std::error::Error for TimerError {}

/// The two real states. The old `isActive`/nullable-deadline pair is a
/// phase now, so an active timer without a deadline cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle { remaining_secs: u32 },
    Active { end_at_ms: i64 },
}

/// Side effects requested by a transition, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerIntent {
    /// Flush this record to the per-exercise durable store.
    Persist(TimerRecord),
    /// Delete the per-exercise durable record.
    ClearRecord,
    /// Cancel any outstanding scheduled notification for this exercise.
    CancelScheduled,
    /// Schedule a notification at the deadline. Always preceded by
    /// `CancelScheduled` so at most one is ever outstanding.
    Schedule { fire_at_ms: i64 },
    /// Drop the local notification handle without cancelling server-side
    /// (the notification is expected to fire on its own).
    ForgetScheduled,
}

/// Durable per-exercise snapshot, written on every transition that
/// matters and once more on teardown while active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRecord {
    pub is_active: bool,
    pub end_at_ms: Option<i64>,
    pub remaining_secs: u32,
    pub configured_secs: u32,
    pub saved_at_ms: i64,
}

/// Outcome of the once-per-second tick while mounted.
#[derive(Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Countdown still running; display this value.
    Running { remaining_secs: u32 },
    /// Deadline passed; the machine is back at `Idle(configured)`.
    Expired(Vec<TimerIntent>),
    /// Nothing to do, timer is idle.
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestTimer {
    phase: TimerPhase,
    configured_secs: u32,
}

impl RestTimer {
    pub fn new(configured_secs: u32) -> Self {
        let configured_secs = configured_secs.max(1);
        Self {
            phase: TimerPhase::Idle {
                remaining_secs: configured_secs,
            },
            configured_secs,
        }
    }

    /// Rebuild from a persisted record, if one is fresh enough.
    /// Returns the restored machine plus any cleanup intents.
    pub fn restore(
        configured_secs: u32,
        record: Option<TimerRecord>,
        now_ms: i64,
    ) -> (Self, Vec<TimerIntent>) {
        let mut timer = Self::new(configured_secs);
        let Some(record) = record else {
            return (timer, Vec::new());
        };
        if now_ms - record.saved_at_ms > FRESHNESS_WINDOW_MS {
            return (timer, vec![TimerIntent::ClearRecord]);
        }
        timer.configured_secs = record.configured_secs.max(1);
        match (record.is_active, record.end_at_ms) {
            (true, Some(end_at_ms)) if end_at_ms > now_ms => {
                timer.phase = TimerPhase::Active { end_at_ms };
                (timer, Vec::new())
            }
            (true, _) => {
                // Deadline already passed while we were away.
                timer.phase = TimerPhase::Idle {
                    remaining_secs: timer.configured_secs,
                };
                (timer, vec![TimerIntent::ClearRecord])
            }
            (false, _) => {
                timer.phase = TimerPhase::Idle {
                    remaining_secs: record.remaining_secs,
                };
                (timer, Vec::new())
            }
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, TimerPhase::Active { .. })
    }

    pub fn configured_secs(&self) -> u32 {
        self.configured_secs
    }

    /// Seconds left to display: the idle value, or
    /// `max(0, floor((end_at - now) / 1000))` while active.
    pub fn remaining_secs(&self, now_ms: i64) -> u32 {
        match self.phase {
            TimerPhase::Idle { remaining_secs } => remaining_secs,
            TimerPhase::Active { end_at_ms } => ((end_at_ms - now_ms).max(0) / 1000) as u32,
        }
    }

    /// Snapshot for durable persistence, also used for the teardown
    /// flush while active.
    pub fn record(&self, now_ms: i64) -> TimerRecord {
        let (is_active, end_at_ms) = match self.phase {
            TimerPhase::Idle { .. } => (false, None),
            TimerPhase::Active { end_at_ms } => (true, Some(end_at_ms)),
        };
        TimerRecord {
            is_active,
            end_at_ms,
            remaining_secs: self.remaining_secs(now_ms),
            configured_secs: self.configured_secs,
            saved_at_ms: now_ms,
        }
    }

    /// Begin the countdown from the current idle remaining.
    pub fn start(&mut self, now_ms: i64) -> Result<Vec<TimerIntent>, TimerError> {
        let TimerPhase::Idle { remaining_secs } = self.phase else {
            return Err(TimerError::AlreadyRunning);
        };
        let end_at_ms = now_ms + remaining_secs as i64 * 1000;
        self.phase = TimerPhase::Active { end_at_ms };
        Ok(vec![
            TimerIntent::Persist(self.record(now_ms)),
            TimerIntent::CancelScheduled,
            TimerIntent::Schedule {
                fire_at_ms: end_at_ms,
            },
        ])
    }

    /// Halt the countdown, freezing the current remaining as the new
    /// idle display. The configured baseline is untouched; only
    /// `reset` returns to it.
    pub fn stop(&mut self, now_ms: i64) -> Result<Vec<TimerIntent>, TimerError> {
        if !self.is_active() {
            return Err(TimerError::NotRunning);
        }
        let remaining_secs = self.remaining_secs(now_ms);
        self.phase = TimerPhase::Idle { remaining_secs };
        Ok(vec![
            TimerIntent::Persist(self.record(now_ms)),
            TimerIntent::CancelScheduled,
        ])
    }

    /// Back to idle at the configured duration, from either state.
    pub fn reset(&mut self) -> Vec<TimerIntent> {
        self.phase = TimerPhase::Idle {
            remaining_secs: self.configured_secs,
        };
        vec![TimerIntent::ClearRecord, TimerIntent::CancelScheduled]
    }

    /// Add or subtract seconds, clamped at zero. Hitting zero forces
    /// idle with a zero display and cancels any notification; while
    /// active the deadline is recomputed and the notification
    /// rescheduled; while idle only the display value changes.
    pub fn adjust(&mut self, delta_secs: i64, now_ms: i64) -> Vec<TimerIntent> {
        let remaining = self.remaining_secs(now_ms) as i64;
        let next = (remaining + delta_secs).max(0) as u32;

        if next == 0 {
            self.phase = TimerPhase::Idle { remaining_secs: 0 };
            return vec![TimerIntent::ClearRecord, TimerIntent::CancelScheduled];
        }

        match self.phase {
            TimerPhase::Active { .. } => {
                let end_at_ms = now_ms + next as i64 * 1000;
                self.phase = TimerPhase::Active { end_at_ms };
                vec![
                    TimerIntent::Persist(self.record(now_ms)),
                    TimerIntent::CancelScheduled,
                    TimerIntent::Schedule {
                        fire_at_ms: end_at_ms,
                    },
                ]
            }
            TimerPhase::Idle { .. } => {
                self.phase = TimerPhase::Idle {
                    remaining_secs: next,
                };
                vec![TimerIntent::Persist(self.record(now_ms))]
            }
        }
    }

    /// Once-per-second wall-clock check while mounted.
    pub fn tick(&mut self, now_ms: i64) -> TickOutcome {
        let TimerPhase::Active { end_at_ms } = self.phase else {
            return TickOutcome::Inactive;
        };
        if end_at_ms - now_ms > 0 {
            return TickOutcome::Running {
                remaining_secs: self.remaining_secs(now_ms),
            };
        }
        self.phase = TimerPhase::Idle {
            remaining_secs: self.configured_secs,
        };
        TickOutcome::Expired(vec![TimerIntent::ClearRecord, TimerIntent::ForgetScheduled])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn has_schedule_at(intents: &[TimerIntent], fire_at_ms: i64) -> bool {
        intents
            .iter()
            .any(|i| *i == TimerIntent::Schedule { fire_at_ms })
    }

    fn cancel_precedes_schedule(intents: &[TimerIntent]) -> bool {
        let cancel = intents
            .iter()
            .position(|i| *i == TimerIntent::CancelScheduled);
        let schedule = intents
            .iter()
            .position(|i| matches!(i, TimerIntent::Schedule { .. }));
        match (cancel, schedule) {
            (Some(c), Some(s)) => c < s,
            (_, None) => true,
            (None, Some(_)) => false,
        }
    }

    #[test]
    fn starts_from_idle_with_deadline_at_now_plus_remaining() {
        let mut timer = RestTimer::new(90);
        let intents = timer.start(NOW).unwrap();
        assert!(timer.is_active());
        assert_eq!(timer.remaining_secs(NOW), 90);
        assert!(has_schedule_at(&intents, NOW + 90_000));
        assert!(cancel_precedes_schedule(&intents));
    }

    #[test]
    fn start_while_active_is_rejected() {
        let mut timer = RestTimer::new(60);
        timer.start(NOW).unwrap();
        assert_eq!(timer.start(NOW + 1000), Err(TimerError::AlreadyRunning));
    }

    #[test]
    fn stop_freezes_remaining_without_touching_configured() {
        let mut timer = RestTimer::new(90);
        timer.start(NOW).unwrap();
        let intents = timer.stop(NOW + 25_000).unwrap();
        assert!(!timer.is_active());
        assert_eq!(timer.remaining_secs(NOW + 25_000), 65);
        assert_eq!(timer.configured_secs(), 90);
        assert!(intents.contains(&TimerIntent::CancelScheduled));
        // The frozen value is persisted, not cleared.
        assert!(matches!(intents[0], TimerIntent::Persist(ref r) if !r.is_active));
    }

    #[test]
    fn stop_while_idle_is_rejected() {
        let mut timer = RestTimer::new(60);
        assert_eq!(timer.stop(NOW), Err(TimerError::NotRunning));
    }

    #[test]
    fn reset_is_idempotent() {
        let mut timer = RestTimer::new(90);
        timer.start(NOW).unwrap();
        let first = timer.reset();
        let state_after_one = timer.clone();
        let second = timer.reset();
        assert_eq!(timer, state_after_one);
        assert_eq!(first, second);
        assert_eq!(timer.remaining_secs(NOW), 90);
        assert!(first.contains(&TimerIntent::ClearRecord));
        assert!(first.contains(&TimerIntent::CancelScheduled));
    }

    #[test]
    fn adjust_clamps_at_zero_and_forces_idle() {
        let mut timer = RestTimer::new(30);
        timer.start(NOW).unwrap();
        let intents = timer.adjust(-45, NOW + 1_000);
        assert!(!timer.is_active());
        assert_eq!(timer.remaining_secs(NOW + 1_000), 0);
        assert!(intents.contains(&TimerIntent::CancelScheduled));
        assert!(intents.contains(&TimerIntent::ClearRecord));
    }

    #[test]
    fn adjust_while_active_recomputes_deadline_and_reschedules() {
        // configured 90, start, +30 after 30 elapsed seconds.
        let mut timer = RestTimer::new(90);
        timer.start(NOW).unwrap();
        let at = NOW + 30_000;
        let intents = timer.adjust(30, at);
        assert!(timer.is_active());
        assert_eq!(timer.remaining_secs(at), 90);
        assert_eq!(timer.phase(), TimerPhase::Active { end_at_ms: at + 90_000 });
        assert!(has_schedule_at(&intents, at + 90_000));
        assert!(cancel_precedes_schedule(&intents));
    }

    #[test]
    fn adjust_while_idle_only_persists_the_display() {
        let mut timer = RestTimer::new(90);
        let intents = timer.adjust(-15, NOW);
        assert_eq!(timer.remaining_secs(NOW), 75);
        assert_eq!(intents.len(), 1);
        assert!(matches!(intents[0], TimerIntent::Persist(_)));
    }

    #[test]
    fn tick_counts_down_from_the_deadline() {
        let mut timer = RestTimer::new(10);
        timer.start(NOW).unwrap();
        assert_eq!(
            timer.tick(NOW + 3_500),
            TickOutcome::Running { remaining_secs: 6 }
        );
    }

    #[test]
    fn tick_past_deadline_expires_to_configured() {
        let mut timer = RestTimer::new(10);
        timer.start(NOW).unwrap();
        let outcome = timer.tick(NOW + 11_000);
        let TickOutcome::Expired(intents) = outcome else {
            panic!("expected expiry, got {:?}", outcome);
        };
        assert!(!timer.is_active());
        assert_eq!(timer.remaining_secs(NOW + 11_000), 10);
        assert!(intents.contains(&TimerIntent::ClearRecord));
        // Server notification fires on its own; no cancel here.
        assert!(!intents.contains(&TimerIntent::CancelScheduled));
        assert!(intents.contains(&TimerIntent::ForgetScheduled));
    }

    #[test]
    fn tick_while_idle_is_inactive() {
        let mut timer = RestTimer::new(10);
        assert_eq!(timer.tick(NOW), TickOutcome::Inactive);
    }

    #[test]
    fn record_restore_round_trip_preserves_remaining() {
        let mut timer = RestTimer::new(120);
        timer.start(NOW).unwrap();
        let record = timer.record(NOW + 40_000);
        let later = NOW + 55_000;
        let (restored, intents) = RestTimer::restore(120, Some(record), later);
        assert!(restored.is_active());
        assert!(intents.is_empty());
        let expected = timer.remaining_secs(later);
        assert!(restored.remaining_secs(later).abs_diff(expected) <= 1);
    }

    #[test]
    fn restore_discards_record_older_than_freshness_window() {
        let mut timer = RestTimer::new(60);
        timer.start(NOW).unwrap();
        let record = timer.record(NOW);
        let later = NOW + FRESHNESS_WINDOW_MS + 1;
        let (restored, intents) = RestTimer::restore(60, Some(record), later);
        assert!(!restored.is_active());
        assert_eq!(restored.remaining_secs(later), 60);
        assert_eq!(intents, vec![TimerIntent::ClearRecord]);
    }

    #[test]
    fn restore_with_passed_deadline_collapses_to_configured() {
        let mut timer = RestTimer::new(45);
        timer.start(NOW).unwrap();
        let record = timer.record(NOW);
        let later = NOW + 50_000;
        let (restored, intents) = RestTimer::restore(45, Some(record), later);
        assert!(!restored.is_active());
        assert_eq!(restored.remaining_secs(later), 45);
        assert_eq!(intents, vec![TimerIntent::ClearRecord]);
    }

    #[test]
    fn restore_idle_record_keeps_stored_remaining() {
        let mut timer = RestTimer::new(90);
        timer.start(NOW).unwrap();
        timer.stop(NOW + 20_000).unwrap();
        let record = timer.record(NOW + 20_000);
        let (restored, intents) = RestTimer::restore(90, Some(record), NOW + 60_000);
        assert!(!restored.is_active());
        assert_eq!(restored.remaining_secs(NOW + 60_000), 70);
        assert!(intents.is_empty());
    }

    #[test]
    fn restore_without_record_defaults_to_configured() {
        let (restored, intents) = RestTimer::restore(75, None, NOW);
        assert_eq!(restored.remaining_secs(NOW), 75);
        assert!(intents.is_empty());
    }

    #[test]
    fn phase_matches_activity_after_every_operation() {
        let mut timer = RestTimer::new(30);
        let check = |t: &RestTimer| match t.phase() {
            TimerPhase::Active { .. } => assert!(t.is_active()),
            TimerPhase::Idle { .. } => assert!(!t.is_active()),
        };
        check(&timer);
        timer.start(NOW).unwrap();
        check(&timer);
        timer.adjust(10, NOW + 1_000);
        check(&timer);
        timer.stop(NOW + 2_000).unwrap();
        check(&timer);
        timer.adjust(-5, NOW + 3_000);
        check(&timer);
        timer.reset();
        check(&timer);
        timer.start(NOW + 4_000).unwrap();
        timer.tick(NOW + 500_000);
        check(&timer);
    }
}
