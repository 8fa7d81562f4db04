//! Notification collaborator for the rest timer.
//!
//! The state machine in `timer.rs` never talks to the network; it
//! emits [`TimerIntent`]s and this module consumes them. Scheduling
//! and cancelling are best-effort: a failed call is logged and the
//! local countdown keeps running regardless.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use leptos::spawn_local;

use crate::api;
use crate::storage;
use crate::timer::TimerIntent;
use crate::types::{PushSubscriptionRow, ScheduledTimerRow};

/// Insert a scheduled notification mirroring the timer deadline.
/// Returns the server handle, or None when scheduling failed.
pub async fn schedule_timer(exercise_id: &str, fire_at_ms: i64) -> Option<String> {
    let row = ScheduledTimerRow {
        id: None,
        user_id: api::get_current_user_id(),
        exercise_id: exercise_id.to_string(),
        fire_at: fire_at_ms,
    };
    match api::insert_returning::<_, ScheduledTimerRow>("scheduled_timers", &row).await {
        Ok(created) => created.id,
        Err(e) => {
            log::warn!("Failed to schedule rest notification: {}", e);
            None
        }
    }
}

/// Cancel every pending notification for this exercise. Keyed by
/// exercise id rather than handle, so a cancel with nothing
/// outstanding is a harmless no-op.
pub async fn cancel_timers_by_exercise(exercise_id: &str) -> bool {
    let filter = format!("exercise_id=eq.{}", exercise_id);
    match api::delete_where("scheduled_timers", &filter).await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Failed to cancel rest notifications: {}", e);
            false
        }
    }
}

/// Upsert this browser's push subscription (fire and forget).
pub fn save_push_subscription(endpoint: String, keys: serde_json::Value) {
    spawn_local(async move {
        let row = PushSubscriptionRow {
            id: None,
            user_id: api::get_current_user_id(),
            endpoint,
            keys,
        };
        if let Err(e) = api::insert_returning::<_, PushSubscriptionRow>("push_subscriptions", &row).await {
            log::warn!("Failed to save push subscription: {}", e);
        }
    });
}

/// Applies timer intents: durable records synchronously, notification
/// calls asynchronously. Holds the at-most-one outstanding handle per
/// exercise.
#[derive(Clone, Default)]
pub struct TimerNotifier {
    handles: Rc<RefCell<HashMap<String, String>>>,
}

impl TimerNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, exercise_id: &str, intents: Vec<TimerIntent>) {
        for intent in intents {
            match intent {
                TimerIntent::Persist(record) => {
                    storage::save_timer_record(exercise_id, &record);
                }
                TimerIntent::ClearRecord => {
                    storage::clear_timer_record(exercise_id);
                }
                TimerIntent::ForgetScheduled => {
                    // The notification fires server-side on its own.
                    self.handles.borrow_mut().remove(exercise_id);
                }
                TimerIntent::CancelScheduled => {
                    self.handles.borrow_mut().remove(exercise_id);
                    if storage::load_push_enabled() {
                        let id = exercise_id.to_string();
                        spawn_local(async move {
                            cancel_timers_by_exercise(&id).await;
                        });
                    }
                }
                TimerIntent::Schedule { fire_at_ms } => {
                    if storage::load_push_enabled() {
                        let id = exercise_id.to_string();
                        let handles = self.handles.clone();
                        spawn_local(async move {
                            if let Some(handle) = schedule_timer(&id, fire_at_ms).await {
                                handles.borrow_mut().insert(id, handle);
                            }
                        });
                    }
                }
            }
        }
    }
}
