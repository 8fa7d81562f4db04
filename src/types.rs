use serde::{Deserialize, Serialize};

/// A logged workout, at most one per calendar date in normal use.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Workout {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    /// ISO date, e.g. "2024-01-01".
    pub date: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_cardio: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutExercise {
    pub id: String,
    pub workout_id: String,
    pub name: String,
    pub position: i32,
    #[serde(default)]
    pub notes: Option<String>,
    /// Rest duration between sets, the reset target for the rest timer.
    pub rest_seconds: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSet {
    pub id: String,
    pub exercise_id: String,
    pub index: i32,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub is_done: bool,
    #[serde(default)]
    pub is_dropset: bool,
    #[serde(default)]
    pub parent_set_index: Option<i32>,
    /// Unix millis of the last edit, used for draft-vs-server comparison.
    pub updated_at: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutTemplate {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TemplateExercise {
    pub id: String,
    pub template_id: String,
    pub name: String,
    pub position: i32,
    pub sets_count: u32,
    pub rest_seconds: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserBodyWeight {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    /// ISO date of the measurement.
    pub measured_on: String,
    pub weight_kg: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub user: AuthUser,
}

/// Row in `push_subscriptions`, one per browser endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushSubscriptionRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub endpoint: String,
    pub keys: serde_json::Value,
}

/// Row in `scheduled_timers`; the push edge function fires at `fire_at`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduledTimerRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub exercise_id: String,
    /// Unix millis.
    pub fire_at: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AppView {
    Login,
    Register,
    Calendar,
    /// Detail view for one workout id.
    WorkoutDay(String),
    Templates,
    Progress,
    Settings,
}

impl WorkoutSet {
    pub fn new(exercise_id: &str, index: i32, updated_at: i64) -> Self {
        Self {
            id: crate::api::new_id(),
            exercise_id: exercise_id.to_string(),
            index,
            weight: None,
            reps: None,
            is_done: false,
            is_dropset: false,
            parent_set_index: None,
            updated_at,
        }
    }

    pub fn dropset(exercise_id: &str, index: i32, parent_index: i32, updated_at: i64) -> Self {
        Self {
            is_dropset: true,
            parent_set_index: Some(parent_index),
            ..Self::new(exercise_id, index, updated_at)
        }
    }
}
