use serde::{de::DeserializeOwned, Serialize};

use crate::timer::TimerRecord;

const AUTH_SESSION_KEY: &str = "setforge_auth_session";
const REST_DEFAULT_KEY: &str = "setforge_rest_default";
const PUSH_ENABLED_KEY: &str = "setforge_push_enabled";
const TIMER_KEY_PREFIX: &str = "setforge_timer_";
const DRAFT_KEY_PREFIX: &str = "setforge_draft_";

pub fn get_local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok()?
}

// All storage failures (no window, quota, parse) degrade to None / no-op.
// Draft recovery and timer resume are conveniences, never load-bearing.

fn get_json<T: DeserializeOwned>(key: &str) -> Option<T> {
    let storage = get_local_storage()?;
    let json = storage.get_item(key).ok()??;
    serde_json::from_str(&json).ok()
}

fn set_json<T: Serialize>(key: &str, value: &T) {
    if let Some(storage) = get_local_storage() {
        if let Ok(json) = serde_json::to_string(value) {
            let _ = storage.set_item(key, &json);
        }
    }
}

fn remove(key: &str) {
    if let Some(storage) = get_local_storage() {
        let _ = storage.remove_item(key);
    }
}

// ============ AUTH SESSION ============

pub fn save_auth_session(session: &crate::types::AuthSession) {
    set_json(AUTH_SESSION_KEY, session);
}

pub fn load_auth_session() -> Option<crate::types::AuthSession> {
    get_json(AUTH_SESSION_KEY)
}

pub fn clear_auth_session() {
    remove(AUTH_SESSION_KEY);
}

// ============ REST TIMER RECORDS (per exercise) ============

fn timer_key(exercise_id: &str) -> String {
    format!("{}{}", TIMER_KEY_PREFIX, exercise_id)
}

pub fn save_timer_record(exercise_id: &str, record: &TimerRecord) {
    set_json(&timer_key(exercise_id), record);
}

pub fn load_timer_record(exercise_id: &str) -> Option<TimerRecord> {
    get_json(&timer_key(exercise_id))
}

pub fn clear_timer_record(exercise_id: &str) {
    remove(&timer_key(exercise_id));
}

// ============ ENTITY DRAFTS ============

/// A field edit that never got a server acknowledgement, kept so a later
/// load can detect "local edit newer than server row".
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct EntityDraft {
    pub value: serde_json::Value,
    pub updated_at: i64,
}

fn draft_key(entity_id: &str) -> String {
    format!("{}{}", DRAFT_KEY_PREFIX, entity_id)
}

pub fn save_draft(entity_id: &str, value: serde_json::Value, updated_at: i64) {
    set_json(&draft_key(entity_id), &EntityDraft { value, updated_at });
}

pub fn load_draft(entity_id: &str) -> Option<EntityDraft> {
    get_json(&draft_key(entity_id))
}

pub fn clear_draft(entity_id: &str) {
    remove(&draft_key(entity_id));
}

// ============ PREFERENCES ============

pub fn save_rest_default(seconds: u32) {
    if let Some(storage) = get_local_storage() {
        let _ = storage.set_item(REST_DEFAULT_KEY, &seconds.to_string());
    }
}

pub fn load_rest_default() -> u32 {
    get_local_storage()
        .and_then(|s| s.get_item(REST_DEFAULT_KEY).ok())
        .flatten()
        .and_then(|v| v.parse().ok())
        .unwrap_or(90)
}

pub fn save_push_enabled(enabled: bool) {
    if let Some(storage) = get_local_storage() {
        let _ = storage.set_item(PUSH_ENABLED_KEY, if enabled { "1" } else { "0" });
    }
}

pub fn load_push_enabled() -> bool {
    get_local_storage()
        .and_then(|s| s.get_item(PUSH_ENABLED_KEY).ok())
        .flatten()
        .map(|v| v == "1")
        .unwrap_or(false)
}

/// Remove every per-user record. Called on logout so timer and draft
/// state cannot leak into the next session.
pub fn clear_user_records() {
    let Some(storage) = get_local_storage() else {
        return;
    };
    let len = storage.length().unwrap_or(0);
    let mut stale = Vec::new();
    for i in 0..len {
        if let Ok(Some(key)) = storage.key(i) {
            if key.starts_with(TIMER_KEY_PREFIX) || key.starts_with(DRAFT_KEY_PREFIX) {
                stale.push(key);
            }
        }
    }
    for key in stale {
        let _ = storage.remove_item(&key);
    }
}
