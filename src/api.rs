use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, RequestMode, Response};

use crate::storage;
use crate::types::{AuthSession, AuthUser};

const SUPABASE_URL: &str = "https://qjxmlfzqvnbocrtpgyuo.supabase.co";
const SUPABASE_KEY: &str = "sb_publishable_Jm2kQxVt-Ab3rbLWyCmQfg_XePzR1wM";

/// Cheap client-side id, millis + random suffix. Uniqueness per user is
/// all that matters; the backend never generates ids for us.
pub fn new_id() -> String {
    format!("{:x}{:x}", crate::util::now_ms() as u64, random_suffix())
}

#[cfg(target_arch = "wasm32")]
fn random_suffix() -> u64 {
    (js_sys::Math::random() * 1_000_000.0) as u64
}

#[cfg(not(target_arch = "wasm32"))]
fn random_suffix() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0)
}

// ============ AUTH ============

#[derive(Deserialize, Debug)]
struct SupabaseAuthResponse {
    access_token: String,
    user: SupabaseUser,
}

#[derive(Deserialize, Debug)]
struct SupabaseUser {
    id: String,
    email: String,
}

#[derive(Deserialize, Debug)]
struct SupabaseError {
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
}

async fn auth_request(path: &str, email: &str, password: &str) -> Result<AuthSession, String> {
    let window = web_sys::window().ok_or("no window")?;

    let body = serde_json::json!({
        "email": email,
        "password": password
    })
    .to_string();

    let headers = Headers::new().map_err(|_| "Failed to create headers")?;
    headers.set("apikey", SUPABASE_KEY).map_err(|_| "Failed to set apikey")?;
    headers
        .set("Content-Type", "application/json")
        .map_err(|_| "Failed to set content-type")?;

    let opts = RequestInit::new();
    opts.set_method("POST");
    opts.set_mode(RequestMode::Cors);
    opts.set_body(&JsValue::from_str(&body));
    opts.set_headers(&JsValue::from(&headers));

    let url = format!("{}{}", SUPABASE_URL, path);
    let request =
        Request::new_with_str_and_init(&url, &opts).map_err(|_| "Failed to create request")?;

    let resp_value = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|_| "Fetch failed")?;
    let resp: Response = resp_value.dyn_into().map_err(|_| "Invalid response")?;

    let json = JsFuture::from(resp.json().map_err(|_| "No JSON")?)
        .await
        .map_err(|_| "JSON parse failed")?;

    if !resp.ok() {
        let err: SupabaseError = serde_wasm_bindgen::from_value(json).unwrap_or(SupabaseError {
            error: Some("Unknown error".into()),
            error_description: None,
            msg: None,
        });
        return Err(err
            .error_description
            .or(err.msg)
            .or(err.error)
            .unwrap_or("Authentication failed".into()));
    }

    let auth_resp: SupabaseAuthResponse =
        serde_wasm_bindgen::from_value(json).map_err(|_| "Invalid auth response")?;

    let session = AuthSession {
        access_token: auth_resp.access_token,
        user: AuthUser {
            id: auth_resp.user.id,
            email: auth_resp.user.email,
        },
    };

    storage::save_auth_session(&session);
    Ok(session)
}

pub async fn sign_up(email: &str, password: &str) -> Result<AuthSession, String> {
    auth_request("/auth/v1/signup", email, password).await
}

pub async fn sign_in(email: &str, password: &str) -> Result<AuthSession, String> {
    auth_request("/auth/v1/token?grant_type=password", email, password).await
}

pub fn sign_out() {
    storage::clear_auth_session();
}

pub fn get_current_user_id() -> Option<String> {
    storage::load_auth_session().map(|s| s.user.id)
}

// ============ REST (PostgREST row CRUD) ============

fn get_headers() -> Result<Headers, JsValue> {
    let headers = Headers::new()?;
    headers.set("apikey", SUPABASE_KEY)?;

    // Use the user's token if logged in, otherwise the anon key
    if let Some(session) = storage::load_auth_session() {
        headers.set("Authorization", &format!("Bearer {}", session.access_token))?;
    } else {
        headers.set("Authorization", &format!("Bearer {}", SUPABASE_KEY))?;
    }

    headers.set("Content-Type", "application/json")?;
    Ok(headers)
}

fn create_request_init(method: &str, body: Option<&str>, headers: &Headers) -> RequestInit {
    let opts = RequestInit::new();
    opts.set_method(method);
    opts.set_mode(RequestMode::Cors);
    if let Some(b) = body {
        opts.set_body(&JsValue::from_str(b));
    }
    opts.set_headers(&JsValue::from(headers));
    opts
}

async fn rest_request(
    method: &str,
    table: &str,
    query: &str,
    body: Option<&str>,
    prefer: Option<&str>,
) -> Result<Option<JsValue>, String> {
    let window = web_sys::window().ok_or("no window")?;

    let headers = get_headers().map_err(|_| "Failed to create headers")?;
    if let Some(prefer) = prefer {
        headers.set("Prefer", prefer).map_err(|_| "Failed to set prefer")?;
    }
    let opts = create_request_init(method, body, &headers);

    let url = if query.is_empty() {
        format!("{}/rest/v1/{}", SUPABASE_URL, table)
    } else {
        format!("{}/rest/v1/{}?{}", SUPABASE_URL, table, query)
    };
    let request =
        Request::new_with_str_and_init(&url, &opts).map_err(|_| "Failed to create request")?;

    let resp_value = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|_| "Fetch failed")?;
    let resp: Response = resp_value.dyn_into().map_err(|_| "Invalid response")?;

    if !resp.ok() {
        return Err(format!("HTTP error: {}", resp.status()));
    }

    // DELETE and minimal-return writes come back bodyless.
    if resp.status() == 204 {
        return Ok(None);
    }
    let json = JsFuture::from(resp.json().map_err(|_| "No JSON")?)
        .await
        .map_err(|_| "JSON parse failed")?;
    Ok(Some(json))
}

fn rows_from_json<R: DeserializeOwned>(json: JsValue) -> Result<Vec<R>, String> {
    serde_wasm_bindgen::from_value(json).map_err(|e| format!("Invalid rows: {}", e))
}

/// Insert one row and return the created row as the server stored it.
pub async fn insert_returning<T: Serialize, R: DeserializeOwned>(
    table: &str,
    row: &T,
) -> Result<R, String> {
    let body = serde_json::to_string(row).map_err(|e| e.to_string())?;
    let json = rest_request("POST", table, "", Some(&body), Some("return=representation"))
        .await?
        .ok_or("Empty insert response")?;
    let mut rows: Vec<R> = rows_from_json(json)?;
    if rows.is_empty() {
        return Err("Insert returned no row".into());
    }
    Ok(rows.remove(0))
}

/// Insert a batch of rows, discarding the response body.
pub async fn insert_many<T: Serialize>(table: &str, rows: &[T]) -> Result<(), String> {
    if rows.is_empty() {
        return Ok(());
    }
    let body = serde_json::to_string(rows).map_err(|e| e.to_string())?;
    rest_request("POST", table, "", Some(&body), Some("return=minimal")).await?;
    Ok(())
}

/// Patch the row with this id and return the updated row.
pub async fn update_by_id<T: Serialize, R: DeserializeOwned>(
    table: &str,
    id: &str,
    patch: &T,
) -> Result<R, String> {
    let body = serde_json::to_string(patch).map_err(|e| e.to_string())?;
    let query = format!("id=eq.{}", id);
    let json = rest_request("PATCH", table, &query, Some(&body), Some("return=representation"))
        .await?
        .ok_or("Empty update response")?;
    let mut rows: Vec<R> = rows_from_json(json)?;
    if rows.is_empty() {
        return Err("Update matched no row".into());
    }
    Ok(rows.remove(0))
}

/// Delete rows matching a PostgREST filter string, e.g. `id=eq.abc`
/// or `workout_id=eq.abc`.
pub async fn delete_where(table: &str, filter: &str) -> Result<(), String> {
    rest_request("DELETE", table, filter, None, None).await?;
    Ok(())
}

/// Select rows with a PostgREST query string
/// (`select=*&date=eq.2024-01-01&order=position.asc&limit=50`).
pub async fn select<R: DeserializeOwned>(table: &str, query: &str) -> Result<Vec<R>, String> {
    let json = rest_request("GET", table, query, None, None)
        .await?
        .ok_or("Empty select response")?;
    rows_from_json(json)
}
