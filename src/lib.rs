mod api;
mod app;
mod autosave;
mod cache;
mod debounce;
mod notify;
mod pages;
mod stats;
mod storage;
mod timer;
mod transfer;
mod types;
mod util;

use leptos::*;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    mount_to_body(app::App);
}

/// Called by the service-worker glue script once the browser push
/// subscription exists; the row is what the push edge function
/// delivers to.
#[wasm_bindgen]
pub fn register_push_subscription(endpoint: String, keys_json: String) {
    let keys = serde_json::from_str(&keys_json).unwrap_or(serde_json::Value::Null);
    notify::save_push_subscription(endpoint, keys);
    storage::save_push_enabled(true);
}
