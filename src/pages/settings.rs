use leptos::*;

use crate::api;
use crate::app::NavBar;
use crate::cache::PageCache;
use crate::storage;
use crate::transfer::{self, ImportMode};
use crate::types::{
    AppView, AuthSession, TemplateExercise, Workout, WorkoutExercise, WorkoutSet, WorkoutTemplate,
};

#[component]
pub fn Settings(
    set_view: WriteSignal<AppView>,
    auth: ReadSignal<Option<AuthSession>>,
    set_auth: WriteSignal<Option<AuthSession>>,
) -> impl IntoView {
    let cache = use_context::<PageCache>().unwrap_or_default();

    let (rest_default, set_rest_default) = create_signal(storage::load_rest_default());
    let (push_enabled, set_push_enabled) = create_signal(storage::load_push_enabled());
    let (transfer_text, set_transfer_text) = create_signal(String::new());
    let (overwrite, set_overwrite) = create_signal(false);
    let (status, set_status) = create_signal(String::new());
    let (busy, set_busy) = create_signal(false);

    let change_rest = move |ev| {
        if let Ok(secs) = event_target_value(&ev).trim().parse::<u32>() {
            let secs = secs.max(1);
            set_rest_default.set(secs);
            storage::save_rest_default(secs);
        }
    };

    let toggle_push = move |_| {
        let next = !push_enabled.get_untracked();
        set_push_enabled.set(next);
        storage::save_push_enabled(next);
    };

    let export = move |_| {
        if busy.get_untracked() {
            return;
        }
        set_busy.set(true);
        set_status.set(String::new());
        spawn_local(async move {
            match build_export().await {
                Ok(json) => set_transfer_text.set(json),
                Err(e) => {
                    log::warn!("Export failed: {}", e);
                    set_status.set("Export failed".to_string());
                }
            }
            set_busy.set(false);
        });
    };

    let import = move |_| {
        if busy.get_untracked() {
            return;
        }
        let text = transfer_text.get_untracked();
        // Validation is all-or-nothing: a bad document writes nothing.
        let doc = match transfer::parse_export(&text) {
            Ok(doc) => doc,
            Err(e) => {
                set_status.set(format!("Import rejected: {}", e));
                return;
            }
        };
        let mode = if overwrite.get_untracked() {
            ImportMode::Overwrite
        } else {
            ImportMode::NewDatesOnly
        };
        set_busy.set(true);
        set_status.set(String::new());
        spawn_local(async move {
            match run_import(&doc, mode).await {
                Ok((written, skipped)) => {
                    set_status.set(format!("Imported {} workouts, skipped {}", written, skipped));
                }
                Err(e) => {
                    log::warn!("Import failed: {}", e);
                    set_status.set("Import failed; some data may have been written".to_string());
                    if let Some(window) = web_sys::window() {
                        let _ = window.alert_with_message("Import failed");
                    }
                }
            }
            set_busy.set(false);
        });
    };

    let logout = {
        let cache = cache.clone();
        move |_| {
            api::sign_out();
            cache.clear_all();
            storage::clear_user_records();
            set_auth.set(None);
            set_view.set(AppView::Login);
        }
    };

    view! {
        <div class="settings-page">
            <div class="page-header">"Settings"</div>

            {move || auth.get().map(|session| view! {
                <div class="account-row">{session.user.email}</div>
            })}

            <div class="settings-row">
                <label>"Default rest (seconds)"</label>
                <input
                    class="rest-default-input"
                    inputmode="numeric"
                    on:change=change_rest
                    prop:value=move || rest_default.get().to_string()
                />
            </div>

            <div class="settings-row">
                <label>"Rest timer notifications"</label>
                <input
                    type="checkbox"
                    prop:checked=push_enabled
                    on:change=toggle_push
                />
            </div>

            <div class="transfer-section">
                <div class="section-title">"Backup"</div>
                <textarea
                    class="transfer-text"
                    placeholder="Exported data appears here; paste a backup to import"
                    on:input=move |ev| set_transfer_text.set(event_target_value(&ev))
                    prop:value=transfer_text
                ></textarea>
                <div class="transfer-mode">
                    <label>
                        <input
                            type="checkbox"
                            prop:checked=overwrite
                            on:change=move |_| set_overwrite.update(|o| *o = !*o)
                        />
                        "Overwrite existing dates"
                    </label>
                </div>
                <div class="transfer-actions">
                    <button disabled=busy on:click=export>"Export"</button>
                    <button disabled=busy on:click=import>"Import"</button>
                </div>
                {move || (!status.get().is_empty()).then(|| view! {
                    <div class="transfer-status">{status.get()}</div>
                })}
            </div>

            <button class="logout-btn" on:click=logout>"Sign out"</button>

            <NavBar set_view=set_view active="Settings" />
        </div>
    }
}

/// Full backup: every workout with its children plus all templates, as
/// one pretty-printed document.
async fn build_export() -> Result<String, String> {
    let workouts: Vec<Workout> = api::select("workouts", "select=*&order=date.asc").await?;
    let exercises: Vec<WorkoutExercise> =
        api::select("workout_exercises", "select=*&order=position.asc").await?;
    let sets: Vec<WorkoutSet> = api::select("workout_sets", "select=*&order=index.asc").await?;

    let nested: Vec<(Workout, Vec<(WorkoutExercise, Vec<WorkoutSet>)>)> = workouts
        .into_iter()
        .map(|workout| {
            let own: Vec<(WorkoutExercise, Vec<WorkoutSet>)> = exercises
                .iter()
                .filter(|e| e.workout_id == workout.id)
                .map(|e| {
                    let own_sets: Vec<WorkoutSet> =
                        sets.iter().filter(|s| s.exercise_id == e.id).cloned().collect();
                    (e.clone(), own_sets)
                })
                .collect();
            (workout, own)
        })
        .collect();

    let templates: Vec<WorkoutTemplate> =
        api::select("workout_templates", "select=*&order=name.asc").await?;
    let template_exercises: Vec<TemplateExercise> =
        api::select("template_exercises", "select=*&order=position.asc").await?;
    let nested_templates: Vec<(WorkoutTemplate, Vec<TemplateExercise>)> = templates
        .into_iter()
        .map(|t| {
            let own: Vec<TemplateExercise> = template_exercises
                .iter()
                .filter(|e| e.template_id == t.id)
                .cloned()
                .collect();
            (t, own)
        })
        .collect();

    let mut doc = transfer::export_workouts(&nested);
    doc.templates = transfer::export_templates(&nested_templates).templates;
    serde_json::to_string_pretty(&doc).map_err(|e| e.to_string())
}

async fn run_import(
    doc: &transfer::ExportDocument,
    mode: ImportMode,
) -> Result<(usize, usize), String> {
    let existing: Vec<Workout> = api::select("workouts", "select=*").await?;
    let existing_dates: Vec<String> = existing.into_iter().map(|w| w.date).collect();

    let plan = transfer::plan_import(&existing_dates, doc, mode);
    let written = transfer::execute_plan(&plan).await?;

    // Templates piggyback on the same document; same-named ones are
    // left alone.
    if !doc.templates.is_empty() {
        let current: Vec<WorkoutTemplate> =
            api::select("workout_templates", "select=*").await?;
        let user_id = api::get_current_user_id();
        for export in &doc.templates {
            if current.iter().any(|t| t.name == export.name) {
                continue;
            }
            let template = WorkoutTemplate {
                id: api::new_id(),
                user_id: user_id.clone(),
                name: export.name.clone(),
                icon: export.icon.clone(),
            };
            let created: WorkoutTemplate =
                api::insert_returning("workout_templates", &template).await?;
            let rows: Vec<TemplateExercise> = export
                .exercises
                .iter()
                .map(|e| TemplateExercise {
                    id: api::new_id(),
                    template_id: created.id.clone(),
                    name: e.name.clone(),
                    position: e.position,
                    sets_count: e.sets_count,
                    rest_seconds: e.rest_seconds,
                })
                .collect();
            if !rows.is_empty() {
                api::insert_many("template_exercises", &rows).await?;
            }
        }
    }

    Ok((written, plan.skipped))
}
