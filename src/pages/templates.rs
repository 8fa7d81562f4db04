use leptos::*;

use crate::api;
use crate::app::{today_iso, NavBar};
use crate::cache::{PageCache, DEFAULT_TTL_MS};
use crate::storage;
use crate::types::{
    AppView, TemplateExercise, Workout, WorkoutExercise, WorkoutSet, WorkoutTemplate,
};
use crate::util;

const CACHE_KEY: &str = "templates";

#[derive(Clone, PartialEq, Default)]
struct TemplatesState {
    templates: Vec<TemplateEntry>,
    loaded: bool,
}

#[derive(Clone, PartialEq)]
struct TemplateEntry {
    template: WorkoutTemplate,
    exercises: Vec<TemplateExercise>,
}

#[component]
pub fn Templates(set_view: WriteSignal<AppView>) -> impl IntoView {
    let cache = use_context::<PageCache>().unwrap_or_default();

    let initial = cache.get(CACHE_KEY, TemplatesState::default(), DEFAULT_TTL_MS);
    let needs_load = !initial.loaded;
    let (state, set_state) = create_signal(initial);
    let (new_name, set_new_name) = create_signal(String::new());
    let (error, set_error) = create_signal(String::new());

    let cache_mirror = cache.clone();
    create_effect(move |_| {
        let snapshot = state.get();
        cache_mirror.set(CACHE_KEY, move |_| snapshot);
    });

    if needs_load {
        spawn_local(async move {
            match load_templates().await {
                Ok(loaded) => set_state.set(loaded),
                Err(e) => {
                    log::warn!("Failed to load templates: {}", e);
                    set_state.update(|s| s.loaded = true);
                }
            }
        });
    }

    let create_template = move |_| {
        let name = new_name.get_untracked().trim().to_string();
        if name.is_empty() {
            return;
        }
        let user_id = api::get_current_user_id();
        if user_id.is_none() {
            return;
        }
        set_new_name.set(String::new());
        let template = WorkoutTemplate {
            id: api::new_id(),
            user_id,
            name,
            icon: None,
        };
        spawn_local(async move {
            match api::insert_returning::<_, WorkoutTemplate>("workout_templates", &template).await
            {
                Ok(created) => set_state.update(|s| {
                    s.templates.push(TemplateEntry {
                        template: created,
                        exercises: Vec::new(),
                    });
                }),
                Err(e) => {
                    log::warn!("Failed to create template: {}", e);
                    set_error.set("Could not create template".to_string());
                }
            }
        });
    };

    view! {
        <div class="templates-page">
            <div class="page-header">"Templates"</div>

            {move || (!error.get().is_empty()).then(|| view! {
                <div class="error-message">{error.get()}</div>
            })}

            {move || {
                let s = state.get();
                if !s.loaded {
                    return view! { <div class="loading">"Loading..."</div> }.into_view();
                }
                if s.templates.is_empty() {
                    return view! { <div class="empty-hint">"No templates yet"</div> }.into_view();
                }
                s.templates
                    .into_iter()
                    .map(|entry| view! {
                        <TemplateCard entry=entry set_state=set_state set_view=set_view />
                    })
                    .collect_view()
            }}

            <div class="add-template-row">
                <input
                    class="add-template-input"
                    placeholder="Template name"
                    on:input=move |ev| set_new_name.set(event_target_value(&ev))
                    prop:value=new_name
                />
                <button class="add-template-btn" on:click=create_template>"+ New"</button>
            </div>

            <NavBar set_view=set_view active="Templates" />
        </div>
    }
}

async fn load_templates() -> Result<TemplatesState, String> {
    let templates: Vec<WorkoutTemplate> =
        api::select("workout_templates", "select=*&order=name.asc").await?;

    let mut entries = Vec::with_capacity(templates.len());
    if !templates.is_empty() {
        let ids: Vec<&str> = templates.iter().map(|t| t.id.as_str()).collect();
        let exercises: Vec<TemplateExercise> = api::select(
            "template_exercises",
            &format!("select=*&template_id=in.({})&order=position.asc", ids.join(",")),
        )
        .await?;
        for template in templates {
            let own: Vec<TemplateExercise> = exercises
                .iter()
                .filter(|e| e.template_id == template.id)
                .cloned()
                .collect();
            entries.push(TemplateEntry {
                template,
                exercises: own,
            });
        }
    }

    Ok(TemplatesState {
        templates: entries,
        loaded: true,
    })
}

#[component]
fn TemplateCard(
    entry: TemplateEntry,
    set_state: WriteSignal<TemplatesState>,
    set_view: WriteSignal<AppView>,
) -> impl IntoView {
    let template = entry.template.clone();
    let template_id = template.id.clone();
    let (expanded, set_expanded) = create_signal(false);
    let (new_exercise, set_new_exercise) = create_signal(String::new());
    let (applying, set_applying) = create_signal(false);

    let add_id = template_id.clone();
    let next_position = std::rc::Rc::new(std::cell::Cell::new(entry.exercises.len() as i32));
    let add_exercise = move |_| {
        let name = new_exercise.get_untracked().trim().to_string();
        if name.is_empty() {
            return;
        }
        set_new_exercise.set(String::new());
        let template_id = add_id.clone();
        let position = next_position.get();
        next_position.set(position + 1);
        spawn_local(async move {
            let exercise = TemplateExercise {
                id: api::new_id(),
                template_id: template_id.clone(),
                name,
                position,
                sets_count: 3,
                rest_seconds: storage::load_rest_default(),
            };
            match api::insert_returning::<_, TemplateExercise>("template_exercises", &exercise)
                .await
            {
                Ok(created) => set_state.update(|s| {
                    if let Some(t) = s.templates.iter_mut().find(|t| t.template.id == template_id)
                    {
                        t.exercises.push(created.clone());
                    }
                }),
                Err(e) => log::warn!("Failed to add template exercise: {}", e),
            }
        });
    };

    let delete_id = template_id.clone();
    let delete_template = move |_| {
        let template_id = delete_id.clone();
        spawn_local(async move {
            let result = async {
                api::delete_where(
                    "template_exercises",
                    &format!("template_id=eq.{}", template_id),
                )
                .await?;
                api::delete_where("workout_templates", &format!("id=eq.{}", template_id)).await
            }
            .await;
            match result {
                Ok(()) => set_state.update(|s| {
                    s.templates.retain(|t| t.template.id != template_id);
                }),
                Err(e) => {
                    log::warn!("Failed to delete template: {}", e);
                    if let Some(window) = web_sys::window() {
                        let _ = window.alert_with_message("Could not delete template");
                    }
                }
            }
        });
    };

    let apply_template = {
        let template = template.clone();
        let exercises = entry.exercises.clone();
        move |_| {
            if applying.get_untracked() {
                return;
            }
            let template = template.clone();
            let exercises = exercises.clone();
            set_applying.set(true);
            spawn_local(async move {
                match apply_to_today(&template, &exercises).await {
                    Ok(workout_id) => set_view.set(AppView::WorkoutDay(workout_id)),
                    Err(e) => {
                        log::warn!("Failed to apply template: {}", e);
                        if let Some(window) = web_sys::window() {
                            let _ = window.alert_with_message("Could not apply template");
                        }
                    }
                }
                set_applying.set(false);
            });
        }
    };

    let exercise_count = entry.exercises.len();
    let exercises_view = entry.exercises.clone();

    view! {
        <div class="template-card">
            <div class="template-card-header" on:click=move |_| set_expanded.update(|e| *e = !*e)>
                <span class="template-name">{template.name.clone()}</span>
                <span class="template-count">{format!("{} exercises", exercise_count)}</span>
            </div>
            {move || expanded.get().then(|| {
                let exercises = exercises_view.clone();
                view! {
                    <div class="template-body">
                        {exercises
                            .into_iter()
                            .map(|e| view! {
                                <div class="template-exercise">
                                    <span>{e.name.clone()}</span>
                                    <span class="template-exercise-meta">
                                        {format!("{} sets · {}s rest", e.sets_count, e.rest_seconds)}
                                    </span>
                                </div>
                            })
                            .collect_view()}
                        <div class="template-add-row">
                            <input
                                class="template-add-input"
                                placeholder="Exercise name"
                                on:input=move |ev| set_new_exercise.set(event_target_value(&ev))
                                prop:value=new_exercise
                            />
                            <button on:click=add_exercise.clone()>"+"</button>
                        </div>
                        <div class="template-actions">
                            <button
                                class="template-apply-btn"
                                disabled=applying
                                on:click=apply_template.clone()
                            >
                                "Start today"
                            </button>
                            <button class="template-delete-btn" on:click=delete_template.clone()>
                                "Delete"
                            </button>
                        </div>
                    </div>
                }
            })}
        </div>
    }
}

/// Creates today's workout from a template: one workout row, one
/// exercise per template entry, empty sets matching each sets count.
async fn apply_to_today(
    template: &WorkoutTemplate,
    exercises: &[TemplateExercise],
) -> Result<String, String> {
    let user_id = api::get_current_user_id();
    if user_id.is_none() {
        return Err("Not signed in".to_string());
    }
    let workout = Workout {
        id: api::new_id(),
        user_id,
        date: today_iso(),
        name: template.name.clone(),
        icon: None,
        is_cardio: false,
        notes: None,
        start_time: None,
        end_time: None,
    };
    let created: Workout = api::insert_returning("workouts", &workout).await?;

    let mut rows = Vec::new();
    let mut sets = Vec::new();
    let now = util::now_ms();
    for (position, te) in exercises.iter().enumerate() {
        let exercise = WorkoutExercise {
            id: api::new_id(),
            workout_id: created.id.clone(),
            name: te.name.clone(),
            position: position as i32,
            notes: None,
            rest_seconds: te.rest_seconds,
        };
        for index in 0..te.sets_count {
            sets.push(WorkoutSet::new(&exercise.id, index as i32, now));
        }
        rows.push(exercise);
    }
    if !rows.is_empty() {
        api::insert_many("workout_exercises", &rows).await?;
    }
    if !sets.is_empty() {
        api::insert_many("workout_sets", &sets).await?;
    }
    Ok(created.id)
}
