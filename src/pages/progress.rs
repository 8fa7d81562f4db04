use leptos::*;
use serde::Deserialize;

use crate::api;
use crate::app::{format_weight, today_iso, NavBar};
use crate::autosave::RequestGen;
use crate::cache::{PageCache, DEFAULT_TTL_MS};
use crate::stats::{self, ExerciseTrend};
use crate::types::{AppView, UserBodyWeight, WorkoutSet};

const CACHE_KEY: &str = "progress";

#[derive(Clone, PartialEq, Default)]
struct ProgressState {
    query: String,
    matches: Vec<String>,
    selected: Option<String>,
    trend: ExerciseTrend,
    weights: Vec<UserBodyWeight>,
    loaded: bool,
}

/// Shape of the embedded history query on `workout_exercises`.
#[derive(Clone, Deserialize)]
struct HistoryRow {
    #[serde(default)]
    workouts: Option<WorkoutDateRef>,
    #[serde(default)]
    workout_sets: Vec<WorkoutSet>,
}

#[derive(Clone, Deserialize)]
struct WorkoutDateRef {
    date: String,
}

#[component]
pub fn Progress(set_view: WriteSignal<AppView>) -> impl IntoView {
    let cache = use_context::<PageCache>().unwrap_or_default();

    let initial = cache.get(CACHE_KEY, ProgressState::default(), DEFAULT_TTL_MS);
    let needs_load = !initial.loaded;
    let (state, set_state) = create_signal(initial);
    let search_gen = RequestGen::new();

    let cache_mirror = cache.clone();
    create_effect(move |_| {
        let snapshot = state.get();
        cache_mirror.set(CACHE_KEY, move |_| snapshot);
    });

    if needs_load {
        spawn_local(async move {
            match api::select::<UserBodyWeight>(
                "user_body_weight",
                "select=*&order=measured_on.asc",
            )
            .await
            {
                Ok(weights) => set_state.update(|s| {
                    s.weights = weights;
                    s.loaded = true;
                }),
                Err(e) => {
                    log::warn!("Failed to load body weight log: {}", e);
                    set_state.update(|s| s.loaded = true);
                }
            }
        });
    }

    let search = {
        let gen = search_gen.clone();
        move |term: String| {
            set_state.update(|s| s.query = term.clone());
            let issued = gen.next();
            if term.trim().len() < 2 {
                set_state.update(|s| s.matches.clear());
                return;
            }
            let gen = gen.clone();
            spawn_local(async move {
                let encoded = String::from(js_sys::encode_uri_component(&term));
                let result = api::select::<NameRow>(
                    "workout_exercises",
                    &format!("select=name&name=ilike.*{}*&limit=40", encoded),
                )
                .await;
                // A stale response must not overwrite a newer search.
                if !gen.is_current(issued) {
                    return;
                }
                match result {
                    Ok(rows) => set_state.update(|s| {
                        let mut names: Vec<String> = rows.into_iter().map(|r| r.name).collect();
                        names.sort();
                        names.dedup();
                        s.matches = names;
                    }),
                    Err(e) => log::warn!("Exercise search failed: {}", e),
                }
            });
        }
    };

    let select_exercise = move |name: String| {
        set_state.update(|s| {
            s.selected = Some(name.clone());
            s.matches.clear();
            s.query = name.clone();
        });
        spawn_local(async move {
            match load_history(&name).await {
                Ok(trend) => set_state.update(|s| s.trend = trend),
                Err(e) => log::warn!("Failed to load history for {}: {}", name, e),
            }
        });
    };

    view! {
        <div class="progress-page">
            <div class="page-header">"Progress"</div>

            <input
                class="exercise-search"
                placeholder="Search exercise"
                on:input=move |ev| search(event_target_value(&ev))
                prop:value=move || state.get().query
            />
            {move || {
                let matches = state.get().matches;
                (!matches.is_empty()).then(|| view! {
                    <div class="search-results">
                        {matches
                            .into_iter()
                            .map(|name| {
                                let pick = name.clone();
                                view! {
                                    <div
                                        class="search-result"
                                        on:click=move |_| select_exercise(pick.clone())
                                    >
                                        {name}
                                    </div>
                                }
                            })
                            .collect_view()}
                    </div>
                })
            }}

            {move || {
                let s = state.get();
                s.selected.map(|name| view! {
                    <div class="trend-section">
                        <div class="trend-title">{name}</div>
                        <TrendChart label="Est. 1RM" series=s.trend.one_rm.clone() />
                        <TrendChart label="Volume" series=s.trend.volume.clone() />
                    </div>
                })
            }}

            <BodyWeightSection state=state set_state=set_state />

            <NavBar set_view=set_view active="Progress" />
        </div>
    }
}

#[derive(Clone, Deserialize)]
struct NameRow {
    name: String,
}

async fn load_history(name: &str) -> Result<ExerciseTrend, String> {
    let encoded = String::from(js_sys::encode_uri_component(name));
    let rows: Vec<HistoryRow> = api::select(
        "workout_exercises",
        &format!("select=name,workouts(date),workout_sets(*)&name=eq.{}", encoded),
    )
    .await?;

    let history: Vec<(String, Vec<WorkoutSet>)> = rows
        .into_iter()
        .filter_map(|r| r.workouts.map(|w| (w.date, r.workout_sets)))
        .collect();
    Ok(stats::exercise_trend(&history))
}

#[component]
fn TrendChart(label: &'static str, series: Vec<(String, f64)>) -> impl IntoView {
    const WIDTH: f64 = 320.0;
    const HEIGHT: f64 = 120.0;

    if series.len() < 2 {
        return view! {
            <div class="chart-empty">{format!("{}: not enough data", label)}</div>
        }
        .into_view();
    }

    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    let points = stats::polyline_points(&values, WIDTH, HEIGHT, 10.0);
    let latest = values.last().copied().unwrap_or(0.0);
    let first_date = series.first().map(|(d, _)| d.clone()).unwrap_or_default();
    let last_date = series.last().map(|(d, _)| d.clone()).unwrap_or_default();

    view! {
        <div class="chart">
            <div class="chart-label">
                {label} " · " {format_weight(latest)}
            </div>
            <svg viewBox=format!("0 0 {} {}", WIDTH, HEIGHT) class="chart-svg">
                <polyline points=points fill="none" stroke="currentColor" stroke-width="2" />
            </svg>
            <div class="chart-dates">
                <span>{first_date}</span>
                <span>{last_date}</span>
            </div>
        </div>
    }
    .into_view()
}

#[component]
fn BodyWeightSection(
    state: ReadSignal<ProgressState>,
    set_state: WriteSignal<ProgressState>,
) -> impl IntoView {
    let (date, set_date) = create_signal(today_iso());
    let (weight_text, set_weight_text) = create_signal(String::new());

    let add_entry = move |_| {
        let weight: f64 = match weight_text.get_untracked().trim().replace(',', ".").parse() {
            Ok(w) => w,
            Err(_) => return,
        };
        if !weight.is_finite() || weight <= 0.0 {
            return;
        }
        let entry = UserBodyWeight {
            id: api::new_id(),
            user_id: api::get_current_user_id(),
            measured_on: date.get_untracked(),
            weight_kg: weight,
        };
        set_weight_text.set(String::new());
        spawn_local(async move {
            match api::insert_returning::<_, UserBodyWeight>("user_body_weight", &entry).await {
                Ok(created) => set_state.update(|s| {
                    s.weights.retain(|w| w.measured_on != created.measured_on);
                    s.weights.push(created);
                    s.weights.sort_by(|a, b| a.measured_on.cmp(&b.measured_on));
                }),
                Err(e) => log::warn!("Failed to log body weight: {}", e),
            }
        });
    };

    view! {
        <div class="bodyweight-section">
            <div class="section-title">"Body weight"</div>
            {move || {
                let series = stats::body_weight_series(&state.get().weights);
                view! { <TrendChart label="kg" series=series /> }
            }}
            <div class="bodyweight-form">
                <input
                    type="date"
                    on:input=move |ev| set_date.set(event_target_value(&ev))
                    prop:value=date
                />
                <input
                    class="bodyweight-input"
                    inputmode="decimal"
                    placeholder="kg"
                    on:input=move |ev| set_weight_text.set(event_target_value(&ev))
                    prop:value=weight_text
                />
                <button on:click=add_entry>"Log"</button>
            </div>
        </div>
    }
}
