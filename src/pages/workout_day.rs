use std::cell::RefCell;
use std::rc::Rc;

use leptos::*;

use crate::api;
use crate::app::format_time;
use crate::autosave::{derived_done, draft_is_newer, SaveState};
use crate::cache::{PageCache, DEFAULT_TTL_MS};
use crate::debounce::create_debounced;
use crate::notify::TimerNotifier;
use crate::storage;
use crate::timer::{RestTimer, TickOutcome};
use crate::types::{AppView, Workout, WorkoutExercise, WorkoutSet};
use crate::util;

/// Quiet period before an edited field is written to the backend.
const AUTOSAVE_DELAY_MS: u32 = 600;

#[derive(Clone, PartialEq, Default)]
struct DayState {
    workout: Option<Workout>,
    exercises: Vec<ExerciseEntry>,
    loaded: bool,
}

#[derive(Clone, PartialEq)]
struct ExerciseEntry {
    exercise: WorkoutExercise,
    sets: Vec<WorkoutSet>,
}

fn parse_weight(text: &str) -> Option<f64> {
    text.trim().replace(',', ".").parse().ok().filter(|w: &f64| w.is_finite() && *w >= 0.0)
}

fn parse_reps(text: &str) -> Option<u32> {
    text.trim().parse().ok()
}

fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(message);
    }
}

#[component]
pub fn WorkoutDay(workout_id: String, set_view: WriteSignal<AppView>) -> impl IntoView {
    let cache = use_context::<PageCache>().unwrap_or_default();
    let cache_key = format!("workout_{}", workout_id);

    let initial = cache.get(&cache_key, DayState::default(), DEFAULT_TTL_MS);
    let needs_load = !initial.loaded;
    let (state, set_state) = create_signal(initial);
    let (new_exercise, set_new_exercise) = create_signal(String::new());

    // Every transition lands in the page cache, so coming back from
    // another view resumes without a refetch.
    let cache_mirror = cache.clone();
    let mirror_key = cache_key.clone();
    create_effect(move |_| {
        let snapshot = state.get();
        cache_mirror.set(&mirror_key, move |_| snapshot);
    });

    if needs_load {
        let id = workout_id.clone();
        spawn_local(async move {
            match load_day(&id).await {
                Ok(loaded) => set_state.set(loaded),
                Err(e) => {
                    log::warn!("Failed to load workout {}: {}", id, e);
                    set_state.update(|s| s.loaded = true);
                }
            }
        });
    }

    let add_exercise = move |_| {
        let name = new_exercise.get_untracked().trim().to_string();
        if name.is_empty() {
            return;
        }
        set_new_exercise.set(String::new());
        let workout_id = match state.get_untracked().workout {
            Some(w) => w.id,
            None => return,
        };
        let exercise = WorkoutExercise {
            id: api::new_id(),
            workout_id,
            name,
            position: state.get_untracked().exercises.len() as i32,
            notes: None,
            rest_seconds: storage::load_rest_default(),
        };
        spawn_local(async move {
            match api::insert_returning::<_, WorkoutExercise>("workout_exercises", &exercise).await
            {
                Ok(created) => set_state.update(|s| {
                    s.exercises.push(ExerciseEntry {
                        exercise: created,
                        sets: Vec::new(),
                    });
                }),
                Err(e) => log::warn!("Failed to add exercise: {}", e),
            }
        });
    };

    view! {
        <div class="workout-day">
            <div class="day-header">
                <button class="back-btn" on:click=move |_| set_view.set(AppView::Calendar)>
                    "←"
                </button>
                <div class="day-title">
                    {move || state.get().workout.map(|w| format!("{} · {}", w.date, w.name)).unwrap_or_default()}
                </div>
            </div>

            {move || {
                state.get().workout.map(|w| view! {
                    <WorkoutNotes workout=w set_state=set_state />
                })
            }}

            {move || {
                let s = state.get();
                if !s.loaded {
                    return view! { <div class="loading">"Loading..."</div> }.into_view();
                }
                view! {
                    <For
                        each=move || state.get().exercises
                        key=|entry| entry.exercise.id.clone()
                        children=move |entry| view! {
                            <ExerciseCard entry=entry state=state set_state=set_state />
                        }
                    />
                }
                .into_view()
            }}

            <div class="add-exercise-row">
                <input
                    class="add-exercise-input"
                    placeholder="Exercise name"
                    on:input=move |ev| set_new_exercise.set(event_target_value(&ev))
                    prop:value=new_exercise
                />
                <button class="add-exercise-btn" on:click=add_exercise>"+ Add"</button>
            </div>
        </div>
    }
}

async fn load_day(workout_id: &str) -> Result<DayState, String> {
    let mut workouts: Vec<Workout> =
        api::select("workouts", &format!("select=*&id=eq.{}", workout_id)).await?;
    let workout = if workouts.is_empty() {
        None
    } else {
        Some(workouts.remove(0))
    };

    let exercises: Vec<WorkoutExercise> = api::select(
        "workout_exercises",
        &format!("select=*&workout_id=eq.{}&order=position.asc", workout_id),
    )
    .await?;

    let mut entries = Vec::with_capacity(exercises.len());
    if !exercises.is_empty() {
        let ids: Vec<&str> = exercises.iter().map(|e| e.id.as_str()).collect();
        let sets: Vec<WorkoutSet> = api::select(
            "workout_sets",
            &format!("select=*&exercise_id=in.({})&order=index.asc", ids.join(",")),
        )
        .await?;
        for exercise in exercises {
            let own: Vec<WorkoutSet> = sets
                .iter()
                .filter(|s| s.exercise_id == exercise.id)
                .cloned()
                .collect();
            entries.push(ExerciseEntry {
                exercise,
                sets: own,
            });
        }
    }

    Ok(DayState {
        workout,
        exercises: entries,
        loaded: true,
    })
}

/// Debounced autosave for the workout's notes field.
#[component]
fn WorkoutNotes(workout: Workout, set_state: WriteSignal<DayState>) -> impl IntoView {
    let (notes, set_notes) = create_signal(workout.notes.clone().unwrap_or_default());
    let debounced = create_debounced(notes.into(), AUTOSAVE_DELAY_MS);
    let (last_saved, set_last_saved) = create_signal(workout.notes.clone().unwrap_or_default());
    let workout_id = workout.id.clone();

    create_effect(move |_| {
        let text = debounced.get();
        if text == last_saved.get_untracked() {
            return;
        }
        let id = workout_id.clone();
        let notes = (!text.is_empty()).then(|| text.clone());
        let patch = serde_json::json!({ "notes": notes });
        spawn_local(async move {
            match api::update_by_id::<_, Workout>("workouts", &id, &patch).await {
                Ok(row) => {
                    set_last_saved.set(row.notes.clone().unwrap_or_default());
                    set_state.update(|s| s.workout = Some(row));
                }
                Err(e) => log::warn!("Failed to save workout notes: {}", e),
            }
        });
    });

    view! {
        <textarea
            class="workout-notes"
            placeholder="Notes"
            on:input=move |ev| set_notes.set(event_target_value(&ev))
            prop:value=notes
        ></textarea>
    }
}

#[component]
fn ExerciseCard(
    entry: ExerciseEntry,
    state: ReadSignal<DayState>,
    set_state: WriteSignal<DayState>,
) -> impl IntoView {
    let exercise = entry.exercise.clone();
    let exercise_id = exercise.id.clone();

    // Name edits follow the same debounce-then-write contract as sets.
    let (name, set_name) = create_signal(exercise.name.clone());
    let debounced_name = create_debounced(name.into(), AUTOSAVE_DELAY_MS);
    let (last_saved_name, set_last_saved_name) = create_signal(exercise.name.clone());
    let name_exercise_id = exercise_id.clone();
    create_effect(move |_| {
        let text = debounced_name.get();
        if text.trim().is_empty() || text == last_saved_name.get_untracked() {
            return;
        }
        let id = name_exercise_id.clone();
        let patch = serde_json::json!({ "name": text });
        spawn_local(async move {
            match api::update_by_id::<_, WorkoutExercise>("workout_exercises", &id, &patch).await {
                Ok(row) => {
                    set_last_saved_name.set(row.name.clone());
                    set_state.update(|s| {
                        if let Some(e) = s.exercises.iter_mut().find(|e| e.exercise.id == row.id) {
                            e.exercise = row.clone();
                        }
                    });
                }
                Err(e) => log::warn!("Failed to rename exercise: {}", e),
            }
        });
    });

    let add_set_id = exercise_id.clone();
    let add_set = move |_| {
        let exercise_id = add_set_id.clone();
        let now = util::now_ms();
        set_state.update(|s| {
            if let Some(e) = s.exercises.iter_mut().find(|e| e.exercise.id == exercise_id) {
                let index = e.sets.iter().map(|s| s.index + 1).max().unwrap_or(0);
                let optimistic = WorkoutSet::new(&exercise_id, index, now);
                let row = optimistic.clone();
                e.sets.push(optimistic);
                spawn_local(persist_new_set(row, set_state));
            }
        });
    };

    let drop_set_id = exercise_id.clone();
    let add_dropset = move |parent_index: i32| {
        let exercise_id = drop_set_id.clone();
        let now = util::now_ms();
        set_state.update(|s| {
            if let Some(e) = s.exercises.iter_mut().find(|e| e.exercise.id == exercise_id) {
                let index = e.sets.iter().map(|s| s.index + 1).max().unwrap_or(0);
                let optimistic = WorkoutSet::dropset(&exercise_id, index, parent_index, now);
                let row = optimistic.clone();
                e.sets.push(optimistic);
                spawn_local(persist_new_set(row, set_state));
            }
        });
    };

    let remove_id = exercise_id.clone();
    let remove_exercise = move |_| {
        let exercise_id = remove_id.clone();
        spawn_local(async move {
            let sets_filter = format!("exercise_id=eq.{}", exercise_id);
            let result = async {
                api::delete_where("workout_sets", &sets_filter).await?;
                api::delete_where("workout_exercises", &format!("id=eq.{}", exercise_id)).await
            }
            .await;
            match result {
                Ok(()) => set_state.update(|s| {
                    s.exercises.retain(|e| e.exercise.id != exercise_id);
                }),
                Err(e) => {
                    log::warn!("Failed to delete exercise: {}", e);
                    alert("Could not delete exercise");
                }
            }
        });
    };

    let card_exercise_id = exercise_id.clone();

    view! {
        <div class="exercise-card">
            <div class="exercise-card-header">
                <input
                    class="exercise-name-input"
                    on:input=move |ev| set_name.set(event_target_value(&ev))
                    prop:value=name
                />
                <button class="exercise-remove-btn" on:click=remove_exercise>"✕"</button>
            </div>

            <div class="set-header-row">
                <span>"#"</span>
                <span>"kg"</span>
                <span>"reps"</span>
                <span>"✓"</span>
            </div>

            <For
                each={
                    let id = card_exercise_id.clone();
                    move || {
                        state
                            .get()
                            .exercises
                            .iter()
                            .find(|e| e.exercise.id == id)
                            .map(|e| e.sets.clone())
                            .unwrap_or_default()
                    }
                }
                key=|set| set.id.clone()
                children=move |set| {
                    let on_dropset = add_dropset.clone();
                    view! {
                        <SetRow set=set set_state=set_state on_dropset=on_dropset />
                    }
                }
            />

            <button class="add-set-btn" on:click=add_set>"+ Set"</button>

            <RestTimerView exercise_id=exercise_id.clone() rest_seconds=exercise.rest_seconds />
        </div>
    }
}

async fn persist_new_set(row: WorkoutSet, set_state: WriteSignal<DayState>) {
    match api::insert_returning::<_, WorkoutSet>("workout_sets", &row).await {
        Ok(created) => set_state.update(|s| {
            for entry in &mut s.exercises {
                if let Some(slot) = entry.sets.iter_mut().find(|s| s.id == row.id) {
                    *slot = created.clone();
                }
            }
        }),
        Err(e) => {
            // A failed count change reverts; the row disappears again.
            log::warn!("Failed to add set: {}", e);
            set_state.update(|s| {
                for entry in &mut s.exercises {
                    entry.sets.retain(|s| s.id != row.id);
                }
            });
        }
    }
}

#[component]
fn SetRow(
    set: WorkoutSet,
    set_state: WriteSignal<DayState>,
    on_dropset: impl Fn(i32) + Clone + 'static,
) -> impl IntoView {
    // A durable draft newer than the server row re-offers the local edit.
    let mut seed = set.clone();
    if let Some(draft) = storage::load_draft(&set.id) {
        if draft_is_newer(draft.updated_at, set.updated_at) {
            if let Ok(draft_set) = serde_json::from_value::<WorkoutSet>(draft.value.clone()) {
                seed.weight = draft_set.weight;
                seed.reps = draft_set.reps;
                seed.is_done = draft_set.is_done;
            }
        }
    }

    let set_id = set.id.clone();
    let (authoritative, set_authoritative) = create_signal(set.clone());
    let (weight_text, set_weight_text) =
        create_signal(seed.weight.map(crate::app::format_weight).unwrap_or_default());
    let (reps_text, set_reps_text) =
        create_signal(seed.reps.map(|r| r.to_string()).unwrap_or_default());
    let (done, set_done) = create_signal(seed.is_done);
    let (save_state, set_save_state) = create_signal(SaveState::Idle);

    let debounced_weight = create_debounced(weight_text.into(), AUTOSAVE_DELAY_MS);
    let debounced_reps = create_debounced(reps_text.into(), AUTOSAVE_DELAY_MS);

    let save_id = set_id.clone();
    create_effect(move |_| {
        let weight = parse_weight(&debounced_weight.get());
        let reps = parse_reps(&debounced_reps.get());

        let current = authoritative.get_untracked();
        // Once both debounced inputs settle, done is derived from their
        // presence, overriding any manual toggle.
        let is_done = derived_done(weight, reps);
        if weight == current.weight && reps == current.reps && is_done == current.is_done {
            return;
        }
        set_done.set(is_done);
        set_save_state.set(SaveState::Saving);

        let now = util::now_ms();
        let mut draft = current.clone();
        draft.weight = weight;
        draft.reps = reps;
        draft.is_done = is_done;
        draft.updated_at = now;
        storage::save_draft(
            &draft.id,
            serde_json::to_value(&draft).unwrap_or(serde_json::Value::Null),
            now,
        );

        let id = save_id.clone();
        let patch = serde_json::json!({
            "weight": weight,
            "reps": reps,
            "is_done": is_done,
            "updated_at": now,
        });
        spawn_local(async move {
            match api::update_by_id::<_, WorkoutSet>("workout_sets", &id, &patch).await {
                Ok(row) => {
                    storage::clear_draft(&id);
                    set_authoritative.set(row.clone());
                    set_save_state.set(SaveState::Idle);
                    set_state.update(|s| {
                        for entry in &mut s.exercises {
                            if let Some(slot) = entry.sets.iter_mut().find(|s| s.id == row.id) {
                                *slot = row.clone();
                            }
                        }
                    });
                }
                Err(e) => {
                    // Optimistic value stays; the draft covers a reload.
                    log::warn!("Autosave failed for set {}: {}", id, e);
                    set_save_state.set(SaveState::Failed);
                }
            }
        });
    });

    let toggle_id = set_id.clone();
    let toggle_done = move |_| {
        let next = !done.get_untracked();
        set_done.set(next);
        let id = toggle_id.clone();
        let patch = serde_json::json!({ "is_done": next, "updated_at": util::now_ms() });
        spawn_local(async move {
            match api::update_by_id::<_, WorkoutSet>("workout_sets", &id, &patch).await {
                Ok(row) => set_authoritative.set(row),
                Err(e) => log::warn!("Failed to toggle set {}: {}", id, e),
            }
        });
    };

    let remove_set_id = set_id.clone();
    let remove = move |_| {
        let id = remove_set_id.clone();
        let mut removed: Option<(String, WorkoutSet)> = None;
        set_state.update(|s| {
            for entry in &mut s.exercises {
                if let Some(pos) = entry.sets.iter().position(|s| s.id == id) {
                    removed = Some((entry.exercise.id.clone(), entry.sets.remove(pos)));
                }
            }
        });
        spawn_local(async move {
            if let Err(e) = api::delete_where("workout_sets", &format!("id=eq.{}", id)).await {
                log::warn!("Failed to delete set {}: {}", id, e);
                alert("Could not delete set");
                // Revert the optimistic removal.
                if let Some((exercise_id, row)) = removed {
                    set_state.update(|s| {
                        if let Some(entry) =
                            s.exercises.iter_mut().find(|e| e.exercise.id == exercise_id)
                        {
                            entry.sets.push(row);
                            entry.sets.sort_by_key(|s| s.index);
                        }
                    });
                }
            }
        });
    };

    let row_index = set.index;
    let is_dropset = set.is_dropset;
    let dropset_click = move |_| on_dropset(row_index);

    view! {
        <div class=if is_dropset { "set-row dropset" } else { "set-row" }>
            <span class="set-index">
                {if is_dropset { format!("↳{}", row_index + 1) } else { (row_index + 1).to_string() }}
            </span>
            <input
                class="set-input"
                inputmode="decimal"
                on:input=move |ev| set_weight_text.set(event_target_value(&ev))
                prop:value=weight_text
            />
            <input
                class="set-input"
                inputmode="numeric"
                on:input=move |ev| set_reps_text.set(event_target_value(&ev))
                prop:value=reps_text
            />
            <input
                type="checkbox"
                class="set-done"
                prop:checked=done
                on:change=toggle_done
            />
            <span class="set-save-state">
                {move || match save_state.get() {
                    SaveState::Idle => "",
                    SaveState::Saving => "···",
                    SaveState::Failed => "!",
                }}
            </span>
            {(!is_dropset).then(|| view! {
                <button class="dropset-btn" title="Add dropset" on:click=dropset_click>"D"</button>
            })}
            <button class="set-remove-btn" on:click=remove>"−"</button>
        </div>
    }
}

#[component]
fn RestTimerView(exercise_id: String, rest_seconds: u32) -> impl IntoView {
    let notifier = use_context::<TimerNotifier>().unwrap_or_default();

    let timer = {
        let (restored, intents) = RestTimer::restore(
            rest_seconds,
            storage::load_timer_record(&exercise_id),
            util::now_ms(),
        );
        notifier.apply(&exercise_id, intents);
        Rc::new(RefCell::new(restored))
    };

    let (remaining, set_remaining) = create_signal(timer.borrow().remaining_secs(util::now_ms()));
    let (active, set_active) = create_signal(timer.borrow().is_active());
    let (flash, set_flash) = create_signal(false);

    let sync = {
        let timer = timer.clone();
        move || {
            let now = util::now_ms();
            set_remaining.set(timer.borrow().remaining_secs(now));
            set_active.set(timer.borrow().is_active());
        }
    };

    // Wall-clock tick; survives backgrounding because remaining is
    // recomputed from the deadline every second.
    {
        let timer = timer.clone();
        let notifier = notifier.clone();
        let exercise_id = exercise_id.clone();
        let sync = sync.clone();
        create_effect(move |_| {
            let timer = timer.clone();
            let notifier = notifier.clone();
            let exercise_id = exercise_id.clone();
            let sync = sync.clone();
            let handle = gloo_timers::callback::Interval::new(1000, move || {
                let outcome = timer.borrow_mut().tick(util::now_ms());
                match outcome {
                    TickOutcome::Running { remaining_secs } => set_remaining.set(remaining_secs),
                    TickOutcome::Expired(intents) => {
                        notifier.apply(&exercise_id, intents);
                        sync();
                        set_flash.set(true);
                        gloo_timers::callback::Timeout::new(800, move || set_flash.set(false))
                            .forget();
                    }
                    TickOutcome::Inactive => {}
                }
            });
            on_cleanup(move || drop(handle));
        });
    }

    // Teardown flush: a still-running timer must survive navigation.
    // The scheduled notification is deliberately left alone.
    {
        let timer = timer.clone();
        let exercise_id = exercise_id.clone();
        on_cleanup(move || {
            let t = timer.borrow();
            if t.is_active() {
                storage::save_timer_record(&exercise_id, &t.record(util::now_ms()));
            }
        });
    }

    let run = {
        let timer = timer.clone();
        let notifier = notifier.clone();
        let exercise_id = exercise_id.clone();
        let sync = sync.clone();
        move |op: fn(&mut RestTimer, i64) -> Result<Vec<crate::timer::TimerIntent>, crate::timer::TimerError>| {
            match op(&mut timer.borrow_mut(), util::now_ms()) {
                Ok(intents) => notifier.apply(&exercise_id, intents),
                Err(e) => log::warn!("Rest timer: {}", e),
            }
            sync();
        }
    };

    let start = {
        let run = run.clone();
        move |_| run(RestTimer::start)
    };
    let stop = {
        let run = run.clone();
        move |_| run(RestTimer::stop)
    };
    let reset = {
        let timer = timer.clone();
        let notifier = notifier.clone();
        let exercise_id = exercise_id.clone();
        let sync = sync.clone();
        move |_| {
            let intents = timer.borrow_mut().reset();
            notifier.apply(&exercise_id, intents);
            sync();
        }
    };
    let adjust = {
        let timer = timer.clone();
        move |delta: i64| {
            let intents = timer.borrow_mut().adjust(delta, util::now_ms());
            notifier.apply(&exercise_id, intents);
            sync();
        }
    };
    let adjust_down = {
        let adjust = adjust.clone();
        move |_| adjust(-15)
    };
    let adjust_up = {
        let adjust = adjust.clone();
        move |_| adjust(15)
    };

    view! {
        <div class=move || if flash.get() { "rest-timer flash" } else { "rest-timer" }>
            <span class="rest-label">"Rest"</span>
            <button class="timer-adjust" on:click=adjust_down>"−15"</button>
            <span class=move || if active.get() { "timer-display running" } else { "timer-display" }>
                {move || format_time(remaining.get())}
            </span>
            <button class="timer-adjust" on:click=adjust_up>"+15"</button>
            {move || if active.get() {
                view! { <button class="timer-btn" on:click=stop.clone()>"Stop"</button> }.into_view()
            } else {
                view! { <button class="timer-btn" on:click=start.clone()>"Start"</button> }.into_view()
            }}
            <button class="timer-btn subtle" on:click=reset>"↺"</button>
        </div>
    }
}
