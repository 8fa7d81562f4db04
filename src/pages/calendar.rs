use chrono::{Datelike, Months, NaiveDate};
use leptos::*;

use crate::api;
use crate::app::{today_iso, NavBar};
use crate::cache::{PageCache, DEFAULT_TTL_MS};
use crate::types::{AppView, Workout};

const CACHE_KEY: &str = "calendar";

#[derive(Clone, PartialEq)]
struct CalendarState {
    month_start: NaiveDate,
    selected: String,
    workouts: Vec<Workout>,
    loaded: bool,
}

impl Default for CalendarState {
    fn default() -> Self {
        let today = today_iso();
        let month_start = NaiveDate::parse_from_str(&today, "%Y-%m-%d")
            .map(|d| d.with_day(1).unwrap_or(d))
            .unwrap_or_default();
        Self {
            month_start,
            selected: today,
            workouts: Vec::new(),
            loaded: false,
        }
    }
}

fn month_end(month_start: NaiveDate) -> NaiveDate {
    month_start
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
        .unwrap_or(month_start)
}

#[component]
pub fn Calendar(set_view: WriteSignal<AppView>) -> impl IntoView {
    let cache = use_context::<PageCache>().unwrap_or_default();

    let initial = cache.get(CACHE_KEY, CalendarState::default(), DEFAULT_TTL_MS);
    let needs_load = !initial.loaded;
    let (state, set_state) = create_signal(initial);
    let (error, set_error) = create_signal(Option::<String>::None);

    // Mirror every transition into the page cache so navigating away
    // and back resumes on the same month and selection.
    let cache_mirror = cache.clone();
    create_effect(move |_| {
        let snapshot = state.get();
        cache_mirror.set(CACHE_KEY, move |_| snapshot);
    });

    let load_month = move |month_start: NaiveDate| {
        let query = format!(
            "select=*&date=gte.{}&date=lte.{}&order=date.asc",
            month_start.format("%Y-%m-%d"),
            month_end(month_start).format("%Y-%m-%d"),
        );
        spawn_local(async move {
            match api::select::<Workout>("workouts", &query).await {
                Ok(workouts) => set_state.update(|s| {
                    s.workouts = workouts;
                    s.loaded = true;
                }),
                Err(e) => {
                    log::warn!("Failed to load month: {}", e);
                    set_state.update(|s| s.loaded = true);
                }
            }
        });
    };

    if needs_load {
        load_month(state.get_untracked().month_start);
    }

    let change_month = move |months: i32| {
        set_state.update(|s| {
            let next = if months > 0 {
                s.month_start.checked_add_months(Months::new(1))
            } else {
                s.month_start.checked_sub_months(Months::new(1))
            };
            if let Some(next) = next {
                s.month_start = next;
                s.workouts.clear();
            }
        });
        load_month(state.get_untracked().month_start);
    };

    let open_or_create = move |_| {
        let s = state.get_untracked();
        if let Some(existing) = s.workouts.iter().find(|w| w.date == s.selected) {
            set_view.set(AppView::WorkoutDay(existing.id.clone()));
            return;
        }
        let workout = Workout {
            id: api::new_id(),
            user_id: api::get_current_user_id(),
            date: s.selected.clone(),
            name: "Workout".into(),
            icon: None,
            is_cardio: false,
            notes: None,
            start_time: None,
            end_time: None,
        };
        spawn_local(async move {
            match api::insert_returning::<_, Workout>("workouts", &workout).await {
                Ok(created) => {
                    let id = created.id.clone();
                    set_state.update(|s| s.workouts.push(created));
                    set_view.set(AppView::WorkoutDay(id));
                }
                Err(e) => {
                    log::warn!("Failed to create workout: {}", e);
                    set_error.set(Some("Could not create workout".into()));
                }
            }
        });
    };

    view! {
        <div class="calendar-page">
            <div class="calendar-header">
                <button class="month-nav" on:click=move |_| change_month(-1)>"←"</button>
                <div class="month-title">
                    {move || state.get().month_start.format("%B %Y").to_string()}
                </div>
                <button class="month-nav" on:click=move |_| change_month(1)>"→"</button>
            </div>

            {move || error.get().map(|e| view! { <div class="page-error">{e}</div> })}

            <div class="calendar-grid">
                {["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"].into_iter().map(|d| {
                    view! { <div class="calendar-weekday">{d}</div> }
                }).collect_view()}

                {move || {
                    let s = state.get();
                    let offset = s.month_start.weekday().num_days_from_monday() as usize;
                    let days =
                        (month_end(s.month_start) - s.month_start).num_days() as usize + 1;
                    let today = today_iso();

                    let blanks = (0..offset)
                        .map(|_| view! { <div class="calendar-day blank"></div> }.into_view());
                    let cells = (1..=days).map(move |day| {
                        let date = s
                            .month_start
                            .with_day(day as u32)
                            .map(|d| d.format("%Y-%m-%d").to_string())
                            .unwrap_or_default();
                        let workout = s.workouts.iter().find(|w| w.date == date);
                        let has_workout = workout.is_some();
                        let icon = workout.and_then(|w| w.icon.clone());
                        let mut class = String::from("calendar-day");
                        if has_workout {
                            class.push_str(" logged");
                        }
                        if date == s.selected {
                            class.push_str(" selected");
                        }
                        if date == today {
                            class.push_str(" today");
                        }
                        let date_click = date.clone();
                        view! {
                            <button
                                class=class
                                on:click=move |_| {
                                    let date = date_click.clone();
                                    set_state.update(|s| s.selected = date);
                                }
                            >
                                <span class="day-number">{day}</span>
                                {icon.map(|i| view! { <span class="day-icon">{i}</span> })}
                            </button>
                        }
                        .into_view()
                    });
                    blanks.chain(cells).collect_view()
                }}
            </div>

            <div class="day-detail">
                {move || {
                    let s = state.get();
                    match s.workouts.iter().find(|w| w.date == s.selected) {
                        Some(w) => view! {
                            <div class="day-summary">
                                <span class="day-workout-name">{w.name.clone()}</span>
                                {w.is_cardio.then(|| view! { <span class="cardio-tag">"cardio"</span> })}
                            </div>
                            <button class="day-open-btn" on:click=open_or_create>"Open workout"</button>
                        }.into_view(),
                        None => view! {
                            <div class="day-summary empty">"Rest day"</div>
                            <button class="day-open-btn" on:click=open_or_create>"Add workout"</button>
                        }.into_view(),
                    }
                }}
            </div>

            <NavBar set_view=set_view active="Calendar" />
        </div>
    }
}
