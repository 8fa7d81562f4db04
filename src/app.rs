use leptos::*;

use crate::cache::PageCache;
use crate::notify::TimerNotifier;
use crate::pages::{Auth, Calendar, Progress, Settings, Templates, WorkoutDay};
use crate::storage;
use crate::types::AppView;

pub fn format_time(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub fn format_weight(w: f64) -> String {
    if w.fract() == 0.0 {
        format!("{:.0}", w)
    } else {
        format!("{:.1}", w)
    }
}

/// Today's date as the ISO string the backend rows use.
pub fn today_iso() -> String {
    chrono::DateTime::from_timestamp_millis(crate::util::now_ms())
        .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[component]
pub fn App() -> impl IntoView {
    let initial_view = if storage::load_auth_session().is_some() {
        AppView::Calendar
    } else {
        AppView::Login
    };

    let (view, set_view) = create_signal(initial_view);
    let (auth, set_auth) = create_signal(storage::load_auth_session());

    // One page cache and one notifier per session, owned here so
    // logout can clear them explicitly.
    provide_context(PageCache::new());
    provide_context(TimerNotifier::new());

    view! {
        <div class="app">
            {move || match view.get() {
                AppView::Login => view! { <Auth register=false set_view=set_view set_auth=set_auth /> }.into_view(),
                AppView::Register => view! { <Auth register=true set_view=set_view set_auth=set_auth /> }.into_view(),
                AppView::Calendar => view! { <Calendar set_view=set_view /> }.into_view(),
                AppView::WorkoutDay(id) => view! { <WorkoutDay workout_id=id set_view=set_view /> }.into_view(),
                AppView::Templates => view! { <Templates set_view=set_view /> }.into_view(),
                AppView::Progress => view! { <Progress set_view=set_view /> }.into_view(),
                AppView::Settings => view! { <Settings set_view=set_view auth=auth set_auth=set_auth /> }.into_view(),
            }}
        </div>
    }
}

/// Bottom tab bar shared by the main views.
#[component]
pub fn NavBar(set_view: WriteSignal<AppView>, active: &'static str) -> impl IntoView {
    let tab = move |label: &'static str, target: AppView| {
        let class = if label == active { "nav-tab active" } else { "nav-tab" };
        view! {
            <button class=class on:click=move |_| set_view.set(target.clone())>
                {label}
            </button>
        }
    };
    view! {
        <div class="nav-bar">
            {tab("Calendar", AppView::Calendar)}
            {tab("Templates", AppView::Templates)}
            {tab("Progress", AppView::Progress)}
            {tab("Settings", AppView::Settings)}
        </div>
    }
}
