mod auth;
mod calendar;
mod progress;
mod settings;
mod templates;
mod workout_day;

pub use auth::Auth;
pub use calendar::Calendar;
pub use progress::Progress;
pub use settings::Settings;
pub use templates::Templates;
pub use workout_day::WorkoutDay;
