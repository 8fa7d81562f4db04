//! Data export/import.
//!
//! The file format is a JSON document with a top-level `workouts` or
//! `templates` array, camelCase on the wire. Import is planned as a
//! pure step (validate, then decide deletes/inserts against the dates
//! that already exist) so nothing is written when the file is bad, and
//! executed against the backend only once the plan is accepted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{TemplateExercise, Workout, WorkoutExercise, WorkoutSet, WorkoutTemplate};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ExportDocument {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workouts: Vec<WorkoutExport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<TemplateExport>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutExport {
    pub date: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_cardio: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub exercises: Vec<ExerciseExport>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseExport {
    pub name: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "default_rest_seconds")]
    pub rest_seconds: u32,
    #[serde(default)]
    pub sets: Vec<SetExport>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SetExport {
    pub index: i32,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub is_done: bool,
    #[serde(default)]
    pub is_dropset: bool,
    #[serde(default)]
    pub parent_set_index: Option<i32>,
    #[serde(default)]
    pub updated_at: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateExport {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub exercises: Vec<TemplateExerciseExport>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateExerciseExport {
    pub name: String,
    #[serde(default)]
    pub position: i32,
    pub sets_count: u32,
    #[serde(default = "default_rest_seconds")]
    pub rest_seconds: u32,
}

fn default_rest_seconds() -> u32 {
    90
}

#[derive(Debug, PartialEq)]
pub enum ImportError {
    Malformed(String),
    Empty,
    BadDate(String),
    BadWeight { date: String, set_index: i32 },
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Malformed(e) => write!(f, "File is not valid JSON: {}", e),
            ImportError::Empty => write!(f, "File contains no workouts or templates"),
            ImportError::BadDate(d) => write!(f, "Invalid date: {}", d),
            ImportError::BadWeight { date, set_index } => {
                write!(f, "Invalid weight in workout {} set {}", date, set_index)
            }
        }
    }
}

impl std::error::Error for ImportError {}

/// Parse and fully validate an export file. No mutation happens before
/// this returns Ok, so a bad file never causes a partial write.
pub fn parse_export(json: &str) -> Result<ExportDocument, ImportError> {
    let doc: ExportDocument =
        serde_json::from_str(json).map_err(|e| ImportError::Malformed(e.to_string()))?;
    if doc.workouts.is_empty() && doc.templates.is_empty() {
        return Err(ImportError::Empty);
    }
    for workout in &doc.workouts {
        if chrono::NaiveDate::parse_from_str(&workout.date, "%Y-%m-%d").is_err() {
            return Err(ImportError::BadDate(workout.date.clone()));
        }
        for exercise in &workout.exercises {
            for set in &exercise.sets {
                if let Some(w) = set.weight {
                    if !w.is_finite() || w < 0.0 {
                        return Err(ImportError::BadWeight {
                            date: workout.date.clone(),
                            set_index: set.index,
                        });
                    }
                }
            }
        }
    }
    Ok(doc)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportMode {
    /// Dates that already exist are fully replaced: the existing
    /// workout and its children are deleted before the insert.
    Overwrite,
    /// Workouts whose date already exists are skipped.
    NewDatesOnly,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportPlan {
    /// Existing workout dates to delete (with children) before inserting.
    pub delete_dates: Vec<String>,
    pub insert: Vec<WorkoutExport>,
    pub skipped: usize,
}

/// Decide what an import would do, given the dates that already have a
/// workout. Pure; the caller executes the plan.
pub fn plan_import(existing_dates: &[String], doc: &ExportDocument, mode: ImportMode) -> ImportPlan {
    let mut plan = ImportPlan::default();
    for workout in &doc.workouts {
        let exists = existing_dates.iter().any(|d| d == &workout.date);
        match (mode, exists) {
            (ImportMode::Overwrite, true) => {
                plan.delete_dates.push(workout.date.clone());
                plan.insert.push(workout.clone());
            }
            (ImportMode::NewDatesOnly, true) => plan.skipped += 1,
            (_, false) => plan.insert.push(workout.clone()),
        }
    }
    plan
}

// ============ DOMAIN <-> WIRE ============

pub fn export_workouts(
    workouts: &[(Workout, Vec<(WorkoutExercise, Vec<WorkoutSet>)>)],
) -> ExportDocument {
    let workouts = workouts
        .iter()
        .map(|(workout, exercises)| WorkoutExport {
            date: workout.date.clone(),
            name: workout.name.clone(),
            icon: workout.icon.clone(),
            is_cardio: workout.is_cardio,
            notes: workout.notes.clone(),
            start_time: workout.start_time.clone(),
            end_time: workout.end_time.clone(),
            exercises: exercises
                .iter()
                .map(|(exercise, sets)| ExerciseExport {
                    name: exercise.name.clone(),
                    position: exercise.position,
                    notes: exercise.notes.clone(),
                    rest_seconds: exercise.rest_seconds,
                    sets: sets
                        .iter()
                        .map(|set| SetExport {
                            index: set.index,
                            weight: set.weight,
                            reps: set.reps,
                            is_done: set.is_done,
                            is_dropset: set.is_dropset,
                            parent_set_index: set.parent_set_index,
                            updated_at: set.updated_at,
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();
    ExportDocument {
        workouts,
        templates: Vec::new(),
    }
}

pub fn export_templates(templates: &[(WorkoutTemplate, Vec<TemplateExercise>)]) -> ExportDocument {
    let templates = templates
        .iter()
        .map(|(template, exercises)| TemplateExport {
            name: template.name.clone(),
            icon: template.icon.clone(),
            exercises: exercises
                .iter()
                .map(|e| TemplateExerciseExport {
                    name: e.name.clone(),
                    position: e.position,
                    sets_count: e.sets_count,
                    rest_seconds: e.rest_seconds,
                })
                .collect(),
        })
        .collect();
    ExportDocument {
        workouts: Vec::new(),
        templates,
    }
}

/// Turn one imported workout into insertable rows with fresh ids.
pub fn materialize_workout(
    export: &WorkoutExport,
    user_id: Option<String>,
    now_ms: i64,
) -> (Workout, Vec<WorkoutExercise>, Vec<WorkoutSet>) {
    let workout = Workout {
        id: crate::api::new_id(),
        user_id,
        date: export.date.clone(),
        name: export.name.clone(),
        icon: export.icon.clone(),
        is_cardio: export.is_cardio,
        notes: export.notes.clone(),
        start_time: export.start_time.clone(),
        end_time: export.end_time.clone(),
    };
    let mut exercises = Vec::new();
    let mut sets = Vec::new();
    for exercise_export in &export.exercises {
        let exercise = WorkoutExercise {
            id: crate::api::new_id(),
            workout_id: workout.id.clone(),
            name: exercise_export.name.clone(),
            position: exercise_export.position,
            notes: exercise_export.notes.clone(),
            rest_seconds: exercise_export.rest_seconds,
        };
        for set_export in &exercise_export.sets {
            sets.push(WorkoutSet {
                id: crate::api::new_id(),
                exercise_id: exercise.id.clone(),
                index: set_export.index,
                weight: set_export.weight,
                reps: set_export.reps,
                is_done: set_export.is_done,
                is_dropset: set_export.is_dropset,
                parent_set_index: set_export.parent_set_index,
                updated_at: if set_export.updated_at > 0 {
                    set_export.updated_at
                } else {
                    now_ms
                },
            });
        }
        exercises.push(exercise);
    }
    (workout, exercises, sets)
}

// ============ PLAN EXECUTION (backend writes) ============

/// Delete one date's workout with all children: sets, then exercises,
/// then the workout row.
pub async fn delete_workout_by_date(date: &str) -> Result<(), String> {
    let workouts: Vec<Workout> =
        crate::api::select("workouts", &format!("select=*&date=eq.{}", date)).await?;
    for workout in workouts {
        let exercises: Vec<WorkoutExercise> = crate::api::select(
            "workout_exercises",
            &format!("select=*&workout_id=eq.{}", workout.id),
        )
        .await?;
        if !exercises.is_empty() {
            let ids: Vec<&str> = exercises.iter().map(|e| e.id.as_str()).collect();
            let filter = format!("exercise_id=in.({})", ids.join(","));
            crate::api::delete_where("workout_sets", &filter).await?;
        }
        crate::api::delete_where("workout_exercises", &format!("workout_id=eq.{}", workout.id))
            .await?;
        crate::api::delete_where("workouts", &format!("id=eq.{}", workout.id)).await?;
    }
    Ok(())
}

/// Run a validated plan: deletes first, then inserts. Returns how many
/// workouts were written.
pub async fn execute_plan(plan: &ImportPlan) -> Result<usize, String> {
    for date in &plan.delete_dates {
        delete_workout_by_date(date).await?;
    }
    let user_id = crate::api::get_current_user_id();
    let now_ms = crate::util::now_ms();
    for export in &plan.insert {
        let (workout, exercises, sets) = materialize_workout(export, user_id.clone(), now_ms);
        let _: Workout = crate::api::insert_returning("workouts", &workout).await?;
        crate::api::insert_many("workout_exercises", &exercises).await?;
        crate::api::insert_many("workout_sets", &sets).await?;
    }
    Ok(plan.insert.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc(dates: &[&str]) -> ExportDocument {
        ExportDocument {
            workouts: dates
                .iter()
                .map(|d| WorkoutExport {
                    date: d.to_string(),
                    name: "Push".into(),
                    icon: None,
                    is_cardio: false,
                    notes: None,
                    start_time: None,
                    end_time: None,
                    exercises: vec![ExerciseExport {
                        name: "Bench Press".into(),
                        position: 0,
                        notes: None,
                        rest_seconds: 120,
                        sets: vec![SetExport {
                            index: 0,
                            weight: Some(80.0),
                            reps: Some(5),
                            is_done: true,
                            is_dropset: false,
                            parent_set_index: None,
                            updated_at: 1_700_000_000_000,
                        }],
                    }],
                })
                .collect(),
            templates: Vec::new(),
        }
    }

    #[test]
    fn parses_the_wire_format() {
        let json = r#"{
            "workouts": [{
                "date": "2024-01-01",
                "name": "Legs",
                "icon": "leg",
                "isCardio": false,
                "notes": null,
               "startTime": "10:00",
                "endTime": "11:05",
                "exercises": [{
                    "name": "Squats",
                    "restSeconds": 180,
                    "sets": [
                        {"index": 0, "weight": 100.0, "reps": 5, "isDone": true,
                         "isDropset": false, "parentSetIndex": null,
                         "updatedAt": 1704100000000},
                        {"index": 1, "weight": 80.0, "reps": 8, "isDone": true,
                         "isDropset": true, "parentSetIndex": 0,
                         "updatedAt": 1704100300000}
                    ]
                }]
            }]
        }"#;
        let doc = parse_export(json).unwrap();
        assert_eq!(doc.workouts.len(), 1);
        let sets = &doc.workouts[0].exercises[0].sets;
        assert_eq!(sets.len(), 2);
        assert!(sets[1].is_dropset);
        assert_eq!(sets[1].parent_set_index, Some(0));
        assert_eq!(doc.workouts[0].start_time.as_deref(), Some("10:00"));
    }

    #[test]
    fn rejects_invalid_json_and_empty_documents() {
        assert!(matches!(parse_export("not json"), Err(ImportError::Malformed(_))));
        assert_eq!(parse_export("{}"), Err(ImportError::Empty));
    }

    #[test]
    fn rejects_bad_dates_before_any_write() {
        let mut doc = sample_doc(&["2024-13-40"]);
        doc.workouts[0].date = "2024-13-40".into();
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(parse_export(&json), Err(ImportError::BadDate("2024-13-40".into())));
    }

    #[test]
    fn rejects_negative_and_non_finite_weights() {
        let mut doc = sample_doc(&["2024-01-01"]);
        doc.workouts[0].exercises[0].sets[0].weight = Some(-5.0);
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(
            parse_export(&json),
            Err(ImportError::BadWeight {
                date: "2024-01-01".into(),
                set_index: 0
            })
        );
    }

    #[test]
    fn overwrite_deletes_matching_date_then_inserts_once() {
        let existing = vec!["2024-01-01".to_string(), "2024-02-02".to_string()];
        let doc = sample_doc(&["2024-01-01", "2024-03-03"]);
        let plan = plan_import(&existing, &doc, ImportMode::Overwrite);

        assert_eq!(plan.delete_dates, vec!["2024-01-01".to_string()]);
        assert_eq!(plan.insert.len(), 2);
        assert_eq!(plan.skipped, 0);
        // Exactly one insert for the overwritten date, so after the
        // delete there is exactly one workout on it.
        let on_date = plan.insert.iter().filter(|w| w.date == "2024-01-01").count();
        assert_eq!(on_date, 1);
    }

    #[test]
    fn new_dates_only_skips_existing() {
        let existing = vec!["2024-01-01".to_string()];
        let doc = sample_doc(&["2024-01-01", "2024-03-03"]);
        let plan = plan_import(&existing, &doc, ImportMode::NewDatesOnly);

        assert!(plan.delete_dates.is_empty());
        assert_eq!(plan.skipped, 1);
        assert_eq!(plan.insert.len(), 1);
        assert_eq!(plan.insert[0].date, "2024-03-03");
    }

    #[test]
    fn export_then_parse_preserves_workouts() {
        let doc = sample_doc(&["2024-05-05"]);
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(parse_export(&json).unwrap(), doc);
    }

    #[test]
    fn materialize_links_children_to_fresh_ids() {
        let doc = sample_doc(&["2024-05-05"]);
        let (workout, exercises, sets) =
            materialize_workout(&doc.workouts[0], Some("u1".into()), 1_700_000_000_000);
        assert_eq!(exercises.len(), 1);
        assert_eq!(exercises[0].workout_id, workout.id);
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].exercise_id, exercises[0].id);
        assert_eq!(workout.user_id.as_deref(), Some("u1"));
    }
}
