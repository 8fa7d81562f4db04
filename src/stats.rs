//! Trend series for the progress page. Pure data shaping; the page
//! components only render what comes out of here.

use crate::types::{UserBodyWeight, WorkoutSet};

/// Epley estimate: weight × (1 + reps/30).
pub fn estimate_one_rm(weight: f64, reps: u32) -> f64 {
    if reps == 0 {
        return 0.0;
    }
    if reps == 1 {
        return weight;
    }
    weight * (1.0 + reps as f64 / 30.0)
}

fn set_volume(set: &WorkoutSet) -> f64 {
    match (set.weight, set.reps) {
        (Some(w), Some(r)) => w * r as f64,
        _ => 0.0,
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExerciseTrend {
    /// (date, best estimated 1RM that day), ascending by date.
    pub one_rm: Vec<(String, f64)>,
    /// (date, total volume that day), ascending by date.
    pub volume: Vec<(String, f64)>,
}

/// Per-day trend points for one exercise. `history` pairs each date
/// with the sets logged under that exercise name; incomplete sets
/// (missing weight or reps) contribute nothing.
pub fn exercise_trend(history: &[(String, Vec<WorkoutSet>)]) -> ExerciseTrend {
    let mut trend = ExerciseTrend::default();
    let mut days: Vec<&(String, Vec<WorkoutSet>)> = history.iter().collect();
    days.sort_by(|a, b| a.0.cmp(&b.0));

    for (date, sets) in days {
        let best_one_rm = sets
            .iter()
            .filter_map(|s| match (s.weight, s.reps) {
                (Some(w), Some(r)) => Some(estimate_one_rm(w, r)),
                _ => None,
            })
            .fold(0.0, f64::max);
        let volume: f64 = sets.iter().map(set_volume).sum();
        if best_one_rm > 0.0 {
            trend.one_rm.push((date.clone(), best_one_rm));
        }
        if volume > 0.0 {
            trend.volume.push((date.clone(), volume));
        }
    }
    trend
}

/// Body-weight series sorted by measurement date.
pub fn body_weight_series(entries: &[UserBodyWeight]) -> Vec<(String, f64)> {
    let mut series: Vec<(String, f64)> = entries
        .iter()
        .map(|e| (e.measured_on.clone(), e.weight_kg))
        .collect();
    series.sort_by(|a, b| a.0.cmp(&b.0));
    series
}

/// SVG polyline `points` attribute for a series, spread evenly on the
/// x axis and scaled to the value range on y (with a little headroom
/// so a flat series doesn't sit on an edge).
pub fn polyline_points(values: &[f64], width: f64, height: f64, padding: f64) -> String {
    if values.len() < 2 {
        return String::new();
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let spread = (max - min).max(1.0);
    let min = min - spread * 0.1;
    let range = spread * 1.2;

    let step = (width - 2.0 * padding) / (values.len() - 1) as f64;
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let x = padding + i as f64 * step;
            let y = height - padding - ((v - min) / range * (height - 2.0 * padding));
            format!("{:.1},{:.1}", x, y)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(weight: Option<f64>, reps: Option<u32>) -> WorkoutSet {
        WorkoutSet {
            id: "s".into(),
            exercise_id: "e".into(),
            index: 0,
            weight,
            reps,
            is_done: false,
            is_dropset: false,
            parent_set_index: None,
            updated_at: 0,
        }
    }

    #[test]
    fn one_rm_estimate_matches_epley() {
        assert_eq!(estimate_one_rm(100.0, 1), 100.0);
        assert!((estimate_one_rm(100.0, 5) - 116.666).abs() < 0.01);
        assert_eq!(estimate_one_rm(100.0, 0), 0.0);
    }

    #[test]
    fn trend_takes_best_set_per_day_and_sorts_by_date() {
        let history = vec![
            (
                "2024-02-01".to_string(),
                vec![set(Some(100.0), Some(5)), set(Some(110.0), Some(2))],
            ),
            ("2024-01-01".to_string(), vec![set(Some(90.0), Some(5))]),
        ];
        let trend = exercise_trend(&history);
        assert_eq!(trend.one_rm.len(), 2);
        assert_eq!(trend.one_rm[0].0, "2024-01-01");
        // Best of 100x5 (116.7) vs 110x2 (117.3).
        assert!((trend.one_rm[1].1 - 117.333).abs() < 0.01);
        assert_eq!(trend.volume[1].1, 100.0 * 5.0 + 110.0 * 2.0);
    }

    #[test]
    fn incomplete_sets_are_ignored() {
        let history = vec![(
            "2024-01-01".to_string(),
            vec![set(Some(100.0), None), set(None, Some(8))],
        )];
        let trend = exercise_trend(&history);
        assert!(trend.one_rm.is_empty());
        assert!(trend.volume.is_empty());
    }

    #[test]
    fn polyline_spans_the_drawable_area() {
        let points = polyline_points(&[50.0, 60.0, 55.0], 100.0, 60.0, 10.0);
        let coords: Vec<&str> = points.split(' ').collect();
        assert_eq!(coords.len(), 3);
        assert!(coords[0].starts_with("10.0,"));
        assert!(coords[2].starts_with("90.0,"));
        assert_eq!(polyline_points(&[50.0], 100.0, 60.0, 10.0), "");
    }
}
