use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Warm-up stretch performed before the lifting part of a workout.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DynamicStretch {
    pub order: u32,
    pub name: String,
    #[serde(default)]
    pub completed: bool,
}

/// One completed set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSet {
    pub reps: u32,
    pub weight: f64,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Rest timer shown between sets. Defaults to enabled, 60 seconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestTimer {
    pub enabled: bool,
    /// Seconds.
    pub duration: u32,
}

impl Default for RestTimer {
    fn default() -> Self {
        RestTimer {
            enabled: true,
            duration: 60,
        }
    }
}

/// Equipment/resistance the exercise was started with.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InitialResistance {
    pub name: String,
    pub weight: f64,
}

/// An exercise entry nested in a workout. Only reachable through its parent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutExercise {
    pub exercise_id: String,
    #[serde(default)]
    pub sets: Vec<WorkoutSet>,
    #[serde(default)]
    pub rest_timer: RestTimer,
    #[serde(default)]
    pub initial_resistance: Option<InitialResistance>,
    #[serde(default)]
    pub note: Option<String>,
}

/// The workout aggregate.
///
/// `exercises` grows through [`Workout::append_exercise`]; a full update via
/// [`Workout::apply_update`] may replace it outright.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dynamic_stretches: Vec<DynamicStretch>,
    #[serde(default)]
    pub exercises: Vec<WorkoutExercise>,
}

/// Field-wise overwrite of a workout. `None` leaves the stored value alone;
/// `Some` replaces it wholesale (no merging of nested lists).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkoutUpdate {
    pub user_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub dynamic_stretches: Option<Vec<DynamicStretch>>,
    pub exercises: Option<Vec<WorkoutExercise>>,
}

impl Workout {
    pub fn new(id: String, user_id: String) -> Self {
        Workout {
            id,
            user_id,
            start_time: None,
            end_time: None,
            dynamic_stretches: Vec::new(),
            exercises: Vec::new(),
        }
    }

    /// Build a fresh workout from the fields of an update.
    pub fn from_update(id: String, user_id: String, update: WorkoutUpdate) -> Self {
        let mut workout = Workout::new(id, user_id);
        workout.apply_update(update);
        workout
    }

    /// Adds one exercise entry at the end. Existing entries are never touched.
    pub fn append_exercise(&mut self, exercise: WorkoutExercise) {
        self.exercises.push(exercise);
    }

    pub fn apply_update(&mut self, update: WorkoutUpdate) {
        if let Some(user_id) = update.user_id {
            self.user_id = user_id;
        }
        if let Some(start_time) = update.start_time {
            self.start_time = Some(start_time);
        }
        if let Some(end_time) = update.end_time {
            self.end_time = Some(end_time);
        }
        if let Some(stretches) = update.dynamic_stretches {
            self.dynamic_stretches = stretches;
        }
        if let Some(exercises) = update.exercises {
            self.exercises = exercises;
        }
    }
}
