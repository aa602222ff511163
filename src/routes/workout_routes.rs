//! Workout endpoints.
//!
//! Two write paths with different list semantics:
//! - `POST /workouts` overwrites whatever fields it is given, `exercises` included.
//! - `POST /workouts/:id/exercises` only ever appends one entry.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::{json_body, parse_id};
use crate::models::{
    DynamicStretch, InitialResistance, RestTimer, Workout, WorkoutExercise, WorkoutSet,
    WorkoutUpdate,
};
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

const WORKOUT_NOT_FOUND: &str = "Workout not found";

/// Registers workout routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/workouts", post(save_workout))
        .route("/workouts/:id", delete(delete_workout))
        .route("/workouts/:id/exercises", post(add_exercise))
}

/// Body of `POST /workouts`. `date` is the workout's start time.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SaveWorkoutRequest {
    id: Option<String>,
    user_id: Option<String>,
    date: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    dynamic_stretches: Option<Vec<DynamicStretch>>,
    exercises: Option<Vec<WorkoutExercise>>,
}

impl SaveWorkoutRequest {
    /// The id to update, if any. An empty id means "create".
    fn target_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    fn into_update(self) -> WorkoutUpdate {
        WorkoutUpdate {
            user_id: self.user_id,
            start_time: self.date,
            end_time: self.end_time,
            dynamic_stretches: self.dynamic_stretches,
            exercises: self.exercises,
        }
    }
}

/// Body of `POST /workouts/:id/exercises`.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct AddExerciseRequest {
    exercise_id: String,
    #[serde(default)]
    sets: Vec<WorkoutSet>,
    initial_resistance: Option<InitialResistance>,
    note: Option<String>,
    rest_timer: Option<RestTimer>,
}

impl From<AddExerciseRequest> for WorkoutExercise {
    fn from(req: AddExerciseRequest) -> Self {
        WorkoutExercise {
            exercise_id: req.exercise_id,
            sets: req.sets,
            rest_timer: req.rest_timer.unwrap_or_default(),
            initial_resistance: req.initial_resistance,
            note: req.note,
        }
    }
}

/// Creates a workout, or overwrites an existing one when `id` is given.
///
/// Responds 201 with the resulting document in both cases.
async fn save_workout(
    State(state): State<AppState>,
    body: Result<Json<SaveWorkoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Workout>), HTTPError> {
    const FAILED: &str = "Workout operation failed";
    let body = json_body(body, FAILED)?;
    if let Some(exercises) = &body.exercises {
        for exercise in exercises {
            parse_id(&exercise.exercise_id, FAILED)?;
        }
    }

    match body.target_id() {
        Some(raw_id) => {
            let id = parse_id(raw_id, FAILED)?;
            let update = body.into_update();
            match state.store.update_workout(&id, &update).await {
                Ok(Some(workout)) => {
                    info!("Overwrote workout {}", id);
                    Ok((StatusCode::CREATED, Json(workout)))
                }
                Ok(None) => Err(HTTPError::not_found(WORKOUT_NOT_FOUND)),
                Err(e) => {
                    error!("Updating workout {} failed: {}", id, e);
                    Err(HTTPError::bad_request(FAILED))
                }
            }
        }
        None => create_workout(&state, body.into_update())
            .await
            .map(|workout| (StatusCode::CREATED, Json(workout))),
    }
}

/// Inserts the workout, then records it on its owner.
///
/// If the owner reference cannot be recorded the workout is deleted again,
/// so a failed request never leaves an unreferenced workout behind.
async fn create_workout(state: &AppState, update: WorkoutUpdate) -> Result<Workout, HTTPError> {
    const FAILED: &str = "Workout operation failed";

    let user_id = match update.user_id.clone() {
        Some(user_id) => user_id,
        None => {
            debug!("Workout creation without userId");
            return Err(HTTPError::bad_request(FAILED));
        }
    };
    let owner = parse_id(&user_id, FAILED)?;

    let workout = Workout::from_update(ObjectId::new().to_hex(), user_id, update);
    state.store.insert_workout(&workout).await.map_err(|e| {
        error!("Inserting workout failed: {}", e);
        HTTPError::bad_request(FAILED)
    })?;

    let linked = match state.store.push_user_workout(&owner, &workout.id).await {
        Ok(true) => true,
        Ok(false) => {
            warn!("Owner {} of new workout {} does not exist", owner, workout.id);
            false
        }
        Err(e) => {
            error!("Linking workout {} to user {} failed: {}", workout.id, owner, e);
            false
        }
    };

    if !linked {
        if let Err(e) = remove_orphan(state, &workout.id).await {
            error!("Could not remove orphaned workout {}: {}", workout.id, e);
        }
        return Err(HTTPError::bad_request(FAILED));
    }

    info!("Created workout {} for user {}", workout.id, owner);
    Ok(workout)
}

async fn remove_orphan(state: &AppState, workout_id: &str) -> Result<(), String> {
    let id = ObjectId::parse_str(workout_id).map_err(|e| e.to_string())?;
    state
        .store
        .delete_workout(&id)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Appends one exercise entry to the end of the workout's list.
async fn add_exercise(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<AddExerciseRequest>, JsonRejection>,
) -> Result<Json<Workout>, HTTPError> {
    const FAILED: &str = "Add exercise to workout failed";
    let id = parse_id(&id, FAILED)?;
    let body = json_body(body, FAILED)?;
    parse_id(&body.exercise_id, FAILED)?;

    let exists = state.store.get_workout(&id).await.map_err(|e| {
        error!("Looking up workout {} failed: {}", id, e);
        HTTPError::bad_request(FAILED)
    })?;
    if exists.is_none() {
        return Err(HTTPError::not_found(WORKOUT_NOT_FOUND));
    }

    let entry = WorkoutExercise::from(body);
    match state.store.push_workout_exercise(&id, &entry).await {
        Ok(Some(workout)) => {
            debug!(
                "Workout {} now has {} exercises",
                id,
                workout.exercises.len()
            );
            Ok(Json(workout))
        }
        // Deleted between the lookup and the append.
        Ok(None) => Err(HTTPError::not_found(WORKOUT_NOT_FOUND)),
        Err(e) => {
            error!("Appending exercise to workout {} failed: {}", id, e);
            Err(HTTPError::bad_request(FAILED))
        }
    }
}

/// Deletes a workout. The owner's reference list is not touched.
async fn delete_workout(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, HTTPError> {
    const FAILED: &str = "Deletion failed";
    let id = parse_id(&id, FAILED)?;

    match state.store.delete_workout(&id).await {
        Ok(Some(_)) => {
            info!("Deleted workout {}", id);
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(None) => Err(HTTPError::not_found(WORKOUT_NOT_FOUND)),
        Err(e) => {
            error!("Deleting workout {} failed: {}", id, e);
            Err(HTTPError::bad_request(FAILED))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_id_means_create() {
        let body: SaveWorkoutRequest =
            serde_json::from_str(r#"{"id": "", "userId": "u"}"#).unwrap();
        assert_eq!(body.target_id(), None);
    }

    #[test]
    fn test_date_maps_to_start_time() {
        let body: SaveWorkoutRequest = serde_json::from_str(
            r#"{"userId": "u", "date": "2024-05-01T07:30:00Z", "exercises": []}"#,
        )
        .unwrap();
        let update = body.into_update();
        assert_eq!(
            update.start_time.map(|t| t.to_rfc3339()),
            Some("2024-05-01T07:30:00+00:00".to_string())
        );
        assert_eq!(update.exercises, Some(vec![]));
        assert_eq!(update.dynamic_stretches, None);
    }

    #[test]
    fn test_rest_timer_defaults_when_absent() {
        let body: AddExerciseRequest = serde_json::from_str(
            r#"{"exerciseId": "e1", "sets": [{"reps": 5, "weight": 80}], "note": "belt"}"#,
        )
        .unwrap();
        let entry = WorkoutExercise::from(body);
        assert_eq!(entry.rest_timer, RestTimer { enabled: true, duration: 60 });
        assert_eq!(entry.sets.len(), 1);
    }

    #[test]
    fn test_rest_timer_kept_when_supplied() {
        let body: AddExerciseRequest = serde_json::from_str(
            r#"{"exerciseId": "e1", "restTimer": {"enabled": false, "duration": 90}}"#,
        )
        .unwrap();
        let entry = WorkoutExercise::from(body);
        assert_eq!(entry.rest_timer, RestTimer { enabled: false, duration: 90 });
    }
}
