use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tracing::{error, info};

use super::{memory_store::MemoryStore, mongodb_store::MongoDBStore};
use crate::config::{StoreBackend, StoreConfig};
use crate::models::{Exercise, Muscle, User, Workout, WorkoutExercise, WorkoutUpdate};

/// Failures a caller may need to branch on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    Duplicate(String),
    /// The backend could not complete the operation.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Duplicate(what) => write!(f, "Duplicate key: {}", what),
            StoreError::Backend(e) => f.write_str(e),
        }
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

/// The Store trait abstracts the document collections (users, exercises,
/// workouts, muscles).
///
/// Lookups return `Ok(None)` when nothing matches; `Err` is reserved for the
/// backend failing. Ids are validated by the caller before reaching the store.
#[async_trait]
pub trait Store: Send + Sync {
    // -- users
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn get_user(&self, id: &ObjectId) -> StoreResult<Option<User>>;
    /// Inserts a user. Fails with `Duplicate` if the username is taken,
    /// checked atomically with the insert.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn update_user_password(
        &self,
        id: &ObjectId,
        password_hash: &str,
    ) -> StoreResult<Option<User>>;
    async fn delete_user(&self, id: &ObjectId) -> StoreResult<Option<User>>;
    /// Appends a workout reference to a user. Returns false if the user does not exist.
    async fn push_user_workout(&self, user_id: &ObjectId, workout_id: &str) -> StoreResult<bool>;

    // -- exercises
    async fn insert_exercise(&self, exercise: &Exercise) -> StoreResult<()>;
    async fn list_exercises(&self) -> StoreResult<Vec<Exercise>>;

    // -- workouts
    async fn insert_workout(&self, workout: &Workout) -> StoreResult<()>;
    async fn get_workout(&self, id: &ObjectId) -> StoreResult<Option<Workout>>;
    /// Overwrites the fields set in `update` and returns the new document.
    async fn update_workout(
        &self,
        id: &ObjectId,
        update: &WorkoutUpdate,
    ) -> StoreResult<Option<Workout>>;
    /// Atomically appends one exercise entry and returns the new document.
    async fn push_workout_exercise(
        &self,
        id: &ObjectId,
        exercise: &WorkoutExercise,
    ) -> StoreResult<Option<Workout>>;
    async fn delete_workout(&self, id: &ObjectId) -> StoreResult<Option<Workout>>;

    // -- muscles
    async fn list_muscles(&self) -> StoreResult<Vec<Muscle>>;

    fn is_persistent(&self) -> bool {
        // Real stores keep documents across restarts.
        true
    }
}

/// Creates a concrete store implementation based on the StoreConfig.
/// If `store.enabled = false`, returns an in-memory store. Otherwise, picks the specified backend.
pub async fn create_store(config: &StoreConfig) -> Arc<dyn Store> {
    if !config.enabled {
        info!("Document store is disabled. Using in-memory MemoryStore.");
        return Arc::new(MemoryStore::new());
    }

    match &config.backend {
        Some(StoreBackend::MongoDB(mongo_config)) => match MongoDBStore::new(mongo_config).await {
            Ok(store) => {
                info!("Successfully created MongoDB store.");
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to create MongoDB store: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            error!("Store is enabled, but no backend config is provided!");
            std::process::exit(1);
        }
    }
}
