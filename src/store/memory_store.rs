use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use super::base::{Store, StoreError, StoreResult};
use crate::models::{Exercise, Muscle, User, Workout, WorkoutExercise, WorkoutUpdate};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    exercises: Vec<Exercise>,
    workouts: Vec<Workout>,
    muscles: Vec<Muscle>,
}

/// A process-local store used when no database is configured, and in tests.
///
/// Every operation runs under a single lock, so check-then-insert sequences
/// are atomic here.
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            inner: Mutex::new(Collections::default()),
        }
    }

    /// A store preloaded with muscle reference data.
    pub fn with_muscles(muscles: Vec<Muscle>) -> Self {
        MemoryStore {
            inner: Mutex::new(Collections {
                muscles,
                ..Default::default()
            }),
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Collections>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("memory store mutex poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let inner = self.lock()?;
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }

    async fn get_user(&self, id: &ObjectId) -> StoreResult<Option<User>> {
        let id = id.to_hex();
        let inner = self.lock()?;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if inner.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate(format!("username {}", user.username)));
        }
        inner.users.push(user.clone());
        Ok(())
    }

    async fn update_user_password(
        &self,
        id: &ObjectId,
        password_hash: &str,
    ) -> StoreResult<Option<User>> {
        let id = id.to_hex();
        let mut inner = self.lock()?;
        Ok(inner.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.password = password_hash.to_string();
            user.clone()
        }))
    }

    async fn delete_user(&self, id: &ObjectId) -> StoreResult<Option<User>> {
        let id = id.to_hex();
        let mut inner = self.lock()?;
        let position = inner.users.iter().position(|u| u.id == id);
        Ok(position.map(|i| inner.users.remove(i)))
    }

    async fn push_user_workout(&self, user_id: &ObjectId, workout_id: &str) -> StoreResult<bool> {
        let user_id = user_id.to_hex();
        let mut inner = self.lock()?;
        match inner.users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                user.workouts.push(workout_id.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_exercise(&self, exercise: &Exercise) -> StoreResult<()> {
        self.lock()?.exercises.push(exercise.clone());
        Ok(())
    }

    async fn list_exercises(&self) -> StoreResult<Vec<Exercise>> {
        Ok(self.lock()?.exercises.clone())
    }

    async fn insert_workout(&self, workout: &Workout) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if inner.workouts.iter().any(|w| w.id == workout.id) {
            return Err(StoreError::Duplicate(format!("workout {}", workout.id)));
        }
        inner.workouts.push(workout.clone());
        Ok(())
    }

    async fn get_workout(&self, id: &ObjectId) -> StoreResult<Option<Workout>> {
        let id = id.to_hex();
        let inner = self.lock()?;
        Ok(inner.workouts.iter().find(|w| w.id == id).cloned())
    }

    async fn update_workout(
        &self,
        id: &ObjectId,
        update: &WorkoutUpdate,
    ) -> StoreResult<Option<Workout>> {
        let id = id.to_hex();
        let mut inner = self.lock()?;
        Ok(inner.workouts.iter_mut().find(|w| w.id == id).map(|workout| {
            workout.apply_update(update.clone());
            workout.clone()
        }))
    }

    async fn push_workout_exercise(
        &self,
        id: &ObjectId,
        exercise: &WorkoutExercise,
    ) -> StoreResult<Option<Workout>> {
        let id = id.to_hex();
        let mut inner = self.lock()?;
        Ok(inner.workouts.iter_mut().find(|w| w.id == id).map(|workout| {
            workout.append_exercise(exercise.clone());
            workout.clone()
        }))
    }

    async fn delete_workout(&self, id: &ObjectId) -> StoreResult<Option<Workout>> {
        let id = id.to_hex();
        let mut inner = self.lock()?;
        let position = inner.workouts.iter().position(|w| w.id == id);
        Ok(position.map(|i| inner.workouts.remove(i)))
    }

    async fn list_muscles(&self) -> StoreResult<Vec<Muscle>> {
        Ok(self.lock()?.muscles.clone())
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str) -> User {
        User::new(
            ObjectId::new().to_hex(),
            username.to_string(),
            "$argon2id$fake".to_string(),
        )
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryStore::new();
        store.insert_user(&user("alice")).await.unwrap();
        let res = store.insert_user(&user("alice")).await;
        assert!(matches!(res, Err(StoreError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_push_user_workout_on_missing_user() {
        let store = MemoryStore::new();
        let pushed = store
            .push_user_workout(&ObjectId::new(), "w1")
            .await
            .unwrap();
        assert!(!pushed);
    }

    #[tokio::test]
    async fn test_delete_returns_removed_document() {
        let store = MemoryStore::new();
        let alice = user("alice");
        store.insert_user(&alice).await.unwrap();
        let id = ObjectId::parse_str(&alice.id).unwrap();

        assert_eq!(store.delete_user(&id).await.unwrap(), Some(alice));
        assert_eq!(store.delete_user(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_push_workout_exercise_appends() {
        let store = MemoryStore::new();
        let id = ObjectId::new();
        store
            .insert_workout(&Workout::new(id.to_hex(), "u".to_string()))
            .await
            .unwrap();

        let entry = WorkoutExercise {
            exercise_id: "e".to_string(),
            sets: vec![],
            rest_timer: Default::default(),
            initial_resistance: None,
            note: Some("felt heavy".to_string()),
        };
        store.push_workout_exercise(&id, &entry).await.unwrap();
        let workout = store.push_workout_exercise(&id, &entry).await.unwrap().unwrap();
        assert_eq!(workout.exercises.len(), 2);
    }

    #[tokio::test]
    async fn test_store_is_not_persistent() {
        assert!(!MemoryStore::new().is_persistent());
    }
}
