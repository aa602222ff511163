use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{
    ClientOptions, FindOneAndUpdateOptions, IndexOptions, ReturnDocument,
};
use mongodb::{Client, Collection, IndexModel};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::base::{Store, StoreError, StoreResult};
use crate::models::{Exercise, Muscle, User, Workout, WorkoutExercise, WorkoutUpdate};

/// MongoDB reports unique index violations with this code.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// The config struct for MongoDB connections.
/// Contains the URI and database name.
#[derive(Deserialize, Serialize, JsonSchema, Debug)]
pub struct MongoDBConfig {
    pub uri: String,
    pub database: String,
}

/// A concrete `Store` implementation that uses MongoDB.
///
/// One collection per entity. Models are kept as plain documents. Ids and
/// references (`_id`, `users.workouts[]`, `workouts.exercises[].exerciseId`)
/// are stored as ObjectIds and timestamps as BSON dates; the rest of the crate
/// sees them as hex strings and chrono timestamps.
pub struct MongoDBStore {
    user_collection: Collection<Document>,
    exercise_collection: Collection<Document>,
    workout_collection: Collection<Document>,
    muscle_collection: Collection<Document>,
}

impl MongoDBStore {
    /// Creates a new `MongoDBStore` from the given config.
    /// It initializes client connections, sets up indexes, etc.
    pub async fn new(config: &MongoDBConfig) -> Result<Self, String> {
        info!("Connecting to MongoDB database '{}'", config.database);

        // Parse the connection string from the config
        let mut client_options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| format!("Failed to parse MongoDB URI: {}", e))?;

        client_options.app_name = Some("Gymtron".to_string());

        let client = Client::with_options(client_options)
            .map_err(|e| format!("Failed to create MongoDB client: {}", e))?;

        info!("MongoDB connection established successfully.");

        let database = client.database(&config.database);
        let user_collection = database.collection::<Document>("users");
        let exercise_collection = database.collection::<Document>("exercises");
        let workout_collection = database.collection::<Document>("workouts");
        let muscle_collection = database.collection::<Document>("muscles");

        // Usernames are unique; concurrent registrations fail with a duplicate key.
        let mut unique_on_username = IndexModel::default();
        unique_on_username.keys = doc! { "username": 1 };
        unique_on_username.options = Some(IndexOptions::builder().unique(true).build());

        user_collection
            .create_index(unique_on_username, None)
            .await
            .map_err(|e| format!("Failed to create unique index on username: {}", e))?;

        Ok(Self {
            user_collection,
            exercise_collection,
            workout_collection,
            muscle_collection,
        })
    }

    /// Serialize a model into a document, turning its hex `_id` into an ObjectId.
    fn to_stored<T: Serialize>(value: &T) -> StoreResult<Document> {
        let mut document = bson::to_document(value)
            .map_err(|e| StoreError::Backend(format!("Failed to serialize document: {}", e)))?;
        if let Some(id) = document.get_mut("_id") {
            store_reference(id)?;
        }
        Ok(document)
    }

    fn user_document(user: &User) -> StoreResult<Document> {
        let mut document = Self::to_stored(user)?;
        if let Some(workouts) = document.get_mut("workouts") {
            store_reference(workouts)?;
        }
        Ok(document)
    }

    fn workout_document(workout: &Workout) -> StoreResult<Document> {
        let mut document = Self::to_stored(workout)?;
        for field in ["startTime", "endTime"] {
            if let Some(time) = document.get_mut(field) {
                store_datetime(time)?;
            }
        }
        if let Some(exercises) = document.get_mut("exercises") {
            store_exercise_entries(exercises)?;
        }
        Ok(document)
    }

    fn exercise_entry(exercise: &WorkoutExercise) -> StoreResult<Bson> {
        let mut entry = bson::to_bson(exercise)
            .map_err(|e| StoreError::Backend(format!("Failed to serialize exercise: {}", e)))?;
        store_exercise_fields(&mut entry)?;
        Ok(entry)
    }

    /// Convert a stored document back into a model. Every ObjectId and date in
    /// it, nested or not, comes back as a string the models can read.
    fn from_stored<T: DeserializeOwned>(document: Document) -> StoreResult<T> {
        bson::from_bson(readable(Bson::Document(document)))
            .map_err(|e| StoreError::Backend(format!("Failed to deserialize document: {}", e)))
    }

    fn from_stored_opt<T: DeserializeOwned>(document: Option<Document>) -> StoreResult<Option<T>> {
        document.map(Self::from_stored::<T>).transpose()
    }

    /// The `$set` body for a workout update; only fields present in the update.
    fn workout_set_document(update: &WorkoutUpdate) -> StoreResult<Document> {
        fn to_bson<T: Serialize>(value: &T) -> StoreResult<bson::Bson> {
            bson::to_bson(value)
                .map_err(|e| StoreError::Backend(format!("Failed to serialize field: {}", e)))
        }

        let mut set = Document::new();
        if let Some(user_id) = &update.user_id {
            set.insert("userId", user_id.as_str());
        }
        if let Some(start_time) = &update.start_time {
            let mut start_time = to_bson(start_time)?;
            store_datetime(&mut start_time)?;
            set.insert("startTime", start_time);
        }
        if let Some(end_time) = &update.end_time {
            let mut end_time = to_bson(end_time)?;
            store_datetime(&mut end_time)?;
            set.insert("endTime", end_time);
        }
        if let Some(stretches) = &update.dynamic_stretches {
            set.insert("dynamicStretches", to_bson(stretches)?);
        }
        if let Some(exercises) = &update.exercises {
            let mut exercises = to_bson(exercises)?;
            store_exercise_entries(&mut exercises)?;
            set.insert("exercises", exercises);
        }
        Ok(set)
    }

    fn return_after() -> FindOneAndUpdateOptions {
        FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build()
    }

    async fn collect_all<T: DeserializeOwned>(
        collection: &Collection<Document>,
        what: &str,
    ) -> StoreResult<Vec<T>> {
        let mut cursor = collection
            .find(doc! {}, None)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to list {}: {}", what, e)))?;

        let mut items = Vec::new();
        while let Some(document) = cursor
            .try_next()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to read {} document: {}", what, e)))?
        {
            items.push(Self::from_stored(document)?);
        }
        Ok(items)
    }
}

/// Replace a hex string (or each one in an array) with its ObjectId.
fn store_reference(value: &mut Bson) -> StoreResult<()> {
    match value {
        Bson::String(hex) => {
            let oid = ObjectId::parse_str(hex.as_str()).map_err(|e| {
                StoreError::Backend(format!("Invalid document id '{}': {}", hex, e))
            })?;
            *value = Bson::ObjectId(oid);
        }
        Bson::Array(items) => {
            for item in items.iter_mut() {
                store_reference(item)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Replace an RFC 3339 string with a BSON date. Nulls stay null.
fn store_datetime(value: &mut Bson) -> StoreResult<()> {
    if let Bson::String(text) = value {
        let date = bson::DateTime::parse_rfc3339_str(text.as_str()).map_err(|e| {
            StoreError::Backend(format!("Invalid timestamp '{}': {}", text, e))
        })?;
        *value = Bson::DateTime(date);
    }
    Ok(())
}

fn store_exercise_entries(exercises: &mut Bson) -> StoreResult<()> {
    if let Bson::Array(entries) = exercises {
        for entry in entries.iter_mut() {
            store_exercise_fields(entry)?;
        }
    }
    Ok(())
}

/// `exerciseId` as an ObjectId, each `sets[].completedAt` as a date.
fn store_exercise_fields(entry: &mut Bson) -> StoreResult<()> {
    let Some(entry) = entry.as_document_mut() else {
        return Ok(());
    };
    if let Some(exercise_id) = entry.get_mut("exerciseId") {
        store_reference(exercise_id)?;
    }
    if let Some(Bson::Array(sets)) = entry.get_mut("sets") {
        for set in sets.iter_mut() {
            if let Some(completed_at) = set.as_document_mut().and_then(|s| s.get_mut("completedAt")) {
                store_datetime(completed_at)?;
            }
        }
    }
    Ok(())
}

fn readable(value: Bson) -> Bson {
    match value {
        Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
        Bson::DateTime(date) => date
            .try_to_rfc3339_string()
            .map(Bson::String)
            .unwrap_or(Bson::DateTime(date)),
        Bson::Array(items) => Bson::Array(items.into_iter().map(readable).collect()),
        Bson::Document(document) => Bson::Document(
            document
                .into_iter()
                .map(|(key, value)| (key, readable(value)))
                .collect(),
        ),
        other => other,
    }
}

/// Map a driver error from an insert, singling out unique index violations.
fn insert_error(e: mongodb::error::Error, what: &str) -> StoreError {
    if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = e.kind.as_ref() {
        if write_error.code == DUPLICATE_KEY_CODE {
            return StoreError::Duplicate(what.to_string());
        }
    }
    StoreError::Backend(format!("Failed to insert {}: {}", what, e))
}

fn backend(action: &str) -> impl Fn(mongodb::error::Error) -> StoreError + '_ {
    move |e| StoreError::Backend(format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl Store for MongoDBStore {
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let document = self
            .user_collection
            .find_one(doc! { "username": username }, None)
            .await
            .map_err(backend("query user by username"))?;
        Self::from_stored_opt(document)
    }

    async fn get_user(&self, id: &ObjectId) -> StoreResult<Option<User>> {
        let document = self
            .user_collection
            .find_one(doc! { "_id": *id }, None)
            .await
            .map_err(backend("query user by id"))?;
        Self::from_stored_opt(document)
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let document = Self::user_document(user)?;
        self.user_collection
            .insert_one(document, None)
            .await
            .map_err(|e| insert_error(e, &format!("user {}", user.username)))?;
        Ok(())
    }

    async fn update_user_password(
        &self,
        id: &ObjectId,
        password_hash: &str,
    ) -> StoreResult<Option<User>> {
        let document = self
            .user_collection
            .find_one_and_update(
                doc! { "_id": *id },
                doc! { "$set": { "password": password_hash } },
                Self::return_after(),
            )
            .await
            .map_err(backend("update user password"))?;
        Self::from_stored_opt(document)
    }

    async fn delete_user(&self, id: &ObjectId) -> StoreResult<Option<User>> {
        let document = self
            .user_collection
            .find_one_and_delete(doc! { "_id": *id }, None)
            .await
            .map_err(backend("delete user"))?;
        Self::from_stored_opt(document)
    }

    async fn push_user_workout(&self, user_id: &ObjectId, workout_id: &str) -> StoreResult<bool> {
        let workout_oid = ObjectId::parse_str(workout_id).map_err(|e| {
            StoreError::Backend(format!("Invalid workout id '{}': {}", workout_id, e))
        })?;
        let result = self
            .user_collection
            .update_one(
                doc! { "_id": *user_id },
                doc! { "$push": { "workouts": workout_oid } },
                None,
            )
            .await
            .map_err(backend("push workout reference"))?;
        debug!(
            "Pushed workout {} onto user {}: matched={}",
            workout_id, user_id, result.matched_count
        );
        Ok(result.matched_count > 0)
    }

    async fn insert_exercise(&self, exercise: &Exercise) -> StoreResult<()> {
        let document = Self::to_stored(exercise)?;
        self.exercise_collection
            .insert_one(document, None)
            .await
            .map_err(|e| insert_error(e, &format!("exercise {}", exercise.name)))?;
        Ok(())
    }

    async fn list_exercises(&self) -> StoreResult<Vec<Exercise>> {
        Self::collect_all(&self.exercise_collection, "exercises").await
    }

    async fn insert_workout(&self, workout: &Workout) -> StoreResult<()> {
        let document = Self::workout_document(workout)?;
        self.workout_collection
            .insert_one(document, None)
            .await
            .map_err(|e| insert_error(e, &format!("workout {}", workout.id)))?;
        Ok(())
    }

    async fn get_workout(&self, id: &ObjectId) -> StoreResult<Option<Workout>> {
        let document = self
            .workout_collection
            .find_one(doc! { "_id": *id }, None)
            .await
            .map_err(backend("query workout"))?;
        Self::from_stored_opt(document)
    }

    async fn update_workout(
        &self,
        id: &ObjectId,
        update: &WorkoutUpdate,
    ) -> StoreResult<Option<Workout>> {
        let set = Self::workout_set_document(update)?;
        if set.is_empty() {
            // MongoDB rejects an empty $set; nothing to change.
            return self.get_workout(id).await;
        }
        let document = self
            .workout_collection
            .find_one_and_update(doc! { "_id": *id }, doc! { "$set": set }, Self::return_after())
            .await
            .map_err(backend("update workout"))?;
        Self::from_stored_opt(document)
    }

    async fn push_workout_exercise(
        &self,
        id: &ObjectId,
        exercise: &WorkoutExercise,
    ) -> StoreResult<Option<Workout>> {
        let entry = Self::exercise_entry(exercise)?;
        let document = self
            .workout_collection
            .find_one_and_update(
                doc! { "_id": *id },
                doc! { "$push": { "exercises": entry } },
                Self::return_after(),
            )
            .await
            .map_err(backend("append exercise to workout"))?;
        Self::from_stored_opt(document)
    }

    async fn delete_workout(&self, id: &ObjectId) -> StoreResult<Option<Workout>> {
        let document = self
            .workout_collection
            .find_one_and_delete(doc! { "_id": *id }, None)
            .await
            .map_err(backend("delete workout"))?;
        Self::from_stored_opt(document)
    }

    async fn list_muscles(&self) -> StoreResult<Vec<Muscle>> {
        Self::collect_all(&self.muscle_collection, "muscles").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RestTimer, WorkoutSet};
    use chrono::{TimeZone, Utc};

    /// Converting a User to a stored document and back preserves it, with ids as ObjectIds.
    #[test]
    fn test_user_doc_conversion() {
        let mut user = User::new(
            ObjectId::new().to_hex(),
            "alice".to_string(),
            "$argon2id$hash".to_string(),
        );
        let workout_id = ObjectId::new();
        user.workouts.push(workout_id.to_hex());

        let document = MongoDBStore::user_document(&user).unwrap();
        assert!(document.get_object_id("_id").is_ok());
        assert_eq!(
            document.get_array("workouts").unwrap(),
            &vec![Bson::ObjectId(workout_id)]
        );

        let converted: User = MongoDBStore::from_stored(document).unwrap();
        assert_eq!(user, converted);
    }

    #[test]
    fn test_workout_doc_conversion() {
        let mut workout = Workout::new(ObjectId::new().to_hex(), "u1".to_string());
        workout.start_time = Some(Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap());
        workout.append_exercise(WorkoutExercise {
            exercise_id: ObjectId::new().to_hex(),
            sets: vec![WorkoutSet {
                reps: 8,
                weight: 62.5,
                completed_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 18, 5, 0).unwrap()),
            }],
            rest_timer: RestTimer::default(),
            initial_resistance: None,
            note: Some("paused reps".to_string()),
        });

        let document = MongoDBStore::workout_document(&workout).unwrap();
        assert_eq!(document.get_str("userId").unwrap(), "u1");
        let entry = document.get_array("exercises").unwrap()[0]
            .as_document()
            .unwrap();
        assert!(entry.get_object_id("exerciseId").is_ok());
        assert!(document.get_datetime("startTime").is_ok());
        assert!(document.get("endTime").map_or(false, |v| *v == Bson::Null));
        let set = entry.get_array("sets").unwrap()[0].as_document().unwrap();
        assert!(set.get_datetime("completedAt").is_ok());

        let converted: Workout = MongoDBStore::from_stored(document).unwrap();
        assert_eq!(workout, converted);
    }

    #[test]
    fn test_user_with_object_id_references_loads() {
        let id = ObjectId::new();
        let workout_id = ObjectId::new();
        let document = doc! {
            "_id": id,
            "username": "alice",
            "password": "$argon2id$hash",
            "workouts": [workout_id],
            "__v": 0,
        };
        let user: User = MongoDBStore::from_stored(document).unwrap();
        assert_eq!(user.id, id.to_hex());
        assert_eq!(user.workouts, vec![workout_id.to_hex()]);
    }

    #[test]
    fn test_workout_with_object_id_references_loads() {
        let exercise_id = ObjectId::new();
        let document = doc! {
            "_id": ObjectId::new(),
            "userId": "65f000000000000000000001",
            "startTime": bson::DateTime::from_millis(1_709_316_000_000),
            "dynamicStretches": [],
            "exercises": [{
                "_id": ObjectId::new(),
                "exerciseId": exercise_id,
                "sets": [{
                    "_id": ObjectId::new(),
                    "reps": 5,
                    "weight": 100.0,
                    "completedAt": bson::DateTime::from_millis(1_709_316_300_000),
                }],
                "restTimer": { "enabled": true, "duration": 90 },
            }],
            "__v": 0,
        };
        let workout: Workout = MongoDBStore::from_stored(document).unwrap();
        assert_eq!(workout.exercises[0].exercise_id, exercise_id.to_hex());
        assert_eq!(workout.start_time, Some(Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap()));
        assert_eq!(
            workout.exercises[0].sets[0].completed_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 18, 5, 0).unwrap())
        );
        assert_eq!(workout.exercises[0].sets[0].reps, 5);
        assert_eq!(workout.exercises[0].rest_timer.duration, 90);
    }

    #[test]
    fn test_appended_entry_stores_object_id() {
        let exercise_id = ObjectId::new();
        let entry = MongoDBStore::exercise_entry(&WorkoutExercise {
            exercise_id: exercise_id.to_hex(),
            sets: vec![],
            rest_timer: RestTimer::default(),
            initial_resistance: None,
            note: None,
        })
        .unwrap();
        assert_eq!(
            entry.as_document().unwrap().get_object_id("exerciseId").unwrap(),
            exercise_id
        );
    }

    #[test]
    fn test_documents_written_by_other_clients_still_load() {
        // Extra keys such as a version counter are ignored.
        let document = doc! {
            "_id": ObjectId::new(),
            "name": { "simplified": "Chest", "english": "Pectoralis major", "latin": "Musculus pectoralis major" },
            "slug": "pectoralis-major",
            "__v": 0,
        };
        let muscle: Muscle = MongoDBStore::from_stored(document).unwrap();
        assert_eq!(muscle.slug, "pectoralis-major");
        assert_eq!(muscle.id.len(), 24);
    }

    #[test]
    fn test_invalid_id_is_rejected() {
        let user = User::new("nope".to_string(), "a".to_string(), "h".to_string());
        assert!(MongoDBStore::to_stored(&user).is_err());
    }

    #[test]
    fn test_workout_set_document_only_has_supplied_fields() {
        let exercise_id = ObjectId::new();
        let update = WorkoutUpdate {
            user_id: Some("u2".to_string()),
            exercises: Some(vec![WorkoutExercise {
                exercise_id: exercise_id.to_hex(),
                sets: vec![],
                rest_timer: RestTimer::default(),
                initial_resistance: None,
                note: None,
            }]),
            ..Default::default()
        };
        let set = MongoDBStore::workout_set_document(&update).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get_str("userId").unwrap(), "u2");
        let entry = set.get_array("exercises").unwrap()[0].as_document().unwrap();
        assert_eq!(entry.get_object_id("exerciseId").unwrap(), exercise_id);
        assert!(!set.contains_key("startTime"));
    }
}
