use serde::{Deserialize, Serialize};

/// Best lift recorded for an exercise. Zero until a record is set.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PersonalRecord {
    pub weight: f64,
    pub reps: u32,
}

/// Muscles worked, by muscle name.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct MuscleGroup {
    #[serde(default)]
    pub primary: Vec<String>,
    #[serde(default)]
    pub secondary: Vec<String>,
}

/// An entry in the exercise catalog.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub personal_record: PersonalRecord,
    #[serde(default)]
    pub muscles: MuscleGroup,
}

impl Exercise {
    pub fn new(id: String, name: String, description: String) -> Self {
        Exercise {
            id,
            name,
            description,
            personal_record: PersonalRecord::default(),
            muscles: MuscleGroup::default(),
        }
    }
}
