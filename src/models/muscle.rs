use serde::{Deserialize, Serialize};

/// A muscle name in the three locales the catalog carries.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct MuscleName {
    pub simplified: String,
    pub english: String,
    pub latin: String,
}

/// Read-only muscle reference data.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Muscle {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: MuscleName,
    pub slug: String,
}
