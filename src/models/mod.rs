pub mod claims;
pub mod exercise;
pub mod muscle;
pub mod user;
pub mod workout;

pub use claims::Claims;
pub use exercise::{Exercise, MuscleGroup, PersonalRecord};
pub use muscle::{Muscle, MuscleName};
pub use user::User;
pub use workout::{
    DynamicStretch, InitialResistance, RestTimer, Workout, WorkoutExercise, WorkoutSet,
    WorkoutUpdate,
};
