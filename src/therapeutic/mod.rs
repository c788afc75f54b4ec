pub mod specification;

pub use specification::{
    InterpolationMode, TherapeuticEfficacyConfig, TherapeuticEfficacySpecification,
    TimedEfficacy,
};
