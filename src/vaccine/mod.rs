pub mod definition;

pub use definition::{DoseType, EfficacyMap, VaccineDefinition, VaccineDefinitionConfig};
