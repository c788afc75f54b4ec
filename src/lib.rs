// Re-export commonly used types at the crate root
pub use efficacy_manager::ContextEfficacyExt;
pub use efficacy_type::{CumulativeEfficacyType, EfficacyType};
pub use identifiers::{AgeGroup, VaccineId, VariantId};
pub use parameters::{ContextParametersExt, Params};
pub use therapeutic::{InterpolationMode, TherapeuticEfficacySpecification};
pub use vaccine::{DoseType, VaccineDefinition};
pub use weights::{AgeWeights, Weights};
// Module declarations
pub mod efficacy_curve;
pub mod efficacy_manager;
pub mod efficacy_type;
pub mod identifiers;
pub mod parameters;
pub mod stage_conversion;
pub mod therapeutic;
pub mod utils;
pub mod vaccine;
pub mod weights;

// Re-export common macros
pub use ixa::assert_almost_eq;
