use ixa::{Context, IxaError};

use crate::{
    efficacy_type::EfficacyType,
    identifiers::{AgeGroup, VaccineId, VariantId},
    parameters::ContextParametersExt,
    vaccine::VaccineDefinition,
};

/// Efficacy queries against the regimens and treatment loaded into the global parameters.
/// Times are absolute simulation times; elapsed times are measured from the context's
/// current time.
pub trait ContextEfficacyExt {
    /// # Errors
    /// - If no vaccine with `vaccine_id` was loaded
    fn get_vaccine_definition(&self, vaccine_id: &VaccineId)
        -> Result<&VaccineDefinition, IxaError>;

    /// Conditional efficacy of `vaccine_id` now for a person whose most recent of `doses`
    /// doses was given at `last_dose_time`.
    /// # Errors
    /// - If no vaccine with `vaccine_id` was loaded
    /// - If `doses` exceeds the number of doses in the regimen
    fn get_vaccine_efficacy(
        &self,
        vaccine_id: &VaccineId,
        efficacy_type: EfficacyType,
        doses: u32,
        last_dose_time: f64,
        variant_id: &VariantId,
        age_group: &AgeGroup,
    ) -> Result<f64, IxaError>;

    /// Conditional efficacy now of a treatment that began at `treatment_start`.
    fn get_therapeutic_efficacy(&self, efficacy_type: EfficacyType, treatment_start: f64) -> f64;

    fn get_probability_therapeutic_fails_to_prevent_transmission(
        &self,
        treatment_start: f64,
    ) -> f64;
}

impl ContextEfficacyExt for Context {
    fn get_vaccine_definition(
        &self,
        vaccine_id: &VaccineId,
    ) -> Result<&VaccineDefinition, IxaError> {
        self.get_params()
            .vaccines
            .iter()
            .find(|vaccine| vaccine.id() == vaccine_id)
            .ok_or_else(|| {
                IxaError::IxaError(format!("No vaccine is defined with id {vaccine_id}."))
            })
    }

    fn get_vaccine_efficacy(
        &self,
        vaccine_id: &VaccineId,
        efficacy_type: EfficacyType,
        doses: u32,
        last_dose_time: f64,
        variant_id: &VariantId,
        age_group: &AgeGroup,
    ) -> Result<f64, IxaError> {
        self.get_vaccine_definition(vaccine_id)?.get_efficacy(
            efficacy_type,
            doses,
            self.get_current_time() - last_dose_time,
            variant_id,
            age_group,
        )
    }

    fn get_therapeutic_efficacy(&self, efficacy_type: EfficacyType, treatment_start: f64) -> f64 {
        self.get_params()
            .therapeutic_efficacy
            .get_efficacy(self.get_current_time() - treatment_start, efficacy_type)
    }

    fn get_probability_therapeutic_fails_to_prevent_transmission(
        &self,
        treatment_start: f64,
    ) -> f64 {
        self.get_params()
            .therapeutic_efficacy
            .probability_fails_to_prevent_transmission(self.get_current_time() - treatment_start)
    }
}
