use std::{
    collections::{BTreeSet, HashMap},
    fmt::{Display, Formatter},
};

use ixa::{debug, IxaError};
use serde::{Deserialize, Serialize};

use crate::{
    efficacy_curve::EfficacyCurve,
    efficacy_type::{CumulativeEfficacyType, EfficacyType},
    identifiers::{AgeGroup, VaccineId, VariantId},
    stage_conversion::{
        error_message, fill_cumulative_defaults, fill_multiplier_defaults, to_conditional,
        validate_cumulative, CumulativeTable, EfficacyTable,
    },
    weights::AgeWeights,
};

pub type EfficacyMap = HashMap<CumulativeEfficacyType, AgeWeights>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DoseType {
    #[default]
    #[serde(alias = "ONE_DOSE")]
    OneDose,
    #[serde(alias = "TWO_DOSE")]
    TwoDose,
}

impl Display for DoseType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DoseType::OneDose => write!(f, "one-dose"),
            DoseType::TwoDose => write!(f, "two-dose"),
        }
    }
}

/// A vaccine regimen as it appears in configuration files.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VaccineDefinitionConfig {
    pub id: VaccineId,
    #[serde(default, alias = "type")]
    pub dose_type: DoseType,
    #[serde(default)]
    pub first_dose_efficacy_function: EfficacyCurve,
    /// Only used by two-dose regimens
    #[serde(default)]
    pub second_dose_efficacy_function: EfficacyCurve,
    /// Time between the first and second dose; only used by two-dose regimens
    #[serde(default)]
    pub second_dose_delay: f64,
    /// Cumulative efficacy of the complete regimen against the reference variant
    #[serde(default)]
    pub efficacy: EfficacyMap,
    /// Multiplier on `efficacy` for someone who has received only the first dose of a
    /// two-dose regimen
    #[serde(default)]
    pub first_dose_relative_efficacy: EfficacyMap,
    /// Multiplier on `efficacy` against each variant
    #[serde(default)]
    pub variant_relative_efficacy: HashMap<VariantId, EfficacyMap>,
    /// Further multiplier for a single dose against each variant, on top of both
    /// `variant_relative_efficacy` and `first_dose_relative_efficacy`
    #[serde(default)]
    pub variant_first_dose_relative_efficacy: HashMap<VariantId, EfficacyMap>,
}

#[derive(Debug, Clone, PartialEq)]
struct EfficacyTables {
    cumulative: CumulativeTable<AgeWeights>,
    conditional: EfficacyTable<AgeWeights>,
}

/// Peak efficacies after the final dose and after the first dose alone.
#[derive(Debug, Clone, PartialEq)]
struct DoseTables {
    final_dose: EfficacyTables,
    first_dose: EfficacyTables,
}

/// A validated vaccine regimen. Every efficacy table a query can need is derived once at
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VaccineDefinitionConfig", into = "VaccineDefinitionConfig")]
pub struct VaccineDefinition {
    config: VaccineDefinitionConfig,
    base: DoseTables,
    variants: HashMap<VariantId, DoseTables>,
}

impl TryFrom<VaccineDefinitionConfig> for VaccineDefinition {
    type Error = IxaError;

    fn try_from(config: VaccineDefinitionConfig) -> Result<Self, Self::Error> {
        Self::new(config)
    }
}

impl From<VaccineDefinition> for VaccineDefinitionConfig {
    fn from(definition: VaccineDefinition) -> Self {
        definition.config
    }
}

fn efficacy_tables(
    cumulative: CumulativeTable<AgeWeights>,
    description: &str,
) -> Result<EfficacyTables, IxaError> {
    let in_context =
        |e: IxaError| IxaError::IxaError(format!("{description}: {}", error_message(e)));
    validate_cumulative(&cumulative).map_err(in_context)?;
    let conditional = to_conditional(&cumulative).map_err(in_context)?;
    Ok(EfficacyTables {
        cumulative,
        conditional,
    })
}

fn multiply_tables(
    a: &CumulativeTable<AgeWeights>,
    b: &CumulativeTable<AgeWeights>,
) -> CumulativeTable<AgeWeights> {
    a.zip_with(b, AgeWeights::multiply)
}

fn multipliers(supplied: Option<&EfficacyMap>) -> CumulativeTable<AgeWeights> {
    supplied.map_or_else(
        || CumulativeTable::from_fn(|_| AgeWeights::constant(1.0)),
        fill_multiplier_defaults,
    )
}

impl VaccineDefinition {
    /// Fills in unspecified efficacy dimensions, checks that every derived table is
    /// consistent, and converts each into conditional efficacies.
    /// # Errors
    /// - If the second dose delay is negative
    /// - If any base, first-dose, or variant efficacy is outside [0, 1]
    /// - If any table implies an impossible conditional efficacy (e.g. SP < S)
    pub fn new(config: VaccineDefinitionConfig) -> Result<Self, IxaError> {
        if config.second_dose_delay.is_nan() || config.second_dose_delay < 0.0 {
            return Err(IxaError::IxaError(format!(
                "Vaccine {}: the second dose delay must be non-negative.",
                config.id
            )));
        }
        let base_efficacy = fill_cumulative_defaults(&config.efficacy);
        let first_dose_multipliers = multipliers(Some(&config.first_dose_relative_efficacy));
        let base = DoseTables {
            final_dose: efficacy_tables(
                base_efficacy.clone(),
                &format!("Vaccine {} efficacy", config.id),
            )?,
            first_dose: efficacy_tables(
                multiply_tables(&base_efficacy, &first_dose_multipliers),
                &format!("Vaccine {} first dose efficacy", config.id),
            )?,
        };

        let variant_ids: BTreeSet<&VariantId> = config
            .variant_relative_efficacy
            .keys()
            .chain(config.variant_first_dose_relative_efficacy.keys())
            .collect();
        let mut variants = HashMap::new();
        for variant_id in variant_ids {
            let variant_efficacy = multiply_tables(
                &multipliers(config.variant_relative_efficacy.get(variant_id)),
                &base_efficacy,
            );
            let variant_first_dose_efficacy = multiply_tables(
                &multiply_tables(
                    &variant_efficacy,
                    &multipliers(config.variant_first_dose_relative_efficacy.get(variant_id)),
                ),
                &first_dose_multipliers,
            );
            let tables = DoseTables {
                final_dose: efficacy_tables(
                    variant_efficacy,
                    &format!("Vaccine {} efficacy against {variant_id}", config.id),
                )?,
                first_dose: efficacy_tables(
                    variant_first_dose_efficacy,
                    &format!(
                        "Vaccine {} first dose efficacy against {variant_id}",
                        config.id
                    ),
                )?,
            };
            variants.insert(variant_id.clone(), tables);
        }

        debug!(
            "Built {} vaccine definition {} with {} variant-specific efficacy tables",
            config.dose_type,
            config.id,
            variants.len()
        );
        Ok(Self {
            config,
            base,
            variants,
        })
    }

    #[must_use]
    pub fn id(&self) -> &VaccineId {
        &self.config.id
    }

    #[must_use]
    pub fn dose_type(&self) -> DoseType {
        self.config.dose_type
    }

    #[must_use]
    pub fn doses_per_regimen(&self) -> u32 {
        match self.config.dose_type {
            DoseType::OneDose => 1,
            DoseType::TwoDose => 2,
        }
    }

    #[must_use]
    pub fn second_dose_delay(&self) -> f64 {
        self.config.second_dose_delay
    }

    fn dose_tables(&self, variant_id: &VariantId) -> &DoseTables {
        self.variants.get(variant_id).unwrap_or(&self.base)
    }

    /// Conditional efficacy at its peak after the complete regimen.
    #[must_use]
    pub fn peak_efficacy(
        &self,
        efficacy_type: EfficacyType,
        variant_id: &VariantId,
        age_group: &AgeGroup,
    ) -> f64 {
        self.dose_tables(variant_id)
            .final_dose
            .conditional
            .get(efficacy_type)
            .get(age_group)
    }

    /// Conditional efficacy against `variant_id` for a person in `age_group` who has received
    /// `doses` doses, the last of them `time_since_last_dose` ago.
    /// # Errors
    /// - If `doses` exceeds the number of doses in the regimen
    pub fn get_efficacy(
        &self,
        efficacy_type: EfficacyType,
        doses: u32,
        time_since_last_dose: f64,
        variant_id: &VariantId,
        age_group: &AgeGroup,
    ) -> Result<f64, IxaError> {
        if doses == 0 {
            return Ok(0.0);
        }
        let tables = self.dose_tables(variant_id);
        self.efficacy_over_time(
            efficacy_type.cumulative(),
            doses,
            time_since_last_dose,
            age_group,
            tables.final_dose.conditional.get(efficacy_type).get(age_group),
            tables.first_dose.conditional.get(efficacy_type).get(age_group),
        )
    }

    /// Overall efficacy through a stage of the cascade, with the same dose and waning
    /// behavior as `get_efficacy`.
    /// # Errors
    /// - If `doses` exceeds the number of doses in the regimen
    pub fn get_cumulative_efficacy(
        &self,
        efficacy_type: CumulativeEfficacyType,
        doses: u32,
        time_since_last_dose: f64,
        variant_id: &VariantId,
        age_group: &AgeGroup,
    ) -> Result<f64, IxaError> {
        if doses == 0 {
            return Ok(0.0);
        }
        let tables = self.dose_tables(variant_id);
        self.efficacy_over_time(
            efficacy_type,
            doses,
            time_since_last_dose,
            age_group,
            tables.final_dose.cumulative.get(efficacy_type).get(age_group),
            tables.first_dose.cumulative.get(efficacy_type).get(age_group),
        )
    }

    fn efficacy_over_time(
        &self,
        curve_type: CumulativeEfficacyType,
        doses: u32,
        t: f64,
        age_group: &AgeGroup,
        final_dose_peak: f64,
        first_dose_peak: f64,
    ) -> Result<f64, IxaError> {
        let first_dose_curve = &self.config.first_dose_efficacy_function;
        match (self.config.dose_type, doses) {
            (_, 0) => Ok(0.0),
            (DoseType::OneDose, 1) => {
                Ok(final_dose_peak * first_dose_curve.value(curve_type, age_group, t))
            }
            (DoseType::TwoDose, 1) => {
                Ok(first_dose_peak * first_dose_curve.value(curve_type, age_group, t))
            }
            (DoseType::TwoDose, 2) => {
                // Protection from the first dose at the moment the second is given
                let anchor = first_dose_peak
                    * first_dose_curve.value(curve_type, age_group, self.config.second_dose_delay);
                let second_dose_curve = &self.config.second_dose_efficacy_function;
                if final_dose_peak > 0.0 {
                    Ok(final_dose_peak
                        * second_dose_curve.value_from(
                            curve_type,
                            age_group,
                            t,
                            anchor / final_dose_peak,
                        ))
                } else {
                    // Linear transition from the first dose protection down to zero over
                    // the second curve's ramp window.
                    let initial_delay = second_dose_curve.initial_delay(age_group);
                    let peak_time = second_dose_curve.peak_time(age_group);
                    if t < initial_delay {
                        Ok(anchor)
                    } else if t < peak_time {
                        Ok(anchor * (peak_time - t) / (peak_time - initial_delay))
                    } else {
                        Ok(0.0)
                    }
                }
            }
            (dose_type, doses) => Err(IxaError::IxaError(format!(
                "Unsupported number of doses ({doses}) for {dose_type} vaccine {}.",
                self.config.id
            ))),
        }
    }
}
