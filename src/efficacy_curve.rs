use std::collections::HashMap;

use ixa::IxaError;
use serde::{Deserialize, Serialize};

use crate::{
    efficacy_type::CumulativeEfficacyType,
    identifiers::AgeGroup,
    stage_conversion::CumulativeTable,
    weights::AgeWeights,
};

fn zero() -> AgeWeights {
    AgeWeights::constant(0.0)
}

fn infinite() -> AgeWeights {
    AgeWeights::constant(f64::INFINITY)
}

/// The parameters of an efficacy time course, as they appear in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficacyCurveConfig {
    /// Time after the dose before protection starts to build
    #[serde(default = "zero")]
    pub initial_delay: AgeWeights,
    /// Time after the dose at which protection reaches its peak
    #[serde(default = "zero")]
    pub peak_time: AgeWeights,
    /// How long protection stays at its peak before waning
    #[serde(default = "infinite")]
    pub peak_duration: AgeWeights,
    /// Half-life of waning after the peak; dimensions that are not listed do not wane
    #[serde(default)]
    pub after_peak_half_life: HashMap<CumulativeEfficacyType, AgeWeights>,
}

impl Default for EfficacyCurveConfig {
    fn default() -> Self {
        Self {
            initial_delay: zero(),
            peak_time: zero(),
            peak_duration: infinite(),
            after_peak_half_life: HashMap::new(),
        }
    }
}

/// Relative protection (between the starting value and 1.0) as a function of the time
/// since a dose: a delay, a linear ramp to the peak, a plateau, then exponential waning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EfficacyCurveConfig", into = "EfficacyCurveConfig")]
pub struct EfficacyCurve {
    config: EfficacyCurveConfig,
    decay_rate: CumulativeTable<AgeWeights>,
}

impl Default for EfficacyCurve {
    fn default() -> Self {
        Self::build(EfficacyCurveConfig::default())
    }
}

impl TryFrom<EfficacyCurveConfig> for EfficacyCurve {
    type Error = IxaError;

    fn try_from(config: EfficacyCurveConfig) -> Result<Self, Self::Error> {
        Self::new(config)
    }
}

impl From<EfficacyCurve> for EfficacyCurveConfig {
    fn from(curve: EfficacyCurve) -> Self {
        curve.config
    }
}

fn validate_config(config: &EfficacyCurveConfig) -> Result<(), IxaError> {
    let zero = zero();
    if !config.initial_delay.greater_or_equal(&zero) {
        return Err(IxaError::IxaError(
            "The initial delay must be non-negative.".to_string(),
        ));
    }
    if !config.peak_time.greater_or_equal(&config.initial_delay) {
        return Err(IxaError::IxaError(
            "The peak time must not be earlier than the initial delay.".to_string(),
        ));
    }
    if !config.peak_duration.greater_or_equal(&zero) {
        return Err(IxaError::IxaError(
            "The peak duration must be non-negative.".to_string(),
        ));
    }
    for (efficacy_type, half_life) in &config.after_peak_half_life {
        if half_life.all_values().any(|x| x.is_nan() || x <= 0.0) {
            return Err(IxaError::IxaError(format!(
                "The after-peak half-life for {efficacy_type} must be positive."
            )));
        }
    }
    Ok(())
}

impl EfficacyCurve {
    /// # Errors
    /// - If the initial delay or peak duration is negative
    /// - If the peak time precedes the initial delay for any age group
    /// - If any half-life is not positive
    pub fn new(config: EfficacyCurveConfig) -> Result<Self, IxaError> {
        validate_config(&config)?;
        Ok(Self::build(config))
    }

    fn build(config: EfficacyCurveConfig) -> Self {
        // An infinite half-life becomes a decay rate of zero.
        let decay_rate = CumulativeTable::from_fn(|efficacy_type| {
            config
                .after_peak_half_life
                .get(&efficacy_type)
                .map_or_else(infinite, Clone::clone)
                .transform(|half_life| std::f64::consts::LN_2 / half_life)
        });
        Self { config, decay_rate }
    }

    #[must_use]
    pub fn initial_delay(&self, age_group: &AgeGroup) -> f64 {
        self.config.initial_delay.get(age_group)
    }

    #[must_use]
    pub fn peak_time(&self, age_group: &AgeGroup) -> f64 {
        self.config.peak_time.get(age_group)
    }

    #[must_use]
    pub fn value(
        &self,
        efficacy_type: CumulativeEfficacyType,
        age_group: &AgeGroup,
        t: f64,
    ) -> f64 {
        self.value_from(efficacy_type, age_group, t, 0.0)
    }

    /// Starts at `initial_value` and stays there for the initial delay, grows linearly to
    /// 1.0 at the peak time, holds for the peak duration, then decays exponentially.
    #[must_use]
    pub fn value_from(
        &self,
        efficacy_type: CumulativeEfficacyType,
        age_group: &AgeGroup,
        t: f64,
        initial_value: f64,
    ) -> f64 {
        let initial_delay = self.config.initial_delay.get(age_group);
        let peak_time = self.config.peak_time.get(age_group);
        let peak_end = peak_time + self.config.peak_duration.get(age_group);
        if t < initial_delay {
            initial_value
        } else if t < peak_time {
            // Unreachable when `peak_time == initial_delay`, so the denominator is non-zero.
            initial_value
                + (1.0 - initial_value) * (t - initial_delay) / (peak_time - initial_delay)
        } else if t < peak_end {
            1.0
        } else {
            (-self.decay_rate.get(efficacy_type).get(age_group) * (t - peak_end)).exp()
        }
    }
}
