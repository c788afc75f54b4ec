use std::{collections::HashMap, path::Path};

use ixa::{debug, IxaError};
use serde::{Deserialize, Serialize};

use crate::{
    efficacy_type::{CumulativeEfficacyType, EfficacyType},
    stage_conversion::{
        conditional_from_cumulative, error_message, fill_cumulative_defaults,
        validate_cumulative, CumulativeTable,
    },
    utils::{get_lower_index, linear_interpolation},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterpolationMode {
    /// Hold each breakpoint's value until the next breakpoint
    #[default]
    #[serde(alias = "STEP", alias = "step")]
    Step,
    #[serde(alias = "LINEAR", alias = "linear")]
    Linear,
}

/// Cumulative efficacies in effect from `time` (relative to the start of treatment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEfficacy {
    pub time: f64,
    #[serde(default)]
    pub efficacy: HashMap<CumulativeEfficacyType, f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TherapeuticEfficacyConfig {
    #[serde(default)]
    pub efficacies: Vec<TimedEfficacy>,
    #[serde(default)]
    pub interpolation: InterpolationMode,
}

/// Cumulative efficacy at each breakpoint, sorted by time.
#[derive(Debug, Clone, PartialEq)]
struct BreakpointCurves {
    times: Vec<f64>,
    values: CumulativeTable<Vec<f64>>,
}

impl BreakpointCurves {
    fn evaluate(
        &self,
        interpolation: InterpolationMode,
        efficacy_type: CumulativeEfficacyType,
        t: f64,
    ) -> f64 {
        let values = self.values.get(efficacy_type);
        let i = get_lower_index(&self.times, t);
        match interpolation {
            InterpolationMode::Step => values[i],
            InterpolationMode::Linear => {
                if t <= self.times[0] || i + 1 == self.times.len() {
                    values[i]
                } else {
                    linear_interpolation(
                        self.times[i],
                        self.times[i + 1],
                        values[i],
                        values[i + 1],
                        t,
                    )
                }
            }
        }
    }
}

/// Efficacy of a treatment as a function of time since it began. There is no age, dose, or
/// variant dependence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    try_from = "TherapeuticEfficacyConfig",
    into = "TherapeuticEfficacyConfig"
)]
pub struct TherapeuticEfficacySpecification {
    config: TherapeuticEfficacyConfig,
    // `None` when every supplied efficacy is zero
    curves: Option<BreakpointCurves>,
}

impl TryFrom<TherapeuticEfficacyConfig> for TherapeuticEfficacySpecification {
    type Error = IxaError;

    fn try_from(config: TherapeuticEfficacyConfig) -> Result<Self, Self::Error> {
        Self::new(config)
    }
}

impl From<TherapeuticEfficacySpecification> for TherapeuticEfficacyConfig {
    fn from(specification: TherapeuticEfficacySpecification) -> Self {
        specification.config
    }
}

// Treatment is inactive until it starts.
const ZERO_EFFICACY_TIMES: [f64; 2] = [-1.0, 0.0];

#[derive(Deserialize)]
struct TherapeuticEfficacyRecord {
    time: f64,
    efficacy_type: CumulativeEfficacyType,
    value: f64,
}

impl TherapeuticEfficacySpecification {
    /// # Errors
    /// - If a breakpoint time is not finite or appears more than once
    /// - If any efficacy is outside [0, 1]
    /// - If the cascade is broken at any breakpoint (e.g. SP < S)
    pub fn new(config: TherapeuticEfficacyConfig) -> Result<Self, IxaError> {
        let empty = HashMap::new();
        let mut breakpoints: Vec<(f64, &HashMap<CumulativeEfficacyType, f64>)> = config
            .efficacies
            .iter()
            .map(|entry| (entry.time, &entry.efficacy))
            .collect();
        if let Some((time, _)) = breakpoints.iter().find(|(time, _)| !time.is_finite()) {
            return Err(IxaError::IxaError(format!(
                "Therapeutic efficacy breakpoint times must be finite. Got {time}."
            )));
        }
        breakpoints.sort_by(|a, b| a.0.total_cmp(&b.0));
        #[allow(clippy::float_cmp)]
        if let Some(pair) = breakpoints.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(IxaError::IxaError(format!(
                "Therapeutic efficacy is specified more than once at time {}.",
                pair[0].0
            )));
        }

        #[allow(clippy::float_cmp)]
        if breakpoints
            .iter()
            .all(|(_, efficacy)| efficacy.values().all(|value| *value == 0.0))
        {
            debug!("Therapeutic efficacy is zero at every time");
            return Ok(Self {
                config,
                curves: None,
            });
        }

        for time in ZERO_EFFICACY_TIMES {
            #[allow(clippy::float_cmp)]
            if !breakpoints.iter().any(|(t, _)| *t == time) {
                breakpoints.push((time, &empty));
            }
        }
        breakpoints.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut tables = Vec::with_capacity(breakpoints.len());
        for (time, efficacy) in &breakpoints {
            let table = fill_cumulative_defaults(*efficacy);
            validate_cumulative(&table).map_err(|e| {
                IxaError::IxaError(format!(
                    "Therapeutic efficacy at time {time}: {}",
                    error_message(e)
                ))
            })?;
            tables.push(table);
        }
        let curves = BreakpointCurves {
            times: breakpoints.iter().map(|(time, _)| *time).collect(),
            values: CumulativeTable::from_fn(|efficacy_type| {
                tables
                    .iter()
                    .map(|table| *table.get(efficacy_type))
                    .collect()
            }),
        };
        debug!(
            "Built {:?} therapeutic efficacy curves over {} breakpoints",
            config.interpolation,
            curves.times.len()
        );
        Ok(Self {
            config,
            curves: Some(curves),
        })
    }

    /// Reads a long-format CSV with the columns `time`, `efficacy_type`, and `value`.
    /// # Errors
    /// - If the file cannot be read or a record cannot be parsed
    /// - If an efficacy type appears more than once at the same time
    /// - If the resulting specification is invalid
    pub fn from_csv(
        path: impl AsRef<Path>,
        interpolation: InterpolationMode,
    ) -> Result<Self, IxaError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut efficacies: Vec<TimedEfficacy> = Vec::new();
        for record in reader.deserialize::<TherapeuticEfficacyRecord>() {
            let record = record?;
            #[allow(clippy::float_cmp)]
            let position = efficacies.iter().position(|entry| entry.time == record.time);
            let entry = if let Some(i) = position {
                &mut efficacies[i]
            } else {
                efficacies.push(TimedEfficacy {
                    time: record.time,
                    efficacy: HashMap::new(),
                });
                let last = efficacies.len() - 1;
                &mut efficacies[last]
            };
            if entry
                .efficacy
                .insert(record.efficacy_type, record.value)
                .is_some()
            {
                return Err(IxaError::IxaError(format!(
                    "{} therapeutic efficacy is specified more than once at time {}.",
                    record.efficacy_type, record.time
                )));
            }
        }
        Self::new(TherapeuticEfficacyConfig {
            efficacies,
            interpolation,
        })
    }

    #[must_use]
    pub fn interpolation(&self) -> InterpolationMode {
        self.config.interpolation
    }

    /// True when the treatment never has any effect.
    #[must_use]
    pub fn efficacy_is_zero(&self) -> bool {
        self.curves.is_none()
    }

    #[must_use]
    pub fn get_cumulative_efficacy(
        &self,
        time_since_treatment: f64,
        efficacy_type: CumulativeEfficacyType,
    ) -> f64 {
        self.curves.as_ref().map_or(0.0, |curves| {
            curves.evaluate(self.config.interpolation, efficacy_type, time_since_treatment)
        })
    }

    #[must_use]
    pub fn get_efficacy(&self, time_since_treatment: f64, efficacy_type: EfficacyType) -> f64 {
        let Some(curves) = &self.curves else {
            return 0.0;
        };
        conditional_from_cumulative(efficacy_type, |cumulative_type| {
            curves.evaluate(self.config.interpolation, cumulative_type, time_since_treatment)
        })
    }

    /// Probability that an exposure still results in transmission when the treatment
    /// reduces both the source's infectiousness and the contact's susceptibility.
    #[must_use]
    pub fn probability_fails_to_prevent_transmission(&self, time_since_treatment: f64) -> f64 {
        (1.0 - self.get_efficacy(time_since_treatment, EfficacyType::I))
            * (1.0 - self.get_efficacy(time_since_treatment, EfficacyType::S))
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod test {
    use std::io::Write;

    use ixa::{assert_almost_eq, IxaError};
    use tempfile::NamedTempFile;

    use super::{
        InterpolationMode, TherapeuticEfficacyConfig, TherapeuticEfficacySpecification,
        TimedEfficacy,
    };
    use crate::efficacy_type::{CumulativeEfficacyType, EfficacyType};

    fn timed(time: f64, efficacy: &[(CumulativeEfficacyType, f64)]) -> TimedEfficacy {
        TimedEfficacy {
            time,
            efficacy: efficacy.iter().copied().collect(),
        }
    }

    fn specification(interpolation: InterpolationMode) -> TherapeuticEfficacySpecification {
        TherapeuticEfficacySpecification::new(TherapeuticEfficacyConfig {
            efficacies: vec![
                timed(5.0, &[(CumulativeEfficacyType::S, 0.2)]),
                timed(
                    2.0,
                    &[
                        (CumulativeEfficacyType::S, 0.5),
                        (CumulativeEfficacyType::SP, 0.8),
                        (CumulativeEfficacyType::I, 0.4),
                    ],
                ),
            ],
            interpolation,
        })
        .unwrap()
    }

    #[test]
    fn test_all_zero_efficacy() {
        let zero = TherapeuticEfficacySpecification::new(TherapeuticEfficacyConfig {
            efficacies: vec![
                timed(2.0, &[(CumulativeEfficacyType::S, 0.0)]),
                timed(5.0, &[(CumulativeEfficacyType::SPD, 0.0)]),
            ],
            interpolation: InterpolationMode::Linear,
        })
        .unwrap();
        assert!(zero.efficacy_is_zero());
        assert!(TherapeuticEfficacySpecification::default().efficacy_is_zero());
        for time in [-10.0, 0.0, 2.0, 3.5, 100.0] {
            for efficacy_type in EfficacyType::ALL {
                assert_eq!(zero.get_efficacy(time, efficacy_type), 0.0);
            }
            assert_eq!(zero.probability_fails_to_prevent_transmission(time), 1.0);
        }
    }

    #[test]
    fn test_step_interpolation() {
        let therapeutic = specification(InterpolationMode::Step);
        assert!(!therapeutic.efficacy_is_zero());
        assert_eq!(therapeutic.get_efficacy(-5.0, EfficacyType::S), 0.0);
        assert_eq!(therapeutic.get_efficacy(1.0, EfficacyType::S), 0.0);
        assert_eq!(therapeutic.get_efficacy(2.0, EfficacyType::S), 0.5);
        assert_eq!(therapeutic.get_efficacy(4.9, EfficacyType::S), 0.5);
        assert_almost_eq!(therapeutic.get_efficacy(3.0, EfficacyType::P), 0.6, 1e-12);
        assert_eq!(therapeutic.get_efficacy(3.0, EfficacyType::H), 0.0);
        // Unspecified dimensions copy the stage below them, so P is zero here.
        assert_eq!(therapeutic.get_efficacy(5.0, EfficacyType::S), 0.2);
        assert_eq!(therapeutic.get_efficacy(5.0, EfficacyType::P), 0.0);
        assert_eq!(therapeutic.get_efficacy(100.0, EfficacyType::S), 0.2);
        assert_eq!(
            therapeutic.get_cumulative_efficacy(100.0, CumulativeEfficacyType::SPD),
            0.2
        );
    }

    #[test]
    fn test_linear_interpolation() {
        let therapeutic = specification(InterpolationMode::Linear);
        assert_eq!(therapeutic.get_efficacy(-5.0, EfficacyType::S), 0.0);
        assert_almost_eq!(therapeutic.get_efficacy(1.0, EfficacyType::S), 0.25, 1e-12);
        assert_almost_eq!(
            therapeutic.get_cumulative_efficacy(1.0, CumulativeEfficacyType::SP),
            0.4,
            1e-12
        );
        assert_almost_eq!(therapeutic.get_efficacy(1.0, EfficacyType::P), 0.2, 1e-12);
        assert_almost_eq!(therapeutic.get_efficacy(3.5, EfficacyType::S), 0.35, 1e-12);
        assert_almost_eq!(
            therapeutic.get_efficacy(3.5, EfficacyType::P),
            1.0 - 0.5 / 0.65,
            1e-12
        );
        // Values are held past the last breakpoint.
        assert_eq!(therapeutic.get_efficacy(10.0, EfficacyType::S), 0.2);
    }

    #[test]
    fn test_explicit_start_value_replaces_anchor() {
        let therapeutic = TherapeuticEfficacySpecification::new(TherapeuticEfficacyConfig {
            efficacies: vec![timed(0.0, &[(CumulativeEfficacyType::S, 0.5)])],
            interpolation: InterpolationMode::Step,
        })
        .unwrap();
        assert_eq!(therapeutic.get_efficacy(-0.5, EfficacyType::S), 0.0);
        assert_eq!(therapeutic.get_efficacy(0.0, EfficacyType::S), 0.5);
        assert_eq!(therapeutic.get_efficacy(7.0, EfficacyType::S), 0.5);
    }

    #[test]
    fn test_transmission_failure_probability() {
        let therapeutic = specification(InterpolationMode::Step);
        assert_almost_eq!(
            therapeutic.probability_fails_to_prevent_transmission(3.0),
            (1.0 - 0.4) * (1.0 - 0.5),
            1e-12
        );
        assert_eq!(therapeutic.probability_fails_to_prevent_transmission(-1.0), 1.0);
    }

    #[test]
    fn test_impossible_cascade_is_rejected() {
        let e = TherapeuticEfficacySpecification::new(TherapeuticEfficacyConfig {
            efficacies: vec![timed(
                2.0,
                &[
                    (CumulativeEfficacyType::S, 0.5),
                    (CumulativeEfficacyType::SP, 0.4),
                ],
            )],
            interpolation: InterpolationMode::Linear,
        })
        .err();
        match e {
            Some(IxaError::IxaError(msg)) => {
                assert_eq!(
                    msg,
                    "Therapeutic efficacy at time 2: P efficacy implied by SP and S is impossible."
                        .to_string()
                );
            }
            Some(ue) => panic!(
                "Expected an error that SP < S is impossible. Instead got {:?}",
                ue.to_string()
            ),
            None => panic!("Expected an error. Instead, validation passed with no errors."),
        }
    }

    #[test]
    fn test_invalid_breakpoints_are_rejected() {
        let duplicate = TherapeuticEfficacySpecification::new(TherapeuticEfficacyConfig {
            efficacies: vec![
                timed(2.0, &[(CumulativeEfficacyType::S, 0.5)]),
                timed(2.0, &[(CumulativeEfficacyType::S, 0.6)]),
            ],
            interpolation: InterpolationMode::Step,
        })
        .err();
        match duplicate {
            Some(IxaError::IxaError(msg)) => {
                assert_eq!(
                    msg,
                    "Therapeutic efficacy is specified more than once at time 2.".to_string()
                );
            }
            Some(ue) => panic!(
                "Expected an error about a duplicate breakpoint. Instead got {:?}",
                ue.to_string()
            ),
            None => panic!("Expected an error. Instead, validation passed with no errors."),
        }

        let not_finite = TherapeuticEfficacySpecification::new(TherapeuticEfficacyConfig {
            efficacies: vec![timed(f64::NAN, &[(CumulativeEfficacyType::S, 0.5)])],
            interpolation: InterpolationMode::Step,
        });
        assert!(not_finite.is_err());

        let out_of_range = TherapeuticEfficacySpecification::new(TherapeuticEfficacyConfig {
            efficacies: vec![timed(1.0, &[(CumulativeEfficacyType::I, 1.5)])],
            interpolation: InterpolationMode::Step,
        });
        assert!(out_of_range.is_err());
    }

    #[test]
    fn test_from_csv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "time,efficacy_type,value").unwrap();
        writeln!(file, "2.0,TE_S,0.5").unwrap();
        writeln!(file, "2.0,TE_SP,0.8").unwrap();
        writeln!(file, "5.0,S,0.2").unwrap();
        file.flush().unwrap();

        let therapeutic =
            TherapeuticEfficacySpecification::from_csv(file.path(), InterpolationMode::Linear)
                .unwrap();
        assert_eq!(therapeutic.interpolation(), InterpolationMode::Linear);
        assert_almost_eq!(therapeutic.get_efficacy(1.0, EfficacyType::S), 0.25, 1e-12);
        assert_almost_eq!(therapeutic.get_efficacy(2.0, EfficacyType::P), 0.6, 1e-12);
        assert_eq!(therapeutic.get_efficacy(6.0, EfficacyType::S), 0.2);
    }

    #[test]
    fn test_from_csv_rejects_repeated_dimension() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "time,efficacy_type,value").unwrap();
        writeln!(file, "2.0,S,0.5").unwrap();
        writeln!(file, "2.0,S,0.6").unwrap();
        file.flush().unwrap();

        let e = TherapeuticEfficacySpecification::from_csv(file.path(), InterpolationMode::Step)
            .err();
        match e {
            Some(IxaError::IxaError(msg)) => {
                assert_eq!(
                    msg,
                    "S therapeutic efficacy is specified more than once at time 2.".to_string()
                );
            }
            Some(ue) => panic!(
                "Expected an error about a repeated efficacy type. Instead got {:?}",
                ue.to_string()
            ),
            None => panic!("Expected an error. Instead, loading passed with no errors."),
        }
    }

    #[test]
    fn test_deserialize_specification() {
        let therapeutic: TherapeuticEfficacySpecification = serde_json::from_str(
            r#"{
                "interpolation": "Linear",
                "efficacies": [
                    {"time": 2.0, "efficacy": {"TE_S": 0.5, "TE_SP": 0.8}},
                    {"time": 5.0, "efficacy": {"TE_S": 0.2}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(therapeutic.interpolation(), InterpolationMode::Linear);
        assert_almost_eq!(therapeutic.get_efficacy(3.5, EfficacyType::S), 0.35, 1e-12);

        let empty: TherapeuticEfficacySpecification = serde_json::from_str("{}").unwrap();
        assert!(empty.efficacy_is_zero());
        assert_eq!(empty, TherapeuticEfficacySpecification::default());

        let invalid = serde_json::from_str::<TherapeuticEfficacySpecification>(
            r#"{"efficacies": [{"time": 1.0, "efficacy": {"S": 0.9, "SP": 0.1}}]}"#,
        );
        assert!(invalid.is_err());
    }
}
