use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use ixa::IxaError;
use serde::{Deserialize, Serialize};

/// Stage-conditional efficacy: the reduction applied at a single transition of the
/// exposure -> infection -> symptoms -> hospitalization -> death cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EfficacyType {
    /// Against infection
    #[serde(alias = "VE_S", alias = "TE_S")]
    S,
    /// Against onward transmission
    #[serde(alias = "VE_I", alias = "TE_I")]
    I,
    /// Against symptoms conditional on infection
    #[serde(alias = "VE_P", alias = "TE_P")]
    P,
    /// Against hospitalization conditional on symptoms
    #[serde(alias = "VE_H", alias = "TE_H")]
    H,
    /// Against death conditional on hospitalization
    #[serde(alias = "VE_D", alias = "TE_D")]
    D,
}

/// Cumulative (overall) efficacy as measured in trials: protection against reaching a
/// stage of the cascade starting from exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CumulativeEfficacyType {
    /// Against infection
    #[serde(alias = "VE_S", alias = "TE_S")]
    S,
    /// Against onward transmission
    #[serde(alias = "VE_I", alias = "TE_I")]
    I,
    /// Overall against symptomatic infection
    #[serde(alias = "VE_SP", alias = "TE_SP")]
    SP,
    /// Overall against hospitalization
    #[serde(alias = "VE_SPH", alias = "TE_SPH")]
    SPH,
    /// Overall against death
    #[serde(alias = "VE_SPD", alias = "TE_SPD")]
    SPD,
}

impl EfficacyType {
    pub const ALL: [EfficacyType; 5] = [
        EfficacyType::S,
        EfficacyType::I,
        EfficacyType::P,
        EfficacyType::H,
        EfficacyType::D,
    ];

    /// The cumulative dimension this stage ends at, and the cumulative dimension of the
    /// stage before it when the stage is conditional on an earlier one.
    #[must_use]
    pub fn cascade(self) -> (CumulativeEfficacyType, Option<CumulativeEfficacyType>) {
        match self {
            EfficacyType::S => (CumulativeEfficacyType::S, None),
            EfficacyType::I => (CumulativeEfficacyType::I, None),
            EfficacyType::P => (CumulativeEfficacyType::SP, Some(CumulativeEfficacyType::S)),
            EfficacyType::H => (
                CumulativeEfficacyType::SPH,
                Some(CumulativeEfficacyType::SP),
            ),
            EfficacyType::D => (
                CumulativeEfficacyType::SPD,
                Some(CumulativeEfficacyType::SPH),
            ),
        }
    }

    /// The cumulative dimension whose time course drives this conditional dimension.
    #[must_use]
    pub fn cumulative(self) -> CumulativeEfficacyType {
        self.cascade().0
    }
}

impl CumulativeEfficacyType {
    pub const ALL: [CumulativeEfficacyType; 5] = [
        CumulativeEfficacyType::S,
        CumulativeEfficacyType::I,
        CumulativeEfficacyType::SP,
        CumulativeEfficacyType::SPH,
        CumulativeEfficacyType::SPD,
    ];

    /// The dimension whose value is copied in when this one is not supplied. `S` and `I`
    /// have no lower stage and default to zero.
    #[must_use]
    pub fn lower_stage(self) -> Option<CumulativeEfficacyType> {
        match self {
            CumulativeEfficacyType::S | CumulativeEfficacyType::I => None,
            CumulativeEfficacyType::SP => Some(CumulativeEfficacyType::S),
            CumulativeEfficacyType::SPH => Some(CumulativeEfficacyType::SP),
            CumulativeEfficacyType::SPD => Some(CumulativeEfficacyType::SPH),
        }
    }
}

impl Display for EfficacyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EfficacyType::S => write!(f, "S"),
            EfficacyType::I => write!(f, "I"),
            EfficacyType::P => write!(f, "P"),
            EfficacyType::H => write!(f, "H"),
            EfficacyType::D => write!(f, "D"),
        }
    }
}

impl Display for CumulativeEfficacyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CumulativeEfficacyType::S => write!(f, "S"),
            CumulativeEfficacyType::I => write!(f, "I"),
            CumulativeEfficacyType::SP => write!(f, "SP"),
            CumulativeEfficacyType::SPH => write!(f, "SPH"),
            CumulativeEfficacyType::SPD => write!(f, "SPD"),
        }
    }
}

// Configuration files prefix the codes with the intervention kind (`VE_SP`, `TE_SP`).
fn strip_intervention_prefix(s: &str) -> &str {
    s.strip_prefix("VE_")
        .or_else(|| s.strip_prefix("TE_"))
        .unwrap_or(s)
}

impl FromStr for EfficacyType {
    type Err = IxaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match strip_intervention_prefix(s.trim()) {
            "S" => Ok(EfficacyType::S),
            "I" => Ok(EfficacyType::I),
            "P" => Ok(EfficacyType::P),
            "H" => Ok(EfficacyType::H),
            "D" => Ok(EfficacyType::D),
            _ => Err(IxaError::IxaError(format!(
                "Unrecognized efficacy type `{s}`."
            ))),
        }
    }
}

impl FromStr for CumulativeEfficacyType {
    type Err = IxaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match strip_intervention_prefix(s.trim()) {
            "S" => Ok(CumulativeEfficacyType::S),
            "I" => Ok(CumulativeEfficacyType::I),
            "SP" => Ok(CumulativeEfficacyType::SP),
            "SPH" => Ok(CumulativeEfficacyType::SPH),
            "SPD" => Ok(CumulativeEfficacyType::SPD),
            _ => Err(IxaError::IxaError(format!(
                "Unrecognized cumulative efficacy type `{s}`."
            ))),
        }
    }
}

#[cfg(test)]
mod test {
    use ixa::IxaError;

    use super::{CumulativeEfficacyType, EfficacyType};

    #[test]
    fn test_cascade_positions() {
        assert_eq!(EfficacyType::S.cascade(), (CumulativeEfficacyType::S, None));
        assert_eq!(EfficacyType::I.cascade(), (CumulativeEfficacyType::I, None));
        assert_eq!(
            EfficacyType::P.cascade(),
            (CumulativeEfficacyType::SP, Some(CumulativeEfficacyType::S))
        );
        assert_eq!(
            EfficacyType::H.cascade(),
            (CumulativeEfficacyType::SPH, Some(CumulativeEfficacyType::SP))
        );
        assert_eq!(
            EfficacyType::D.cascade(),
            (CumulativeEfficacyType::SPD, Some(CumulativeEfficacyType::SPH))
        );
    }

    #[test]
    fn test_lower_stage_chain() {
        assert_eq!(CumulativeEfficacyType::S.lower_stage(), None);
        assert_eq!(CumulativeEfficacyType::I.lower_stage(), None);
        assert_eq!(
            CumulativeEfficacyType::SPD.lower_stage(),
            Some(CumulativeEfficacyType::SPH)
        );
    }

    #[test]
    fn test_parse_with_prefixes() {
        assert_eq!("VE_P".parse::<EfficacyType>().unwrap(), EfficacyType::P);
        assert_eq!("TE_D".parse::<EfficacyType>().unwrap(), EfficacyType::D);
        assert_eq!(
            "SPH".parse::<CumulativeEfficacyType>().unwrap(),
            CumulativeEfficacyType::SPH
        );
        assert_eq!(
            "VE_SPD".parse::<CumulativeEfficacyType>().unwrap(),
            CumulativeEfficacyType::SPD
        );
    }

    #[test]
    fn test_parse_unknown_code() {
        let e = "Q".parse::<EfficacyType>().err();
        match e {
            Some(IxaError::IxaError(msg)) => {
                assert_eq!(msg, "Unrecognized efficacy type `Q`.".to_string());
            }
            Some(ue) => panic!(
                "Expected an error that the efficacy type is unrecognized. Instead got {:?}",
                ue.to_string()
            ),
            None => panic!("Expected an error. Instead, parsing passed with no errors."),
        }
        // A conditional code is not a cumulative one.
        assert!("P".parse::<CumulativeEfficacyType>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for efficacy_type in CumulativeEfficacyType::ALL {
            assert_eq!(
                efficacy_type
                    .to_string()
                    .parse::<CumulativeEfficacyType>()
                    .unwrap(),
                efficacy_type
            );
        }
    }

    #[test]
    fn test_deserialize_aliases() {
        let parsed: CumulativeEfficacyType = serde_json::from_str("\"VE_SPH\"").unwrap();
        assert_eq!(parsed, CumulativeEfficacyType::SPH);
        let parsed: EfficacyType = serde_json::from_str("\"TE_I\"").unwrap();
        assert_eq!(parsed, EfficacyType::I);
    }
}
