use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// A population stratum over which efficacy parameters may vary. Only ever used as a
/// lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgeGroup(String);

/// A pathogen strain. Relative efficacies are expressed against the reference variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VaccineId(String);

const REFERENCE_VARIANT: &str = "REFERENCE";

impl VariantId {
    #[must_use]
    pub fn reference() -> Self {
        VariantId(REFERENCE_VARIANT.to_string())
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.0 == REFERENCE_VARIANT
    }
}

impl Default for VariantId {
    fn default() -> Self {
        VariantId::reference()
    }
}

macro_rules! string_identifier {
    ($name:ident) => {
        impl $name {
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name(value)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_identifier!(AgeGroup);
string_identifier!(VariantId);
string_identifier!(VaccineId);
