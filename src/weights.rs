use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
};

use serde::{Deserialize, Serialize};

use crate::identifiers::AgeGroup;

/// A scalar indexed by a population subgroup, with a default for every subgroup that
/// has no explicit entry. Lookups never fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "WeightsRepr<C>",
    into = "WeightsRepr<C>",
    bound(
        serialize = "C: Serialize + Eq + Hash + Clone",
        deserialize = "C: Deserialize<'de> + Eq + Hash"
    )
)]
pub struct Weights<C: Eq + Hash> {
    default_value: f64,
    values: HashMap<C, f64>,
}

pub type AgeWeights = Weights<AgeGroup>;

// On disk a bare number is shorthand for a constant.
#[derive(Serialize, Deserialize)]
#[serde(
    untagged,
    bound(
        serialize = "C: Serialize + Eq + Hash",
        deserialize = "C: Deserialize<'de> + Eq + Hash"
    )
)]
enum WeightsRepr<C: Eq + Hash> {
    Constant(f64),
    Weighted {
        default_value: f64,
        #[serde(default)]
        values: HashMap<C, f64>,
    },
}

impl<C: Eq + Hash> From<WeightsRepr<C>> for Weights<C> {
    fn from(repr: WeightsRepr<C>) -> Self {
        match repr {
            WeightsRepr::Constant(value) => Weights::constant(value),
            WeightsRepr::Weighted {
                default_value,
                values,
            } => Weights::new(default_value, values),
        }
    }
}

impl<C: Eq + Hash> From<Weights<C>> for WeightsRepr<C> {
    fn from(weights: Weights<C>) -> Self {
        WeightsRepr::Weighted {
            default_value: weights.default_value,
            values: weights.values,
        }
    }
}

impl<C: Eq + Hash> Default for Weights<C> {
    fn default() -> Self {
        Weights::constant(0.0)
    }
}

impl<C: Eq + Hash> Weights<C> {
    #[must_use]
    pub fn new(default_value: f64, values: HashMap<C, f64>) -> Self {
        Self {
            default_value,
            values,
        }
    }

    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self::new(value, HashMap::new())
    }

    #[must_use]
    pub fn get(&self, category: &C) -> f64 {
        self.values
            .get(category)
            .copied()
            .unwrap_or(self.default_value)
    }

    #[must_use]
    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    pub fn explicit_values(&self) -> impl Iterator<Item = (&C, f64)> {
        self.values.iter().map(|(category, value)| (category, *value))
    }

    /// Iterates over the default and every explicit entry.
    pub fn all_values(&self) -> impl Iterator<Item = f64> + '_ {
        std::iter::once(self.default_value).chain(self.values.values().copied())
    }
}

impl<C: Eq + Hash + Clone> Weights<C> {
    #[must_use]
    pub fn transform(&self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(
            f(self.default_value),
            self.values
                .iter()
                .map(|(category, value)| (category.clone(), f(*value)))
                .collect(),
        )
    }

    /// Categories with an explicit entry in either operand.
    fn union_categories<'a>(&'a self, other: &'a Self) -> HashSet<&'a C> {
        self.values.keys().chain(other.values.keys()).collect()
    }

    /// Combines two weights pointwise over the union of their explicit categories, each
    /// side falling back to its own default for categories it does not list.
    /// # Errors
    /// - If `f` fails for the default or for any category
    pub fn try_combine<E>(
        &self,
        other: &Self,
        f: impl Fn(f64, f64) -> Result<f64, E>,
    ) -> Result<Self, E> {
        let mut values = HashMap::new();
        for category in self.union_categories(other) {
            values.insert(category.clone(), f(self.get(category), other.get(category))?);
        }
        Ok(Self::new(f(self.default_value, other.default_value)?, values))
    }

    #[must_use]
    pub fn combine(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        let values = self
            .union_categories(other)
            .into_iter()
            .map(|category| {
                (
                    category.clone(),
                    f(self.get(category), other.get(category)),
                )
            })
            .collect();
        Self::new(f(self.default_value, other.default_value), values)
    }

    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        self.combine(other, |a, b| a * b)
    }

    /// True when no category (nor the default) satisfies `violates`.
    fn holds_pointwise(&self, other: &Self, violates: impl Fn(f64, f64) -> bool) -> bool {
        !violates(self.default_value, other.default_value)
            && self
                .union_categories(other)
                .into_iter()
                .all(|category| !violates(self.get(category), other.get(category)))
    }

    #[must_use]
    pub fn less_or_equal(&self, other: &Self) -> bool {
        self.holds_pointwise(other, |a, b| a > b)
    }

    #[must_use]
    pub fn greater_or_equal(&self, other: &Self) -> bool {
        self.holds_pointwise(other, |a, b| a < b)
    }
}
