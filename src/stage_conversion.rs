//! Conversion between cumulative efficacy endpoints (S, SP, SPH, SPD) and the
//! stage-conditional multipliers applied at each transition of the disease cascade.
//!
//! If `c_prev` is the cumulative efficacy through the previous stage and `c` the
//! cumulative efficacy through the current one, the conditional efficacy of the current
//! stage satisfies `1 - c = (1 - c_prev) * (1 - conditional)`.

use std::{collections::HashMap, hash::Hash};

use ixa::{trace, IxaError};

use crate::{
    efficacy_type::{CumulativeEfficacyType, EfficacyType},
    weights::Weights,
};

/// One value per cumulative dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeTable<T> {
    pub s: T,
    pub i: T,
    pub sp: T,
    pub sph: T,
    pub spd: T,
}

/// One value per stage-conditional dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct EfficacyTable<T> {
    pub s: T,
    pub i: T,
    pub p: T,
    pub h: T,
    pub d: T,
}

impl<T> CumulativeTable<T> {
    pub fn from_fn(mut f: impl FnMut(CumulativeEfficacyType) -> T) -> Self {
        Self {
            s: f(CumulativeEfficacyType::S),
            i: f(CumulativeEfficacyType::I),
            sp: f(CumulativeEfficacyType::SP),
            sph: f(CumulativeEfficacyType::SPH),
            spd: f(CumulativeEfficacyType::SPD),
        }
    }

    #[must_use]
    pub fn get(&self, efficacy_type: CumulativeEfficacyType) -> &T {
        match efficacy_type {
            CumulativeEfficacyType::S => &self.s,
            CumulativeEfficacyType::I => &self.i,
            CumulativeEfficacyType::SP => &self.sp,
            CumulativeEfficacyType::SPH => &self.sph,
            CumulativeEfficacyType::SPD => &self.spd,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (CumulativeEfficacyType, &T)> {
        CumulativeEfficacyType::ALL
            .into_iter()
            .map(move |efficacy_type| (efficacy_type, self.get(efficacy_type)))
    }

    /// Combines two tables dimension by dimension.
    pub fn zip_with<U, R>(
        &self,
        other: &CumulativeTable<U>,
        mut f: impl FnMut(&T, &U) -> R,
    ) -> CumulativeTable<R> {
        CumulativeTable::from_fn(|efficacy_type| {
            f(self.get(efficacy_type), other.get(efficacy_type))
        })
    }
}

impl<T> EfficacyTable<T> {
    #[must_use]
    pub fn get(&self, efficacy_type: EfficacyType) -> &T {
        match efficacy_type {
            EfficacyType::S => &self.s,
            EfficacyType::I => &self.i,
            EfficacyType::P => &self.p,
            EfficacyType::H => &self.h,
            EfficacyType::D => &self.d,
        }
    }
}

/// A quantity that can sit in a cascade of efficacies: a plain scalar, or a scalar that
/// varies by subgroup.
pub trait CascadeValue: Clone {
    fn zero() -> Self;

    fn one() -> Self;

    fn within_unit_interval(&self) -> bool;

    /// Whether `self >= other` everywhere.
    fn at_least(&self, other: &Self) -> bool;

    /// The conditional efficacy of a stage with cumulative efficacy `self`, given the
    /// cumulative efficacy `previous` of the stage before it.
    /// # Errors
    /// - If the result falls outside [0, 1]
    fn conditional_given(&self, previous: &Self) -> Result<Self, IxaError>;
}

/// `1 - (1 - current) / (1 - previous)`, or 1.0 when the previous stage is already fully
/// protected.
#[must_use]
pub fn conditional_efficacy(previous: f64, current: f64) -> f64 {
    #[allow(clippy::float_cmp)]
    if previous == 1.0 {
        return 1.0;
    }
    1.0 - (1.0 - current) / (1.0 - previous)
}

/// # Errors
/// - If the conditional efficacy implied by `previous` and `current` is outside [0, 1]
pub fn checked_conditional_efficacy(previous: f64, current: f64) -> Result<f64, IxaError> {
    let conditional = conditional_efficacy(previous, current);
    if (0.0..=1.0).contains(&conditional) {
        Ok(conditional)
    } else {
        Err(IxaError::IxaError(format!(
            "Conditional efficacy {conditional} is outside [0, 1]."
        )))
    }
}

impl CascadeValue for f64 {
    fn zero() -> Self {
        0.0
    }

    fn one() -> Self {
        1.0
    }

    fn within_unit_interval(&self) -> bool {
        (0.0..=1.0).contains(self)
    }

    fn at_least(&self, other: &Self) -> bool {
        self >= other
    }

    fn conditional_given(&self, previous: &Self) -> Result<Self, IxaError> {
        checked_conditional_efficacy(*previous, *self)
    }
}

impl<C: Eq + Hash + Clone> CascadeValue for Weights<C> {
    fn zero() -> Self {
        Weights::constant(0.0)
    }

    fn one() -> Self {
        Weights::constant(1.0)
    }

    fn within_unit_interval(&self) -> bool {
        self.all_values().all(|x| (0.0..=1.0).contains(&x))
    }

    fn at_least(&self, other: &Self) -> bool {
        self.greater_or_equal(other)
    }

    fn conditional_given(&self, previous: &Self) -> Result<Self, IxaError> {
        previous.try_combine(self, checked_conditional_efficacy)
    }
}

/// Completes a partially specified cumulative table. `S` and `I` default to zero; every
/// other missing dimension copies the stage below it, i.e. the missing stage is assumed
/// to add no protection of its own.
pub fn fill_cumulative_defaults<V: CascadeValue>(
    supplied: &HashMap<CumulativeEfficacyType, V>,
) -> CumulativeTable<V> {
    let mut filled: HashMap<CumulativeEfficacyType, V> = HashMap::new();
    // `ALL` lists every stage after the stage it copies from.
    for efficacy_type in CumulativeEfficacyType::ALL {
        let value = match (supplied.get(&efficacy_type), efficacy_type.lower_stage()) {
            (Some(value), _) => value.clone(),
            (None, Some(lower)) => {
                trace!("No {efficacy_type} efficacy supplied; copying {lower}");
                filled.get(&lower).cloned().unwrap_or_else(V::zero)
            }
            (None, None) => V::zero(),
        };
        filled.insert(efficacy_type, value);
    }
    CumulativeTable::from_fn(|efficacy_type| filled.remove(&efficacy_type).unwrap_or_else(V::zero))
}

/// Completes a table of relative-efficacy multipliers; missing dimensions are 1.0.
pub fn fill_multiplier_defaults<V: CascadeValue>(
    supplied: &HashMap<CumulativeEfficacyType, V>,
) -> CumulativeTable<V> {
    CumulativeTable::from_fn(|efficacy_type| {
        supplied
            .get(&efficacy_type)
            .cloned()
            .unwrap_or_else(V::one)
    })
}

/// Checks that every value is a proportion and that each cumulative stage is at least as
/// protective as the stage before it.
/// # Errors
/// - If any efficacy is outside [0, 1]
/// - If SP < S, SPH < SP, or SPD < SPH anywhere
pub fn validate_cumulative<V: CascadeValue>(table: &CumulativeTable<V>) -> Result<(), IxaError> {
    if table.iter().any(|(_, value)| !value.within_unit_interval()) {
        return Err(IxaError::IxaError(
            "Efficacy must always be between 0 and 1.".to_string(),
        ));
    }
    for efficacy_type in [EfficacyType::P, EfficacyType::H, EfficacyType::D] {
        if let (current, Some(previous)) = efficacy_type.cascade() {
            if !table.get(current).at_least(table.get(previous)) {
                return Err(IxaError::IxaError(format!(
                    "{efficacy_type} efficacy implied by {current} and {previous} is impossible."
                )));
            }
        }
    }
    Ok(())
}

/// Converts a validated cumulative table into stage-conditional efficacies.
/// # Errors
/// - If any implied conditional efficacy is outside [0, 1]
pub fn to_conditional<V: CascadeValue>(
    table: &CumulativeTable<V>,
) -> Result<EfficacyTable<V>, IxaError> {
    let convert = |efficacy_type: EfficacyType| -> Result<V, IxaError> {
        match efficacy_type.cascade() {
            (current, None) => Ok(table.get(current).clone()),
            (current, Some(previous)) => table
                .get(current)
                .conditional_given(table.get(previous))
                .map_err(|e| {
                    IxaError::IxaError(format!(
                        "{efficacy_type} efficacy implied by {current} and {previous} is impossible: {}",
                        error_message(e)
                    ))
                }),
        }
    };
    Ok(EfficacyTable {
        s: convert(EfficacyType::S)?,
        i: convert(EfficacyType::I)?,
        p: convert(EfficacyType::P)?,
        h: convert(EfficacyType::H)?,
        d: convert(EfficacyType::D)?,
    })
}

/// Evaluates the conditional efficacy of `efficacy_type` from a full set of cumulative
/// values. The values must already satisfy the cascade ordering.
#[must_use]
pub fn conditional_from_cumulative(
    efficacy_type: EfficacyType,
    cumulative: impl Fn(CumulativeEfficacyType) -> f64,
) -> f64 {
    match efficacy_type.cascade() {
        (current, None) => cumulative(current),
        (current, Some(previous)) => {
            conditional_efficacy(cumulative(previous), cumulative(current))
        }
    }
}

pub(crate) fn error_message(e: IxaError) -> String {
    match e {
        IxaError::IxaError(msg) => msg,
        other => other.to_string(),
    }
}
