use criterion::Criterion;
use epi_efficacy::{
    therapeutic::{InterpolationMode, TherapeuticEfficacyConfig, TimedEfficacy},
    vaccine::VaccineDefinitionConfig,
    AgeGroup, AgeWeights, CumulativeEfficacyType, DoseType, EfficacyType,
    TherapeuticEfficacySpecification, VaccineDefinition, VaccineId, VariantId,
};
use epi_efficacy::efficacy_curve::{EfficacyCurve, EfficacyCurveConfig};
use std::{collections::HashMap, hint::black_box};

fn two_dose_vaccine() -> VaccineDefinition {
    let curve = EfficacyCurve::new(EfficacyCurveConfig {
        initial_delay: AgeWeights::constant(7.0),
        peak_time: AgeWeights::constant(14.0),
        peak_duration: AgeWeights::constant(30.0),
        after_peak_half_life: HashMap::from([
            (CumulativeEfficacyType::S, AgeWeights::constant(180.0)),
            (CumulativeEfficacyType::SP, AgeWeights::constant(240.0)),
        ]),
    })
    .expect("Valid efficacy curve parameters");
    VaccineDefinition::new(VaccineDefinitionConfig {
        id: VaccineId::from("mRNA"),
        dose_type: DoseType::TwoDose,
        second_dose_delay: 21.0,
        first_dose_efficacy_function: curve.clone(),
        second_dose_efficacy_function: curve,
        efficacy: HashMap::from([
            (CumulativeEfficacyType::S, AgeWeights::constant(0.9)),
            (CumulativeEfficacyType::SP, AgeWeights::constant(0.95)),
            (CumulativeEfficacyType::SPH, AgeWeights::constant(0.98)),
        ]),
        first_dose_relative_efficacy: HashMap::from([(
            CumulativeEfficacyType::S,
            AgeWeights::constant(0.5),
        )]),
        variant_relative_efficacy: HashMap::from([(
            VariantId::from("Delta"),
            HashMap::from([(CumulativeEfficacyType::S, AgeWeights::constant(0.75))]),
        )]),
        ..Default::default()
    })
    .expect("Valid vaccine parameters")
}

pub fn vaccine_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("vaccine::get_efficacy");
    let vaccine = two_dose_vaccine();
    let reference = VariantId::reference();
    let delta = VariantId::from("Delta");
    let age_group = AgeGroup::from("18-64");

    group.bench_function("first_dose_ramp", |b| {
        b.iter(|| {
            black_box(vaccine.get_efficacy(
                EfficacyType::S,
                1,
                black_box(10.0),
                &reference,
                &age_group,
            ))
        });
    });

    group.bench_function("second_dose_waning", |b| {
        b.iter(|| {
            black_box(vaccine.get_efficacy(
                EfficacyType::P,
                2,
                black_box(120.0),
                &reference,
                &age_group,
            ))
        });
    });

    group.bench_function("variant_second_dose", |b| {
        b.iter(|| {
            black_box(vaccine.get_efficacy(
                EfficacyType::H,
                2,
                black_box(10.0),
                &delta,
                &age_group,
            ))
        });
    });

    group.finish();
}

pub fn therapeutic_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("therapeutic::get_efficacy");
    let efficacies: Vec<TimedEfficacy> = (1..=30)
        .map(|day| TimedEfficacy {
            time: f64::from(day),
            efficacy: HashMap::from([
                (CumulativeEfficacyType::I, 0.5 / f64::from(day)),
                (CumulativeEfficacyType::SPH, 0.8 / f64::from(day)),
            ]),
        })
        .collect();

    for interpolation in [InterpolationMode::Step, InterpolationMode::Linear] {
        let therapeutic = TherapeuticEfficacySpecification::new(TherapeuticEfficacyConfig {
            efficacies: efficacies.clone(),
            interpolation,
        })
        .expect("Valid therapeutic parameters");
        group.bench_function(format!("{interpolation:?}_hospitalization"), |b| {
            b.iter(|| black_box(therapeutic.get_efficacy(black_box(12.5), EfficacyType::H)));
        });
        group.bench_function(format!("{interpolation:?}_transmission"), |b| {
            b.iter(|| {
                black_box(therapeutic.probability_fails_to_prevent_transmission(black_box(12.5)))
            });
        });
    }

    group.finish();
}
