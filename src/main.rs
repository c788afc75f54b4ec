use std::path::{Path, PathBuf};

use clap::Parser;
use epi_efficacy::{
    AgeGroup, ContextEfficacyExt, ContextParametersExt, EfficacyType, VaccineId, VariantId,
};
use ixa::{info, Context, ContextGlobalPropertiesExt, IxaError};
use serde::Serialize;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// path to the input file
    #[arg(short, long)]
    input_file: PathBuf,

    /// path to the output CSV file
    #[arg(short, long)]
    output_file: PathBuf,

    /// vaccine whose efficacy is tabulated
    #[arg(long)]
    vaccine: String,

    /// variant of exposure
    #[arg(long, default_value = "REFERENCE")]
    variant: String,

    /// age group of the vaccinated person
    #[arg(long, default_value = "")]
    age_group: String,

    /// last time since the dose to tabulate
    #[arg(long, default_value_t = 365.0)]
    horizon: f64,

    /// time between rows
    #[arg(long, default_value_t = 1.0)]
    step: f64,
}

#[derive(Serialize)]
struct EfficacyRecord {
    time: f64,
    doses: u32,
    efficacy_type: EfficacyType,
    vaccine_efficacy: f64,
    therapeutic_efficacy: f64,
}

fn tabulate(context: &Context, args: &Args) -> Result<Vec<EfficacyRecord>, IxaError> {
    if args.step.is_nan() || args.step <= 0.0 || args.horizon.is_nan() || args.horizon < 0.0 {
        return Err(IxaError::IxaError(
            "The step must be positive and the horizon non-negative.".to_string(),
        ));
    }
    let vaccine = context.get_vaccine_definition(&VaccineId::from(args.vaccine.as_str()))?;
    let therapeutic = &context.get_params().therapeutic_efficacy;
    let variant_id = VariantId::from(args.variant.as_str());
    let age_group = AgeGroup::from(args.age_group.as_str());

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = (args.horizon / args.step).floor() as usize;
    let mut records = Vec::new();
    for doses in 1..=vaccine.doses_per_regimen() {
        for i in 0..=steps {
            #[allow(clippy::cast_precision_loss)]
            let time = i as f64 * args.step;
            for efficacy_type in EfficacyType::ALL {
                records.push(EfficacyRecord {
                    time,
                    doses,
                    efficacy_type,
                    vaccine_efficacy: vaccine.get_efficacy(
                        efficacy_type,
                        doses,
                        time,
                        &variant_id,
                        &age_group,
                    )?,
                    therapeutic_efficacy: therapeutic.get_efficacy(time, efficacy_type),
                });
            }
        }
    }
    Ok(records)
}

fn write_records(path: &Path, records: &[EfficacyRecord]) -> Result<(), IxaError> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn run(args: &Args) -> Result<(), IxaError> {
    let mut context = Context::new();
    // read the global properties.
    context.load_global_properties(&args.input_file)?;
    info!(
        "Loaded {} vaccine definitions",
        context.get_params().vaccines.len()
    );
    let records = tabulate(&context, args)?;
    write_records(&args.output_file, &records)?;
    info!(
        "Wrote {} rows to {}",
        records.len(),
        args.output_file.display()
    );
    Ok(())
}

fn main() {
    let args = Args::parse();
    run(&args).expect("Error tabulating efficacy.");
}
