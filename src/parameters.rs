use std::collections::HashSet;

use ixa::{define_global_property, ContextGlobalPropertiesExt, IxaError};
use serde::{Deserialize, Serialize};

use crate::{therapeutic::TherapeuticEfficacySpecification, vaccine::VaccineDefinition};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Params {
    /// Vaccine regimens that may be administered. Each is validated as it is read.
    #[serde(default)]
    pub vaccines: Vec<VaccineDefinition>,
    /// Efficacy of treatment as a function of time since treatment began; zero everywhere
    /// when absent
    #[serde(default)]
    pub therapeutic_efficacy: TherapeuticEfficacySpecification,
}

fn validate_inputs(parameters: &Params) -> Result<(), IxaError> {
    let mut vaccine_ids = HashSet::new();
    for vaccine in &parameters.vaccines {
        if !vaccine_ids.insert(vaccine.id()) {
            return Err(IxaError::IxaError(format!(
                "Vaccine {} is defined more than once.",
                vaccine.id()
            )));
        }
    }
    Ok(())
}

define_global_property!(GlobalParams, Params, validate_inputs);

pub trait ContextParametersExt {
    fn get_params(&self) -> &Params;
}

impl ContextParametersExt for ixa::Context {
    fn get_params(&self) -> &Params {
        self.get_global_property_value(GlobalParams)
            .expect("Expected GlobalParams to be set")
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod test {
    use std::{fs::File, io::Write, path::PathBuf};

    use ixa::{Context, ContextGlobalPropertiesExt, IxaError};
    use tempfile::tempdir;

    use super::validate_inputs;
    use crate::{
        efficacy_type::EfficacyType,
        identifiers::VaccineId,
        parameters::{ContextParametersExt, GlobalParams, Params},
        vaccine::{VaccineDefinition, VaccineDefinitionConfig},
    };

    fn vaccine(id: &str) -> VaccineDefinition {
        VaccineDefinition::new(VaccineDefinitionConfig {
            id: VaccineId::from(id),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_default_input_file() {
        let mut context = Context::new();
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("input/input.json");
        context
            .load_global_properties(&path)
            .expect("Could not load input file");
        let params = context.get_params();
        assert_eq!(params.vaccines.len(), 2);
        assert!(!params.therapeutic_efficacy.efficacy_is_zero());
    }

    #[test]
    fn test_get_params() {
        let mut context = Context::new();
        let parameters = Params {
            vaccines: vec![vaccine("A"), vaccine("B")],
            ..Default::default()
        };
        context
            .set_global_property_value(GlobalParams, parameters)
            .unwrap();

        let params = context.get_params();
        assert_eq!(params.vaccines[1].id(), &VaccineId::from("B"));
        assert_eq!(
            params.therapeutic_efficacy.get_efficacy(1.0, EfficacyType::S),
            0.0
        );
    }

    #[test]
    fn test_validate_unique_vaccine_ids() {
        let parameters = Params {
            vaccines: vec![vaccine("A"), vaccine("B"), vaccine("A")],
            ..Default::default()
        };
        let e = validate_inputs(&parameters).err();
        match e {
            Some(IxaError::IxaError(msg)) => {
                assert_eq!(msg, "Vaccine A is defined more than once.".to_string());
            }
            Some(ue) => panic!(
                "Expected an error that vaccine ids must be unique. Instead got {:?}",
                ue.to_string()
            ),
            None => panic!("Expected an error. Instead, validation passed with no errors."),
        }
    }

    fn load_from_str(params_json: &str) -> Result<Context, IxaError> {
        let temp_dir = tempdir().unwrap();
        let dir = PathBuf::from(&temp_dir.path());
        let file_path = dir.join("input.json");
        let mut file = File::create(file_path.clone()).unwrap();
        file.write_all(params_json.as_bytes()).unwrap();

        let mut context = Context::new();
        context.load_global_properties(&file_path)?;
        Ok(context)
    }

    #[test]
    fn test_load_rejects_invalid_vaccine() {
        let params_json = r#"
            {
                "epi_efficacy.GlobalParams": {
                    "vaccines": [{"id": "Bad", "efficacy": {"VE_S": 0.9, "VE_SP": 0.5}}]
                }
            }
        "#;
        assert!(load_from_str(params_json).is_err());
    }

    #[test]
    fn test_load_minimal_params() {
        let params_json = r#"
            {
                "epi_efficacy.GlobalParams": {
                    "vaccines": [{"id": "A", "efficacy": {"VE_S": 0.6}}]
                }
            }
        "#;
        let context = load_from_str(params_json).unwrap();
        let params = context.get_params();
        assert_eq!(params.vaccines.len(), 1);
        assert!(params.therapeutic_efficacy.efficacy_is_zero());
    }
}
