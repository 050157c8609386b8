use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileInputConfig {
    pub guess_bonds: Option<bool>,
    pub bond_tolerance: Option<f64>,
    pub dssp: Option<PathBuf>,
    pub secondary_structure: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileLibraryConfig {
    #[serde(default)]
    pub templates: Vec<PathBuf>,
    #[serde(default)]
    pub parameters: Vec<PathBuf>,
    pub builtin_templates: Option<bool>,
    pub builtin_parameters: Option<bool>,
    pub fallback_template: Option<String>,
    /// `declared-priority` or `registration-order`.
    pub precedence: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileMappingConfig {
    pub failure_policy: Option<String>,
    pub weighting: Option<String>,
    pub step_limit: Option<usize>,
    pub parallel: Option<bool>,
    pub backbone_angles: Option<bool>,
    pub backbone_dihedrals: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileElasticConfig {
    pub enabled: Option<bool>,
    pub force_constant: Option<f64>,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    pub decay_factor: Option<f64>,
    pub decay_power: Option<f64>,
    pub minimum_force: Option<f64>,
    pub excluded_bonds: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileOutputConfig {
    pub molecule_name: Option<String>,
    pub report: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub input: Option<FileInputConfig>,
    pub library: Option<FileLibraryConfig>,
    pub mapping: Option<FileMappingConfig>,
    pub elastic: Option<FileElasticConfig>,
    pub output: Option<FileOutputConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content =
            std::fs::read_to_string(path).map_err(|e| CliError::parsing(path, e))?;
        toml::from_str(&content).map_err(|e| CliError::parsing(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_section() {
        let config: FileConfig = toml::from_str(
            r#"
            [input]
            guess-bonds = false
            secondary-structure = "CCHHHHCC"

            [library]
            templates = ["extra.toml"]
            precedence = "registration-order"

            [mapping]
            failure-policy = "permissive"
            backbone-dihedrals = ["helix"]

            [elastic]
            enabled = true
            upper-bound = 0.85

            [output]
            molecule-name = "Protein"
            "#,
        )
        .unwrap();
        assert_eq!(config.input.unwrap().guess_bonds, Some(false));
        assert_eq!(config.library.unwrap().templates, vec![PathBuf::from("extra.toml")]);
        assert_eq!(
            config.mapping.unwrap().backbone_dihedrals,
            Some(vec!["helix".to_string()])
        );
        assert_eq!(config.elastic.unwrap().upper_bound, Some(0.85));
        assert_eq!(config.output.unwrap().molecule_name.as_deref(), Some("Protein"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: std::result::Result<FileConfig, _> = toml::from_str(
            r#"
            [elastic]
            upper-bund = 0.85
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_file_is_a_parsing_error() {
        let result = FileConfig::from_file(Path::new("/nonexistent/martinize.toml"));
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }
}
