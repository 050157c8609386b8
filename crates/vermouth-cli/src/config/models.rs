use std::path::PathBuf;
use vermouth::core::models::builder::BuildOptions;
use vermouth::engine::config::MappingConfig;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SecondaryStructureSource {
    #[default]
    None,
    DsspFile(PathBuf),
    Codes(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub input_path: PathBuf,
    pub structure_output: PathBuf,
    pub topology_output: PathBuf,
    pub report_path: Option<PathBuf>,
    pub molecule_name: String,
    pub build_options: BuildOptions,
    pub secondary_structure: SecondaryStructureSource,
    pub core_config: MappingConfig,
}
