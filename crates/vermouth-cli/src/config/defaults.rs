use vermouth::core::dssp::StructureClass;
use vermouth::core::models::builder::BuildOptions;
use vermouth::engine::config::{FailurePolicy, WeightingRule};

pub struct DefaultsConfig {
    pub failure_policy: FailurePolicy,
    pub weighting: WeightingRule,
    pub guess_bonds: bool,
    pub bond_tolerance: f64,
    pub parallel: bool,
    pub backbone_angles: bool,
    pub backbone_dihedrals: Vec<StructureClass>,
    pub molecule_name: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Strict,
            weighting: WeightingRule::Mass,
            guess_bonds: true,
            bond_tolerance: BuildOptions::default().bond_tolerance,
            parallel: true,
            backbone_angles: true,
            backbone_dihedrals: vec![StructureClass::Helix, StructureClass::Sheet],
            molecule_name: "molecule_0".to_string(),
        }
    }
}
