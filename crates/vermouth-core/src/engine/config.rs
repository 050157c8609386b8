use crate::core::dssp::StructureClass;
use crate::core::matching::matcher::DEFAULT_STEP_LIMIT;
use crate::core::templates::{LookupPolicy, TemplatePrecedence};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{parameter}': {reason}")]
    Invalid {
        parameter: &'static str,
        reason: String,
    },
}

/// What happens when a fragment cannot be matched or a term cannot be
/// parameterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The first failure aborts the run.
    Strict,
    /// Failures are skipped and recorded in the diagnostic report.
    Permissive,
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "permissive" => Ok(Self::Permissive),
            other => Err(ConfigError::Invalid {
                parameter: "failure-policy",
                reason: format!("expected 'strict' or 'permissive', got '{other}'"),
            }),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "strict",
            Self::Permissive => "permissive",
        })
    }
}

/// How member atoms are weighted when placing a bead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightingRule {
    /// Atom mass times the declared weight.
    #[default]
    Mass,
    /// Every member counts the same.
    Equal,
    /// The declared weight alone.
    Declared,
}

impl WeightingRule {
    pub fn weight(&self, atom_mass: f64, declared: f64) -> f64 {
        match self {
            Self::Mass => atom_mass * declared,
            Self::Equal => 1.0,
            Self::Declared => declared,
        }
    }
}

impl FromStr for WeightingRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mass" => Ok(Self::Mass),
            "equal" => Ok(Self::Equal),
            "declared" => Ok(Self::Declared),
            other => Err(ConfigError::Invalid {
                parameter: "weighting",
                reason: format!("expected 'mass', 'equal' or 'declared', got '{other}'"),
            }),
        }
    }
}

impl fmt::Display for WeightingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mass => "mass",
            Self::Equal => "equal",
            Self::Declared => "declared",
        })
    }
}

/// Rubber-band parameters. Distances in nm, force constants in kJ/mol/nm².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElasticNetworkConfig {
    pub base_constant: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub decay_factor: f64,
    pub decay_power: f64,
    pub minimum_force: f64,
    /// Pairs at most this many bonds apart are not banded.
    pub excluded_bonds: usize,
    pub bond_function: u8,
}

impl Default for ElasticNetworkConfig {
    fn default() -> Self {
        Self {
            base_constant: 500.0,
            lower_bound: 0.0,
            upper_bound: 0.9,
            decay_factor: 0.0,
            decay_power: 0.0,
            minimum_force: 0.0,
            excluded_bonds: 3,
            bond_function: 6,
        }
    }
}

impl ElasticNetworkConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.upper_bound < self.lower_bound {
            return Err(ConfigError::Invalid {
                parameter: "elastic.upper-bound",
                reason: format!(
                    "upper bound {} is below the lower bound {}",
                    self.upper_bound, self.lower_bound
                ),
            });
        }
        if self.base_constant < 0.0 {
            return Err(ConfigError::Invalid {
                parameter: "elastic.force-constant",
                reason: "must not be negative".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingConfig {
    pub failure_policy: FailurePolicy,
    pub weighting: WeightingRule,
    pub lookup: LookupPolicy,
    pub step_limit: usize,
    /// Match chains on the rayon thread pool.
    pub parallel: bool,
    pub backbone_angles: bool,
    pub backbone_dihedral_classes: Vec<StructureClass>,
    /// Rubber bands are only added when set.
    pub elastic_network: Option<ElasticNetworkConfig>,
    /// Template files merged over the built-in library, in order.
    pub template_paths: Vec<PathBuf>,
    /// Parameter files merged over the built-in table, in order.
    pub parameter_paths: Vec<PathBuf>,
    pub use_builtin_templates: bool,
    pub use_builtin_parameters: bool,
}

#[derive(Default)]
pub struct MappingConfigBuilder {
    failure_policy: Option<FailurePolicy>,
    weighting: Option<WeightingRule>,
    precedence: Option<TemplatePrecedence>,
    fallback_template: Option<String>,
    step_limit: Option<usize>,
    parallel: Option<bool>,
    backbone_angles: Option<bool>,
    backbone_dihedral_classes: Option<Vec<StructureClass>>,
    elastic_network: Option<ElasticNetworkConfig>,
    template_paths: Vec<PathBuf>,
    parameter_paths: Vec<PathBuf>,
    use_builtin_templates: Option<bool>,
    use_builtin_parameters: Option<bool>,
}

impl MappingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }
    pub fn weighting(mut self, rule: WeightingRule) -> Self {
        self.weighting = Some(rule);
        self
    }
    pub fn precedence(mut self, precedence: TemplatePrecedence) -> Self {
        self.precedence = Some(precedence);
        self
    }
    pub fn fallback_template(mut self, name: impl Into<String>) -> Self {
        self.fallback_template = Some(name.into());
        self
    }
    pub fn step_limit(mut self, limit: usize) -> Self {
        self.step_limit = Some(limit);
        self
    }
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }
    pub fn backbone_angles(mut self, enabled: bool) -> Self {
        self.backbone_angles = Some(enabled);
        self
    }
    pub fn backbone_dihedral_classes(mut self, classes: Vec<StructureClass>) -> Self {
        self.backbone_dihedral_classes = Some(classes);
        self
    }
    pub fn elastic_network(mut self, config: ElasticNetworkConfig) -> Self {
        self.elastic_network = Some(config);
        self
    }
    pub fn template_path(mut self, path: PathBuf) -> Self {
        self.template_paths.push(path);
        self
    }
    pub fn parameter_path(mut self, path: PathBuf) -> Self {
        self.parameter_paths.push(path);
        self
    }
    pub fn use_builtin_templates(mut self, enabled: bool) -> Self {
        self.use_builtin_templates = Some(enabled);
        self
    }
    pub fn use_builtin_parameters(mut self, enabled: bool) -> Self {
        self.use_builtin_parameters = Some(enabled);
        self
    }

    pub fn build(self) -> Result<MappingConfig, ConfigError> {
        let failure_policy = self
            .failure_policy
            .ok_or(ConfigError::MissingParameter("failure_policy"))?;

        let step_limit = self.step_limit.unwrap_or(DEFAULT_STEP_LIMIT);
        if step_limit == 0 {
            return Err(ConfigError::Invalid {
                parameter: "step_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(elastic) = &self.elastic_network {
            elastic.validate()?;
        }

        Ok(MappingConfig {
            failure_policy,
            weighting: self.weighting.unwrap_or_default(),
            lookup: LookupPolicy {
                precedence: self.precedence.unwrap_or_default(),
                fallback: self.fallback_template,
            },
            step_limit,
            parallel: self.parallel.unwrap_or(true),
            backbone_angles: self.backbone_angles.unwrap_or(true),
            backbone_dihedral_classes: self
                .backbone_dihedral_classes
                .unwrap_or_else(|| vec![StructureClass::Helix, StructureClass::Sheet]),
            elastic_network: self.elastic_network,
            template_paths: self.template_paths,
            parameter_paths: self.parameter_paths,
            use_builtin_templates: self.use_builtin_templates.unwrap_or(true),
            use_builtin_parameters: self.use_builtin_parameters.unwrap_or(true),
        })
    }
}
