use thiserror::Error;

use super::config::ConfigError;
use crate::core::dssp::StructureClass;
use crate::core::dssp::annotator::AnnotationError;
use crate::core::forcefield::params::ParamLoadError;
use crate::core::forcefield::resolver::ParameterError;
use crate::core::matching::MatchError;
use crate::core::models::builder::StructureError;
use crate::core::templates::TemplateLoadError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Malformed structure: {0}")]
    MalformedStructure(#[from] StructureError),

    #[error("Secondary structure does not fit the structure: {0}")]
    AnnotationMismatch(#[from] AnnotationError),

    #[error("No template for residue {residue} at {location} ({context} context)")]
    UnknownResidue {
        residue: String,
        location: String,
        context: StructureClass,
    },

    #[error(transparent)]
    NoMatchingTemplate(#[from] MatchError),

    #[error("{} bonded terms have no parameters; first: {}", .0.len(), first_error(.0))]
    MissingParameters(Vec<ParameterError>),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to load templates: {0}")]
    TemplateLoad(#[from] TemplateLoadError),

    #[error("Failed to load parameters: {0}")]
    ParameterLoad(#[from] ParamLoadError),

    #[error("Internal logic error: {0}")]
    Internal(String),
}

fn first_error(errors: &[ParameterError]) -> String {
    errors
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}
