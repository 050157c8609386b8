use crate::core::dssp::SecondaryStructure;
use crate::core::dssp::annotator::{annotate_records, annotate_sequence};
use crate::core::dssp::reader::DsspRecord;
use crate::core::forcefield::params::ParameterTable;
use crate::core::forcefield::resolver::{ParameterError, ParameterResolver};
use crate::core::models::coarse::CoarseGrainedGraph;
use crate::core::models::system::MolecularSystem;
use crate::core::templates::TemplateLibrary;
use crate::engine::config::{FailurePolicy, MappingConfig};
use crate::engine::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticReport};
use crate::engine::elastic::apply_elastic_network;
use crate::engine::error::EngineError;
use crate::engine::mapper::Mapper;
use crate::engine::progress::{Progress, ProgressReporter};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Where residue secondary structure comes from.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SecondaryStructureInput {
    /// Residues keep whatever labels they carry; unlabeled residues are coil.
    #[default]
    None,
    /// One label per residue in chain and sequence order.
    Sequence(Vec<SecondaryStructure>),
    /// Labels keyed by chain and residue number, as read from DSSP output.
    Records(Vec<DsspRecord>),
}

/// Template library and parameter table shared by mapping runs.
#[derive(Debug, Clone)]
pub struct MappingResources {
    pub templates: Arc<TemplateLibrary>,
    pub parameters: Arc<ParameterTable>,
}

impl MappingResources {
    pub fn new(templates: TemplateLibrary, parameters: ParameterTable) -> Self {
        Self {
            templates: Arc::new(templates),
            parameters: Arc::new(parameters),
        }
    }

    /// Built-in libraries (unless disabled) with the configured files merged
    /// over them in order.
    pub fn load(config: &MappingConfig) -> Result<Self, EngineError> {
        let mut templates = if config.use_builtin_templates {
            TemplateLibrary::builtin()?.clone()
        } else {
            TemplateLibrary::new()
        };
        for path in &config.template_paths {
            templates.merge(TemplateLibrary::load(path)?);
        }

        let mut parameters = if config.use_builtin_parameters {
            ParameterTable::builtin()?.clone()
        } else {
            ParameterTable::new()
        };
        for path in &config.parameter_paths {
            parameters.merge(ParameterTable::load(path)?);
        }

        info!(
            templates = templates.len(),
            modifications = templates.modification_count(),
            parameters = parameters.len(),
            "Loaded mapping resources."
        );
        Ok(Self::new(templates, parameters))
    }
}

#[derive(Debug, Clone)]
pub struct MappingResult {
    /// The input structure with secondary structure attached.
    pub system: MolecularSystem,
    pub graph: CoarseGrainedGraph,
    pub diagnostics: DiagnosticReport,
}

#[instrument(skip_all, name = "martinize_workflow")]
pub fn run(
    system: &MolecularSystem,
    secondary_structure: &SecondaryStructureInput,
    resources: &MappingResources,
    config: &MappingConfig,
    reporter: &ProgressReporter,
) -> Result<MappingResult, EngineError> {
    // === Phase 1: Secondary structure ===
    reporter.report(Progress::PhaseStart {
        name: "Annotation",
    });
    let mut working_system = system.clone();
    match secondary_structure {
        SecondaryStructureInput::None => {}
        SecondaryStructureInput::Sequence(labels) => {
            annotate_sequence(&mut working_system, labels)?;
        }
        SecondaryStructureInput::Records(records) => {
            annotate_records(&mut working_system, records)?;
        }
    }
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Fragment matching and bead assembly ===
    reporter.report(Progress::PhaseStart { name: "Mapping" });
    info!(
        chains = working_system.chains_iter().count(),
        residues = working_system.residue_count(),
        policy = %config.failure_policy,
        "Mapping structure onto templates."
    );
    let mapped = Mapper::new(&working_system, &resources.templates, config).map(reporter)?;
    let mut graph = mapped.graph;
    let mut diagnostics = DiagnosticReport::new();
    diagnostics.extend(mapped.diagnostics);
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Bonded parameters ===
    reporter.report(Progress::PhaseStart {
        name: "Parameters",
    });
    let errors = ParameterResolver::new(&resources.parameters).resolve(&mut graph);
    if !errors.is_empty() {
        if config.failure_policy == FailurePolicy::Strict {
            return Err(EngineError::MissingParameters(errors));
        }
        drop_unresolved_terms(&mut graph, &errors, &mut diagnostics);
    }
    reporter.report(Progress::PhaseFinish);

    // === Phase 4: Elastic network ===
    if let Some(elastic) = &config.elastic_network {
        reporter.report(Progress::PhaseStart {
            name: "Elastic network",
        });
        let bands = apply_elastic_network(&mut graph, elastic);
        info!(bands, "Added elastic network.");
        reporter.report(Progress::Message(format!("{bands} rubber bands added")));
        reporter.report(Progress::PhaseFinish);
    }

    info!(
        beads = graph.bead_count(),
        terms = graph.terms().len(),
        diagnostics = diagnostics.len(),
        "Mapping workflow finished."
    );

    Ok(MappingResult {
        system: working_system,
        graph,
        diagnostics,
    })
}

fn drop_unresolved_terms(
    graph: &mut CoarseGrainedGraph,
    errors: &[ParameterError],
    diagnostics: &mut DiagnosticReport,
) {
    for error in errors {
        let location = match error {
            ParameterError::Unresolved { beads, .. } | ParameterError::Unmeasurable { beads, .. } => {
                beads.clone()
            }
        };
        warn!(term = error.term(), "Dropping term: {}", error);
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::MissingParameter,
            location,
            error.to_string(),
        ));
    }
    let indices: Vec<usize> = errors.iter().map(ParameterError::term).collect();
    graph.remove_terms(&indices);
}
