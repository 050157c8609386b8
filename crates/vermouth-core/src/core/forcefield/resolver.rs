use super::params::ParameterTable;
use super::term::{BondedParameters, InteractionKind};
use crate::core::dssp::StructureClass;
use crate::core::models::coarse::{BondedTerm, CoarseGrainedGraph};
use crate::core::utils::geometry::{self, ANGSTROM_TO_NM};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParameterError {
    #[error("No {kind} parameters for {beads} (types {types:?}, {context} context)")]
    Unresolved {
        term: usize,
        kind: InteractionKind,
        beads: String,
        types: Vec<String>,
        context: StructureClass,
    },

    #[error("Cannot measure the {kind} equilibrium of {beads}: degenerate geometry")]
    Unmeasurable {
        term: usize,
        kind: InteractionKind,
        beads: String,
    },
}

impl ParameterError {
    /// Index of the offending term in its graph.
    pub fn term(&self) -> usize {
        match self {
            ParameterError::Unresolved { term, .. } | ParameterError::Unmeasurable { term, .. } => {
                *term
            }
        }
    }
}

/// Completes bonded terms from explicit template values, a parameter table
/// and its per-kind defaults, in that order.
pub struct ParameterResolver<'a> {
    table: &'a ParameterTable,
}

impl<'a> ParameterResolver<'a> {
    pub fn new(table: &'a ParameterTable) -> Self {
        Self { table }
    }

    /// Fills in the parameters of every term that has none yet and returns one
    /// error per term left unresolved. Unresolved terms are kept unchanged.
    pub fn resolve(&self, graph: &mut CoarseGrainedGraph) -> Vec<ParameterError> {
        let mut resolved = Vec::new();
        let mut errors = Vec::new();

        for (index, term) in graph.terms().iter().enumerate() {
            if term.parameters.is_some() {
                continue;
            }
            match self.resolve_term(graph, index, term) {
                Ok(parameters) => resolved.push((index, parameters)),
                Err(e) => errors.push(e),
            }
        }

        debug!(
            resolved = resolved.len(),
            unresolved = errors.len(),
            "Resolved bonded parameters."
        );
        let terms = graph.terms_mut();
        for (index, parameters) in resolved {
            terms[index].parameters = Some(parameters);
        }
        errors
    }

    fn resolve_term(
        &self,
        graph: &CoarseGrainedGraph,
        index: usize,
        term: &BondedTerm,
    ) -> Result<BondedParameters, ParameterError> {
        let types: Vec<&str> = term
            .beads
            .iter()
            .filter_map(|&b| graph.bead(b))
            .map(|b| b.bead_type.as_str())
            .collect();

        let spec = term
            .explicit
            .as_ref()
            .or_else(|| self.table.lookup(term.kind, &types, term.context, term.origin))
            .or_else(|| self.table.default_for(term.kind))
            .ok_or_else(|| ParameterError::Unresolved {
                term: index,
                kind: term.kind,
                beads: bead_labels(graph, term),
                types: types.iter().map(|t| t.to_string()).collect(),
                context: term.context,
            })?;

        let measured = if spec.measured {
            measure(graph, term)
        } else {
            None
        };
        trace!(term = index, kind = %term.kind, ?measured, "Resolving term.");

        spec.resolve(term.kind, measured)
            .ok_or_else(|| ParameterError::Unmeasurable {
                term: index,
                kind: term.kind,
                beads: bead_labels(graph, term),
            })
    }
}

/// Current value of the term's coordinate: distance in nm, angles in degrees.
pub fn measure(graph: &CoarseGrainedGraph, term: &BondedTerm) -> Option<f64> {
    let positions: Vec<_> = term
        .beads
        .iter()
        .map(|&b| graph.bead(b).map(|bead| bead.position))
        .collect::<Option<_>>()?;

    match (term.kind, positions.as_slice()) {
        (InteractionKind::Bond | InteractionKind::Constraint, [a, b]) => {
            Some(geometry::distance(a, b) * ANGSTROM_TO_NM)
        }
        (InteractionKind::Angle, [a, b, c]) => geometry::angle_degrees(a, b, c),
        (InteractionKind::Dihedral | InteractionKind::Improper, [a, b, c, d]) => {
            geometry::dihedral_degrees(a, b, c, d)
        }
        _ => None,
    }
}

fn bead_labels(graph: &CoarseGrainedGraph, term: &BondedTerm) -> String {
    term.beads
        .iter()
        .map(|&b| match graph.bead(b) {
            Some(bead) => format!("{}:{} {}", bead.chain, bead.residue_number, bead.name),
            None => format!("#{b}"),
        })
        .collect::<Vec<_>>()
        .join(" - ")
}
