use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of a bonded interaction between beads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Bond,
    Constraint,
    Angle,
    Dihedral,
    Improper,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid interaction kind: '{0}'")]
pub struct ParseInteractionKindError(pub String);

impl InteractionKind {
    pub const ALL: [InteractionKind; 5] = [
        InteractionKind::Bond,
        InteractionKind::Constraint,
        InteractionKind::Angle,
        InteractionKind::Dihedral,
        InteractionKind::Improper,
    ];

    /// Number of beads the interaction spans.
    pub fn arity(&self) -> usize {
        match self {
            InteractionKind::Bond | InteractionKind::Constraint => 2,
            InteractionKind::Angle => 3,
            InteractionKind::Dihedral | InteractionKind::Improper => 4,
        }
    }

    /// GROMACS function type used when none is given.
    pub fn default_function(&self) -> u8 {
        match self {
            InteractionKind::Bond => 1,
            InteractionKind::Constraint => 1,
            InteractionKind::Angle => 2,
            InteractionKind::Dihedral => 1,
            InteractionKind::Improper => 2,
        }
    }

    /// Topology section the interaction is written to. Impropers share the
    /// dihedral section and differ by function type.
    pub fn section(&self) -> &'static str {
        match self {
            InteractionKind::Bond => "bonds",
            InteractionKind::Constraint => "constraints",
            InteractionKind::Angle => "angles",
            InteractionKind::Dihedral | InteractionKind::Improper => "dihedrals",
        }
    }

    pub fn requires_force_constant(&self) -> bool {
        !matches!(self, InteractionKind::Constraint)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Bond => "bond",
            InteractionKind::Constraint => "constraint",
            InteractionKind::Angle => "angle",
            InteractionKind::Dihedral => "dihedral",
            InteractionKind::Improper => "improper",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = ParseInteractionKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bond" | "bonds" => Ok(InteractionKind::Bond),
            "constraint" | "constraints" => Ok(InteractionKind::Constraint),
            "angle" | "angles" => Ok(InteractionKind::Angle),
            "dihedral" | "dihedrals" => Ok(InteractionKind::Dihedral),
            "improper" | "impropers" => Ok(InteractionKind::Improper),
            _ => Err(ParseInteractionKindError(s.to_string())),
        }
    }
}

/// Where a bonded term came from; parameter entries can be scoped to one origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermOrigin {
    Template,
    Backbone,
    Crosslink,
    Elastic,
}

impl fmt::Display for TermOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TermOrigin::Template => "template",
            TermOrigin::Backbone => "backbone",
            TermOrigin::Crosslink => "crosslink",
            TermOrigin::Elastic => "elastic",
        };
        f.write_str(name)
    }
}

/// Fully resolved parameters of a bonded term.
///
/// Distances are in nm, angles in degrees, force constants in the GROMACS
/// units of the function type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondedParameters {
    pub function: u8,
    pub equilibrium: f64,
    pub force_constant: Option<f64>,
    pub multiplicity: Option<u32>,
}
