use crate::core::dssp::StructureClass;
use crate::core::forcefield::params::ParameterSpec;
use crate::core::forcefield::term::InteractionKind;
use crate::core::models::element::Element;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Whether a role must be bound for a template to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    Required,
    Optional,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemplateError {
    #[error("Template lists no residues")]
    EmptyResidues,

    #[error("Role '{0}' is declared more than once")]
    DuplicateRole(String),

    #[error("Unknown role '{0}'")]
    UnknownRole(String),

    #[error("Role '{role}' refers to residue {offset}, but the template spans {span}")]
    ResidueOffsetOutOfRange {
        role: String,
        offset: usize,
        span: usize,
    },

    #[error("Bead '{0}' is declared more than once")]
    DuplicateBead(String),

    #[error("Bead '{0}' has no atoms")]
    EmptyBead(String),

    #[error("Role '{role}' belongs to both bead '{first}' and bead '{second}'")]
    OverlappingBeads {
        role: String,
        first: String,
        second: String,
    },

    #[error("Unknown bead '{0}'")]
    UnknownBead(String),

    #[error("A {kind} needs {expected} beads, got {found}")]
    WrongArity {
        kind: InteractionKind,
        expected: usize,
        found: usize,
    },

    #[error("Invalid parameters for {kind} {beads:?}: {message}")]
    InvalidParameters {
        kind: InteractionKind,
        beads: Vec<String>,
        message: String,
    },

    #[error("Anchor role '{0}' must not belong to a bead of the modification")]
    AnchorInBead(String),

    #[error("Modification binds no atoms besides its anchors")]
    NoModifiedAtoms,

    #[error("No template for residue '{residue}' in {context} context")]
    UnknownResidue {
        residue: String,
        context: StructureClass,
    },
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ResidueSpec {
    Name(String),
    Alternatives(Vec<String>),
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AtomRoleDef {
    pub name: String,
    pub element: Element,
    #[serde(default)]
    pub requirement: Option<Requirement>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub residue: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum MemberSpec {
    Name(String),
    Weighted { atom: String, weight: f64 },
}

impl MemberSpec {
    fn parts(&self) -> (&str, f64) {
        match self {
            MemberSpec::Name(name) => (name, 1.0),
            MemberSpec::Weighted { atom, weight } => (atom, *weight),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BeadDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub bead_type: String,
    #[serde(default)]
    pub type_by_context: BTreeMap<StructureClass, String>,
    pub atoms: Vec<MemberSpec>,
    #[serde(default)]
    pub charge: f64,
    #[serde(default)]
    pub mass: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct InteractionDefinition {
    pub kind: InteractionKind,
    pub beads: Vec<String>,
    #[serde(default)]
    pub parameters: Option<ParameterSpec>,
}

/// A template as written in a TOML library file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TemplateDef {
    pub name: String,
    pub residues: Vec<ResidueSpec>,
    #[serde(default)]
    pub context: Option<StructureClass>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub link_bead: Option<String>,
    pub atoms: Vec<AtomRoleDef>,
    #[serde(default)]
    pub edges: Vec<[String; 2]>,
    #[serde(default)]
    pub beads: Vec<BeadDefinition>,
    #[serde(default)]
    pub interactions: Vec<InteractionDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtomRole {
    pub name: String,
    pub element: Element,
    pub aliases: Vec<String>,
    pub requirement: Requirement,
    pub priority: i32,
    /// Index of the template residue the role belongs to.
    pub residue: usize,
}

impl AtomRole {
    pub fn is_required(&self) -> bool {
        self.requirement == Requirement::Required
    }

    pub fn accepts_name(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateBead {
    pub name: String,
    pub bead_type: String,
    pub type_by_context: BTreeMap<StructureClass, String>,
    /// Role indices with declared weights.
    pub members: Vec<(usize, f64)>,
    pub charge: f64,
    pub mass: Option<f64>,
}

impl TemplateBead {
    /// Bead type for the given structure class.
    pub fn type_for(&self, class: StructureClass) -> &str {
        self.type_by_context
            .get(&class)
            .map(String::as_str)
            .unwrap_or(&self.bead_type)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateInteraction {
    pub kind: InteractionKind,
    pub beads: Vec<usize>,
    pub parameters: Option<ParameterSpec>,
}

/// A validated template: a pattern graph over atom roles with its beads and
/// bonded terms.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    residues: Vec<Vec<String>>,
    context: Option<StructureClass>,
    priority: i32,
    roles: Vec<AtomRole>,
    role_index: HashMap<String, usize>,
    adjacency: Vec<Vec<usize>>,
    beads: Vec<TemplateBead>,
    role_bead: Vec<Option<usize>>,
    interactions: Vec<TemplateInteraction>,
    link_bead: Option<usize>,
}

impl Template {
    pub fn compile(def: TemplateDef) -> Result<Self, TemplateError> {
        if def.residues.is_empty() {
            return Err(TemplateError::EmptyResidues);
        }
        let residues: Vec<Vec<String>> = def
            .residues
            .into_iter()
            .map(|spec| match spec {
                ResidueSpec::Name(name) => vec![name],
                ResidueSpec::Alternatives(names) => names,
            })
            .collect();
        let span = residues.len();

        let mut roles = Vec::with_capacity(def.atoms.len());
        let mut role_index = HashMap::with_capacity(def.atoms.len());
        for atom in def.atoms {
            if role_index.contains_key(&atom.name) {
                return Err(TemplateError::DuplicateRole(atom.name));
            }
            if atom.residue >= span {
                return Err(TemplateError::ResidueOffsetOutOfRange {
                    role: atom.name,
                    offset: atom.residue,
                    span,
                });
            }
            let requirement = atom.requirement.unwrap_or(if atom.element.is_hydrogen() {
                Requirement::Optional
            } else {
                Requirement::Required
            });
            role_index.insert(atom.name.clone(), roles.len());
            roles.push(AtomRole {
                name: atom.name,
                element: atom.element,
                aliases: atom.aliases,
                requirement,
                priority: atom.priority,
                residue: atom.residue,
            });
        }

        let find_role = |name: &str| {
            role_index
                .get(name)
                .copied()
                .ok_or_else(|| TemplateError::UnknownRole(name.to_string()))
        };

        let mut adjacency = vec![Vec::new(); roles.len()];
        for [a, b] in &def.edges {
            let (a, b) = (find_role(a)?, find_role(b)?);
            if a != b && !adjacency[a].contains(&b) {
                adjacency[a].push(b);
                adjacency[b].push(a);
            }
        }

        let mut beads: Vec<TemplateBead> = Vec::with_capacity(def.beads.len());
        let mut bead_index: HashMap<String, usize> = HashMap::new();
        let mut role_bead = vec![None; roles.len()];
        for bead in def.beads {
            if bead_index.contains_key(&bead.name) {
                return Err(TemplateError::DuplicateBead(bead.name));
            }
            if bead.atoms.is_empty() {
                return Err(TemplateError::EmptyBead(bead.name));
            }
            let index = beads.len();
            let mut members = Vec::with_capacity(bead.atoms.len());
            for member in &bead.atoms {
                let (atom, weight) = member.parts();
                let role = find_role(atom)?;
                if let Some(previous) = role_bead[role] {
                    let first: &TemplateBead = &beads[previous];
                    return Err(TemplateError::OverlappingBeads {
                        role: atom.to_string(),
                        first: first.name.clone(),
                        second: bead.name.clone(),
                    });
                }
                role_bead[role] = Some(index);
                members.push((role, weight));
            }
            bead_index.insert(bead.name.clone(), index);
            beads.push(TemplateBead {
                name: bead.name,
                bead_type: bead.bead_type,
                type_by_context: bead.type_by_context,
                members,
                charge: bead.charge,
                mass: bead.mass,
            });
        }

        let find_bead = |name: &str| {
            bead_index
                .get(name)
                .copied()
                .ok_or_else(|| TemplateError::UnknownBead(name.to_string()))
        };

        let mut interactions = Vec::with_capacity(def.interactions.len());
        for interaction in def.interactions {
            let expected = interaction.kind.arity();
            if interaction.beads.len() != expected {
                return Err(TemplateError::WrongArity {
                    kind: interaction.kind,
                    expected,
                    found: interaction.beads.len(),
                });
            }
            if let Some(spec) = &interaction.parameters {
                spec.validate(interaction.kind)
                    .map_err(|message| TemplateError::InvalidParameters {
                        kind: interaction.kind,
                        beads: interaction.beads.clone(),
                        message,
                    })?;
            }
            let bead_ids = interaction
                .beads
                .iter()
                .map(|name| find_bead(name))
                .collect::<Result<Vec<_>, _>>()?;
            interactions.push(TemplateInteraction {
                kind: interaction.kind,
                beads: bead_ids,
                parameters: interaction.parameters,
            });
        }

        let link_bead = def.link_bead.as_deref().map(find_bead).transpose()?;

        Ok(Self {
            name: def.name,
            residues,
            context: def.context,
            priority: def.priority,
            roles,
            role_index,
            adjacency,
            beads,
            role_bead,
            interactions,
            link_bead,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accepted residue names per template position.
    pub fn residues(&self) -> &[Vec<String>] {
        &self.residues
    }

    /// Number of consecutive residues the template covers.
    pub fn span(&self) -> usize {
        self.residues.len()
    }

    pub fn context(&self) -> Option<StructureClass> {
        self.context
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn roles(&self) -> &[AtomRole] {
        &self.roles
    }

    pub fn role(&self, index: usize) -> &AtomRole {
        &self.roles[index]
    }

    pub fn role_index(&self, name: &str) -> Option<usize> {
        self.role_index.get(name).copied()
    }

    pub fn neighbors(&self, role: usize) -> &[usize] {
        &self.adjacency[role]
    }

    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        self.adjacency[a].contains(&b)
    }

    pub fn beads(&self) -> &[TemplateBead] {
        &self.beads
    }

    pub fn bead_of_role(&self, role: usize) -> Option<usize> {
        self.role_bead[role]
    }

    pub fn interactions(&self) -> &[TemplateInteraction] {
        &self.interactions
    }

    pub fn link_bead(&self) -> Option<usize> {
        self.link_bead
    }

    pub fn required_count(&self) -> usize {
        self.roles.iter().filter(|r| r.is_required()).count()
    }

    /// Whether the template can start at a residue with this name.
    pub fn starts_with(&self, residue_name: &str) -> bool {
        self.residues
            .first()
            .is_some_and(|names| names.iter().any(|n| n == residue_name))
    }

    /// Whether the names fit the template positions one to one.
    pub fn matches_residues(&self, names: &[&str]) -> bool {
        names.len() == self.residues.len()
            && self
                .residues
                .iter()
                .zip(names)
                .all(|(accepted, name)| accepted.iter().any(|a| a == name))
    }
}
