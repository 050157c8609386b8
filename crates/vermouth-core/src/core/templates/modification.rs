use super::template::{
    AtomRoleDef, BeadDefinition, InteractionDefinition, ResidueSpec, Template, TemplateDef,
    TemplateError,
};
use crate::core::forcefield::params::ParameterSpec;
use crate::core::forcefield::term::InteractionKind;
use serde::Deserialize;

/// A modification as written in a TOML library file.
///
/// Anchors are roles the residue template has already mapped; every other
/// role must bind an atom the residue template left over.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ModificationDef {
    pub name: String,
    /// Residue names the modification applies to. Empty means any residue.
    #[serde(default)]
    pub residues: Vec<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub anchors: Vec<String>,
    pub atoms: Vec<AtomRoleDef>,
    #[serde(default)]
    pub edges: Vec<[String; 2]>,
    #[serde(default)]
    pub beads: Vec<BeadDefinition>,
    #[serde(default)]
    pub interactions: Vec<InteractionDefinition>,
}

/// A bead an interaction of a modification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeadRef {
    /// A bead the modification adds.
    Own(usize),
    /// Whichever bead the atom bound to this anchor role belongs to.
    Anchor(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModificationInteraction {
    pub kind: InteractionKind,
    pub beads: Vec<BeadRef>,
    pub parameters: Option<ParameterSpec>,
}

/// A validated modification: a pattern over anchor and modified atom roles,
/// the beads grouping the modified atoms, and the terms tying them to the
/// residue they decorate.
#[derive(Debug, Clone, PartialEq)]
pub struct Modification {
    pattern: Template,
    residues: Vec<String>,
    anchors: Vec<bool>,
    interactions: Vec<ModificationInteraction>,
}

impl Modification {
    pub fn compile(def: ModificationDef) -> Result<Self, TemplateError> {
        let pattern = Template::compile(TemplateDef {
            name: def.name.clone(),
            residues: vec![ResidueSpec::Name(def.name)],
            context: None,
            priority: def.priority,
            link_bead: None,
            atoms: def.atoms,
            edges: def.edges,
            beads: def.beads,
            interactions: Vec::new(),
        })?;

        let mut anchors = vec![false; pattern.roles().len()];
        for name in &def.anchors {
            let role = pattern
                .role_index(name)
                .ok_or_else(|| TemplateError::UnknownRole(name.clone()))?;
            if pattern.bead_of_role(role).is_some() {
                return Err(TemplateError::AnchorInBead(name.clone()));
            }
            anchors[role] = true;
        }

        let modified = pattern
            .roles()
            .iter()
            .zip(&anchors)
            .filter(|(role, anchor)| role.is_required() && !**anchor)
            .count();
        if modified == 0 {
            return Err(TemplateError::NoModifiedAtoms);
        }

        let resolve = |name: &str| {
            if let Some(bead) = pattern.beads().iter().position(|b| b.name == name) {
                return Ok(BeadRef::Own(bead));
            }
            match pattern.role_index(name) {
                Some(role) if anchors[role] => Ok(BeadRef::Anchor(role)),
                _ => Err(TemplateError::UnknownBead(name.to_string())),
            }
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
            let beads = interaction
                .beads
                .iter()
                .map(|name| resolve(name.as_str()))
                .collect::<Result<Vec<_>, _>>()?;
            interactions.push(ModificationInteraction {
                kind: interaction.kind,
                beads,
                parameters: interaction.parameters,
            });
        }

        Ok(Self {
            pattern,
            residues: def.residues,
            anchors,
            interactions,
        })
    }

    pub fn name(&self) -> &str {
        self.pattern.name()
    }

    pub fn priority(&self) -> i32 {
        self.pattern.priority()
    }

    /// The roles, edges and beads of the modification as a single-residue
    /// template.
    pub fn pattern(&self) -> &Template {
        &self.pattern
    }

    pub fn is_anchor(&self, role: usize) -> bool {
        self.anchors.get(role).copied().unwrap_or(false)
    }

    /// Required roles that bind modified atoms.
    pub fn modified_count(&self) -> usize {
        self.pattern
            .roles()
            .iter()
            .enumerate()
            .filter(|(role, spec)| spec.is_required() && !self.is_anchor(*role))
            .count()
    }

    pub fn applies_to(&self, residue_name: &str) -> bool {
        self.residues.is_empty() || self.residues.iter().any(|r| r == residue_name)
    }

    pub fn interactions(&self) -> &[ModificationInteraction] {
        &self.interactions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::templates::template::MemberSpec;

    fn parse(text: &str) -> ModificationDef {
        toml::from_str(text).unwrap()
    }

    const PHOSPHATE: &str = r#"
        name = "phosphate"
        residues = ["SER", "THR"]
        anchors = ["OG"]
        atoms = [
            { name = "OG", element = "O", aliases = ["OG1"] },
            { name = "P", element = "P" },
            { name = "O1P", element = "O" },
            { name = "O2P", element = "O" },
            { name = "O3P", element = "O", requirement = "optional" },
        ]
        edges = [["OG", "P"], ["P", "O1P"], ["P", "O2P"], ["P", "O3P"]]

        [[beads]]
        name = "PO4"
        type = "Qa"
        charge = -2.0
        atoms = ["P", "O1P", "O2P", "O3P"]

        [[interactions]]
        kind = "bond"
        beads = ["OG", "PO4"]
        parameters = { equilibrium = 0.3, force-constant = 5000.0 }
    "#;

    #[test]
    fn compiles_anchors_beads_and_interactions() {
        let modification = Modification::compile(parse(PHOSPHATE)).unwrap();
        let og = modification.pattern().role_index("OG").unwrap();
        let p = modification.pattern().role_index("P").unwrap();
        assert!(modification.is_anchor(og));
        assert!(!modification.is_anchor(p));
        assert_eq!(modification.modified_count(), 3);
        assert_eq!(
            modification.interactions()[0].beads,
            vec![BeadRef::Anchor(og), BeadRef::Own(0)]
        );
        assert!(modification.applies_to("THR"));
        assert!(!modification.applies_to("ALA"));
    }

    #[test]
    fn empty_residue_list_applies_everywhere() {
        let mut def = parse(PHOSPHATE);
        def.residues.clear();
        assert!(Modification::compile(def).unwrap().applies_to("LYS"));
    }

    #[test]
    fn anchors_cannot_belong_to_modification_beads() {
        let mut def = parse(PHOSPHATE);
        def.beads[0].atoms.push(MemberSpec::Name("OG".to_string()));
        assert_eq!(
            Modification::compile(def).unwrap_err(),
            TemplateError::AnchorInBead("OG".to_string())
        );
    }

    #[test]
    fn a_modification_needs_modified_atoms() {
        let text = r#"
            name = "empty"
            anchors = ["OG"]
            atoms = [{ name = "OG", element = "O" }, { name = "HG", element = "H" }]
        "#;
        assert_eq!(
            Modification::compile(parse(text)).unwrap_err(),
            TemplateError::NoModifiedAtoms
        );
    }

    #[test]
    fn interactions_only_reach_own_beads_and_anchors() {
        let mut def = parse(PHOSPHATE);
        def.interactions[0].beads = vec!["BB".to_string(), "PO4".to_string()];
        assert_eq!(
            Modification::compile(def).unwrap_err(),
            TemplateError::UnknownBead("BB".to_string())
        );
    }

    #[test]
    fn unknown_anchor_is_rejected() {
        let mut def = parse(PHOSPHATE);
        def.anchors = vec!["OH".to_string()];
        assert_eq!(
            Modification::compile(def).unwrap_err(),
            TemplateError::UnknownRole("OH".to_string())
        );
    }
}
