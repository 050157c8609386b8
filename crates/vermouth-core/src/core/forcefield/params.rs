use super::term::{BondedParameters, InteractionKind, TermOrigin};
use crate::core::dssp::StructureClass;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Bead type pattern matching any type.
pub const WILDCARD: &str = "*";

/// Parameters as written in a template or parameter file.
///
/// A `measured` spec takes its equilibrium value from the bead geometry at
/// resolution time.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ParameterSpec {
    #[serde(default)]
    pub function: Option<u8>,
    #[serde(default)]
    pub equilibrium: Option<f64>,
    #[serde(default)]
    pub force_constant: Option<f64>,
    #[serde(default)]
    pub multiplicity: Option<u32>,
    #[serde(default)]
    pub measured: bool,
}

impl ParameterSpec {
    /// Checks that the spec carries every value the interaction kind needs.
    pub fn validate(&self, kind: InteractionKind) -> Result<(), String> {
        if !self.measured && self.equilibrium.is_none() {
            return Err(format!("{kind} parameters need an equilibrium value or `measured`"));
        }
        if kind.requires_force_constant() && self.force_constant.is_none() {
            return Err(format!("{kind} parameters need a force constant"));
        }
        if kind == InteractionKind::Dihedral
            && self.function_for(kind) == 1
            && self.multiplicity.is_none()
        {
            return Err("proper dihedrals need a multiplicity".to_string());
        }
        Ok(())
    }

    pub fn function_for(&self, kind: InteractionKind) -> u8 {
        self.function.unwrap_or_else(|| kind.default_function())
    }

    /// Final parameters, or `None` when the equilibrium value is unavailable.
    pub fn resolve(&self, kind: InteractionKind, measured: Option<f64>) -> Option<BondedParameters> {
        let equilibrium = if self.measured {
            measured?
        } else {
            self.equilibrium?
        };
        Some(BondedParameters {
            function: self.function_for(kind),
            equilibrium,
            force_constant: self.force_constant,
            multiplicity: self.multiplicity,
        })
    }
}

/// One row of a parameter table.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterEntry {
    pub types: Vec<String>,
    pub context: Option<StructureClass>,
    pub scope: Option<TermOrigin>,
    pub spec: ParameterSpec,
}

impl ParameterEntry {
    fn is_wildcard(&self) -> bool {
        self.types.iter().any(|t| t == WILDCARD)
    }

    fn matches_types(&self, types: &[&str]) -> bool {
        let matches =
            |pattern: &String, bead_type: &&str| pattern == WILDCARD || pattern.as_str() == *bead_type;
        self.types.len() == types.len()
            && (self.types.iter().zip(types).all(|(p, t)| matches(p, t))
                || self.types.iter().rev().zip(types).all(|(p, t)| matches(p, t)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawEntry {
    types: Vec<String>,
    #[serde(default)]
    context: Option<StructureClass>,
    #[serde(default)]
    scope: Option<TermOrigin>,
    #[serde(default)]
    function: Option<u8>,
    #[serde(default)]
    equilibrium: Option<f64>,
    #[serde(default)]
    force_constant: Option<f64>,
    #[serde(default)]
    multiplicity: Option<u32>,
    #[serde(default)]
    measured: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ParameterFile {
    #[serde(default)]
    default: HashMap<InteractionKind, ParameterSpec>,
    #[serde(default)]
    bonds: Vec<RawEntry>,
    #[serde(default)]
    constraints: Vec<RawEntry>,
    #[serde(default)]
    angles: Vec<RawEntry>,
    #[serde(default)]
    dihedrals: Vec<RawEntry>,
    #[serde(default)]
    impropers: Vec<RawEntry>,
}

/// Bonded parameters keyed by interaction kind, bead types and structure class.
#[derive(Debug, Clone, Default)]
pub struct ParameterTable {
    entries: HashMap<InteractionKind, Vec<ParameterEntry>>,
    defaults: HashMap<InteractionKind, ParameterSpec>,
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid parameter entry in '{path}': {message}")]
    Invalid { path: String, message: String },
}

static BUILTIN: Lazy<Result<ParameterTable, String>> = Lazy::new(|| {
    ParameterTable::from_toml_str(
        include_str!("../../../data/parameters/martini22.toml"),
        "<builtin martini22>",
    )
    .map_err(|e| e.to_string())
});

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content, &path.to_string_lossy())
    }

    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ParamLoadError> {
        let file: ParameterFile = toml::from_str(content).map_err(|e| ParamLoadError::Toml {
            path: origin.to_string(),
            source: e,
        })?;

        let mut table = Self::new();
        for (kind, spec) in file.default {
            spec.validate(kind).map_err(|message| ParamLoadError::Invalid {
                path: origin.to_string(),
                message: format!("default {kind}: {message}"),
            })?;
            table.defaults.insert(kind, spec);
        }

        let sections = [
            (InteractionKind::Bond, file.bonds),
            (InteractionKind::Constraint, file.constraints),
            (InteractionKind::Angle, file.angles),
            (InteractionKind::Dihedral, file.dihedrals),
            (InteractionKind::Improper, file.impropers),
        ];
        for (kind, raws) in sections {
            for raw in raws {
                let entry = ParameterEntry {
                    spec: ParameterSpec {
                        function: raw.function,
                        equilibrium: raw.equilibrium,
                        force_constant: raw.force_constant,
                        multiplicity: raw.multiplicity,
                        measured: raw.measured,
                    },
                    types: raw.types,
                    context: raw.context,
                    scope: raw.scope,
                };
                table
                    .insert(kind, entry)
                    .map_err(|message| ParamLoadError::Invalid {
                        path: origin.to_string(),
                        message,
                    })?;
            }
        }
        Ok(table)
    }

    /// The embedded Martini 2.2 protein backbone parameters.
    pub fn builtin() -> Result<&'static ParameterTable, ParamLoadError> {
        BUILTIN.as_ref().map_err(|message| ParamLoadError::Invalid {
            path: "<builtin martini22>".to_string(),
            message: message.clone(),
        })
    }

    /// Adds an entry. Later entries take precedence over earlier equivalent ones.
    pub fn insert(&mut self, kind: InteractionKind, entry: ParameterEntry) -> Result<(), String> {
        if entry.types.len() != kind.arity() {
            return Err(format!(
                "{kind} entry {:?} has {} types, expected {}",
                entry.types,
                entry.types.len(),
                kind.arity()
            ));
        }
        entry
            .spec
            .validate(kind)
            .map_err(|message| format!("{kind} entry {:?}: {message}", entry.types))?;
        self.entries.entry(kind).or_default().push(entry);
        Ok(())
    }

    pub fn set_default(&mut self, kind: InteractionKind, spec: ParameterSpec) {
        self.defaults.insert(kind, spec);
    }

    /// Appends the entries and defaults of `other`, which then take precedence.
    pub fn merge(&mut self, other: ParameterTable) {
        for (kind, entries) in other.entries {
            self.entries.entry(kind).or_default().extend(entries);
        }
        self.defaults.extend(other.defaults);
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most specific entry for the term: exact types before wildcards, then a
    /// matching structure class before class-independent entries. Ties go to
    /// the entry added last. Keys match forward or reversed.
    pub fn lookup(
        &self,
        kind: InteractionKind,
        types: &[&str],
        context: StructureClass,
        origin: TermOrigin,
    ) -> Option<&ParameterSpec> {
        let entries = self.entries.get(&kind)?;
        let mut best: Option<((bool, bool), &ParameterEntry)> = None;

        for entry in entries.iter().rev() {
            if entry.context.is_some_and(|c| c != context)
                || entry.scope.is_some_and(|s| s != origin)
                || !entry.matches_types(types)
            {
                continue;
            }
            let rank = (entry.is_wildcard(), entry.context.is_none());
            if best.as_ref().is_none_or(|(current, _)| rank < *current) {
                best = Some((rank, entry));
            }
        }
        best.map(|(_, entry)| &entry.spec)
    }

    pub fn default_for(&self, kind: InteractionKind) -> Option<&ParameterSpec> {
        self.defaults.get(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const TABLE: &str = r#"
        [default.bond]
        equilibrium = 0.47
        force-constant = 1250.0

        [[bonds]]
        types = ["*", "*"]
        scope = "backbone"
        equilibrium = 0.35
        force-constant = 1250.0

        [[bonds]]
        types = ["*", "*"]
        context = "sheet"
        scope = "backbone"
        equilibrium = 0.365
        force-constant = 1250.0

        [[bonds]]
        types = ["C5", "P5"]
        equilibrium = 0.31
        force-constant = 7500.0

        [[angles]]
        types = ["*", "*", "*"]
        context = "helix"
        equilibrium = 96.0
        force-constant = 700.0
    "#;

    fn table() -> ParameterTable {
        ParameterTable::from_toml_str(TABLE, "test").unwrap()
    }

    #[test]
    fn exact_types_beat_wildcards() {
        let table = table();
        let spec = table
            .lookup(InteractionKind::Bond, &["P5", "C5"], StructureClass::Coil, TermOrigin::Backbone)
            .unwrap();
        assert_eq!(spec.equilibrium, Some(0.31));
    }

    #[test]
    fn class_specific_entries_beat_generic_ones() {
        let table = table();
        let sheet = table
            .lookup(InteractionKind::Bond, &["Nda", "Nda"], StructureClass::Sheet, TermOrigin::Backbone)
            .unwrap();
        assert_eq!(sheet.equilibrium, Some(0.365));
        let coil = table
            .lookup(InteractionKind::Bond, &["P5", "P5"], StructureClass::Coil, TermOrigin::Backbone)
            .unwrap();
        assert_eq!(coil.equilibrium, Some(0.35));
    }

    #[test]
    fn scoped_entries_only_match_their_origin() {
        let table = table();
        assert!(table
            .lookup(InteractionKind::Bond, &["P5", "P5"], StructureClass::Coil, TermOrigin::Template)
            .is_none());
        assert_eq!(
            table.default_for(InteractionKind::Bond).unwrap().equilibrium,
            Some(0.47)
        );
    }

    #[test]
    fn merged_entries_override_earlier_ones() {
        let mut base = table();
        let overrides = ParameterTable::from_toml_str(
            r#"
            [[bonds]]
            types = ["P5", "C5"]
            equilibrium = 0.29
            force-constant = 5000.0
            "#,
            "override",
        )
        .unwrap();
        base.merge(overrides);
        let spec = base
            .lookup(InteractionKind::Bond, &["C5", "P5"], StructureClass::Helix, TermOrigin::Template)
            .unwrap();
        assert_eq!(spec.equilibrium, Some(0.29));
    }

    #[test]
    fn entry_with_wrong_arity_is_invalid() {
        let result = ParameterTable::from_toml_str(
            "[[angles]]\ntypes = [\"A\", \"B\"]\nequilibrium = 120.0\nforce-constant = 25.0\n",
            "bad",
        );
        assert!(matches!(result, Err(ParamLoadError::Invalid { .. })));
    }

    #[test]
    fn entry_without_equilibrium_is_invalid() {
        let result = ParameterTable::from_toml_str(
            "[[bonds]]\ntypes = [\"A\", \"B\"]\nforce-constant = 25.0\n",
            "bad",
        );
        assert!(matches!(result, Err(ParamLoadError::Invalid { .. })));
    }

    #[test]
    fn measured_spec_uses_geometry() {
        let spec = ParameterSpec {
            measured: true,
            force_constant: Some(500.0),
            ..ParameterSpec::default()
        };
        let params = spec.resolve(InteractionKind::Bond, Some(0.42)).unwrap();
        assert_eq!(params.equilibrium, 0.42);
        assert_eq!(params.function, 1);
        assert!(spec.resolve(InteractionKind::Bond, None).is_none());
    }

    #[test]
    fn builtin_table_parses() {
        let table = ParameterTable::builtin().unwrap();
        assert!(!table.is_empty());
        let helix = table
            .lookup(InteractionKind::Angle, &["N0", "N0", "N0"], StructureClass::Helix, TermOrigin::Backbone)
            .unwrap();
        assert_eq!(helix.equilibrium, Some(96.0));
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let result = ParameterTable::load(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ParamLoadError::Io { .. })));
    }

    #[test]
    fn load_fails_for_malformed_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("malformed.toml");
        fs::write(&path, "this is not toml").unwrap();
        assert!(matches!(
            ParameterTable::load(&path),
            Err(ParamLoadError::Toml { .. })
        ));
    }
}
