use super::modification::{Modification, ModificationDef};
use super::template::{Template, TemplateDef, TemplateError};
use crate::core::dssp::StructureClass;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// How templates of the same tier are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplatePrecedence {
    /// Higher declared priority first, ties broken by name.
    #[default]
    DeclaredPriority,
    /// Templates registered later first, so user files shadow built-ins.
    RegistrationOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LookupPolicy {
    pub precedence: TemplatePrecedence,
    /// Template used when no candidate exists for a residue.
    pub fallback: Option<String>,
}

#[derive(Debug, Error)]
pub enum TemplateLoadError {
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
    #[error("Invalid template '{template}' in '{path}': {source}")]
    Invalid {
        path: String,
        template: String,
        source: TemplateError,
    },
    #[error("Built-in template library is invalid: {0}")]
    Builtin(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateFile {
    #[serde(default, rename = "template")]
    templates: Vec<TemplateDef>,
    #[serde(default, rename = "modification")]
    modifications: Vec<ModificationDef>,
}

#[derive(Debug, Clone)]
struct Entry {
    template: Arc<Template>,
    seq: usize,
}

/// Named templates with residue-based lookup, plus the modifications that
/// may decorate the residues they map.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    entries: HashMap<String, Entry>,
    next_seq: usize,
    modifications: HashMap<String, Arc<Modification>>,
}

static BUILTIN: Lazy<Result<TemplateLibrary, String>> = Lazy::new(|| {
    TemplateLibrary::from_toml_str(
        include_str!("../../../data/templates/martini22.toml"),
        "<builtin martini22>",
    )
    .map_err(|e| e.to_string())
});

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, TemplateLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| TemplateLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content, &path.to_string_lossy())
    }

    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, TemplateLoadError> {
        let file: TemplateFile = toml::from_str(content).map_err(|e| TemplateLoadError::Toml {
            path: origin.to_string(),
            source: e,
        })?;

        let mut library = Self::new();
        for def in file.templates {
            let name = def.name.clone();
            let template = Template::compile(def).map_err(|source| TemplateLoadError::Invalid {
                path: origin.to_string(),
                template: name,
                source,
            })?;
            library.register(template);
        }
        for def in file.modifications {
            let name = def.name.clone();
            let modification =
                Modification::compile(def).map_err(|source| TemplateLoadError::Invalid {
                    path: origin.to_string(),
                    template: name,
                    source,
                })?;
            library.register_modification(modification);
        }
        debug!(
            origin,
            templates = library.len(),
            modifications = library.modification_count(),
            "Loaded template library."
        );
        Ok(library)
    }

    /// The embedded Martini 2.2 protein templates, parsed once per process.
    pub fn builtin() -> Result<&'static TemplateLibrary, TemplateLoadError> {
        BUILTIN
            .as_ref()
            .map_err(|message| TemplateLoadError::Builtin(message.clone()))
    }

    /// Adds a template, replacing any template of the same name.
    pub fn register(&mut self, template: Template) -> Option<Arc<Template>> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries
            .insert(
                template.name().to_string(),
                Entry {
                    template: Arc::new(template),
                    seq,
                },
            )
            .map(|previous| previous.template)
    }

    /// Registers every template of `other` in its registration order.
    pub fn merge(&mut self, other: TemplateLibrary) {
        let mut incoming: Vec<Entry> = other.entries.into_values().collect();
        incoming.sort_by_key(|entry| entry.seq);
        for entry in incoming {
            let template = Arc::unwrap_or_clone(entry.template);
            self.register(template);
        }
        self.modifications.extend(other.modifications);
    }

    /// Adds a modification, replacing any modification of the same name.
    pub fn register_modification(
        &mut self,
        modification: Modification,
    ) -> Option<Arc<Modification>> {
        self.modifications
            .insert(modification.name().to_string(), Arc::new(modification))
    }

    pub fn modification_count(&self) -> usize {
        self.modifications.len()
    }

    /// Modifications that may decorate a residue, largest first, then by
    /// priority and name.
    pub fn modifications_for(&self, residue_name: &str) -> Vec<Arc<Modification>> {
        let mut found: Vec<&Arc<Modification>> = self
            .modifications
            .values()
            .filter(|m| m.applies_to(residue_name))
            .collect();
        found.sort_by(|a, b| {
            (Reverse(a.modified_count()), Reverse(a.priority()))
                .cmp(&(Reverse(b.modified_count()), Reverse(b.priority())))
                .then_with(|| a.name().cmp(b.name()))
        });
        found.into_iter().map(Arc::clone).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Template>> {
        self.entries.get(name).map(|e| Arc::clone(&e.template))
    }

    /// Residue names any template can start at, sorted.
    pub fn residue_names(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .filter_map(|e| e.template.residues().first())
            .flatten()
            .cloned()
            .collect()
    }

    pub fn templates(&self) -> impl Iterator<Item = &Arc<Template>> {
        self.entries.values().map(|e| &e.template)
    }

    pub fn lookup(
        &self,
        residue_name: &str,
        class: StructureClass,
    ) -> Result<Vec<Arc<Template>>, TemplateError> {
        self.lookup_with(residue_name, class, &LookupPolicy::default())
    }

    /// Candidate templates for a residue, best first: templates declared for
    /// `class` before generic ones, then multi-residue before single-residue
    /// templates, then the precedence policy.
    pub fn lookup_with(
        &self,
        residue_name: &str,
        class: StructureClass,
        policy: &LookupPolicy,
    ) -> Result<Vec<Arc<Template>>, TemplateError> {
        let mut candidates: Vec<&Entry> = self
            .entries
            .values()
            .filter(|e| e.template.starts_with(residue_name))
            .filter(|e| e.template.context().is_none_or(|c| c == class))
            .collect();

        match policy.precedence {
            TemplatePrecedence::DeclaredPriority => candidates.sort_by(|a, b| {
                let key = |e: &Entry| {
                    (
                        e.template.context().is_none(),
                        Reverse(e.template.span()),
                        Reverse(e.template.priority()),
                    )
                };
                key(a)
                    .cmp(&key(b))
                    .then_with(|| a.template.name().cmp(b.template.name()))
            }),
            TemplatePrecedence::RegistrationOrder => candidates.sort_by_key(|e| {
                (
                    e.template.context().is_none(),
                    Reverse(e.template.span()),
                    Reverse(e.seq),
                )
            }),
        }

        if candidates.is_empty() {
            if let Some(fallback) = policy.fallback.as_deref().and_then(|name| self.get(name)) {
                return Ok(vec![fallback]);
            }
            return Err(TemplateError::UnknownResidue {
                residue: residue_name.to_string(),
                context: class,
            });
        }

        Ok(candidates
            .into_iter()
            .map(|e| Arc::clone(&e.template))
            .collect())
    }
}
