//! # Template Library
//!
//! Residue templates describe how the atoms of one or more consecutive
//! residues group into beads and which bonded terms connect those beads.
//!
//! - [`template`] - The TOML template format and its validated, compiled form
//! - [`modification`] - Post-translational modifications matched onto atoms a
//!   residue template left over
//! - [`library`] - Lookup by residue name and structure class, user overrides and
//!   the embedded Martini 2.2 protein library

pub mod library;
pub mod modification;
pub mod template;

pub use library::{LookupPolicy, TemplateLibrary, TemplateLoadError, TemplatePrecedence};
pub use modification::Modification;
pub use template::{Requirement, Template, TemplateError};
