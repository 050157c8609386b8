//! # Core Module
//!
//! Data models and algorithms that the mapping engine is built from.
//!
//! ## Architecture
//!
//! - **Molecule Graph** ([`models`]) - Atoms, residues, chains and bonds of the input, plus the
//!   coarse-grained graph produced from them
//! - **Secondary Structure** ([`dssp`]) - Labels, DSSP readers and the annotator
//! - **Templates** ([`templates`]) - Residue templates and the library that looks them up
//! - **Matching** ([`matching`]) - Subgraph isomorphism of templates onto fragments
//! - **Bonded Parameters** ([`forcefield`]) - Parameter tables and term resolution
//! - **File I/O** ([`io`]) - PDB input, PDB and ITP output
//! - **Utilities** ([`utils`]) - Geometry helpers
//!
//! Positions are kept in Angstroms as read; conversion to nm happens when
//! parameters are measured or written.

pub mod dssp;
pub mod forcefield;
pub mod io;
pub mod matching;
pub mod models;
pub mod templates;
pub mod utils;
