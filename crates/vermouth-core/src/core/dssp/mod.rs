//! # Secondary Structure
//!
//! Per-residue secondary-structure labels, the readers for external DSSP
//! output, and the annotator that attaches labels to a
//! [`MolecularSystem`](crate::core::models::system::MolecularSystem).
//!
//! Labels select structure-dependent templates and bonded parameters through
//! their coarse [`StructureClass`].

pub mod annotator;
pub mod label;
pub mod reader;

pub use label::{SecondaryStructure, StructureClass};
