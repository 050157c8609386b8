//! # Molecule Graph
//!
//! In-memory representation of atomistic structures and of the coarse-grained
//! graphs derived from them.
//!
//! ## Key Components
//!
//! - [`system`] - The [`MolecularSystem`](system::MolecularSystem): atoms, bonds, residues, chains
//!   and the cached adjacency used for neighbor queries
//! - [`builder`] - Construction from serial-numbered records with structural validation
//! - [`fragment`] - Induced subgraphs over consecutive residues, the unit of template matching
//! - [`bonding`] - Bond perception from covalent radii
//! - [`coarse`] - Beads, bonded terms and the [`CoarseGrainedGraph`](coarse::CoarseGrainedGraph)
//! - [`molecules`] - Connected molecules of a coarse-grained graph and the moleculetypes they share
//! - [`atom`], [`element`], [`residue`], [`chain`], [`topology`], [`ids`] - The node and edge types
//!
//! `AtomId` keys are stable for the lifetime of a system. Once built, a system
//! is only mutated by the secondary-structure annotator.
//!
//! ```ignore
//! use vermouth::core::models::builder::MolecularSystemBuilder;
//!
//! let mut builder = MolecularSystemBuilder::new();
//! builder.start_chain('A').start_residue(1, "GLY");
//! builder.add_atom(1, "N", Element::N, Point3::origin())?;
//! let system = builder.build()?;
//! ```

pub mod atom;
pub mod bonding;
pub mod builder;
pub mod chain;
pub mod coarse;
pub mod element;
pub mod fragment;
pub mod ids;
pub mod molecules;
pub mod residue;
pub mod system;
pub mod topology;
