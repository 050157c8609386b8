//! # Bonded Parameters
//!
//! Interaction kinds, parameter tables and the resolver that completes the
//! bonded terms of a [`CoarseGrainedGraph`](crate::core::models::coarse::CoarseGrainedGraph).
//!
//! ## Key Components
//!
//! - [`term`] - Interaction kinds, term origins and resolved parameter values
//! - [`params`] - Parameter specs as written in files and the [`params::ParameterTable`]
//!   keyed by bead types and structure class, including the embedded Martini 2.2 table
//! - [`resolver`] - Per-term resolution: explicit template values, then the table,
//!   then the configured default
//!
//! Distances are in nm and angles in degrees, as GROMACS expects them.

pub mod params;
pub mod resolver;
pub mod term;
