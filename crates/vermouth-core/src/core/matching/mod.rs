//! # Subgraph Matching
//!
//! Maps the atom roles of a [`Template`](crate::core::templates::Template)
//! injectively onto the atoms of a [`Fragment`](crate::core::models::fragment::Fragment).
//!
//! The search is a backtracking walk over an explicit stack of frames. Roles
//! are visited required first, then by priority, then in declaration order.
//! Candidate atoms are filtered by element, residue offset and degree. Atoms
//! whose name matches the role come first, so equal inputs always give equal
//! assignments.

pub mod matcher;

pub use matcher::{Match, MatchError, PartialCoverage, SubgraphMatcher};
