//! # Workflows Module
//!
//! High-level entry points that run a complete mapping, from an atomistic
//! molecule graph to a parameterized coarse-grained graph.
//!
//! ## Overview
//!
//! A workflow loads or receives the shared resources (template library and
//! parameter table), attaches secondary structure, maps every chain, resolves
//! bonded parameters and optionally adds an elastic network. Progress is
//! reported phase by phase and everything that was skipped ends up in the
//! returned diagnostic report.
//!
//! - **Martinize Workflow** ([`martinize`]) - Protein coarse-graining onto Martini templates

pub mod martinize;
