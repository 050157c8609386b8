//! # Engine Module
//!
//! Turns an annotated molecule graph into a coarse-grained graph.
//!
//! ## Overview
//!
//! The engine walks every chain, groups residues into fragments, matches each
//! fragment against the template library and assembles beads and bonded terms
//! from the matches. Parameters are resolved afterwards and an optional
//! elastic network is laid over the backbone.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Failure policy, weighting rule, template precedence and elastic network settings
//! - **Mapping** ([`mapper`]) - Fragment matching and bead/term assembly, one chain per rayon task
//! - **Elastic network** ([`elastic`]) - Rubber bands between backbone beads of a chain
//! - **Diagnostics** ([`diagnostics`]) - Everything a permissive run skipped
//! - **Progress Monitoring** ([`progress`]) - Progress callbacks for front ends
//! - **Error Handling** ([`error`]) - The [`error::EngineError`] taxonomy

pub mod config;
pub mod diagnostics;
pub mod elastic;
pub mod error;
pub mod mapper;
pub mod progress;
