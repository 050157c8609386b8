//! # Vermouth Core Library
//!
//! Graph-based mapping of atomistic molecular structures onto coarse-grained
//! Martini models.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture.
//!
//! - **[`core`]: The Foundation.** The molecule graph, secondary-structure labels,
//!   templates, the subgraph matcher, bonded parameter tables and file I/O. Nothing
//!   here knows about a whole mapping run.
//!
//! - **[`engine`]: The Logic Core.** Configuration, fragment-by-fragment mapping,
//!   the elastic network, diagnostics, progress reporting and the error taxonomy.
//!
//! - **[`workflows`]: The Public API.** [`workflows::martinize::run`] ties the layers
//!   together: annotate, map, resolve parameters, add rubber bands.

pub mod core;
pub mod engine;
pub mod workflows;
