//! Reading atomistic structures and writing coarse-grained models.
//!
//! Structures come in as PDB files; the coarse-grained result goes out as a
//! PDB file of bead positions and a GROMACS ITP topology. Both directions go
//! through the traits in [`traits`].

pub mod itp;
pub mod pdb;
pub mod traits;
