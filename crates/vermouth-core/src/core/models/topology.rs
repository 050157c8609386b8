use super::ids::AtomId;
use std::fmt;

/// Where a covalent bond of the molecule graph came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondOrigin {
    /// Read from the input (CONECT records) or added by the caller.
    #[default]
    Declared,
    /// Perceived from interatomic distances and covalent radii.
    Perceived,
}

impl fmt::Display for BondOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Declared => "declared",
            Self::Perceived => "perceived",
        })
    }
}

/// Undirected covalent bond between two atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub atom1_id: AtomId,
    pub atom2_id: AtomId,
    pub origin: BondOrigin,
}

impl Bond {
    pub fn new(atom1_id: AtomId, atom2_id: AtomId, origin: BondOrigin) -> Self {
        Self {
            atom1_id,
            atom2_id,
            origin,
        }
    }

    pub fn contains(&self, atom_id: AtomId) -> bool {
        self.atom1_id == atom_id || self.atom2_id == atom_id
    }

    /// The atom on the other side of the bond, if `atom_id` is part of it.
    pub fn partner(&self, atom_id: AtomId) -> Option<AtomId> {
        match atom_id {
            id if id == self.atom1_id => Some(self.atom2_id),
            id if id == self.atom2_id => Some(self.atom1_id),
            _ => None,
        }
    }
}
