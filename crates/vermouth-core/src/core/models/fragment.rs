use super::atom::Atom;
use super::ids::{AtomId, ResidueId};
use super::system::MolecularSystem;
use std::collections::HashMap;

/// Induced subgraph of one or more consecutive residues.
///
/// Atoms are addressed by a dense local index (residue order, then input
/// order) so the matcher can track them in bit sets. Only bonds with both
/// ends inside the fragment are kept.
#[derive(Debug, Clone)]
pub struct Fragment<'a> {
    system: &'a MolecularSystem,
    residues: Vec<ResidueId>,
    atoms: Vec<AtomId>,
    residue_offsets: Vec<usize>,
    local_index: HashMap<AtomId, usize>,
    adjacency: Vec<Vec<usize>>,
}

impl<'a> Fragment<'a> {
    pub(crate) fn new(system: &'a MolecularSystem, residues: &[ResidueId]) -> Self {
        let mut atoms = Vec::new();
        let mut residue_offsets = Vec::new();
        for (offset, &residue_id) in residues.iter().enumerate() {
            if let Some(residue) = system.residue(residue_id) {
                for &atom_id in residue.atoms() {
                    atoms.push(atom_id);
                    residue_offsets.push(offset);
                }
            }
        }

        let local_index: HashMap<AtomId, usize> =
            atoms.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let adjacency = atoms
            .iter()
            .map(|&atom_id| {
                let mut neighbors: Vec<usize> = system
                    .get_bonded_neighbors(atom_id)
                    .iter()
                    .filter_map(|n| local_index.get(n).copied())
                    .collect();
                neighbors.sort_unstable();
                neighbors
            })
            .collect();

        Self {
            system,
            residues: residues.to_vec(),
            atoms,
            residue_offsets,
            local_index,
            adjacency,
        }
    }

    pub fn system(&self) -> &'a MolecularSystem {
        self.system
    }

    pub fn residues(&self) -> &[ResidueId] {
        &self.residues
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atom_ids(&self) -> &[AtomId] {
        &self.atoms
    }

    pub fn atom_id(&self, local: usize) -> AtomId {
        self.atoms[local]
    }

    pub fn atom(&self, local: usize) -> Option<&'a Atom> {
        self.system.atom(self.atoms[local])
    }

    /// Position of the atom's residue inside the fragment (0 for the first residue).
    pub fn residue_offset(&self, local: usize) -> usize {
        self.residue_offsets[local]
    }

    pub fn local_index(&self, atom_id: AtomId) -> Option<usize> {
        self.local_index.get(&atom_id).copied()
    }

    pub fn neighbors(&self, local: usize) -> &[usize] {
        &self.adjacency[local]
    }

    pub fn degree(&self, local: usize) -> usize {
        self.adjacency[local].len()
    }

    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        self.adjacency[a].binary_search(&b).is_ok()
    }

    /// Human-readable label such as `A:12 LYS` or `A:12 ALA-A:13 GLY`.
    pub fn label(&self) -> String {
        self.residues
            .iter()
            .filter_map(|&id| self.system.residue(id))
            .map(|residue| {
                let chain = self
                    .system
                    .chain(residue.chain_id)
                    .map(|c| c.id)
                    .unwrap_or('?');
                format!("{}:{} {}", chain, residue.number_label(), residue.name)
            })
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::topology::BondOrigin;
    use nalgebra::Point3;

    fn two_residue_system() -> (MolecularSystem, Vec<ResidueId>) {
        let mut system = MolecularSystem::new();
        let chain = system.add_chain('A');
        let r1 = system.add_residue(chain, 1, "GLY").unwrap();
        let r2 = system.add_residue(chain, 2, "ALA").unwrap();
        let n1 = system
            .add_atom_to_residue(r1, Atom::new("N", Element::N, r1, Point3::origin()))
            .unwrap();
        let c1 = system
            .add_atom_to_residue(r1, Atom::new("C", Element::C, r1, Point3::new(1.0, 0.0, 0.0)))
            .unwrap();
        let n2 = system
            .add_atom_to_residue(r2, Atom::new("N", Element::N, r2, Point3::new(2.0, 0.0, 0.0)))
            .unwrap();
        system.add_bond(n1, c1, BondOrigin::Declared).unwrap();
        system.add_bond(c1, n2, BondOrigin::Declared).unwrap();
        (system, vec![r1, r2])
    }

    #[test]
    fn single_residue_fragment_drops_external_bonds() {
        let (system, residues) = two_residue_system();
        let fragment = system.fragment(&residues[..1]);
        assert_eq!(fragment.len(), 2);
        assert_eq!(fragment.degree(1), 1);
        assert!(fragment.has_edge(0, 1));
        assert_eq!(fragment.label(), "A:1 GLY");
    }

    #[test]
    fn multi_residue_fragment_tracks_offsets() {
        let (system, residues) = two_residue_system();
        let fragment = system.fragment(&residues);
        assert_eq!(fragment.len(), 3);
        assert_eq!(fragment.residue_offset(0), 0);
        assert_eq!(fragment.residue_offset(2), 1);
        assert!(fragment.has_edge(1, 2));
        assert!(!fragment.has_edge(0, 2));
        assert_eq!(fragment.label(), "A:1 GLY-A:2 ALA");
    }

    #[test]
    fn local_index_round_trips_atom_ids() {
        let (system, residues) = two_residue_system();
        let fragment = system.fragment(&residues);
        for local in 0..fragment.len() {
            assert_eq!(fragment.local_index(fragment.atom_id(local)), Some(local));
        }
    }
}
