use super::atom::Atom;
use super::chain::Chain;
use super::fragment::Fragment;
use super::ids::{AtomId, ChainId, ResidueId};
use super::residue::Residue;
use super::topology::{Bond, BondOrigin};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::{HashMap, HashSet, VecDeque};

/// The atomistic molecule graph: atoms are nodes, covalent bonds are edges.
///
/// Atoms are grouped into residues and residues into chains. Identifiers are
/// slotmap keys and stay valid for the whole mapping pipeline, because the
/// system is never structurally modified once it has been built.
#[derive(Debug, Clone, Default)]
pub struct MolecularSystem {
    /// Primary storage for atoms.
    atoms: SlotMap<AtomId, Atom>,
    /// Primary storage for residues.
    residues: SlotMap<ResidueId, Residue>,
    /// Primary storage for chains.
    chains: SlotMap<ChainId, Chain>,
    /// Chains in the order they were declared.
    chain_order: Vec<ChainId>,
    /// List of all bonds in the system.
    bonds: Vec<Bond>,
    /// Lookup map for finding residues by chain ID, residue number and insertion code.
    residue_id_map: HashMap<(ChainId, isize, char), ResidueId>,
    /// Lookup map for finding chains by their single-character identifier.
    chain_id_map: HashMap<char, ChainId>,
    /// Cached adjacency list for bond connectivity, indexed by atom ID.
    bond_adjacency: SecondaryMap<AtomId, Vec<AtomId>>,
}

impl MolecularSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atoms.iter()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    pub(crate) fn residue_mut(&mut self, id: ResidueId) -> Option<&mut Residue> {
        self.residues.get_mut(id)
    }

    pub fn residues_iter(&self) -> impl Iterator<Item = (ResidueId, &Residue)> {
        self.residues.iter()
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id)
    }

    /// Iterates chains in declaration order.
    pub fn chains_iter(&self) -> impl Iterator<Item = (ChainId, &Chain)> {
        self.chain_order
            .iter()
            .filter_map(|&id| self.chains.get(id).map(|chain| (id, chain)))
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn find_chain_by_id(&self, id: char) -> Option<ChainId> {
        self.chain_id_map.get(&id).copied()
    }

    /// Finds residue `residue_number` of the chain that has no insertion code.
    pub fn find_residue_by_number(
        &self,
        chain_id: ChainId,
        residue_number: isize,
    ) -> Option<ResidueId> {
        self.find_residue(chain_id, residue_number, ' ')
    }

    pub fn find_residue(
        &self,
        chain_id: ChainId,
        residue_number: isize,
        insertion_code: char,
    ) -> Option<ResidueId> {
        self.residue_id_map
            .get(&(chain_id, residue_number, insertion_code))
            .copied()
    }

    /// Returns the chain with identifier `id`, creating it if needed.
    pub fn add_chain(&mut self, id: char) -> ChainId {
        *self.chain_id_map.entry(id).or_insert_with(|| {
            let chain_id = self.chains.insert(Chain::new(id));
            self.chain_order.push(chain_id);
            chain_id
        })
    }

    /// Returns the residue `residue_number` of the chain, creating it if needed.
    /// New residues are appended to the chain's sequence.
    pub fn add_residue(
        &mut self,
        chain_id: ChainId,
        residue_number: isize,
        name: &str,
    ) -> Option<ResidueId> {
        self.add_inserted_residue(chain_id, residue_number, ' ', name)
    }

    /// Like [`add_residue`](Self::add_residue), for residues that carry an
    /// insertion code. `52` and `52A` are distinct residues.
    pub fn add_inserted_residue(
        &mut self,
        chain_id: ChainId,
        residue_number: isize,
        insertion_code: char,
        name: &str,
    ) -> Option<ResidueId> {
        let chain = self.chains.get_mut(chain_id)?;
        let key = (chain_id, residue_number, insertion_code);

        let residue_id = *self.residue_id_map.entry(key).or_insert_with(|| {
            let residue =
                Residue::new(residue_number, name, chain_id).with_insertion_code(insertion_code);
            let id = self.residues.insert(residue);
            chain.residues.push(id);
            id
        });

        Some(residue_id)
    }

    pub fn add_atom_to_residue(&mut self, residue_id: ResidueId, mut atom: Atom) -> Option<AtomId> {
        let residue = self.residues.get_mut(residue_id)?;
        atom.residue_id = residue_id;
        let name = atom.name.clone();

        let atom_id = self.atoms.insert(atom);
        self.bond_adjacency.insert(atom_id, Vec::new());
        residue.add_atom(&name, atom_id);

        Some(atom_id)
    }

    /// Adds an undirected bond. Adding an existing bond is a no-op; self-bonds
    /// and bonds to unknown atoms are rejected with `None`.
    pub fn add_bond(&mut self, atom1_id: AtomId, atom2_id: AtomId, origin: BondOrigin) -> Option<()> {
        if atom1_id == atom2_id
            || !self.atoms.contains_key(atom1_id)
            || !self.atoms.contains_key(atom2_id)
        {
            return None;
        }

        if self.are_bonded(atom1_id, atom2_id) {
            return Some(());
        }

        self.bonds.push(Bond::new(atom1_id, atom2_id, origin));
        self.bond_adjacency[atom1_id].push(atom2_id);
        self.bond_adjacency[atom2_id].push(atom1_id);
        Some(())
    }

    pub fn get_bonded_neighbors(&self, atom_id: AtomId) -> &[AtomId] {
        self.bond_adjacency
            .get(atom_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn are_bonded(&self, atom1_id: AtomId, atom2_id: AtomId) -> bool {
        self.get_bonded_neighbors(atom1_id).contains(&atom2_id)
    }

    /// All residues, chain by chain, in sequence order.
    pub fn residues_in_order(&self) -> Vec<ResidueId> {
        self.chains_iter()
            .flat_map(|(_, chain)| chain.residues.iter().copied())
            .collect()
    }

    /// All atoms in chain, residue and input order.
    pub fn atoms_in_order(&self) -> Vec<AtomId> {
        self.residues_in_order()
            .into_iter()
            .filter_map(|id| self.residues.get(id))
            .flat_map(|residue| residue.atoms.iter().copied())
            .collect()
    }

    /// Connected components of the whole graph. Each component is a distinct
    /// molecule; components and their atoms are listed in input order.
    pub fn connected_components(&self) -> Vec<Vec<AtomId>> {
        self.components_within(&self.atoms_in_order())
    }

    /// Connected components of the subgraph induced by `atoms`.
    pub fn components_within(&self, atoms: &[AtomId]) -> Vec<Vec<AtomId>> {
        let mut visited: HashSet<AtomId> = HashSet::with_capacity(atoms.len());
        let order: HashMap<AtomId, usize> =
            atoms.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let mut components = Vec::new();

        for &start in atoms {
            if !visited.insert(start) {
                continue;
            }
            let mut component = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                for &neighbor in self.get_bonded_neighbors(current) {
                    if order.contains_key(&neighbor) && visited.insert(neighbor) {
                        component.push(neighbor);
                        queue.push_back(neighbor);
                    }
                }
            }
            component.sort_by_key(|id| order.get(id).copied().unwrap_or(usize::MAX));
            components.push(component);
        }

        components
    }

    /// Extracts the induced subgraph of a run of residues as a matching unit.
    pub fn fragment(&self, residues: &[ResidueId]) -> Fragment<'_> {
        Fragment::new(self, residues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::element::Element;
    use nalgebra::Point3;

    struct TestRefs {
        chain_a: ChainId,
        gly: ResidueId,
        gly_n: AtomId,
        gly_ca: AtomId,
        ala: ResidueId,
        ala_ca: AtomId,
        water_o: AtomId,
    }

    fn create_standard_test_system() -> (MolecularSystem, TestRefs) {
        let mut system = MolecularSystem::new();
        let chain_a = system.add_chain('A');

        let gly = system.add_residue(chain_a, 1, "GLY").unwrap();
        let gly_n = system
            .add_atom_to_residue(gly, Atom::new("N", Element::N, gly, Point3::origin()))
            .unwrap();
        let gly_ca = system
            .add_atom_to_residue(
                gly,
                Atom::new("CA", Element::C, gly, Point3::new(1.4, 0.0, 0.0)),
            )
            .unwrap();
        system.add_bond(gly_n, gly_ca, BondOrigin::Declared).unwrap();

        let ala = system.add_residue(chain_a, 2, "ALA").unwrap();
        let ala_ca = system
            .add_atom_to_residue(
                ala,
                Atom::new("CA", Element::C, ala, Point3::new(2.0, 1.0, 0.0)),
            )
            .unwrap();
        system.add_bond(gly_ca, ala_ca, BondOrigin::Declared).unwrap();

        let chain_w = system.add_chain('W');
        let water = system.add_residue(chain_w, 1, "HOH").unwrap();
        let water_o = system
            .add_atom_to_residue(
                water,
                Atom::new("O", Element::O, water, Point3::new(9.0, 9.0, 9.0)),
            )
            .unwrap();

        let refs = TestRefs {
            chain_a,
            gly,
            gly_n,
            gly_ca,
            ala,
            ala_ca,
            water_o,
        };
        (system, refs)
    }

    #[test]
    fn lookup_maps_resolve_chains_and_residues() {
        let (system, refs) = create_standard_test_system();
        assert_eq!(system.find_chain_by_id('A'), Some(refs.chain_a));
        assert_eq!(system.find_residue_by_number(refs.chain_a, 2), Some(refs.ala));
        assert!(system.find_residue_by_number(refs.chain_a, 3).is_none());
        assert!(system.find_chain_by_id('Z').is_none());
    }

    #[test]
    fn add_residue_returns_existing_residue_for_same_number() {
        let (mut system, refs) = create_standard_test_system();
        let again = system.add_residue(refs.chain_a, 1, "GLY").unwrap();
        assert_eq!(again, refs.gly);
        assert_eq!(system.chain(refs.chain_a).unwrap().len(), 2);
    }

    #[test]
    fn insertion_codes_make_distinct_residues() {
        let (mut system, refs) = create_standard_test_system();
        let inserted = system
            .add_inserted_residue(refs.chain_a, 2, 'A', "GLY")
            .unwrap();
        assert_ne!(inserted, refs.ala);
        assert_eq!(system.find_residue(refs.chain_a, 2, 'A'), Some(inserted));
        assert_eq!(system.find_residue_by_number(refs.chain_a, 2), Some(refs.ala));
        assert_eq!(system.residue(inserted).unwrap().number_label(), "2A");
        assert_eq!(system.chain(refs.chain_a).unwrap().len(), 3);
    }

    #[test]
    fn add_atom_to_unknown_residue_fails() {
        let (mut system, _) = create_standard_test_system();
        let missing = ResidueId::default();
        let result =
            system.add_atom_to_residue(missing, Atom::new("C", Element::C, missing, Point3::origin()));
        assert!(result.is_none());
        assert_eq!(system.atom_count(), 4);
    }

    #[test]
    fn add_bond_is_idempotent_and_symmetric() {
        let (mut system, refs) = create_standard_test_system();
        let before = system.bonds().len();
        system
            .add_bond(refs.gly_ca, refs.gly_n, BondOrigin::Declared)
            .unwrap();
        assert_eq!(system.bonds().len(), before);
        assert!(system.are_bonded(refs.gly_n, refs.gly_ca));
        assert!(system.are_bonded(refs.gly_ca, refs.gly_n));
    }

    #[test]
    fn add_bond_rejects_self_bonds() {
        let (mut system, refs) = create_standard_test_system();
        assert!(system.add_bond(refs.gly_n, refs.gly_n, BondOrigin::Declared).is_none());
    }

    #[test]
    fn neighbors_reflect_bonds() {
        let (system, refs) = create_standard_test_system();
        let neighbors = system.get_bonded_neighbors(refs.gly_ca);
        assert_eq!(neighbors.len(), 2);
        assert!(neighbors.contains(&refs.gly_n));
        assert!(neighbors.contains(&refs.ala_ca));
        assert!(system.get_bonded_neighbors(refs.water_o).is_empty());
    }

    #[test]
    fn residues_in_order_follows_chain_declaration() {
        let (system, refs) = create_standard_test_system();
        let order = system.residues_in_order();
        assert_eq!(order.len(), 3);
        assert_eq!(order[0], refs.gly);
        assert_eq!(order[1], refs.ala);
    }

    #[test]
    fn connected_components_separate_molecules() {
        let (system, refs) = create_standard_test_system();
        let components = system.connected_components();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0], vec![refs.gly_n, refs.gly_ca, refs.ala_ca]);
        assert_eq!(components[1], vec![refs.water_o]);
    }

    #[test]
    fn components_within_ignores_edges_leaving_the_subset() {
        let (system, refs) = create_standard_test_system();
        let components = system.components_within(&[refs.gly_n, refs.ala_ca]);
        assert_eq!(components.len(), 2);
    }
}
