use super::atom::Atom;
use super::bonding::{self, DEFAULT_BOND_TOLERANCE};
use super::element::Element;
use super::ids::{AtomId, ChainId, ResidueId};
use super::system::MolecularSystem;
use super::topology::BondOrigin;
use nalgebra::Point3;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Errors raised when the parsed structure cannot form a consistent molecule graph.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructureError {
    #[error("Structure contains no atoms")]
    Empty,

    #[error("Atom serial {serial} is used more than once")]
    DuplicateSerial { serial: usize },

    #[error("Bond references unknown atom serial {serial}")]
    UnknownAtomSerial { serial: usize },

    #[error("Atom serial {serial} is bonded to itself")]
    SelfBond { serial: usize },

    #[error("Atom serial {serial} was added before any chain or residue was started")]
    NoCurrentResidue { serial: usize },

    #[error(
        "Residue {chain}:{number} {name} is split across {components} disconnected parts of its chain"
    )]
    ResidueSplit {
        chain: char,
        number: isize,
        name: String,
        components: usize,
    },
}

/// Options that control how the molecule graph is completed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildOptions {
    /// Add bonds perceived from covalent radii to the explicit ones.
    pub guess_bonds: bool,
    /// Tolerance in Angstroms for bond perception.
    pub bond_tolerance: f64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            guess_bonds: false,
            bond_tolerance: DEFAULT_BOND_TOLERANCE,
        }
    }
}

/// Incrementally assembles a [`MolecularSystem`] from serial-numbered records.
///
/// Atoms are appended to the current residue; bonds are recorded by serial and
/// resolved in [`build`](Self::build), so they may be declared before the atoms
/// they reference (as in files where connectivity precedes coordinates).
pub struct MolecularSystemBuilder {
    system: MolecularSystem,
    options: BuildOptions,

    atom_serial_map: HashMap<usize, AtomId>,
    pending_bonds: Vec<(usize, usize, BondOrigin)>,
    current_chain: Option<ChainId>,
    current_residue: Option<ResidueId>,
}

impl Default for MolecularSystemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MolecularSystemBuilder {
    pub fn new() -> Self {
        Self::with_options(BuildOptions::default())
    }

    pub fn with_options(options: BuildOptions) -> Self {
        Self {
            system: MolecularSystem::new(),
            options,
            atom_serial_map: HashMap::new(),
            pending_bonds: Vec::new(),
            current_chain: None,
            current_residue: None,
        }
    }

    pub fn start_chain(&mut self, id: char) -> &mut Self {
        self.current_chain = Some(self.system.add_chain(id));
        self.current_residue = None;
        self
    }

    /// Starts (or re-enters) residue `number` of the current chain, starting
    /// chain `' '` when no chain is open.
    pub fn start_residue(&mut self, number: isize, name: &str) -> &mut Self {
        self.start_inserted_residue(number, ' ', name)
    }

    /// Starts residue `number` with an insertion code, as in `52A`.
    pub fn start_inserted_residue(
        &mut self,
        number: isize,
        insertion_code: char,
        name: &str,
    ) -> &mut Self {
        let chain_id = match self.current_chain {
            Some(id) => id,
            None => {
                let id = self.system.add_chain(' ');
                self.current_chain = Some(id);
                id
            }
        };
        self.current_residue =
            self.system
                .add_inserted_residue(chain_id, number, insertion_code, name);
        self
    }

    pub fn add_atom(
        &mut self,
        serial: usize,
        name: &str,
        element: Element,
        position: Point3<f64>,
    ) -> Result<AtomId, StructureError> {
        let residue_id = self
            .current_residue
            .ok_or(StructureError::NoCurrentResidue { serial })?;
        self.insert_atom(serial, Atom::new(name, element, residue_id, position))
    }

    /// Adds a fully specified atom (charge, mass) to the current residue.
    pub fn add_detailed_atom(
        &mut self,
        serial: usize,
        atom: Atom,
    ) -> Result<AtomId, StructureError> {
        self.insert_atom(serial, atom)
    }

    fn insert_atom(&mut self, serial: usize, atom: Atom) -> Result<AtomId, StructureError> {
        if self.atom_serial_map.contains_key(&serial) {
            return Err(StructureError::DuplicateSerial { serial });
        }
        let residue_id = self
            .current_residue
            .ok_or(StructureError::NoCurrentResidue { serial })?;
        let atom_id = self
            .system
            .add_atom_to_residue(residue_id, atom)
            .ok_or(StructureError::NoCurrentResidue { serial })?;
        self.atom_serial_map.insert(serial, atom_id);
        Ok(atom_id)
    }

    pub fn add_bond(&mut self, serial1: usize, serial2: usize, origin: BondOrigin) -> &mut Self {
        self.pending_bonds.push((serial1, serial2, origin));
        self
    }

    /// Resolves bonds, optionally perceives missing ones, and validates that
    /// every residue forms a single connected piece of its chain.
    pub fn build(mut self) -> Result<MolecularSystem, StructureError> {
        if self.system.atom_count() == 0 {
            return Err(StructureError::Empty);
        }

        for (serial1, serial2, origin) in std::mem::take(&mut self.pending_bonds) {
            if serial1 == serial2 {
                return Err(StructureError::SelfBond { serial: serial1 });
            }
            let a = self.resolve_serial(serial1)?;
            let b = self.resolve_serial(serial2)?;
            self.system.add_bond(a, b, origin);
        }

        if self.options.guess_bonds {
            bonding::guess_bonds(&mut self.system, self.options.bond_tolerance);
        }

        validate_residue_connectivity(&self.system)?;

        debug!(
            atoms = self.system.atom_count(),
            residues = self.system.residue_count(),
            bonds = self.system.bonds().len(),
            "Molecule graph built."
        );
        Ok(self.system)
    }

    fn resolve_serial(&self, serial: usize) -> Result<AtomId, StructureError> {
        self.atom_serial_map
            .get(&serial)
            .copied()
            .ok_or(StructureError::UnknownAtomSerial { serial })
    }
}

/// Fails when a chain's connectivity disagrees with its residue partition,
/// i.e. when the atoms of one residue fall into different components of the
/// chain's bond graph.
pub fn validate_residue_connectivity(system: &MolecularSystem) -> Result<(), StructureError> {
    for (_, chain) in system.chains_iter() {
        let chain_atoms: Vec<AtomId> = chain
            .residues()
            .iter()
            .filter_map(|&id| system.residue(id))
            .flat_map(|residue| residue.atoms().iter().copied())
            .collect();

        let mut component_of: HashMap<AtomId, usize> = HashMap::with_capacity(chain_atoms.len());
        for (index, component) in system.components_within(&chain_atoms).iter().enumerate() {
            for &atom_id in component {
                component_of.insert(atom_id, index);
            }
        }

        for &residue_id in chain.residues() {
            let Some(residue) = system.residue(residue_id) else {
                continue;
            };
            let components: HashSet<usize> = residue
                .atoms()
                .iter()
                .filter_map(|id| component_of.get(id).copied())
                .collect();
            if components.len() > 1 {
                return Err(StructureError::ResidueSplit {
                    chain: chain.id,
                    number: residue.number,
                    name: residue.name.clone(),
                    components: components.len(),
                });
            }
        }
    }
    Ok(())
}
