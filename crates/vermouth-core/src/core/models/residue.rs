use super::ids::{AtomId, ChainId};
use crate::core::dssp::SecondaryStructure;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residue {
    pub number: isize,                      // Residue sequence number from source file
    pub insertion_code: char,               // PDB insertion code, ' ' when absent
    pub name: String,                       // Name of the residue (e.g., "ALA", "GLY")
    pub chain_id: ChainId,                  // ID of the parent chain
    pub(crate) atoms: Vec<AtomId>,          // Atoms in input order
    atom_name_map: HashMap<String, AtomId>, // First atom carrying each name
    pub(crate) secondary_structure: Option<SecondaryStructure>,
}

impl Residue {
    pub(crate) fn new(number: isize, name: &str, chain_id: ChainId) -> Self {
        Self {
            number,
            insertion_code: ' ',
            name: name.to_string(),
            chain_id,
            atoms: Vec::new(),
            atom_name_map: HashMap::new(),
            secondary_structure: None,
        }
    }

    pub(crate) fn with_insertion_code(mut self, insertion_code: char) -> Self {
        self.insertion_code = insertion_code;
        self
    }

    /// Sequence number followed by the insertion code, e.g. `52` or `52A`.
    pub fn number_label(&self) -> String {
        if self.insertion_code == ' ' {
            self.number.to_string()
        } else {
            format!("{}{}", self.number, self.insertion_code)
        }
    }

    pub(crate) fn add_atom(&mut self, atom_name: &str, atom_id: AtomId) {
        self.atoms.push(atom_id);
        self.atom_name_map
            .entry(atom_name.to_string())
            .or_insert(atom_id);
    }

    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    pub fn get_atom_id_by_name(&self, name: &str) -> Option<AtomId> {
        self.atom_name_map.get(name).copied()
    }

    /// Secondary-structure label attached by the annotator, if any.
    pub fn secondary_structure(&self) -> Option<SecondaryStructure> {
        self.secondary_structure
    }
}
