use super::ids::ResidueId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub id: char,                        // Chain identifier (e.g., 'A', 'B')
    pub(crate) residues: Vec<ResidueId>, // Residues in sequence order
}

impl Chain {
    pub(crate) fn new(id: char) -> Self {
        Self {
            id,
            residues: Vec::new(),
        }
    }

    pub fn residues(&self) -> &[ResidueId] {
        &self.residues
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }
}
