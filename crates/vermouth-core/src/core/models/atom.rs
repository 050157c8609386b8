use super::element::Element;
use super::ids::ResidueId;
use nalgebra::Point3;

/// Represents an atom of the atomistic input structure.
///
/// Atoms are owned by a [`MolecularSystem`](super::system::MolecularSystem) and
/// are never modified once the mapping starts; beads only keep references to
/// them through their [`AtomId`](super::ids::AtomId).
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g., "CA", "OD1").
    pub name: String,
    /// The chemical element of the atom.
    pub element: Element,
    /// The ID of the parent residue this atom belongs to.
    pub residue_id: ResidueId,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
    /// Partial charge in elementary charge units, if known.
    pub charge: Option<f64>,
    /// Explicit mass in g/mol; the element mass is used when absent.
    pub mass: Option<f64>,
}

impl Atom {
    pub fn new(name: &str, element: Element, residue_id: ResidueId, position: Point3<f64>) -> Self {
        Self {
            name: name.to_string(),
            element,
            residue_id,
            position,
            charge: None,
            mass: None,
        }
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = Some(charge);
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = Some(mass);
        self
    }

    /// Mass used for weighting: the explicit mass if set, else the element mass.
    pub fn mass(&self) -> f64 {
        self.mass.unwrap_or_else(|| self.element.atomic_mass())
    }

    pub fn is_hydrogen(&self) -> bool {
        self.element.is_hydrogen()
    }
}
