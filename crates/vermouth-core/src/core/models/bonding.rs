use super::element::Element;
use super::ids::AtomId;
use super::system::MolecularSystem;
use super::topology::BondOrigin;
use nalgebra::Point3;
use tracing::debug;

/// Default tolerance added to the sum of covalent radii (Angstroms).
pub const DEFAULT_BOND_TOLERANCE: f64 = 0.4;

/// Pairs closer than this are overlapping atoms, not bonds.
const MIN_BOND_DISTANCE: f64 = 0.4;

/// Perceives covalent bonds from distances and covalent radii.
///
/// Candidates are the atoms of each residue, the atoms of sequential residues
/// in a chain, and every pair of sulfur atoms in the system (disulfide
/// bridges). Returns the number of bonds that were added.
pub fn guess_bonds(system: &mut MolecularSystem, tolerance: f64) -> usize {
    let before = system.bonds().len();
    let mut pairs: Vec<(AtomId, AtomId)> = Vec::new();

    for (_, chain) in system.chains_iter() {
        let residues = chain.residues();
        for (i, &residue_id) in residues.iter().enumerate() {
            let Some(residue) = system.residue(residue_id) else {
                continue;
            };
            let own = residue.atoms();
            collect_close_pairs(system, own, None, tolerance, &mut pairs);

            if let Some(next) = residues.get(i + 1).and_then(|&id| system.residue(id)) {
                collect_close_pairs(system, own, Some(next.atoms()), tolerance, &mut pairs);
            }
        }
    }

    let sulfurs: Vec<AtomId> = system
        .atoms_in_order()
        .into_iter()
        .filter(|&id| matches!(system.atom(id).map(|a| a.element), Some(Element::S)))
        .collect();
    collect_close_pairs(system, &sulfurs, None, tolerance, &mut pairs);

    for (a, b) in pairs {
        system.add_bond(a, b, BondOrigin::Perceived);
    }

    let added = system.bonds().len() - before;
    debug!(added, "Guessed bonds from covalent radii.");
    added
}

/// Collects bonded pairs between `left` and `right`, or among `left` itself
/// when `right` is `None`.
fn collect_close_pairs(
    system: &MolecularSystem,
    left: &[AtomId],
    right: Option<&[AtomId]>,
    tolerance: f64,
    pairs: &mut Vec<(AtomId, AtomId)>,
) {
    for (i, &a) in left.iter().enumerate() {
        let Some(atom_a) = system.atom(a) else {
            continue;
        };
        let others = match right {
            Some(right) => right,
            None => &left[i + 1..],
        };
        for &b in others {
            let Some(atom_b) = system.atom(b) else {
                continue;
            };
            if a == b || (atom_a.is_hydrogen() && atom_b.is_hydrogen()) {
                continue;
            }
            if is_bonded_distance(
                &atom_a.position,
                atom_a.element,
                &atom_b.position,
                atom_b.element,
                tolerance,
            ) {
                pairs.push((a, b));
            }
        }
    }
}

fn is_bonded_distance(
    pos_a: &Point3<f64>,
    elem_a: Element,
    pos_b: &Point3<f64>,
    elem_b: Element,
    tolerance: f64,
) -> bool {
    if elem_a == Element::Unknown || elem_b == Element::Unknown {
        return false;
    }
    let distance = nalgebra::distance(pos_a, pos_b);
    let threshold = elem_a.covalent_radius() + elem_b.covalent_radius() + tolerance;
    distance > MIN_BOND_DISTANCE && distance <= threshold
}
