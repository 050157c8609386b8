use super::coarse::{Bead, BondedTerm, CoarseGrainedGraph};
use crate::core::forcefield::term::{BondedParameters, InteractionKind};

/// Molecules of a coarse-grained graph that share one topology.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeType {
    /// Bead indices of each molecule of this type, in graph order.
    pub molecules: Vec<Vec<usize>>,
}

impl MoleculeType {
    /// Beads of the first molecule, the one written out for the type.
    pub fn representative(&self) -> &[usize] {
        self.molecules.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self) -> usize {
        self.molecules.len()
    }
}

/// Beads of each connected molecule. Any bonded term connects all of its
/// beads. Molecules are ordered by their first bead, and the beads of a
/// molecule ascend.
pub fn molecules(graph: &CoarseGrainedGraph) -> Vec<Vec<usize>> {
    let count = graph.bead_count();
    let mut parent: Vec<usize> = (0..count).collect();

    fn root(parent: &mut [usize], mut bead: usize) -> usize {
        while parent[bead] != bead {
            parent[bead] = parent[parent[bead]];
            bead = parent[bead];
        }
        bead
    }

    for term in graph.terms() {
        let Some((&first, rest)) = term.beads.split_first() else {
            continue;
        };
        if first >= count {
            continue;
        }
        for &other in rest.iter().filter(|&&b| b < count) {
            let (a, b) = (root(&mut parent, first), root(&mut parent, other));
            if a != b {
                parent[a.max(b)] = a.min(b);
            }
        }
    }

    let mut by_root: Vec<Option<usize>> = vec![None; count];
    let mut molecules: Vec<Vec<usize>> = Vec::new();
    for bead in 0..count {
        let top = root(&mut parent, bead);
        let index = *by_root[top].get_or_insert_with(|| {
            molecules.push(Vec::new());
            molecules.len() - 1
        });
        molecules[index].push(bead);
    }
    molecules
}

/// What an itp block writes for one bead.
#[derive(Debug, PartialEq)]
struct BeadRecord<'a> {
    name: &'a str,
    bead_type: &'a str,
    residue_name: &'a str,
    residue_number: isize,
    charge: f64,
    mass: Option<f64>,
}

impl<'a> From<&'a Bead> for BeadRecord<'a> {
    fn from(bead: &'a Bead) -> Self {
        Self {
            name: &bead.name,
            bead_type: &bead.bead_type,
            residue_name: &bead.residue_name,
            residue_number: bead.residue_number,
            charge: bead.charge,
            mass: bead.mass,
        }
    }
}

/// What an itp block writes for one term, over molecule-local bead indices.
#[derive(Debug, PartialEq)]
struct TermRecord<'a> {
    kind: InteractionKind,
    beads: Vec<usize>,
    parameters: Option<BondedParameters>,
    group: Option<&'a str>,
}

type Signature<'a> = (Vec<BeadRecord<'a>>, Vec<TermRecord<'a>>);

fn records<'a>(graph: &'a CoarseGrainedGraph, beads: &[usize]) -> Signature<'a> {
    let atoms = beads
        .iter()
        .filter_map(|&b| graph.bead(b))
        .map(BeadRecord::from)
        .collect();
    let terms = local_terms(graph, beads)
        .into_iter()
        .map(|(term, local)| TermRecord {
            kind: term.kind,
            beads: local,
            parameters: term.parameters,
            group: term.group.as_deref(),
        })
        .collect();
    (atoms, terms)
}

/// Terms whose beads all belong to `beads`, with indices local to it.
pub fn local_terms<'a>(
    graph: &'a CoarseGrainedGraph,
    beads: &[usize],
) -> Vec<(&'a BondedTerm, Vec<usize>)> {
    graph
        .terms()
        .iter()
        .filter_map(|term| {
            let local: Option<Vec<usize>> = term
                .beads
                .iter()
                .map(|b| beads.binary_search(b).ok())
                .collect();
            local.map(|local| (term, local))
        })
        .collect()
}

/// Groups the molecules whose itp blocks would be written identically:
/// same beads in the same order and the same terms between them. Types are
/// ordered by their first molecule.
pub fn molecule_types(graph: &CoarseGrainedGraph) -> Vec<MoleculeType> {
    let mut types: Vec<MoleculeType> = Vec::new();
    let mut signatures: Vec<Signature<'_>> = Vec::new();
    for molecule in molecules(graph) {
        let signature = records(graph, &molecule);
        match signatures.iter().position(|known| *known == signature) {
            Some(index) => types[index].molecules.push(molecule),
            None => {
                signatures.push(signature);
                types.push(MoleculeType {
                    molecules: vec![molecule],
                });
            }
        }
    }
    types
}
