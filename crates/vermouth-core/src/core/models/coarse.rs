use super::ids::{AtomId, ResidueId};
use crate::core::dssp::StructureClass;
use crate::core::forcefield::params::ParameterSpec;
use crate::core::forcefield::term::{BondedParameters, InteractionKind, TermOrigin};
use nalgebra::Point3;
use std::collections::HashSet;
use std::ops::Range;

/// An atom contributing to a bead, with its declared weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeadMember {
    pub atom: AtomId,
    pub weight: f64,
}

/// A coarse-grained pseudo-atom.
#[derive(Debug, Clone, PartialEq)]
pub struct Bead {
    pub name: String,
    pub bead_type: String,
    pub residue_name: String,
    pub residue_number: isize,
    pub insertion_code: char,
    pub chain: char,
    pub charge: f64,
    pub mass: Option<f64>,
    /// Weighted center of the members, in Angstroms.
    pub position: Point3<f64>,
    pub members: Vec<BeadMember>,
    pub context: StructureClass,
    /// Carries the inter-fragment backbone terms of its fragment.
    pub is_link: bool,
    /// Index of the bead group (matched fragment) this bead belongs to.
    pub fragment: usize,
}

/// A bonded interaction over bead indices of the owning graph.
#[derive(Debug, Clone, PartialEq)]
pub struct BondedTerm {
    pub kind: InteractionKind,
    pub beads: Vec<usize>,
    pub origin: TermOrigin,
    pub context: StructureClass,
    pub parameters: Option<BondedParameters>,
    pub(crate) explicit: Option<ParameterSpec>,
    /// Comment group the term is written under, e.g. `Rubber band`.
    pub group: Option<String>,
}

impl BondedTerm {
    pub(crate) fn new(
        kind: InteractionKind,
        beads: Vec<usize>,
        origin: TermOrigin,
        context: StructureClass,
    ) -> Self {
        Self {
            kind,
            beads,
            origin,
            context,
            parameters: None,
            explicit: None,
            group: None,
        }
    }

    pub(crate) fn with_explicit(mut self, spec: Option<ParameterSpec>) -> Self {
        self.explicit = spec;
        self
    }

    pub(crate) fn with_parameters(mut self, parameters: BondedParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub(crate) fn with_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    /// True when both terms have the same kind and bead tuple, read either way.
    pub fn same_interaction(&self, kind: InteractionKind, beads: &[usize]) -> bool {
        self.kind == kind
            && (self.beads == beads || self.beads.iter().rev().eq(beads.iter()))
    }
}

/// The beads produced from one matched fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct BeadGroup {
    pub template: String,
    pub residues: Vec<ResidueId>,
    /// Positions of the residues in their chain.
    pub chain_span: Range<usize>,
    pub beads: Range<usize>,
}

impl BeadGroup {
    /// Whether `next` starts at the residue right after this group ends.
    pub fn precedes(&self, next: &BeadGroup) -> bool {
        self.chain_span.end == next.chain_span.start
    }
}

/// Beads and bonded terms derived from one molecule graph.
///
/// Only the mapping pipeline mutates the graph; callers receive it read-only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoarseGrainedGraph {
    beads: Vec<Bead>,
    terms: Vec<BondedTerm>,
    groups: Vec<BeadGroup>,
}

impl CoarseGrainedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn beads(&self) -> &[Bead] {
        &self.beads
    }

    pub fn bead(&self, index: usize) -> Option<&Bead> {
        self.beads.get(index)
    }

    pub fn terms(&self) -> &[BondedTerm] {
        &self.terms
    }

    pub fn terms_of(&self, kind: InteractionKind) -> impl Iterator<Item = &BondedTerm> {
        self.terms.iter().filter(move |t| t.kind == kind)
    }

    pub fn groups(&self) -> &[BeadGroup] {
        &self.groups
    }

    pub fn bead_count(&self) -> usize {
        self.beads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beads.is_empty()
    }

    /// Beads of one group.
    pub fn group_beads(&self, group: usize) -> &[Bead] {
        self.groups
            .get(group)
            .map(|g| &self.beads[g.beads.clone()])
            .unwrap_or(&[])
    }

    /// Atoms that ended up in some bead.
    pub fn mapped_atoms(&self) -> HashSet<AtomId> {
        self.beads
            .iter()
            .flat_map(|b| b.members.iter().map(|m| m.atom))
            .collect()
    }

    /// Adjacency of beads over bonds and constraints.
    pub fn bond_adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.beads.len()];
        for term in &self.terms {
            if matches!(
                term.kind,
                InteractionKind::Bond | InteractionKind::Constraint
            ) && term.beads.len() == 2
            {
                let (a, b) = (term.beads[0], term.beads[1]);
                if a < adjacency.len() && b < adjacency.len() {
                    adjacency[a].push(b);
                    adjacency[b].push(a);
                }
            }
        }
        adjacency
    }

    pub fn has_term(&self, kind: InteractionKind, beads: &[usize]) -> bool {
        self.terms.iter().any(|t| t.same_interaction(kind, beads))
    }

    /// Opens a new group. Beads pushed afterwards belong to it.
    pub(crate) fn begin_group(
        &mut self,
        template: &str,
        residues: Vec<ResidueId>,
        chain_span: Range<usize>,
    ) -> usize {
        let start = self.beads.len();
        self.groups.push(BeadGroup {
            template: template.to_string(),
            residues,
            chain_span,
            beads: start..start,
        });
        self.groups.len() - 1
    }

    pub(crate) fn push_bead(&mut self, mut bead: Bead) -> usize {
        let index = self.beads.len();
        if let Some(last) = self.groups.len().checked_sub(1) {
            bead.fragment = last;
            self.groups[last].beads.end = index + 1;
        }
        self.beads.push(bead);
        index
    }

    /// Adds the term unless an equivalent one exists. Returns whether it was added.
    pub(crate) fn push_term(&mut self, term: BondedTerm) -> bool {
        if self.has_term(term.kind, &term.beads) {
            return false;
        }
        self.terms.push(term);
        true
    }

    pub(crate) fn terms_mut(&mut self) -> &mut [BondedTerm] {
        &mut self.terms
    }

    /// Removes the terms at the given indices, keeping the order of the rest.
    pub(crate) fn remove_terms(&mut self, indices: &[usize]) {
        let drop: HashSet<usize> = indices.iter().copied().collect();
        let mut index = 0;
        self.terms.retain(|_| {
            let keep = !drop.contains(&index);
            index += 1;
            keep
        });
    }

    /// Appends another graph, shifting its bead and group indices.
    pub(crate) fn append(&mut self, other: CoarseGrainedGraph) {
        let bead_offset = self.beads.len();
        let group_offset = self.groups.len();

        self.beads.extend(other.beads.into_iter().map(|mut bead| {
            bead.fragment += group_offset;
            bead
        }));
        self.groups.extend(other.groups.into_iter().map(|mut group| {
            group.beads = (group.beads.start + bead_offset)..(group.beads.end + bead_offset);
            group
        }));
        self.terms.extend(other.terms.into_iter().map(|mut term| {
            for bead in &mut term.beads {
                *bead += bead_offset;
            }
            term
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bead(name: &str, chain: char) -> Bead {
        Bead {
            name: name.to_string(),
            bead_type: "P5".to_string(),
            residue_name: "GLY".to_string(),
            residue_number: 1,
            insertion_code: ' ',
            chain,
            charge: 0.0,
            mass: None,
            position: Point3::origin(),
            members: Vec::new(),
            context: StructureClass::Coil,
            is_link: true,
            fragment: 0,
        }
    }

    fn bond(a: usize, b: usize) -> BondedTerm {
        BondedTerm::new(
            InteractionKind::Bond,
            vec![a, b],
            TermOrigin::Backbone,
            StructureClass::Coil,
        )
    }

    #[test]
    fn push_bead_extends_the_open_group() {
        let mut graph = CoarseGrainedGraph::new();
        graph.begin_group("GLY", Vec::new(), 0..1);
        graph.push_bead(bead("BB", 'A'));
        let group = graph.begin_group("ALA", Vec::new(), 1..2);
        let index = graph.push_bead(bead("BB", 'A'));

        assert_eq!(graph.groups()[0].beads, 0..1);
        assert_eq!(graph.groups()[1].beads, 1..2);
        assert_eq!(graph.beads()[index].fragment, group);
        assert_eq!(graph.group_beads(1).len(), 1);
    }

    #[test]
    fn duplicate_terms_collapse_in_either_direction() {
        let mut graph = CoarseGrainedGraph::new();
        assert!(graph.push_term(bond(0, 1)));
        assert!(!graph.push_term(bond(1, 0)));
        assert_eq!(graph.terms().len(), 1);
    }

    #[test]
    fn remove_terms_keeps_remaining_order() {
        let mut graph = CoarseGrainedGraph::new();
        graph.push_term(bond(0, 1));
        graph.push_term(bond(1, 2));
        graph.push_term(bond(2, 3));
        graph.remove_terms(&[1]);
        let beads: Vec<_> = graph.terms().iter().map(|t| t.beads.clone()).collect();
        assert_eq!(beads, vec![vec![0, 1], vec![2, 3]]);
    }

    #[test]
    fn append_shifts_indices() {
        let mut first = CoarseGrainedGraph::new();
        first.begin_group("GLY", Vec::new(), 0..1);
        first.push_bead(bead("BB", 'A'));
        first.push_bead(bead("SC1", 'A'));
        first.push_term(bond(0, 1));

        let mut second = CoarseGrainedGraph::new();
        second.begin_group("ALA", Vec::new(), 0..1);
        second.push_bead(bead("BB", 'B'));
        second.push_bead(bead("SC1", 'B'));
        second.push_term(bond(0, 1));

        first.append(second);
        assert_eq!(first.bead_count(), 4);
        assert_eq!(first.groups()[1].beads, 2..4);
        assert_eq!(first.terms()[1].beads, vec![2, 3]);
        assert_eq!(first.beads()[3].fragment, 1);
    }

    #[test]
    fn bond_adjacency_ignores_angles() {
        let mut graph = CoarseGrainedGraph::new();
        graph.begin_group("GLY", Vec::new(), 0..1);
        for _ in 0..3 {
            graph.push_bead(bead("BB", 'A'));
        }
        graph.push_term(bond(0, 1));
        graph.push_term(BondedTerm::new(
            InteractionKind::Angle,
            vec![0, 1, 2],
            TermOrigin::Backbone,
            StructureClass::Coil,
        ));
        let adjacency = graph.bond_adjacency();
        assert_eq!(adjacency[0], vec![1]);
        assert!(adjacency[2].is_empty());
    }
}
