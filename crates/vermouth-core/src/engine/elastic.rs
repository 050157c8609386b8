use super::config::ElasticNetworkConfig;
use crate::core::dssp::StructureClass;
use crate::core::forcefield::term::{BondedParameters, InteractionKind, TermOrigin};
use crate::core::models::coarse::{BondedTerm, CoarseGrainedGraph};
use crate::core::utils::geometry::{self, ANGSTROM_TO_NM};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

pub const RUBBER_BAND_GROUP: &str = "Rubber band";

/// Force constant of a band of length `distance` (nm).
pub fn band_force_constant(config: &ElasticNetworkConfig, distance: f64) -> f64 {
    config.base_constant
        * (-config.decay_factor * (distance - config.lower_bound).powf(config.decay_power)).exp()
}

/// Adds rubber bands between the link beads of each chain and returns how
/// many were added.
pub fn apply_elastic_network(graph: &mut CoarseGrainedGraph, config: &ElasticNetworkConfig) -> usize {
    let mut chains: Vec<(char, Vec<usize>)> = Vec::new();
    for (index, bead) in graph.beads().iter().enumerate() {
        if !bead.is_link {
            continue;
        }
        match chains.iter_mut().find(|(chain, _)| *chain == bead.chain) {
            Some((_, beads)) => beads.push(index),
            None => chains.push((bead.chain, vec![index])),
        }
    }

    let adjacency = graph.bond_adjacency();
    let mut bands = Vec::new();

    for (chain, selection) in &chains {
        let selected: HashSet<usize> = selection.iter().copied().collect();
        for (position, &first) in selection.iter().enumerate() {
            let near = within_bonds(&adjacency, &selected, first, config.excluded_bonds);
            for &second in &selection[position + 1..] {
                if near.contains(&second) {
                    continue;
                }
                let (Some(a), Some(b)) = (graph.bead(first), graph.bead(second)) else {
                    continue;
                };
                let distance = geometry::distance(&a.position, &b.position) * ANGSTROM_TO_NM;
                if distance > config.upper_bound {
                    continue;
                }
                let force_constant = band_force_constant(config, distance);
                if !(force_constant > config.minimum_force) {
                    continue;
                }
                let context = StructureClass::common([a.context, b.context]);
                let length = (distance * 1e5).round() / 1e5;
                bands.push(
                    BondedTerm::new(
                        InteractionKind::Bond,
                        vec![first, second],
                        TermOrigin::Elastic,
                        context,
                    )
                    .with_parameters(BondedParameters {
                        function: config.bond_function,
                        equilibrium: length,
                        force_constant: Some(force_constant),
                        multiplicity: None,
                    })
                    .with_group(RUBBER_BAND_GROUP),
                );
            }
        }
        debug!(chain = %chain, beads = selection.len(), "Built elastic network for chain.");
    }

    bands
        .into_iter()
        .map(|band| graph.push_term(band))
        .filter(|added| *added)
        .count()
}

/// Beads of `selected` reachable from `start` in at most `max_bonds` bonds,
/// walking only through selected beads.
fn within_bonds(
    adjacency: &[Vec<usize>],
    selected: &HashSet<usize>,
    start: usize,
    max_bonds: usize,
) -> HashSet<usize> {
    let mut depth: HashMap<usize, usize> = HashMap::from([(start, 0)]);
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        let d = depth[&current];
        if d == max_bonds {
            continue;
        }
        for &next in adjacency.get(current).map(Vec::as_slice).unwrap_or(&[]) {
            if selected.contains(&next) && !depth.contains_key(&next) {
                depth.insert(next, d + 1);
                queue.push_back(next);
            }
        }
    }
    depth.into_keys().collect()
}
