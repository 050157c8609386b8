use super::config::{FailurePolicy, MappingConfig};
use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use crate::core::dssp::StructureClass;
use crate::core::forcefield::params::ParameterSpec;
use crate::core::forcefield::term::{InteractionKind, TermOrigin};
use crate::core::matching::{Match, MatchError, PartialCoverage, SubgraphMatcher};
use crate::core::models::coarse::{Bead, BeadMember, BondedTerm, CoarseGrainedGraph};
use crate::core::models::fragment::Fragment;
use crate::core::models::ids::{AtomId, ChainId, ResidueId};
use crate::core::models::residue::Residue;
use crate::core::models::system::MolecularSystem;
use crate::core::templates::modification::BeadRef;
use crate::core::templates::template::TemplateBead;
use crate::core::templates::{Modification, Template, TemplateError, TemplateLibrary};
use crate::core::utils::geometry;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Structure class a residue is mapped in: its annotated class, `Coil` when
/// it carries no label.
pub fn residue_class(residue: &Residue) -> StructureClass {
    residue
        .secondary_structure()
        .map(|ss| ss.class())
        .unwrap_or(StructureClass::Coil)
}

#[derive(Default)]
struct ChainMapping {
    graph: CoarseGrainedGraph,
    diagnostics: Vec<Diagnostic>,
    atom_bead: HashMap<AtomId, usize>,
    /// Link bead of each group, if the template declares one and it survived.
    links: Vec<Option<usize>>,
}

/// The group beads of one fragment are added to.
struct FragmentSite {
    chain: char,
    group: usize,
    label: String,
}

/// Beads and terms of a mapped structure, before parameter resolution.
#[derive(Debug, Clone, Default)]
pub struct MappedStructure {
    pub graph: CoarseGrainedGraph,
    pub diagnostics: Vec<Diagnostic>,
}

/// Turns a molecule graph into a coarse-grained graph, fragment by fragment.
pub struct Mapper<'a> {
    system: &'a MolecularSystem,
    library: &'a TemplateLibrary,
    config: &'a MappingConfig,
    matcher: SubgraphMatcher,
}

impl<'a> Mapper<'a> {
    pub fn new(
        system: &'a MolecularSystem,
        library: &'a TemplateLibrary,
        config: &'a MappingConfig,
    ) -> Self {
        Self {
            system,
            library,
            config,
            matcher: SubgraphMatcher::new(config.step_limit),
        }
    }

    pub fn map(&self, reporter: &ProgressReporter) -> Result<MappedStructure, EngineError> {
        let chains: Vec<ChainId> = self.system.chains_iter().map(|(id, _)| id).collect();
        reporter.report(Progress::TaskStart {
            total_steps: self.system.residue_count() as u64,
        });

        let results: Vec<Result<ChainMapping, EngineError>> = if self.config.parallel {
            chains
                .par_iter()
                .map(|&chain| self.map_chain(chain, reporter))
                .collect()
        } else {
            chains
                .iter()
                .map(|&chain| self.map_chain(chain, reporter))
                .collect()
        };
        reporter.report(Progress::TaskFinish);

        let mut graph = CoarseGrainedGraph::new();
        let mut diagnostics = Vec::new();
        let mut atom_bead = HashMap::new();
        let mut links = Vec::new();
        for result in results {
            let chain = result?;
            let offset = graph.bead_count();
            atom_bead.extend(chain.atom_bead.into_iter().map(|(atom, bead)| (atom, bead + offset)));
            links.extend(chain.links.into_iter().map(|link| link.map(|bead| bead + offset)));
            graph.append(chain.graph);
            diagnostics.extend(chain.diagnostics);
        }

        let bonds = self.add_inter_fragment_bonds(&mut graph, &atom_bead, &links);
        let (angles, dihedrals) = if self.config.backbone_angles {
            self.add_backbone_terms(&mut graph, &links)
        } else {
            (0, 0)
        };
        debug!(
            beads = graph.bead_count(),
            inter_fragment_bonds = bonds,
            backbone_angles = angles,
            backbone_dihedrals = dihedrals,
            "Assembled coarse-grained graph."
        );

        Ok(MappedStructure { graph, diagnostics })
    }

    fn map_chain(
        &self,
        chain_id: ChainId,
        reporter: &ProgressReporter,
    ) -> Result<ChainMapping, EngineError> {
        let chain = self
            .system
            .chain(chain_id)
            .ok_or_else(|| EngineError::Internal(format!("chain {chain_id:?} vanished")))?;
        let residues = chain.residues();
        let mut out = ChainMapping::default();

        let mut index = 0;
        while index < residues.len() {
            match self.match_at(residues, index) {
                Ok((matched, fragment)) => {
                    let span = matched.template.span();
                    self.build_fragment(
                        chain.id,
                        &matched,
                        &fragment,
                        index..index + span,
                        &mut out,
                    );
                    for _ in 0..span {
                        reporter.report(Progress::TaskIncrement);
                    }
                    index += span;
                }
                Err(error) => {
                    let location = self.system.fragment(&residues[index..=index]).label();
                    let kind = if matches!(error, EngineError::UnknownResidue { .. }) {
                        DiagnosticKind::UnknownResidue
                    } else if matches!(error, EngineError::NoMatchingTemplate(_)) {
                        DiagnosticKind::UnmatchedFragment
                    } else {
                        return Err(error);
                    };
                    if self.config.failure_policy == FailurePolicy::Strict {
                        return Err(error);
                    }
                    warn!(fragment = %location, "Skipping fragment: {}", error);
                    out.diagnostics
                        .push(Diagnostic::new(kind, location, error.to_string()));
                    reporter.report(Progress::TaskIncrement);
                    index += 1;
                }
            }
        }

        debug!(
            chain = %chain.id,
            groups = out.graph.groups().len(),
            beads = out.graph.bead_count(),
            "Mapped chain."
        );
        Ok(out)
    }

    /// Finds the first template matching a fragment that starts at
    /// `residues[index]`, trying longer templates before shorter ones.
    fn match_at(
        &self,
        residues: &[ResidueId],
        index: usize,
    ) -> Result<(Match, Fragment<'a>), EngineError> {
        let system: &'a MolecularSystem = self.system;
        let residue = system
            .residue(residues[index])
            .ok_or_else(|| EngineError::Internal("residue vanished".to_string()))?;
        let class = residue_class(residue);

        let candidates = self
            .library
            .lookup_with(&residue.name, class, &self.config.lookup)
            .map_err(|e| match e {
                TemplateError::UnknownResidue { residue, context } => EngineError::UnknownResidue {
                    residue,
                    location: system.fragment(&residues[index..=index]).label(),
                    context,
                },
                other => EngineError::Internal(other.to_string()),
            })?;

        let mut best: Option<PartialCoverage> = None;
        for run in candidates.chunk_by(|a, b| a.span() == b.span()) {
            let span = run[0].span();
            let Some(window) = residues.get(index..index + span) else {
                continue;
            };
            let names: Vec<&str> = window
                .iter()
                .filter_map(|&id| system.residue(id))
                .map(|r| r.name.as_str())
                .collect();
            // A fallback template applies whatever the residue is called.
            let fitting: Vec<Arc<Template>> = run
                .iter()
                .filter(|t| t.matches_residues(&names) || !t.starts_with(&residue.name))
                .cloned()
                .collect();
            if fitting.is_empty() {
                continue;
            }

            let fragment = system.fragment(window);
            match self.matcher.match_first(&fitting, &fragment) {
                Ok(matched) => return Ok((matched, fragment)),
                Err(MatchError::NoMatchingTemplate {
                    best: Some(partial),
                    ..
                }) => {
                    if best.as_ref().is_none_or(|b| partial.is_better_than(b)) {
                        best = Some(partial);
                    }
                }
                Err(MatchError::NoMatchingTemplate { best: None, .. }) => {}
            }
        }

        Err(EngineError::NoMatchingTemplate(
            MatchError::NoMatchingTemplate {
                fragment: system.fragment(&residues[index..=index]).label(),
                best,
            },
        ))
    }

    fn build_fragment(
        &self,
        chain: char,
        matched: &Match,
        fragment: &Fragment<'_>,
        chain_span: Range<usize>,
        out: &mut ChainMapping,
    ) {
        let template = &matched.template;
        let site = FragmentSite {
            chain,
            group: out
                .graph
                .begin_group(template.name(), fragment.residues().to_vec(), chain_span),
            label: fragment.label(),
        };

        let bead_map: Vec<Option<usize>> = template
            .beads()
            .iter()
            .enumerate()
            .map(|(bead_index, spec)| {
                let is_link = template.link_bead() == Some(bead_index);
                self.place_bead(&site, fragment, spec, &matched.assignment, is_link, out)
            })
            .collect();

        for interaction in template.interactions() {
            let beads: Option<Vec<usize>> =
                interaction.beads.iter().map(|&b| bead_map[b]).collect();
            let Some(beads) = beads else {
                let names: Vec<&str> = interaction
                    .beads
                    .iter()
                    .map(|&b| template.beads()[b].name.as_str())
                    .collect();
                out.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DroppedTerm,
                    site.label.clone(),
                    format!("{} {} uses a dropped bead", interaction.kind, names.join("-")),
                ));
                continue;
            };
            push_template_term(out, interaction.kind, beads, interaction.parameters.clone());
        }

        let covered = self.apply_modifications(&site, fragment, out);

        let mut hydrogens = 0usize;
        for local in 0..fragment.len() {
            let atom_id = fragment.atom_id(local);
            if out.atom_bead.contains_key(&atom_id) || covered.contains(&atom_id) {
                continue;
            }
            let Some(atom) = fragment.atom(local) else {
                continue;
            };
            if atom.is_hydrogen() {
                hydrogens += 1;
            } else {
                out.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnmappedAtom,
                    site.label.clone(),
                    format!("heavy atom {} is not part of any bead", atom.name),
                ));
            }
        }
        if hydrogens > 0 {
            debug!(fragment = %site.label, hydrogens, "Hydrogens left out of the mapping.");
        }

        out.links
            .push(template.link_bead().and_then(|bead| bead_map[bead]));
        debug!(
            fragment = %site.label,
            template = template.name(),
            beads = out.graph.group_beads(site.group).len(),
            "Mapped fragment."
        );
    }

    /// Adds the bead `spec` describes, centred on the atoms `assignment`
    /// binds to its member roles. A bead without bound atoms is dropped.
    fn place_bead(
        &self,
        site: &FragmentSite,
        fragment: &Fragment<'_>,
        spec: &TemplateBead,
        assignment: &[Option<usize>],
        is_link: bool,
        out: &mut ChainMapping,
    ) -> Option<usize> {
        let mut weighted = Vec::with_capacity(spec.members.len());
        let mut members = Vec::with_capacity(spec.members.len());
        let mut owner = None;
        for &(role, declared) in &spec.members {
            let Some(local) = assignment.get(role).copied().flatten() else {
                continue;
            };
            let Some(atom) = fragment.atom(local) else {
                continue;
            };
            owner.get_or_insert(atom.residue_id);
            weighted.push((
                atom.position,
                self.config.weighting.weight(atom.mass(), declared),
            ));
            members.push(BeadMember {
                atom: fragment.atom_id(local),
                weight: declared,
            });
        }

        let position = geometry::weighted_center(&weighted).or_else(|| {
            let unweighted: Vec<_> = weighted.iter().map(|(p, _)| (*p, 1.0)).collect();
            geometry::weighted_center(&unweighted)
        });
        let (Some(position), Some(residue)) =
            (position, owner.and_then(|id| self.system.residue(id)))
        else {
            warn!(fragment = %site.label, bead = %spec.name, "Dropping bead without matched atoms.");
            out.diagnostics.push(Diagnostic::new(
                DiagnosticKind::DroppedBead,
                site.label.clone(),
                format!("bead {} has no matched atoms", spec.name),
            ));
            return None;
        };

        let context = residue_class(residue);
        let bead = Bead {
            name: spec.name.clone(),
            bead_type: spec.type_for(context).to_string(),
            residue_name: residue.name.clone(),
            residue_number: residue.number,
            insertion_code: residue.insertion_code,
            chain: site.chain,
            charge: spec.charge,
            mass: spec.mass,
            position,
            members,
            context,
            is_link,
            fragment: site.group,
        };
        let atoms: Vec<AtomId> = bead.members.iter().map(|m| m.atom).collect();
        let index = out.graph.push_bead(bead);
        for atom in atoms {
            out.atom_bead.insert(atom, index);
        }
        Some(index)
    }

    /// Matches modifications onto the connected runs of atoms the residue
    /// template left over, largest modification first, until a run has no
    /// heavy atoms left or nothing else fits. Returns the atoms the applied
    /// modifications account for.
    fn apply_modifications(
        &self,
        site: &FragmentSite,
        fragment: &Fragment<'_>,
        out: &mut ChainMapping,
    ) -> HashSet<AtomId> {
        let mut covered = HashSet::new();
        if self.library.modification_count() == 0 {
            return covered;
        }
        let is_heavy = |id: &AtomId| self.system.atom(*id).is_some_and(|a| !a.is_hydrogen());

        let leftover: Vec<AtomId> = fragment
            .atom_ids()
            .iter()
            .copied()
            .filter(|id| !out.atom_bead.contains_key(id))
            .collect();
        for component in self.system.components_within(&leftover) {
            let Some(residue_id) = component
                .iter()
                .find(|&id| is_heavy(id))
                .and_then(|&id| self.system.atom(id))
                .map(|atom| atom.residue_id)
            else {
                continue;
            };
            let Some(residue) = self.system.residue(residue_id) else {
                continue;
            };
            let candidates = self.library.modifications_for(&residue.name);
            if candidates.is_empty() {
                continue;
            }

            let local = self.system.fragment(&[residue_id]);
            let mut remaining: HashSet<AtomId> = component.into_iter().collect();
            while remaining.iter().any(is_heavy) {
                let applied = candidates.iter().find_map(|modification| {
                    self.matcher
                        .match_template_where(modification.pattern(), &local, |role, atom| {
                            let atom = local.atom_id(atom);
                            if modification.is_anchor(role) {
                                out.atom_bead.contains_key(&atom)
                            } else {
                                remaining.contains(&atom)
                            }
                        })
                        .ok()
                        .map(|assignment| (modification, assignment))
                });
                let Some((modification, assignment)) = applied else {
                    break;
                };
                for (role, bound) in assignment.iter().enumerate() {
                    if modification.is_anchor(role) {
                        continue;
                    }
                    if let Some(bound) = bound {
                        let atom = local.atom_id(*bound);
                        remaining.remove(&atom);
                        covered.insert(atom);
                    }
                }
                self.add_modification(site, &local, modification, &assignment, out);
            }
        }
        covered
    }

    fn add_modification(
        &self,
        site: &FragmentSite,
        fragment: &Fragment<'_>,
        modification: &Modification,
        assignment: &[Option<usize>],
        out: &mut ChainMapping,
    ) {
        let own: Vec<Option<usize>> = modification
            .pattern()
            .beads()
            .iter()
            .map(|spec| self.place_bead(site, fragment, spec, assignment, false, out))
            .collect();

        for interaction in modification.interactions() {
            let beads: Option<Vec<usize>> = interaction
                .beads
                .iter()
                .map(|reference| match *reference {
                    BeadRef::Own(bead) => own[bead],
                    BeadRef::Anchor(role) => assignment
                        .get(role)
                        .copied()
                        .flatten()
                        .and_then(|bound| out.atom_bead.get(&fragment.atom_id(bound)).copied()),
                })
                .collect();
            let Some(beads) = beads else {
                out.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DroppedTerm,
                    site.label.clone(),
                    format!(
                        "{} of modification {} uses a dropped bead",
                        interaction.kind,
                        modification.name()
                    ),
                ));
                continue;
            };
            push_template_term(out, interaction.kind, beads, interaction.parameters.clone());
        }

        info!(
            fragment = %site.label,
            modification = modification.name(),
            beads = own.iter().flatten().count(),
            "Applied modification."
        );
    }

    fn group_chain(&self, graph: &CoarseGrainedGraph, group: usize) -> Option<ChainId> {
        graph
            .groups()
            .get(group)?
            .residues
            .first()
            .and_then(|&id| self.system.residue(id))
            .map(|r| r.chain_id)
    }

    /// Whether group `second` starts at the residue right after group
    /// `first` ends, in the same chain.
    fn consecutive(&self, graph: &CoarseGrainedGraph, first: usize, second: usize) -> bool {
        let groups = graph.groups();
        let (Some(a), Some(b)) = (groups.get(first), groups.get(second)) else {
            return false;
        };
        a.precedes(b)
            && self
                .group_chain(graph, first)
                .is_some_and(|chain| self.group_chain(graph, second) == Some(chain))
    }

    /// Bonds between beads of different fragments, derived from atomistic
    /// bonds that cross fragment boundaries.
    fn add_inter_fragment_bonds(
        &self,
        graph: &mut CoarseGrainedGraph,
        atom_bead: &HashMap<AtomId, usize>,
        links: &[Option<usize>],
    ) -> usize {
        let mut added = 0;
        for bond in self.system.bonds() {
            let (Some(&a), Some(&b)) = (atom_bead.get(&bond.atom1_id), atom_bead.get(&bond.atom2_id))
            else {
                continue;
            };
            let (Some(bead_a), Some(bead_b)) = (graph.bead(a), graph.bead(b)) else {
                continue;
            };
            if bead_a.fragment == bead_b.fragment {
                continue;
            }
            let (a, b) = if bead_a.fragment < bead_b.fragment {
                (a, b)
            } else {
                (b, a)
            };
            let (first, second) = (graph.beads()[a].fragment, graph.beads()[b].fragment);

            let (pair, origin) = if self.consecutive(graph, first, second) {
                match (links.get(first).copied().flatten(), links.get(second).copied().flatten()) {
                    (Some(x), Some(y)) => ([x, y], TermOrigin::Backbone),
                    _ => ([a, b], TermOrigin::Backbone),
                }
            } else {
                ([a, b], TermOrigin::Crosslink)
            };

            let context = StructureClass::common(
                pair.iter()
                    .filter_map(|&bead| graph.bead(bead))
                    .map(|bead| bead.context),
            );
            if graph.push_term(BondedTerm::new(
                InteractionKind::Bond,
                pair.to_vec(),
                origin,
                context,
            )) {
                added += 1;
            }
        }
        added
    }

    /// Angles and dihedrals along runs of bonded link beads.
    fn add_backbone_terms(
        &self,
        graph: &mut CoarseGrainedGraph,
        links: &[Option<usize>],
    ) -> (usize, usize) {
        let mut runs: Vec<Vec<usize>> = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        for group in 0..links.len() {
            let Some(link) = links[group] else {
                runs.push(std::mem::take(&mut current));
                continue;
            };
            let connected = current.last().is_some_and(|&previous| {
                group > 0
                    && self.consecutive(graph, group - 1, group)
                    && (graph.has_term(InteractionKind::Bond, &[previous, link])
                        || graph.has_term(InteractionKind::Constraint, &[previous, link]))
            });
            if !connected {
                runs.push(std::mem::take(&mut current));
            }
            current.push(link);
        }
        runs.push(current);

        let mut angles = 0;
        let mut dihedrals = 0;
        for run in runs.iter().filter(|run| run.len() >= 3) {
            for window in run.windows(3) {
                let context = self.common_context(graph, window);
                if graph.push_term(BondedTerm::new(
                    InteractionKind::Angle,
                    window.to_vec(),
                    TermOrigin::Backbone,
                    context,
                )) {
                    angles += 1;
                }
            }
            for window in run.windows(4) {
                let context = self.common_context(graph, window);
                if !self.config.backbone_dihedral_classes.contains(&context) {
                    continue;
                }
                if graph.push_term(BondedTerm::new(
                    InteractionKind::Dihedral,
                    window.to_vec(),
                    TermOrigin::Backbone,
                    context,
                )) {
                    dihedrals += 1;
                }
            }
        }
        (angles, dihedrals)
    }

    fn common_context(&self, graph: &CoarseGrainedGraph, beads: &[usize]) -> StructureClass {
        StructureClass::common(beads.iter().filter_map(|&b| graph.bead(b)).map(|b| b.context))
    }
}

fn push_template_term(
    out: &mut ChainMapping,
    kind: InteractionKind,
    beads: Vec<usize>,
    parameters: Option<ParameterSpec>,
) {
    let context = StructureClass::common(
        beads
            .iter()
            .filter_map(|&b| out.graph.bead(b))
            .map(|b| b.context),
    );
    out.graph.push_term(
        BondedTerm::new(kind, beads, TermOrigin::Template, context).with_explicit(parameters),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dssp::SecondaryStructure;
    use crate::core::dssp::annotator::annotate_sequence;
    use crate::core::models::builder::MolecularSystemBuilder;
    use crate::core::models::element::Element;
    use crate::core::models::topology::BondOrigin;
    use crate::engine::config::{MappingConfigBuilder, WeightingRule};
    use nalgebra::Point3;

    const LIBRARY: &str = r#"
        [[template]]
        name = "TRI"
        residues = ["TRI"]
        link-bead = "B1"
        atoms = [
            { name = "N1", element = "N" },
            { name = "C1", element = "C" },
            { name = "C2", element = "C" },
            { name = "C3", element = "C" },
            { name = "H1", element = "H" },
        ]
        edges = [["N1", "C1"], ["C1", "C2"], ["C2", "C3"], ["N1", "H1"]]

        [[template.beads]]
        name = "B1"
        type = "P5"
        type-by-context = { helix = "N0" }
        atoms = ["N1", "C1", "H1"]

        [[template.beads]]
        name = "B2"
        type = "C1"
        atoms = ["C2"]

        [[template.beads]]
        name = "B3"
        type = "C1"
        atoms = ["C3"]

        [[template.interactions]]
        kind = "bond"
        beads = ["B1", "B2"]
        parameters = { equilibrium = 0.3, force-constant = 1000.0 }

        [[template.interactions]]
        kind = "bond"
        beads = ["B2", "B3"]
    "#;

    fn library() -> TemplateLibrary {
        TemplateLibrary::from_toml_str(LIBRARY, "test").unwrap()
    }

    /// A chain of `names` residues; TRI-like residues get N1-C1-C2-C3 and are
    /// linked C1(i)-N1(i+1).
    fn chain(names: &[&str], extra_atom: bool) -> MolecularSystem {
        let mut builder = MolecularSystemBuilder::new();
        builder.start_chain('A');
        let mut serial = 1;
        let mut previous_c1 = None;
        for (i, name) in names.iter().enumerate() {
            let x = 10.0 * i as f64;
            builder.start_residue(i as isize + 1, name);
            let n1 = serial;
            builder
                .add_atom(n1, "N1", Element::N, Point3::new(x, 0.0, 0.0))
                .unwrap();
            builder
                .add_atom(n1 + 1, "C1", Element::C, Point3::new(x + 1.5, 0.0, 0.0))
                .unwrap();
            builder
                .add_atom(n1 + 2, "C2", Element::C, Point3::new(x + 1.5, 1.5, 0.0))
                .unwrap();
            builder
                .add_atom(n1 + 3, "C3", Element::C, Point3::new(x + 1.5, 3.0, 0.0))
                .unwrap();
            builder
                .add_bond(n1, n1 + 1, BondOrigin::Declared)
                .add_bond(n1 + 1, n1 + 2, BondOrigin::Declared)
                .add_bond(n1 + 2, n1 + 3, BondOrigin::Declared);
            serial += 4;
            if extra_atom && i == 0 {
                builder
                    .add_atom(serial, "CX", Element::C, Point3::new(x + 1.5, 4.5, 0.0))
                    .unwrap();
                builder.add_bond(n1 + 3, serial, BondOrigin::Declared);
                serial += 1;
            }
            if let Some(c1) = previous_c1 {
                builder.add_bond(c1, n1, BondOrigin::Declared);
            }
            previous_c1 = Some(n1 + 1);
        }
        builder.build().unwrap()
    }

    fn config(policy: FailurePolicy) -> MappingConfig {
        MappingConfigBuilder::new()
            .failure_policy(policy)
            .parallel(false)
            .build()
            .unwrap()
    }

    fn map(system: &MolecularSystem, config: &MappingConfig) -> Result<MappedStructure, EngineError> {
        let library = library();
        Mapper::new(system, &library, config).map(&ProgressReporter::new())
    }

    /// Maps with the TRI template plus the templates and modifications in `extra`.
    fn map_with(system: &MolecularSystem, extra: &str) -> MappedStructure {
        let mut library = library();
        library.merge(TemplateLibrary::from_toml_str(extra, "extra").unwrap());
        Mapper::new(system, &library, &config(FailurePolicy::Strict))
            .map(&ProgressReporter::new())
            .unwrap()
    }

    fn bonds_of(graph: &CoarseGrainedGraph, origin: TermOrigin) -> Vec<Vec<usize>> {
        graph
            .terms_of(InteractionKind::Bond)
            .filter(|t| t.origin == origin)
            .map(|t| t.beads.clone())
            .collect()
    }

    fn atom_named(system: &MolecularSystem, number: isize, name: &str) -> AtomId {
        let chain = system.find_chain_by_id('A').unwrap();
        let residue = system.find_residue_by_number(chain, number).unwrap();
        system
            .residue(residue)
            .unwrap()
            .get_atom_id_by_name(name)
            .unwrap()
    }

    /// TRI-TRI needs the CX atom on its first residue.
    const PAIR: &str = r#"
        [[template]]
        name = "TRI-TRI"
        residues = ["TRI", "TRI"]
        link-bead = "P1"
        atoms = [
            { name = "N1", element = "N" },
            { name = "C1", element = "C" },
            { name = "C2", element = "C" },
            { name = "C3", element = "C" },
            { name = "CX", element = "C" },
            { name = "N1'", element = "N", residue = 1, aliases = ["N1"] },
            { name = "C1'", element = "C", residue = 1, aliases = ["C1"] },
            { name = "C2'", element = "C", residue = 1, aliases = ["C2"] },
            { name = "C3'", element = "C", residue = 1, aliases = ["C3"] },
        ]
        edges = [
            ["N1", "C1"], ["C1", "C2"], ["C2", "C3"], ["C3", "CX"], ["C1", "N1'"],
            ["N1'", "C1'"], ["C1'", "C2'"], ["C2'", "C3'"],
        ]

        [[template.beads]]
        name = "P1"
        type = "P2"
        atoms = ["N1", "C1", "C2", "C3", "CX"]

        [[template.beads]]
        name = "P2"
        type = "P2"
        atoms = ["N1'", "C1'", "C2'", "C3'"]

        [[template.interactions]]
        kind = "bond"
        beads = ["P1", "P2"]
    "#;

    const CARBOXYL: &str = r#"
        [[modification]]
        name = "carboxyl"
        residues = ["TRI"]
        anchors = ["C3"]
        atoms = [{ name = "C3", element = "C" }, { name = "CX", element = "C" }]
        edges = [["C3", "CX"]]

        [[modification.beads]]
        name = "MX"
        type = "Qa"
        charge = -1.0
        atoms = ["CX"]

        [[modification.interactions]]
        kind = "bond"
        beads = ["C3", "MX"]
        parameters = { equilibrium = 0.28, force-constant = 2500.0 }
    "#;

    #[test]
    fn maps_each_residue_and_links_backbone_beads() {
        let system = chain(&["TRI", "TRI", "TRI"], false);
        let mapped = map(&system, &config(FailurePolicy::Strict)).unwrap();
        let graph = &mapped.graph;

        assert_eq!(graph.bead_count(), 9);
        assert_eq!(graph.groups().len(), 3);
        assert!(mapped.diagnostics.is_empty());

        let backbone_bonds: Vec<&[usize]> = graph
            .terms()
            .iter()
            .filter(|t| t.kind == InteractionKind::Bond && t.origin == TermOrigin::Backbone)
            .map(|t| t.beads.as_slice())
            .collect();
        assert_eq!(backbone_bonds, vec![&[0, 3][..], &[3, 6][..]]);

        let angles: Vec<&BondedTerm> = graph.terms_of(InteractionKind::Angle).collect();
        assert_eq!(angles.len(), 1);
        assert_eq!(angles[0].beads, vec![0, 3, 6]);
        assert_eq!(graph.terms_of(InteractionKind::Dihedral).count(), 0);
    }

    #[test]
    fn bead_position_follows_weighting_rule() {
        let system = chain(&["TRI"], false);
        let mass = map(&system, &config(FailurePolicy::Strict)).unwrap();
        let n_mass = Element::N.atomic_mass();
        let c_mass = Element::C.atomic_mass();
        let expected = 1.5 * c_mass / (n_mass + c_mass);
        assert!((mass.graph.beads()[0].position.x - expected).abs() < 1e-9);

        let equal_config = MappingConfigBuilder::new()
            .failure_policy(FailurePolicy::Strict)
            .weighting(WeightingRule::Equal)
            .build()
            .unwrap();
        let equal = map(&system, &equal_config).unwrap();
        assert!((equal.graph.beads()[0].position.x - 0.75).abs() < 1e-9);
    }

    #[test]
    fn every_atom_belongs_to_at_most_one_bead() {
        let system = chain(&["TRI", "TRI", "TRI", "TRI"], false);
        let mapped = map(&system, &config(FailurePolicy::Strict)).unwrap();
        let total: usize = mapped.graph.beads().iter().map(|b| b.members.len()).sum();
        assert_eq!(total, mapped.graph.mapped_atoms().len());
    }

    #[test]
    fn unmapped_heavy_atoms_are_reported() {
        let system = chain(&["TRI", "TRI"], true);
        let mapped = map(&system, &config(FailurePolicy::Strict)).unwrap();
        let unmapped: Vec<&Diagnostic> = mapped
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::UnmappedAtom)
            .collect();
        assert_eq!(unmapped.len(), 1);
        assert!(unmapped[0].message.contains("CX"));
        assert_eq!(unmapped[0].location, "A:1 TRI");
    }

    #[test]
    fn strict_policy_fails_on_unknown_residue() {
        let system = chain(&["TRI", "XYZ", "TRI"], false);
        let result = map(&system, &config(FailurePolicy::Strict));
        assert!(matches!(
            result,
            Err(EngineError::UnknownResidue { ref residue, .. }) if residue == "XYZ"
        ));
    }

    #[test]
    fn permissive_policy_skips_unknown_residue() {
        let system = chain(&["TRI", "XYZ", "TRI"], false);
        let mapped = map(&system, &config(FailurePolicy::Permissive)).unwrap();
        assert_eq!(mapped.graph.groups().len(), 2);
        assert_eq!(mapped.diagnostics.len(), 1);
        assert_eq!(mapped.diagnostics[0].kind, DiagnosticKind::UnknownResidue);
        assert_eq!(mapped.diagnostics[0].location, "A:2 XYZ");
        assert_eq!(
            mapped
                .graph
                .terms()
                .iter()
                .filter(|t| t.origin != TermOrigin::Template)
                .count(),
            0
        );
    }

    #[test]
    fn helix_context_selects_bead_type_and_dihedrals() {
        let mut system = chain(&["TRI", "TRI", "TRI", "TRI"], false);
        annotate_sequence(&mut system, &[SecondaryStructure::AlphaHelix; 4]).unwrap();
        let mapped = map(&system, &config(FailurePolicy::Strict)).unwrap();
        assert_eq!(mapped.graph.beads()[0].bead_type, "N0");
        assert_eq!(mapped.graph.beads()[1].bead_type, "C1");
        let dihedrals: Vec<&BondedTerm> =
            mapped.graph.terms_of(InteractionKind::Dihedral).collect();
        assert_eq!(dihedrals.len(), 1);
        assert_eq!(dihedrals[0].context, StructureClass::Helix);
    }

    #[test]
    fn parallel_mapping_matches_sequential() {
        let mut builder = MolecularSystemBuilder::new();
        let mut serial = 1;
        for chain_id in ['A', 'B', 'C'] {
            builder.start_chain(chain_id);
            for i in 0..3 {
                builder.start_residue(i + 1, "TRI");
                let base = serial;
                for (offset, (name, element)) in [
                    ("N1", Element::N),
                    ("C1", Element::C),
                    ("C2", Element::C),
                    ("C3", Element::C),
                ]
                .into_iter()
                .enumerate()
                {
                    let position = Point3::new(i as f64 * 5.0, offset as f64, 0.0);
                    builder.add_atom(base + offset, name, element, position).unwrap();
                }
                builder
                    .add_bond(base, base + 1, BondOrigin::Declared)
                    .add_bond(base + 1, base + 2, BondOrigin::Declared)
                    .add_bond(base + 2, base + 3, BondOrigin::Declared);
                if i > 0 {
                    builder.add_bond(base - 3, base, BondOrigin::Declared);
                }
                serial += 4;
            }
        }
        let system = builder.build().unwrap();

        let sequential = map(&system, &config(FailurePolicy::Strict)).unwrap();
        let parallel_config = MappingConfigBuilder::new()
            .failure_policy(FailurePolicy::Strict)
            .parallel(true)
            .build()
            .unwrap();
        let parallel = map(&system, &parallel_config).unwrap();
        assert_eq!(sequential.graph, parallel.graph);
        assert_eq!(parallel.graph.bead_count(), 27);
    }
    #[test]
    fn bonds_across_a_skipped_residue_stay_crosslinks() {
        let mut system = chain(&["TRI", "XYZ", "TRI"], false);
        let (first, third) = (atom_named(&system, 1, "C3"), atom_named(&system, 3, "C3"));
        system.add_bond(first, third, BondOrigin::Declared).unwrap();

        let mapped = map(&system, &config(FailurePolicy::Permissive)).unwrap();
        let graph = &mapped.graph;
        assert_eq!(graph.groups()[0].chain_span, 0..1);
        assert_eq!(graph.groups()[1].chain_span, 2..3);
        assert!(bonds_of(graph, TermOrigin::Backbone).is_empty());
        assert_eq!(bonds_of(graph, TermOrigin::Crosslink), vec![vec![2, 5]]);
        assert_eq!(graph.terms_of(InteractionKind::Angle).count(), 0);
    }

    #[test]
    fn two_residue_template_covers_both_residues() {
        let system = chain(&["TRI", "TRI", "TRI"], true);
        let mapped = map_with(&system, PAIR);
        let graph = &mapped.graph;

        let templates: Vec<&str> = graph.groups().iter().map(|g| g.template.as_str()).collect();
        assert_eq!(templates, vec!["TRI-TRI", "TRI"]);
        assert_eq!(graph.groups()[0].residues.len(), 2);
        assert_eq!(graph.groups()[0].chain_span, 0..2);
        assert_eq!(graph.bead_count(), 5);
        assert_eq!(graph.beads()[1].residue_number, 2);
        assert!(mapped.diagnostics.is_empty());

        assert!(bonds_of(graph, TermOrigin::Template).contains(&vec![0, 1]));
        assert_eq!(bonds_of(graph, TermOrigin::Backbone), vec![vec![0, 2]]);
    }

    #[test]
    fn failed_two_residue_template_falls_back_to_single_residues() {
        let system = chain(&["TRI", "TRI"], false);
        let mapped = map_with(&system, PAIR);
        let graph = &mapped.graph;

        let templates: Vec<&str> = graph.groups().iter().map(|g| g.template.as_str()).collect();
        assert_eq!(templates, vec!["TRI", "TRI"]);
        assert_eq!(graph.bead_count(), 6);
        assert!(mapped.diagnostics.is_empty());
        assert_eq!(bonds_of(graph, TermOrigin::Backbone), vec![vec![0, 3]]);
    }

    #[test]
    fn modification_maps_atoms_the_residue_template_left_over() {
        let system = chain(&["TRI", "TRI"], true);
        let mapped = map_with(&system, CARBOXYL);
        let graph = &mapped.graph;

        assert!(mapped.diagnostics.is_empty());
        assert_eq!(graph.bead_count(), 7);
        let added = &graph.beads()[3];
        assert_eq!(added.name, "MX");
        assert_eq!(added.bead_type, "Qa");
        assert_eq!(added.residue_number, 1);
        assert_eq!(added.fragment, 0);
        assert_eq!(added.charge, -1.0);
        assert_eq!(graph.groups()[0].beads, 0..4);

        let tether = graph
            .terms()
            .iter()
            .find(|t| t.kind == InteractionKind::Bond && t.beads == vec![2, 3])
            .unwrap();
        assert_eq!(tether.origin, TermOrigin::Template);
        assert!(tether.explicit.is_some());
        assert_eq!(bonds_of(graph, TermOrigin::Backbone), vec![vec![0, 4]]);
    }

    #[test]
    fn modification_only_claims_leftover_atoms() {
        let system = chain(&["TRI"], true);
        // Any bonded carbon pair fits, but only CX is left over.
        let mapped = map_with(
            &system,
            r#"
            [[modification]]
            name = "ethyl"
            atoms = [{ name = "CA1", element = "C" }, { name = "CA2", element = "C" }]
            edges = [["CA1", "CA2"]]
            [[modification.beads]]
            name = "ET"
            type = "C1"
            atoms = ["CA1", "CA2"]
            "#,
        );
        assert_eq!(mapped.graph.bead_count(), 3);
        assert_eq!(mapped.diagnostics.len(), 1);
        assert_eq!(mapped.diagnostics[0].kind, DiagnosticKind::UnmappedAtom);
    }
}
