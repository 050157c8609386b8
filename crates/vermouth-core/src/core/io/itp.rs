use crate::core::forcefield::term::{BondedParameters, InteractionKind};
use crate::core::io::traits::CoarseGrainedFile;
use crate::core::models::coarse::{BondedTerm, CoarseGrainedGraph};
use crate::core::models::molecules::{MoleculeType, local_terms, molecule_types};
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ItpError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{kind} between beads {beads} has no parameters")]
    Unparameterized { kind: InteractionKind, beads: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItpOptions {
    pub molecule_name: String,
    pub exclusions: u32,
    /// Comment lines written before the topology.
    pub header: Vec<String>,
}

impl Default for ItpOptions {
    fn default() -> Self {
        Self {
            molecule_name: "molecule_0".to_string(),
            exclusions: 1,
            header: Vec::new(),
        }
    }
}

/// GROMACS include topology.
pub struct ItpFile;

const SECTION_ORDER: [(&str, &[InteractionKind]); 4] = [
    ("bonds", &[InteractionKind::Bond]),
    ("constraints", &[InteractionKind::Constraint]),
    ("angles", &[InteractionKind::Angle]),
    (
        "dihedrals",
        &[InteractionKind::Dihedral, InteractionKind::Improper],
    ),
];

fn parameter_columns(kind: InteractionKind, parameters: &BondedParameters) -> String {
    let mut columns = format!("{:>2} {:>10.5}", parameters.function, parameters.equilibrium);
    if let Some(k) = parameters.force_constant.filter(|_| kind.requires_force_constant()) {
        columns.push_str(&format!(" {k:>10.5}"));
    }
    if let Some(multiplicity) = parameters.multiplicity {
        columns.push_str(&format!(" {multiplicity}"));
    }
    columns
}

fn write_term(
    writer: &mut impl Write,
    graph: &CoarseGrainedGraph,
    term: &BondedTerm,
    local: &[usize],
) -> Result<(), ItpError> {
    let indices: Vec<String> = local.iter().map(|b| format!("{:>5}", b + 1)).collect();
    let parameters = term.parameters.ok_or_else(|| ItpError::Unparameterized {
        kind: term.kind,
        beads: term
            .beads
            .iter()
            .map(|&b| {
                graph
                    .bead(b)
                    .map(|bead| format!("{}:{} {}", bead.chain, bead.residue_number, bead.name))
                    .unwrap_or_else(|| format!("#{}", b + 1))
            })
            .collect::<Vec<_>>()
            .join(" - "),
    })?;
    writeln!(
        writer,
        "{} {}",
        indices.join(" "),
        parameter_columns(term.kind, &parameters)
    )?;
    Ok(())
}

/// One `[ moleculetype ]` block over `beads`, numbered from 1.
fn write_moleculetype(
    writer: &mut impl Write,
    graph: &CoarseGrainedGraph,
    name: &str,
    exclusions: u32,
    beads: &[usize],
) -> Result<(), ItpError> {
    writeln!(writer, "[ moleculetype ]")?;
    writeln!(writer, "; name nrexcl")?;
    writeln!(writer, "{name} {exclusions}")?;

    writeln!(writer)?;
    writeln!(writer, "[ atoms ]")?;
    writeln!(writer, ";  id type  resnr resname atom  cgnr charge")?;
    for (index, bead) in beads.iter().filter_map(|&b| graph.bead(b)).enumerate() {
        write!(
            writer,
            "{:>5} {:<5} {:>5} {:<5} {:<5} {:>5} {:>6.3}",
            index + 1,
            bead.bead_type,
            bead.residue_number,
            bead.residue_name,
            bead.name,
            index + 1,
            bead.charge
        )?;
        if let Some(mass) = bead.mass {
            write!(writer, " {mass:>8.3}")?;
        }
        writeln!(writer)?;
    }

    let terms = local_terms(graph, beads);
    for (section, kinds) in SECTION_ORDER {
        let section_terms: Vec<&(&BondedTerm, Vec<usize>)> = terms
            .iter()
            .filter(|(t, _)| kinds.contains(&t.kind))
            .collect();
        if section_terms.is_empty() {
            continue;
        }
        writeln!(writer)?;
        writeln!(writer, "[ {section} ]")?;

        for (term, local) in section_terms.iter().filter(|(t, _)| t.group.is_none()) {
            write_term(writer, graph, term, local)?;
        }

        let mut groups: Vec<&str> = Vec::new();
        for group in section_terms.iter().filter_map(|(t, _)| t.group.as_deref()) {
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        for group in groups {
            writeln!(writer, "; {group}")?;
            for (term, local) in section_terms
                .iter()
                .filter(|(t, _)| t.group.as_deref() == Some(group))
            {
                write_term(writer, graph, term, local)?;
            }
        }
    }
    Ok(())
}

/// Molecule type names with how many consecutive molecules use each, in
/// graph order.
fn molecule_listing<'n>(types: &[MoleculeType], names: &'n [String]) -> Vec<(&'n str, usize)> {
    let mut order: Vec<(usize, usize)> = types
        .iter()
        .enumerate()
        .flat_map(|(kind, moltype)| {
            moltype
                .molecules
                .iter()
                .filter_map(move |beads| beads.first().map(|&first| (first, kind)))
        })
        .collect();
    order.sort_unstable();

    let mut listing: Vec<(&'n str, usize)> = Vec::new();
    for (_, kind) in order {
        let name = names[kind].as_str();
        match listing.last_mut() {
            Some((last, count)) if *last == name => *count += 1,
            _ => listing.push((name, 1)),
        }
    }
    listing
}

impl CoarseGrainedFile for ItpFile {
    type Options = ItpOptions;
    type Error = ItpError;

    /// Writes one moleculetype per distinct molecule. With more than one,
    /// types are named `<molecule_name>_<k>` and a commented `[ molecules ]`
    /// listing gives the order and counts to include them in.
    fn write_to(
        graph: &CoarseGrainedGraph,
        options: &Self::Options,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for line in &options.header {
            writeln!(writer, "; {line}")?;
        }
        if !options.header.is_empty() {
            writeln!(writer)?;
        }

        let types = molecule_types(graph);
        if types.is_empty() {
            return write_moleculetype(
                writer,
                graph,
                &options.molecule_name,
                options.exclusions,
                &[],
            );
        }

        let names: Vec<String> = if types.len() == 1 {
            vec![options.molecule_name.clone()]
        } else {
            (0..types.len())
                .map(|k| format!("{}_{k}", options.molecule_name))
                .collect()
        };
        for (index, (moltype, name)) in types.iter().zip(&names).enumerate() {
            if index > 0 {
                writeln!(writer)?;
            }
            write_moleculetype(
                writer,
                graph,
                name,
                options.exclusions,
                moltype.representative(),
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "; [ molecules ]")?;
        for (name, count) in molecule_listing(&types, &names) {
            writeln!(writer, "; {name} {count}")?;
        }
        Ok(())
    }
}
