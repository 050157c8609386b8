use crate::core::forcefield::term::{InteractionKind, TermOrigin};
use crate::core::io::traits::{CoarseGrainedFile, MolecularFile};
use crate::core::models::atom::Atom;
use crate::core::models::builder::{BuildOptions, MolecularSystemBuilder, StructureError};
use crate::core::models::coarse::CoarseGrainedGraph;
use crate::core::models::element::Element;
use crate::core::models::ids::ResidueId;
use crate::core::models::system::MolecularSystem;
use crate::core::models::topology::BondOrigin;
use nalgebra::Point3;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PdbParseErrorKind,
    },

    #[error("No ATOM/HETATM records found")]
    NoAtoms,

    #[error("Invalid structure: {0}")]
    Structure(#[from] StructureError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer in columns {columns} (value: '{value}')")]
    InvalidInt { columns: &'static str, value: String },
    #[error("Invalid coordinate in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: &'static str, value: String },
    #[error("Atom name in columns 13-16 is empty")]
    MissingAtomName,
    #[error("Line is too short for an ATOM/HETATM record (needs 54 columns)")]
    LineTooShort,
}

/// What was read besides the molecule graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbMetadata {
    pub title: Option<String>,
    /// Models present in the file; only the first is read.
    pub models: usize,
    /// Atoms skipped because they belong to a secondary alternate location.
    pub skipped_alt_locs: usize,
    pub conect_bonds: usize,
}

fn columns(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn column_char(line: &str, index: usize) -> char {
    line.get(index..index + 1)
        .and_then(|s| s.chars().next())
        .unwrap_or(' ')
}

fn parse_float(line: &str, start: usize, end: usize, name: &'static str, line_num: usize) -> Result<f64, PdbError> {
    let value = columns(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: name,
            value: value.to_string(),
        },
    })
}

/// Formal charge written as `2+` or `1-` in columns 79-80.
fn parse_formal_charge(field: &str) -> Option<f64> {
    let mut chars = field.chars();
    let magnitude = chars.next()?.to_digit(10)? as f64;
    match chars.next()? {
        '+' => Some(magnitude),
        '-' => Some(-magnitude),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ResidueKey {
    chain: char,
    number: isize,
    insertion: char,
    name: String,
}

pub struct PdbFile;

impl MolecularFile for PdbFile {
    type Metadata = PdbMetadata;
    type Error = PdbError;

    fn read_from(
        reader: &mut impl BufRead,
        options: BuildOptions,
    ) -> Result<(MolecularSystem, Self::Metadata), Self::Error> {
        let mut builder = MolecularSystemBuilder::with_options(options);
        let mut metadata = PdbMetadata::default();
        let mut serials: HashSet<usize> = HashSet::new();
        let mut conect: BTreeSet<(usize, usize)> = BTreeSet::new();

        let mut current_residue: Option<ResidueKey> = None;
        let mut current_chain: Option<char> = None;
        let mut chosen_alt_loc: Option<char> = None;
        let mut first_model_done = false;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let record = columns(&line, 0, 6);

            match record {
                "TITLE" => {
                    let text = columns(&line, 10, 80);
                    metadata.title = Some(match metadata.title.take() {
                        Some(previous) => format!("{previous} {text}"),
                        None => text.to_string(),
                    });
                }
                "MODEL" => metadata.models += 1,
                "ENDMDL" => first_model_done = true,
                "TER" => {
                    current_chain = None;
                    current_residue = None;
                }
                "ATOM" | "HETATM" if !first_model_done => {
                    if line.len() < 54 {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::LineTooShort,
                        });
                    }

                    let alt_loc = column_char(&line, 16);
                    if alt_loc != ' ' {
                        match chosen_alt_loc {
                            None => chosen_alt_loc = Some(alt_loc),
                            Some(chosen) if chosen != alt_loc => {
                                metadata.skipped_alt_locs += 1;
                                continue;
                            }
                            Some(_) => {}
                        }
                    }

                    let serial_str = columns(&line, 6, 11);
                    let serial: usize = serial_str.parse().map_err(|_| PdbError::Parse {
                        line: line_num,
                        kind: PdbParseErrorKind::InvalidInt {
                            columns: "7-11",
                            value: serial_str.to_string(),
                        },
                    })?;
                    let name = columns(&line, 12, 16);
                    if name.is_empty() {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::MissingAtomName,
                        });
                    }
                    let residue_name = columns(&line, 17, 21);
                    let chain = column_char(&line, 21);
                    let number_str = columns(&line, 22, 26);
                    let number: isize = number_str.parse().map_err(|_| PdbError::Parse {
                        line: line_num,
                        kind: PdbParseErrorKind::InvalidInt {
                            columns: "23-26",
                            value: number_str.to_string(),
                        },
                    })?;
                    let insertion = column_char(&line, 26);
                    let x = parse_float(&line, 30, 38, "31-38", line_num)?;
                    let y = parse_float(&line, 38, 46, "39-46", line_num)?;
                    let z = parse_float(&line, 46, 54, "47-54", line_num)?;

                    let element = columns(&line, 76, 78)
                        .parse::<Element>()
                        .unwrap_or_else(|_| Element::from_atom_name(name));
                    let charge = parse_formal_charge(columns(&line, 78, 80));

                    if current_chain != Some(chain) {
                        builder.start_chain(chain);
                        current_chain = Some(chain);
                        current_residue = None;
                    }
                    let key = ResidueKey {
                        chain,
                        number,
                        insertion,
                        name: residue_name.to_string(),
                    };
                    if current_residue.as_ref() != Some(&key) {
                        builder.start_inserted_residue(number, insertion, residue_name);
                        current_residue = Some(key);
                    }

                    let mut atom = Atom::new(name, element, ResidueId::default(), Point3::new(x, y, z));
                    if let Some(charge) = charge {
                        atom = atom.with_charge(charge);
                    }
                    builder.add_detailed_atom(serial, atom)?;
                    serials.insert(serial);
                }
                "ATOM" | "HETATM" => {}
                "CONECT" => {
                    let mut fields = (0..5).map(|i| columns(&line, 6 + 5 * i, 11 + 5 * i));
                    let Some(Ok(origin)) = fields.next().map(str::parse::<usize>) else {
                        continue;
                    };
                    for partner in fields.filter_map(|f| f.parse::<usize>().ok()) {
                        if partner != origin {
                            conect.insert((origin.min(partner), origin.max(partner)));
                        }
                    }
                }
                "END" => break,
                _ => {}
            }
        }

        if serials.is_empty() {
            return Err(PdbError::NoAtoms);
        }
        if metadata.skipped_alt_locs > 0 {
            warn!(
                skipped = metadata.skipped_alt_locs,
                "Ignored atoms at secondary alternate locations."
            );
        }
        if metadata.models > 1 {
            warn!(models = metadata.models, "Only the first model is read.");
        }

        for &(a, b) in &conect {
            // Atoms of later models or skipped alternate locations.
            if serials.contains(&a) && serials.contains(&b) {
                builder.add_bond(a, b, BondOrigin::Declared);
                metadata.conect_bonds += 1;
            }
        }

        let system = builder.build()?;
        debug!(
            atoms = system.atom_count(),
            conect = metadata.conect_bonds,
            bonds = system.bonds().len(),
            "Read PDB structure."
        );
        Ok((system, metadata))
    }
}

/// Largest serial that fits columns 7-11.
const MAX_SERIAL: usize = 99_999;

/// Atom name field: names shorter than four characters start in column 14.
fn atom_name_field(name: &str) -> String {
    if name.len() >= 4 {
        name.chars().take(4).collect()
    } else {
        format!(" {name:<3}")
    }
}

impl CoarseGrainedFile for PdbFile {
    type Options = ();
    type Error = PdbError;

    /// Writes beads as ATOM records (Angstroms), TER between chains and
    /// CONECT records for bonds and constraints other than rubber bands.
    /// Serials wrap past 99999, so CONECT is left out for larger models.
    fn write_to(
        graph: &CoarseGrainedGraph,
        _options: &Self::Options,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        writeln!(writer, "REMARK   1 COARSE-GRAINED MODEL GENERATED BY MARTINIZE2")?;

        let mut previous_chain = None;
        for (index, bead) in graph.beads().iter().enumerate() {
            if previous_chain.is_some_and(|chain| chain != bead.chain) {
                writeln!(writer, "TER")?;
            }
            previous_chain = Some(bead.chain);
            writeln!(
                writer,
                "{:<6}{:>5} {:<4} {:>3} {:1}{:>4}{:1}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}",
                "ATOM",
                (index + 1) % (MAX_SERIAL + 1),
                atom_name_field(&bead.name),
                bead.residue_name.chars().take(3).collect::<String>(),
                bead.chain,
                bead.residue_number % 10_000,
                bead.insertion_code,
                bead.position.x,
                bead.position.y,
                bead.position.z,
                1.0,
                0.0
            )?;
        }
        if previous_chain.is_some() {
            writeln!(writer, "TER")?;
        }

        if graph.bead_count() > MAX_SERIAL {
            warn!(
                beads = graph.bead_count(),
                "Too many beads for unique PDB serials; CONECT records are not written."
            );
            writeln!(writer, "END")?;
            return Ok(());
        }

        let mut partners: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for term in graph.terms() {
            if !matches!(term.kind, InteractionKind::Bond | InteractionKind::Constraint)
                || term.origin == TermOrigin::Elastic
            {
                continue;
            }
            if let [a, b] = term.beads[..] {
                partners.entry(a + 1).or_default().push(b + 1);
                partners.entry(b + 1).or_default().push(a + 1);
            }
        }
        for (serial, bonded) in &mut partners {
            bonded.sort_unstable();
            for chunk in bonded.chunks(4) {
                write!(writer, "CONECT{serial:>5}")?;
                for partner in chunk {
                    write!(writer, "{partner:>5}")?;
                }
                writeln!(writer)?;
            }
        }

        writeln!(writer, "END")?;
        Ok(())
    }
}
