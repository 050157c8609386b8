use super::label::SecondaryStructure;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Secondary structure of one residue as reported by DSSP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsspRecord {
    pub chain: char,
    pub residue_number: isize,
    pub insertion_code: char,
    pub structure: SecondaryStructure,
}

impl DsspRecord {
    pub fn new(chain: char, residue_number: isize, structure: SecondaryStructure) -> Self {
        Self {
            chain,
            residue_number,
            insertion_code: ' ',
            structure,
        }
    }

    /// Residue number with its insertion code, e.g. `52A`.
    pub fn number_label(&self) -> String {
        if self.insertion_code == ' ' {
            self.residue_number.to_string()
        } else {
            format!("{}{}", self.residue_number, self.insertion_code)
        }
    }
}

#[derive(Debug, Error)]
pub enum DsspError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("DSSP output has no residue table")]
    MissingHeader,

    #[error("Invalid DSSP record on line {line}: {message}")]
    Parse { line: usize, message: String },
}

const TABLE_HEADER: &str = "  #  RESIDUE";

/// Reads the residue table of classic DSSP output.
///
/// Chain-break lines (`!` in the amino-acid column) are skipped and a blank
/// structure column is read as coil.
pub fn read_dssp<R: BufRead>(reader: R) -> Result<Vec<DsspRecord>, DsspError> {
    let mut records = Vec::new();
    let mut in_table = false;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = index + 1;

        if !in_table {
            in_table = line.starts_with(TABLE_HEADER);
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let chars: Vec<char> = line.chars().collect();
        if chars.get(13) == Some(&'!') {
            continue;
        }
        if chars.len() < 17 {
            return Err(DsspError::Parse {
                line: line_number,
                message: "line is too short".to_string(),
            });
        }

        let number_field: String = chars[5..10].iter().collect();
        let residue_number =
            number_field
                .trim()
                .parse::<isize>()
                .map_err(|_| DsspError::Parse {
                    line: line_number,
                    message: format!("invalid residue number '{}'", number_field.trim()),
                })?;
        let insertion_code = chars[10];
        let chain = chars[11];
        let structure =
            SecondaryStructure::from_code(chars[16]).map_err(|e| DsspError::Parse {
                line: line_number,
                message: e.to_string(),
            })?;

        records.push(DsspRecord {
            chain,
            residue_number,
            insertion_code,
            structure,
        });
    }

    if !in_table {
        return Err(DsspError::MissingHeader);
    }
    Ok(records)
}

pub fn read_dssp_file(path: &Path) -> Result<Vec<DsspRecord>, DsspError> {
    let file = File::open(path)?;
    read_dssp(BufReader::new(file))
}

/// Parses a string of one-letter codes such as `CCHHHHHHCC`. Whitespace is ignored.
pub fn parse_secondary_structure_string(
    codes: &str,
) -> Result<Vec<SecondaryStructure>, DsspError> {
    codes
        .chars()
        .filter(|c| !c.is_whitespace())
        .enumerate()
        .map(|(position, code)| {
            SecondaryStructure::from_code(code).map_err(|e| DsspError::Parse {
                line: 1,
                message: format!("position {}: {}", position + 1, e),
            })
        })
        .collect()
}
