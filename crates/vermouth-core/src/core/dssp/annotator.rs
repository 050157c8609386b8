use super::label::SecondaryStructure;
use super::reader::DsspRecord;
use crate::core::models::ids::ResidueId;
use crate::core::models::system::MolecularSystem;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("Got {labels} secondary-structure labels for {residues} residues")]
    CountMismatch { residues: usize, labels: usize },

    #[error("Secondary structure given for unknown residue {chain}:{number}")]
    ResidueNotFound { chain: char, number: String },

    #[error("Residue {chain}:{number} has more than one secondary-structure label")]
    DuplicateLabel { chain: char, number: String },

    #[error("Residue {chain}:{number} has no secondary-structure label")]
    MissingLabel { chain: char, number: String },
}

/// Attaches one label per residue, in chain and sequence order.
///
/// Nothing is modified unless the label count equals the residue count.
pub fn annotate_sequence(
    system: &mut MolecularSystem,
    labels: &[SecondaryStructure],
) -> Result<(), AnnotationError> {
    let residues = system.residues_in_order();
    if residues.len() != labels.len() {
        return Err(AnnotationError::CountMismatch {
            residues: residues.len(),
            labels: labels.len(),
        });
    }
    apply(system, residues.into_iter().zip(labels.iter().copied()));
    Ok(())
}

/// Attaches labels addressed by chain, residue number and insertion code.
///
/// Every residue must be covered exactly once and every record must name an
/// existing residue; otherwise no residue is modified.
pub fn annotate_records(
    system: &mut MolecularSystem,
    records: &[DsspRecord],
) -> Result<(), AnnotationError> {
    let mut assigned: HashMap<ResidueId, SecondaryStructure> = HashMap::with_capacity(records.len());

    for record in records {
        let residue_id = system
            .find_chain_by_id(record.chain)
            .and_then(|chain| {
                system.find_residue(chain, record.residue_number, record.insertion_code)
            })
            .ok_or_else(|| AnnotationError::ResidueNotFound {
                chain: record.chain,
                number: record.number_label(),
            })?;
        if assigned.insert(residue_id, record.structure).is_some() {
            return Err(AnnotationError::DuplicateLabel {
                chain: record.chain,
                number: record.number_label(),
            });
        }
    }

    let residues = system.residues_in_order();
    let mut ordered = Vec::with_capacity(residues.len());
    for residue_id in residues {
        match assigned.get(&residue_id) {
            Some(&label) => ordered.push((residue_id, label)),
            None => {
                let (chain, number) = residue_label(system, residue_id);
                return Err(AnnotationError::MissingLabel { chain, number });
            }
        }
    }

    apply(system, ordered);
    Ok(())
}

fn apply<I>(system: &mut MolecularSystem, labels: I)
where
    I: IntoIterator<Item = (ResidueId, SecondaryStructure)>,
{
    let mut count = 0usize;
    for (residue_id, label) in labels {
        if let Some(residue) = system.residue_mut(residue_id) {
            residue.secondary_structure = Some(label);
            count += 1;
        }
    }
    debug!(residues = count, "Attached secondary-structure labels.");
}

fn residue_label(system: &MolecularSystem, residue_id: ResidueId) -> (char, String) {
    system
        .residue(residue_id)
        .map(|residue| {
            let chain = system.chain(residue.chain_id).map(|c| c.id).unwrap_or('?');
            (chain, residue.number_label())
        })
        .unwrap_or(('?', String::new()))
}
