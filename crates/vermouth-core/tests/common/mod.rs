#![allow(dead_code)]

use nalgebra::{Isometry3, Point3};
use vermouth::core::forcefield::params::ParameterTable;
use vermouth::core::models::builder::MolecularSystemBuilder;
use vermouth::core::models::element::Element;
use vermouth::core::models::system::MolecularSystem;
use vermouth::core::models::topology::BondOrigin;
use vermouth::core::templates::TemplateLibrary;
use vermouth::engine::config::{FailurePolicy, MappingConfig, MappingConfigBuilder};
use vermouth::workflows::martinize::MappingResources;

struct ResidueSpec {
    name: String,
    missing: Vec<String>,
    phosphate: bool,
}

/// Builds small peptides with idealized, non-degenerate coordinates and
/// explicit bonds.
pub struct PeptideBuilder {
    chains: Vec<(char, Vec<ResidueSpec>)>,
    hydrogens: bool,
    transform: Isometry3<f64>,
}

impl PeptideBuilder {
    pub fn new() -> Self {
        Self {
            chains: Vec::new(),
            hydrogens: false,
            transform: Isometry3::identity(),
        }
    }

    pub fn chain(mut self, id: char) -> Self {
        self.chains.push((id, Vec::new()));
        self
    }

    pub fn residue(self, name: &str) -> Self {
        self.residue_without(name, &[])
    }

    pub fn residues(mut self, names: &[&str]) -> Self {
        for name in names {
            self = self.residue(name);
        }
        self
    }

    /// Adds a residue with some of its atoms left out.
    pub fn residue_without(mut self, name: &str, missing: &[&str]) -> Self {
        if self.chains.is_empty() {
            self.chains.push(('A', Vec::new()));
        }
        if let Some((_, residues)) = self.chains.last_mut() {
            residues.push(ResidueSpec {
                name: name.to_string(),
                missing: missing.iter().map(|s| s.to_string()).collect(),
                phosphate: false,
            });
        }
        self
    }

    /// Adds a phosphate group to the hydroxyl oxygen of the last residue.
    pub fn phosphorylated(mut self) -> Self {
        if let Some(spec) = self.chains.last_mut().and_then(|(_, r)| r.last_mut()) {
            spec.phosphate = true;
        }
        self
    }

    pub fn with_hydrogens(mut self) -> Self {
        self.hydrogens = true;
        self
    }

    pub fn transformed(mut self, transform: Isometry3<f64>) -> Self {
        self.transform = transform;
        self
    }

    pub fn build(self) -> MolecularSystem {
        let mut builder = MolecularSystemBuilder::new();
        let mut serial = 1usize;

        for (chain_index, (chain_id, residues)) in self.chains.iter().enumerate() {
            builder.start_chain(*chain_id);
            let mut previous_c: Option<usize> = None;

            for (i, spec) in residues.iter().enumerate() {
                builder.start_residue(i as isize + 1, &spec.name);
                let base = Point3::new(3.8 * i as f64, 0.5 * (i % 2) as f64, 20.0 * chain_index as f64);

                let mut atoms: Vec<(&str, Element, [f64; 3])> = vec![
                    ("N", Element::N, [0.0, 0.0, 0.0]),
                    ("CA", Element::C, [1.45, 0.3, 0.0]),
                    ("C", Element::C, [2.4, -0.4, 0.6]),
                    ("O", Element::O, [2.3, -1.6, 0.8]),
                ];
                if matches!(spec.name.as_str(), "ALA" | "SER") {
                    atoms.push(("CB", Element::C, [1.6, 1.7, -0.5]));
                }
                if spec.name == "SER" {
                    atoms.push(("OG", Element::O, [2.8, 2.2, -0.9]));
                }
                if spec.phosphate {
                    atoms.push(("P", Element::P, [3.6, 3.4, -1.4]));
                    atoms.push(("O1P", Element::O, [5.1, 3.3, -1.2]));
                    atoms.push(("O2P", Element::O, [3.2, 4.8, -1.3]));
                    atoms.push(("O3P", Element::O, [3.2, 3.1, -2.8]));
                }
                if self.hydrogens {
                    atoms.push(("H", Element::H, [-0.6, 0.7, 0.3]));
                }

                let mut serial_of = std::collections::HashMap::new();
                for (name, element, [x, y, z]) in atoms {
                    if spec.missing.iter().any(|m| m == name) {
                        continue;
                    }
                    let position = self.transform * Point3::new(base.x + x, base.y + y, base.z + z);
                    builder.add_atom(serial, name, element, position).unwrap();
                    serial_of.insert(name, serial);
                    serial += 1;
                }

                for (a, b) in [
                    ("N", "CA"),
                    ("CA", "C"),
                    ("C", "O"),
                    ("CA", "CB"),
                    ("CB", "OG"),
                    ("N", "H"),
                    ("OG", "P"),
                    ("P", "O1P"),
                    ("P", "O2P"),
                    ("P", "O3P"),
                ] {
                    if let (Some(&a), Some(&b)) = (serial_of.get(a), serial_of.get(b)) {
                        builder.add_bond(a, b, BondOrigin::Declared);
                    }
                }
                if let (Some(c), Some(&n)) = (previous_c, serial_of.get("N")) {
                    builder.add_bond(c, n, BondOrigin::Declared);
                }
                previous_c = serial_of.get("C").copied();
            }
        }

        builder.build().unwrap()
    }
}

pub fn builtin_resources() -> MappingResources {
    MappingResources::new(
        TemplateLibrary::builtin().unwrap().clone(),
        ParameterTable::builtin().unwrap().clone(),
    )
}

pub fn config(policy: FailurePolicy) -> MappingConfig {
    MappingConfigBuilder::new()
        .failure_policy(policy)
        .build()
        .unwrap()
}
