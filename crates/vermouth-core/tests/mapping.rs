mod common;

use common::{PeptideBuilder, builtin_resources, config};
use nalgebra::{Isometry3, Vector3};
use std::collections::HashSet;
use vermouth::core::dssp::SecondaryStructure;
use vermouth::core::forcefield::params::ParameterTable;
use vermouth::core::forcefield::term::{InteractionKind, TermOrigin};
use vermouth::core::matching::MatchError;
use vermouth::core::models::builder::MolecularSystemBuilder;
use vermouth::core::models::element::Element;
use vermouth::core::models::system::MolecularSystem;
use vermouth::core::models::topology::BondOrigin;
use vermouth::core::templates::TemplateLibrary;
use vermouth::engine::config::{ElasticNetworkConfig, FailurePolicy, MappingConfigBuilder};
use vermouth::engine::diagnostics::DiagnosticKind;
use vermouth::engine::error::EngineError;
use vermouth::engine::progress::ProgressReporter;
use vermouth::workflows::martinize::{
    MappingResources, MappingResult, SecondaryStructureInput, run,
};

fn map(system: &MolecularSystem, policy: FailurePolicy) -> Result<MappingResult, EngineError> {
    run(
        system,
        &SecondaryStructureInput::None,
        &builtin_resources(),
        &config(policy),
        &ProgressReporter::new(),
    )
}

#[test]
fn every_atom_is_assigned_to_at_most_one_bead() {
    let system = PeptideBuilder::new()
        .residues(&["GLY", "ALA", "SER", "SER", "GLY"])
        .with_hydrogens()
        .build();
    let result = map(&system, FailurePolicy::Strict).unwrap();

    let mut seen = HashSet::new();
    for bead in result.graph.beads() {
        for member in &bead.members {
            assert!(seen.insert(member.atom), "atom in two beads");
        }
    }
    // Hydrogens stay unmapped without producing diagnostics.
    assert_eq!(seen.len(), system.atom_count() - 5);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn bead_positions_commute_with_rigid_transforms() {
    let residues = ["SER", "ALA", "GLY", "SER"];
    let transform = Isometry3::new(Vector3::new(4.0, -2.5, 11.0), Vector3::new(0.3, -1.1, 0.7));

    let original = map(
        &PeptideBuilder::new().residues(&residues).build(),
        FailurePolicy::Strict,
    )
    .unwrap();
    let moved = map(
        &PeptideBuilder::new()
            .residues(&residues)
            .transformed(transform)
            .build(),
        FailurePolicy::Strict,
    )
    .unwrap();

    assert_eq!(original.graph.bead_count(), moved.graph.bead_count());
    for (a, b) in original.graph.beads().iter().zip(moved.graph.beads()) {
        let expected = transform * a.position;
        assert!((expected - b.position).norm() < 1e-9);
    }
}

#[test]
fn mapping_is_deterministic() {
    let system = PeptideBuilder::new()
        .chain('A')
        .residues(&["GLY", "SER", "ALA"])
        .chain('B')
        .residues(&["ALA", "ALA", "SER", "GLY"])
        .build();
    let first = map(&system, FailurePolicy::Strict).unwrap();
    let second = map(&system, FailurePolicy::Strict).unwrap();
    assert_eq!(first.graph, second.graph);
}

#[test]
fn missing_optional_roles_and_extra_atoms_still_match() {
    // No OXT anywhere and hydrogens on every nitrogen.
    let system = PeptideBuilder::new()
        .residues(&["ALA", "SER"])
        .with_hydrogens()
        .build();
    let result = map(&system, FailurePolicy::Strict).unwrap();
    let names: Vec<&str> = result.graph.beads().iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["BB", "BB", "SC1"]);
}

#[test]
fn unsatisfiable_required_role_fails_without_beads() {
    let system = PeptideBuilder::new()
        .residue_without("SER", &["OG"])
        .build();
    match map(&system, FailurePolicy::Strict) {
        Err(EngineError::NoMatchingTemplate(MatchError::NoMatchingTemplate { fragment, best })) => {
            assert_eq!(fragment, "A:1 SER");
            assert!(best.is_some_and(|b| b.missing.contains(&"OG".to_string())));
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let permissive = map(&system, FailurePolicy::Permissive).unwrap();
    assert!(permissive.graph.is_empty());
    assert_eq!(permissive.diagnostics.len(), 1);
}

const TWO_TEMPLATES: &str = r#"
    [[template]]
    name = "T1"
    residues = ["ONE"]
    link-bead = "L"
    atoms = [
        { name = "A1", element = "C" },
        { name = "A2", element = "C" },
        { name = "A3", element = "C" },
    ]
    edges = [["A1", "A2"], ["A2", "A3"]]
    [[template.beads]]
    name = "L"
    type = "P5"
    atoms = ["A1"]
    [[template.beads]]
    name = "S1"
    type = "C1"
    atoms = ["A2"]
    [[template.beads]]
    name = "S2"
    type = "C1"
    atoms = ["A3"]

    [[template]]
    name = "T2"
    residues = ["TWO"]
    link-bead = "L"
    atoms = [{ name = "B1", element = "C" }, { name = "B2", element = "C" }]
    edges = [["B1", "B2"]]
    [[template.beads]]
    name = "L"
    type = "P5"
    atoms = ["B1"]
    [[template.beads]]
    name = "S1"
    type = "C1"
    atoms = ["B2"]
"#;

#[test]
fn two_fragments_are_joined_by_one_bond_between_link_beads() {
    let mut builder = MolecularSystemBuilder::new();
    builder.start_chain('A').start_residue(1, "ONE");
    for (serial, name, x) in [(1, "A1", 0.0), (2, "A2", 1.5), (3, "A3", 3.0)] {
        builder
            .add_atom(serial, name, Element::C, [x, 0.0, 0.0].into())
            .unwrap();
    }
    builder.start_residue(2, "TWO");
    for (serial, name, x) in [(4, "B1", 4.5), (5, "B2", 6.0)] {
        builder
            .add_atom(serial, name, Element::C, [x, 1.0, 0.0].into())
            .unwrap();
    }
    builder
        .add_bond(1, 2, BondOrigin::Declared)
        .add_bond(2, 3, BondOrigin::Declared)
        .add_bond(4, 5, BondOrigin::Declared)
        // The only inter-residue bond joins two non-link atoms.
        .add_bond(3, 5, BondOrigin::Declared);
    let system = builder.build().unwrap();

    let resources = MappingResources::new(
        TemplateLibrary::from_toml_str(TWO_TEMPLATES, "test").unwrap(),
        ParameterTable::builtin().unwrap().clone(),
    );
    let result = run(
        &system,
        &SecondaryStructureInput::None,
        &resources,
        &config(FailurePolicy::Strict),
        &ProgressReporter::new(),
    )
    .unwrap();

    assert_eq!(result.graph.bead_count(), 5);
    let inter: Vec<&[usize]> = result
        .graph
        .terms()
        .iter()
        .filter(|t| t.origin == TermOrigin::Backbone && t.kind == InteractionKind::Bond)
        .map(|t| t.beads.as_slice())
        .collect();
    assert_eq!(inter, vec![&[0, 3][..]]);
}

#[test]
fn label_count_mismatch_maps_nothing() {
    let system = PeptideBuilder::new()
        .residues(&["GLY"; 10])
        .build();
    let result = run(
        &system,
        &SecondaryStructureInput::Sequence(vec![SecondaryStructure::AlphaHelix; 9]),
        &builtin_resources(),
        &config(FailurePolicy::Permissive),
        &ProgressReporter::new(),
    );
    assert!(matches!(result, Err(EngineError::AnnotationMismatch(_))));
}

#[test]
fn permissive_run_skips_one_unmatched_fragment_of_ten() {
    let mut builder = PeptideBuilder::new();
    for i in 0..10 {
        builder = if i == 4 {
            builder.residue_without("SER", &["OG"])
        } else {
            builder.residue("ALA")
        };
    }
    let result = map(&builder.build(), FailurePolicy::Permissive).unwrap();

    assert_eq!(result.graph.groups().len(), 9);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(
        result.diagnostics.entries()[0].kind,
        DiagnosticKind::UnmatchedFragment
    );
    assert_eq!(result.diagnostics.entries()[0].location, "A:5 SER");
}

#[test]
fn helix_labels_select_bead_types_and_backbone_dihedrals() {
    let system = PeptideBuilder::new()
        .residues(&["ALA", "ALA", "ALA", "ALA", "ALA"])
        .build();
    let result = run(
        &system,
        &SecondaryStructureInput::Sequence(vec![SecondaryStructure::AlphaHelix; 5]),
        &builtin_resources(),
        &config(FailurePolicy::Strict),
        &ProgressReporter::new(),
    )
    .unwrap();

    assert!(result.graph.beads().iter().all(|b| b.bead_type == "C5"));
    let dihedrals: Vec<_> = result.graph.terms_of(InteractionKind::Dihedral).collect();
    assert_eq!(dihedrals.len(), 2);
    let parameters = dihedrals[0].parameters.unwrap();
    assert_eq!(parameters.equilibrium, -120.0);
    assert_eq!(parameters.multiplicity, Some(1));

    let angle = result.graph.terms_of(InteractionKind::Angle).next().unwrap();
    assert_eq!(angle.parameters.unwrap().equilibrium, 96.0);
}

#[test]
fn coil_residues_get_no_backbone_dihedrals() {
    let system = PeptideBuilder::new()
        .residues(&["ALA", "GLY", "ALA", "GLY", "ALA"])
        .build();
    let result = map(&system, FailurePolicy::Strict).unwrap();
    assert_eq!(result.graph.terms_of(InteractionKind::Dihedral).count(), 0);
    assert_eq!(result.graph.terms_of(InteractionKind::Angle).count(), 3);
}

#[test]
fn elastic_network_bands_distant_backbone_beads() {
    let system = PeptideBuilder::new()
        .residues(&["ALA"; 6])
        .build();
    let config = MappingConfigBuilder::new()
        .failure_policy(FailurePolicy::Strict)
        .elastic_network(ElasticNetworkConfig {
            upper_bound: 2.0,
            ..ElasticNetworkConfig::default()
        })
        .build()
        .unwrap();
    let result = run(
        &system,
        &SecondaryStructureInput::None,
        &builtin_resources(),
        &config,
        &ProgressReporter::new(),
    )
    .unwrap();

    let bands: Vec<_> = result
        .graph
        .terms()
        .iter()
        .filter(|t| t.origin == TermOrigin::Elastic)
        .collect();
    // Pairs four or more residues apart: (1,5), (1,6), (2,6).
    assert_eq!(bands.len(), 3);
    assert!(bands.iter().all(|t| t.group.as_deref() == Some("Rubber band")));
}

#[test]
fn phosphoserine_gets_a_phosphate_bead_tied_to_its_side_chain() {
    let system = PeptideBuilder::new()
        .residues(&["GLY", "SER"])
        .residue("SER")
        .phosphorylated()
        .residue("ALA")
        .build();
    let result = map(&system, FailurePolicy::Strict).unwrap();
    assert!(result.diagnostics.is_empty());

    let graph = &result.graph;
    let phosphates: Vec<usize> = (0..graph.bead_count())
        .filter(|&b| graph.beads()[b].name == "PO4")
        .collect();
    assert_eq!(phosphates.len(), 1);
    let po4 = phosphates[0];
    let bead = &graph.beads()[po4];
    assert_eq!(bead.residue_number, 3);
    assert_eq!(bead.residue_name, "SER");
    assert_eq!(bead.bead_type, "Qa");
    assert_eq!(bead.charge, -2.0);
    assert_eq!(bead.members.len(), 4);

    let side_chain = po4 - 1;
    assert_eq!(graph.beads()[side_chain].name, "SC1");
    let tether = graph
        .terms()
        .iter()
        .find(|t| t.same_interaction(InteractionKind::Bond, &[side_chain, po4]))
        .unwrap();
    assert_eq!(tether.origin, TermOrigin::Template);
    assert_eq!(tether.parameters.unwrap().equilibrium, 0.31);
}
