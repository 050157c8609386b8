use crate::cli::MapArgs;
use crate::config::{AppConfig, SecondaryStructureSource, build_config};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use std::fs::File;
use std::io::BufWriter;
use vermouth::{
    core::dssp::reader::{parse_secondary_structure_string, read_dssp_file},
    core::io::{
        itp::{ItpFile, ItpOptions},
        pdb::PdbFile,
        traits::{CoarseGrainedFile, MolecularFile},
    },
    core::models::{coarse::CoarseGrainedGraph, molecules::molecule_types},
    engine::diagnostics::DiagnosticReport,
    engine::progress::ProgressReporter,
    workflows::martinize::{self, MappingResources, SecondaryStructureInput},
};
use tracing::{info, warn};

pub async fn run(args: MapArgs, quiet: bool) -> Result<()> {
    info!("Merging configuration from defaults, file and CLI arguments...");
    let config = build_config(&args)?;

    info!("Loading input structure from {:?}", &config.input_path);
    let (system, metadata) = PdbFile::read_from_path(&config.input_path, config.build_options)
        .map_err(|e| CliError::parsing(&config.input_path, e))?;
    if metadata.models > 1 {
        warn!(
            models = metadata.models,
            "Input contains several models; only the first one is mapped."
        );
    }
    if metadata.skipped_alt_locs > 0 {
        info!(
            skipped = metadata.skipped_alt_locs,
            "Kept the first alternate location of disordered atoms."
        );
    }

    let secondary_structure = load_secondary_structure(&config)?;

    let resources = tokio::task::block_in_place(|| MappingResources::load(&config.core_config))?;

    let progress_handler = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Mapping {} residues in {} chain(s)...",
        system.residue_count(),
        system.chains_iter().count()
    );
    info!("Invoking the core mapping workflow...");
    let result = tokio::task::block_in_place(|| {
        martinize::run(
            &system,
            &secondary_structure,
            &resources,
            &config.core_config,
            &reporter,
        )
    })?;

    write_outputs(&config, &result.graph, metadata.title.as_deref())?;
    print_summary(&result.diagnostics, result.graph.bead_count(), &config);

    if let Some(report_path) = &config.report_path {
        let file = File::create(report_path).map_err(|e| CliError::writing(report_path, e))?;
        result
            .diagnostics
            .write_csv(BufWriter::new(file))
            .map_err(|e| CliError::writing(report_path, e))?;
        println!("Diagnostic report written to: {}", report_path.display());
    }

    Ok(())
}

fn load_secondary_structure(config: &AppConfig) -> Result<SecondaryStructureInput> {
    Ok(match &config.secondary_structure {
        SecondaryStructureSource::None => SecondaryStructureInput::None,
        SecondaryStructureSource::DsspFile(path) => {
            info!("Reading secondary structure from {:?}", path);
            let records = read_dssp_file(path).map_err(|e| CliError::parsing(path, e))?;
            SecondaryStructureInput::Records(records)
        }
        SecondaryStructureSource::Codes(codes) => {
            let labels = parse_secondary_structure_string(codes)
                .map_err(|e| CliError::Argument(format!("Invalid secondary structure: {e}")))?;
            SecondaryStructureInput::Sequence(labels)
        }
    })
}

fn write_outputs(
    config: &AppConfig,
    graph: &CoarseGrainedGraph,
    title: Option<&str>,
) -> Result<()> {
    info!("Writing coarse-grained structure to {:?}", &config.structure_output);
    PdbFile::write_to_path(graph, &(), &config.structure_output)
        .map_err(|e| CliError::writing(&config.structure_output, e))?;

    let mut header = vec![
        format!("Generated by martinize2 v{}", env!("CARGO_PKG_VERSION")),
        format!("Input structure: {}", config.input_path.display()),
    ];
    if let Some(title) = title {
        header.push(format!("Title: {title}"));
    }
    let options = ItpOptions {
        molecule_name: config.molecule_name.clone(),
        header,
        ..ItpOptions::default()
    };
    info!(
        moleculetypes = molecule_types(graph).len(),
        "Writing topology to {:?}", &config.topology_output
    );
    ItpFile::write_to_path(graph, &options, &config.topology_output)
        .map_err(|e| CliError::writing(&config.topology_output, e))?;

    println!(
        "✓ {} beads written to: {}",
        graph.bead_count(),
        config.structure_output.display()
    );
    println!(
        "✓ Topology '{}' written to: {}",
        config.molecule_name,
        config.topology_output.display()
    );
    Ok(())
}

fn print_summary(diagnostics: &DiagnosticReport, beads: usize, config: &AppConfig) {
    if diagnostics.is_empty() {
        info!(beads, "Mapping completed without diagnostics.");
        return;
    }
    warn!(
        count = diagnostics.len(),
        policy = %config.core_config.failure_policy,
        "Mapping completed with diagnostics."
    );
    println!("Diagnostics:");
    for (kind, count) in diagnostics.summary() {
        println!("  {:<20} {count}", kind.as_str());
    }
    if config.report_path.is_none() {
        for entry in diagnostics.entries().iter().take(10) {
            println!("  - {entry}");
        }
        if diagnostics.len() > 10 {
            println!(
                "  ... {} more (use --report to write all of them)",
                diagnostics.len() - 10
            );
        }
    }
}
