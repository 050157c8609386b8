use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileElasticConfig};
use super::models::{AppConfig, SecondaryStructureSource};
use crate::cli::{ElasticArgs, MapArgs};
use crate::error::{CliError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use vermouth::core::dssp::StructureClass;
use vermouth::core::models::builder::BuildOptions;
use vermouth::core::templates::TemplatePrecedence;
use vermouth::engine::config::{
    ElasticNetworkConfig, FailurePolicy, MappingConfigBuilder, WeightingRule,
};

pub fn build_config(args: &MapArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    // --- Mapping policy ---
    let mapping_file = file_config.mapping.take().unwrap_or_default();
    let failure_policy = if args.failure_policy.strict {
        FailurePolicy::Strict
    } else if args.failure_policy.permissive {
        FailurePolicy::Permissive
    } else {
        match mapping_file.failure_policy.as_deref() {
            Some(value) => parse_config_value("mapping.failure-policy", value)?,
            None => defaults.failure_policy,
        }
    };
    let weighting = match (args.weighting, mapping_file.weighting.as_deref()) {
        (Some(rule), _) => rule,
        (None, Some(value)) => parse_config_value::<WeightingRule>("mapping.weighting", value)?,
        (None, None) => defaults.weighting,
    };
    let backbone_dihedrals = match &mapping_file.backbone_dihedrals {
        Some(classes) => classes
            .iter()
            .map(|c| parse_config_value::<StructureClass>("mapping.backbone-dihedrals", c))
            .collect::<Result<Vec<_>>>()?,
        None => defaults.backbone_dihedrals,
    };

    let mut builder = MappingConfigBuilder::new()
        .failure_policy(failure_policy)
        .weighting(weighting)
        .parallel(mapping_file.parallel.unwrap_or(defaults.parallel))
        .backbone_angles(mapping_file.backbone_angles.unwrap_or(defaults.backbone_angles))
        .backbone_dihedral_classes(backbone_dihedrals);
    if let Some(limit) = mapping_file.step_limit {
        builder = builder.step_limit(limit);
    }

    // --- Libraries ---
    let library_file = file_config.library.take().unwrap_or_default();
    if let Some(value) = library_file.precedence.as_deref() {
        builder = builder.precedence(parse_precedence(value)?);
    }
    if let Some(name) = library_file.fallback_template {
        builder = builder.fallback_template(name);
    }
    builder = builder
        .use_builtin_templates(library_file.builtin_templates.unwrap_or(true))
        .use_builtin_parameters(library_file.builtin_parameters.unwrap_or(true));
    for path in library_file.templates.into_iter().chain(args.templates.iter().cloned()) {
        builder = builder.template_path(path);
    }
    for path in library_file
        .parameters
        .into_iter()
        .chain(args.parameters.iter().cloned())
    {
        builder = builder.parameter_path(path);
    }

    // --- Elastic network ---
    let elastic_file = file_config.elastic.take().unwrap_or_default();
    if let Some(elastic) = merge_elastic(&args.elastic, &elastic_file) {
        builder = builder.elastic_network(elastic);
    }

    let core_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    // --- Input ---
    let input_file = file_config.input.take().unwrap_or_default();
    let guess_bonds = if args.guess_bonds.guess_bonds {
        true
    } else if args.guess_bonds.no_guess_bonds {
        false
    } else {
        input_file.guess_bonds.unwrap_or(defaults.guess_bonds)
    };
    let build_options = BuildOptions {
        guess_bonds,
        bond_tolerance: input_file.bond_tolerance.unwrap_or(defaults.bond_tolerance),
    };
    if build_options.bond_tolerance < 0.0 {
        return Err(CliError::Config(
            "`input.bond-tolerance` must not be negative.".to_string(),
        ));
    }

    let secondary_structure = match (
        &args.secondary_structure.dssp,
        &args.secondary_structure.ss,
    ) {
        (Some(path), _) => SecondaryStructureSource::DsspFile(path.clone()),
        (None, Some(codes)) => SecondaryStructureSource::Codes(codes.clone()),
        (None, None) => match (input_file.dssp, input_file.secondary_structure) {
            (Some(_), Some(_)) => {
                return Err(CliError::Config(
                    "`input.dssp` and `input.secondary-structure` are mutually exclusive."
                        .to_string(),
                ));
            }
            (Some(path), None) => SecondaryStructureSource::DsspFile(path),
            (None, Some(codes)) => SecondaryStructureSource::Codes(codes),
            (None, None) => SecondaryStructureSource::None,
        },
    };

    // --- Output ---
    let output_file = file_config.output.take().unwrap_or_default();
    let molecule_name = args
        .name
        .clone()
        .or(output_file.molecule_name)
        .unwrap_or(defaults.molecule_name);
    if molecule_name.trim().is_empty() || molecule_name.contains(char::is_whitespace) {
        return Err(CliError::Argument(format!(
            "Molecule name '{molecule_name}' must be a single non-empty word."
        )));
    }
    let report_path: Option<PathBuf> = args.report.clone().or(output_file.report);

    Ok(AppConfig {
        input_path: args.input.clone(),
        structure_output: args.output_structure.clone(),
        topology_output: args.output_topology.clone(),
        report_path,
        molecule_name,
        build_options,
        secondary_structure,
        core_config,
    })
}

/// Rubber bands are added when `--elastic` is given or the file enables them.
/// Each parameter comes from its flag, then the file, then the default.
fn merge_elastic(cli: &ElasticArgs, file: &FileElasticConfig) -> Option<ElasticNetworkConfig> {
    if !cli.elastic && !file.enabled.unwrap_or(false) {
        return None;
    }
    let defaults = ElasticNetworkConfig::default();
    Some(ElasticNetworkConfig {
        base_constant: cli
            .force_constant
            .or(file.force_constant)
            .unwrap_or(defaults.base_constant),
        lower_bound: cli
            .lower_bound
            .or(file.lower_bound)
            .unwrap_or(defaults.lower_bound),
        upper_bound: cli
            .upper_bound
            .or(file.upper_bound)
            .unwrap_or(defaults.upper_bound),
        decay_factor: cli
            .decay_factor
            .or(file.decay_factor)
            .unwrap_or(defaults.decay_factor),
        decay_power: cli
            .decay_power
            .or(file.decay_power)
            .unwrap_or(defaults.decay_power),
        minimum_force: cli
            .minimum_force
            .or(file.minimum_force)
            .unwrap_or(defaults.minimum_force),
        excluded_bonds: file.excluded_bonds.unwrap_or(defaults.excluded_bonds),
        ..defaults
    })
}

fn parse_precedence(value: &str) -> Result<TemplatePrecedence> {
    match value.to_ascii_lowercase().as_str() {
        "declared-priority" => Ok(TemplatePrecedence::DeclaredPriority),
        "registration-order" => Ok(TemplatePrecedence::RegistrationOrder),
        other => Err(CliError::Config(format!(
            "Invalid value for library.precedence: '{other}'. Expected 'declared-priority' or 'registration-order'."
        ))),
    }
}

fn parse_config_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| CliError::Config(format!("Invalid value for {key}: '{value}' ({e})")))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value) = kv_pair.split_once('=').ok_or_else(|| {
            CliError::Config(format!(
                "Invalid --set format: '{kv_pair}'. Expected KEY=VALUE."
            ))
        })?;
        let key = key.trim();

        match key {
            "input.guess-bonds" => {
                config.input.get_or_insert_with(Default::default).guess_bonds =
                    Some(parse_config_value(key, value)?);
            }
            "input.bond-tolerance" => {
                config.input.get_or_insert_with(Default::default).bond_tolerance =
                    Some(parse_config_value(key, value)?);
            }
            "library.precedence" => {
                config.library.get_or_insert_with(Default::default).precedence =
                    Some(value.to_string());
            }
            "library.fallback-template" => {
                config
                    .library
                    .get_or_insert_with(Default::default)
                    .fallback_template = Some(value.to_string());
            }
            "mapping.failure-policy" => {
                config
                    .mapping
                    .get_or_insert_with(Default::default)
                    .failure_policy = Some(value.to_string());
            }
            "mapping.weighting" => {
                config.mapping.get_or_insert_with(Default::default).weighting =
                    Some(value.to_string());
            }
            "mapping.step-limit" => {
                config.mapping.get_or_insert_with(Default::default).step_limit =
                    Some(parse_config_value(key, value)?);
            }
            "mapping.parallel" => {
                config.mapping.get_or_insert_with(Default::default).parallel =
                    Some(parse_config_value(key, value)?);
            }
            "mapping.backbone-angles" => {
                config
                    .mapping
                    .get_or_insert_with(Default::default)
                    .backbone_angles = Some(parse_config_value(key, value)?);
            }
            "mapping.backbone-dihedrals" => {
                config
                    .mapping
                    .get_or_insert_with(Default::default)
                    .backbone_dihedrals = Some(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect(),
                );
            }
            "elastic.enabled" => {
                config.elastic.get_or_insert_with(Default::default).enabled =
                    Some(parse_config_value(key, value)?);
            }
            "elastic.force-constant" => {
                config
                    .elastic
                    .get_or_insert_with(Default::default)
                    .force_constant = Some(parse_config_value(key, value)?);
            }
            "elastic.lower-bound" => {
                config.elastic.get_or_insert_with(Default::default).lower_bound =
                    Some(parse_config_value(key, value)?);
            }
            "elastic.upper-bound" => {
                config.elastic.get_or_insert_with(Default::default).upper_bound =
                    Some(parse_config_value(key, value)?);
            }
            "elastic.decay-factor" => {
                config.elastic.get_or_insert_with(Default::default).decay_factor =
                    Some(parse_config_value(key, value)?);
            }
            "elastic.decay-power" => {
                config.elastic.get_or_insert_with(Default::default).decay_power =
                    Some(parse_config_value(key, value)?);
            }
            "elastic.minimum-force" => {
                config
                    .elastic
                    .get_or_insert_with(Default::default)
                    .minimum_force = Some(parse_config_value(key, value)?);
            }
            "elastic.excluded-bonds" => {
                config
                    .elastic
                    .get_or_insert_with(Default::default)
                    .excluded_bonds = Some(parse_config_value(key, value)?);
            }
            "output.molecule-name" => {
                config
                    .output
                    .get_or_insert_with(Default::default)
                    .molecule_name = Some(value.to_string());
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{key}'"
                )));
            }
        }
    }
    Ok(config)
}
