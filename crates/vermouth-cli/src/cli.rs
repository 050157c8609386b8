use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vermouth::engine::config::WeightingRule;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The Vermouth Developers",
    version,
    about = "martinize2 - Map atomistic protein structures onto coarse-grained Martini models.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Number of threads used to match chains in parallel.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Map an atomistic structure and write the coarse-grained structure and topology.
    Map(MapArgs),
    /// List the residue names covered by the template library.
    Templates(TemplatesArgs),
}

/// Arguments for the `map` subcommand.
#[derive(Args, Debug)]
pub struct MapArgs {
    // --- Input and Output ---
    /// Atomistic input structure (PDB).
    #[arg(short = 'f', long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Output coarse-grained structure (PDB).
    #[arg(short = 'x', long = "output-structure", required = true, value_name = "PATH")]
    pub output_structure: PathBuf,

    /// Output topology (GROMACS ITP).
    #[arg(short = 'o', long = "output-topology", required = true, value_name = "PATH")]
    pub output_topology: PathBuf,

    /// Optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write every diagnostic of the run to a CSV file.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Molecule name written to the topology.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    // --- Libraries ---
    /// Additional template file, merged over the built-in library. Repeatable.
    #[arg(long = "templates", value_name = "PATH")]
    pub templates: Vec<PathBuf>,

    /// Additional bonded parameter file, merged over the built-in table. Repeatable.
    #[arg(long = "parameters", value_name = "PATH")]
    pub parameters: Vec<PathBuf>,

    // --- Secondary Structure ---
    #[command(flatten)]
    pub secondary_structure: SecondaryStructureArgs,

    // --- Mapping Policy ---
    #[command(flatten)]
    pub failure_policy: FailurePolicyFlags,

    /// How member atoms are weighted when placing beads: mass, equal or declared.
    #[arg(long, value_name = "RULE")]
    pub weighting: Option<WeightingRule>,

    #[command(flatten)]
    pub guess_bonds: GuessBondsFlags,

    // --- Elastic Network ---
    #[command(flatten)]
    pub elastic: ElasticArgs,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S elastic.upper-bound=1.0
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Where secondary structure comes from. At most one source may be given.
#[derive(Args, Debug, Clone, Default)]
#[group(required = false, multiple = false)]
pub struct SecondaryStructureArgs {
    /// DSSP output file for the input structure.
    #[arg(long, value_name = "PATH")]
    pub dssp: Option<PathBuf>,

    /// One-letter secondary structure codes, one per residue (e.g. 'CHHHHHHC').
    #[arg(long = "ss", value_name = "STRING")]
    pub ss: Option<String>,
}

/// A group to handle mutually exclusive failure policy flags.
#[derive(Args, Debug, Clone, Copy, Default)]
#[group(required = false, multiple = false)]
pub struct FailurePolicyFlags {
    /// Abort on the first unmatched fragment or unparameterized term.
    #[arg(long)]
    pub strict: bool,
    /// Skip unmatched fragments and unparameterized terms, reporting each one.
    #[arg(long)]
    pub permissive: bool,
}

/// A group to handle mutually exclusive bond perception flags.
#[derive(Args, Debug, Clone, Copy, Default)]
#[group(required = false, multiple = false)]
pub struct GuessBondsFlags {
    /// Add bonds perceived from interatomic distances to the CONECT records.
    #[arg(long)]
    pub guess_bonds: bool,
    /// Use only the bonds declared in the input file.
    #[arg(long)]
    pub no_guess_bonds: bool,
}

/// Elastic network switches. Distances in nm, force constants in kJ/mol/nm².
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct ElasticArgs {
    /// Add an elastic network between backbone beads.
    #[arg(long)]
    pub elastic: bool,

    /// Rubber band force constant.
    #[arg(long = "ef", value_name = "FLOAT")]
    pub force_constant: Option<f64>,

    /// Rubber band lower distance cutoff.
    #[arg(long = "el", value_name = "FLOAT")]
    pub lower_bound: Option<f64>,

    /// Rubber band upper distance cutoff.
    #[arg(long = "eu", value_name = "FLOAT")]
    pub upper_bound: Option<f64>,

    /// Rubber band decay factor.
    #[arg(long = "ea", value_name = "FLOAT")]
    pub decay_factor: Option<f64>,

    /// Rubber band decay power.
    #[arg(long = "ep", value_name = "FLOAT")]
    pub decay_power: Option<f64>,

    /// Minimum rubber band force constant; weaker bands are dropped.
    #[arg(long = "em", value_name = "FLOAT")]
    pub minimum_force: Option<f64>,
}

/// Arguments for the `templates` subcommand.
#[derive(Args, Debug)]
pub struct TemplatesArgs {
    /// Additional template file, merged over the built-in library. Repeatable.
    #[arg(long = "templates", value_name = "PATH")]
    pub templates: Vec<PathBuf>,

    /// List only the templates from the given files.
    #[arg(long)]
    pub no_builtin: bool,
}
