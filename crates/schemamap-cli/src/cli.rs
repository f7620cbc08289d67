//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Schemamap CLI - Spec-driven schema and data mapping
///
/// Maps data between schemas using a declarative transformation
/// specification, derives target schemas and inverts specifications.
#[derive(Parser, Debug)]
#[command(
    name = "schemamap",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "SCHEMAMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for documents (defaults to the configured format)
    #[arg(short = 'O', long, value_enum, global = true)]
    pub output_format: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Map a data document from the source schema to the target schema
    MapData(MapDataArgs),

    /// Derive the target schema from a source schema and a specification
    DeriveSchema(DeriveSchemaArgs),

    /// Invert a transformation specification
    Invert(InvertArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Schema and specification inputs shared by every mapping command
#[derive(Parser, Debug)]
pub struct MappingInputs {
    /// Path to the source schema (YAML or JSON)
    #[arg(short, long, value_name = "SCHEMA")]
    pub source_schema: PathBuf,

    /// Path to the transformation specification (YAML or JSON)
    #[arg(short = 'T', long, value_name = "SPECIFICATION")]
    pub transformer_specification: PathBuf,
}

/// Arguments for the map-data command
#[derive(Parser, Debug)]
pub struct MapDataArgs {
    #[command(flatten)]
    pub inputs: MappingInputs,

    /// Path to the input data document (YAML or JSON); `-` reads stdin
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Source class of the input document
    #[arg(long)]
    pub source_type: Option<String>,

    /// Target class to produce
    #[arg(long)]
    pub target_type: Option<String>,

    /// Path to an explicit target schema (derived when omitted)
    #[arg(long, value_name = "SCHEMA")]
    pub target_schema: Option<PathBuf>,

    /// Index the input document first so dot-paths follow references
    #[arg(long, requires = "source_type")]
    pub index: bool,

    /// Map each item of a top-level list separately
    #[arg(long)]
    pub each: bool,

    /// Map target objects back to the source schema through the inverted specification
    #[arg(long)]
    pub reverse: bool,

    #[command(flatten)]
    pub transform: TransformFlags,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Transformer option overrides
#[derive(Parser, Debug, Default, Clone, Copy)]
pub struct TransformFlags {
    /// Allow expressions outside the restricted subset
    #[arg(long)]
    pub unrestricted_eval: bool,

    /// Fail on unresolvable dot-paths instead of yielding null
    #[arg(long)]
    pub strict: bool,

    /// Do not coerce values to primitive target ranges
    #[arg(long)]
    pub no_coerce: bool,
}

/// Arguments for the derive-schema command
#[derive(Parser, Debug)]
pub struct DeriveSchemaArgs {
    #[command(flatten)]
    pub inputs: MappingInputs,

    /// Identifier of the derived schema
    #[arg(long)]
    pub target_id: Option<String>,

    /// Name of the derived schema
    #[arg(long)]
    pub target_name: Option<String>,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the invert command
#[derive(Parser, Debug)]
pub struct InvertArgs {
    #[command(flatten)]
    pub inputs: MappingInputs,

    /// Fail on the first non-invertible derivation instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for generating shell completions
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Document output formats
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// YAML output
    Yaml,
    /// JSON output
    Json,
    /// Pretty-printed JSON output
    JsonPretty,
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stderr().is_terminal()
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}
