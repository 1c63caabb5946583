use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rapi")]
#[command(author = "rapi contributors")]
#[command(version)]
#[command(about = "Inspect and enforce declarative system resources", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List known resource types
    Types,

    /// Show docs, attributes and autorequires of a type
    Describe {
        /// Resource type name
        type_name: String,
    },

    /// Print the JSON Schema of a type
    Schema {
        /// Resource type name
        type_name: String,
    },

    /// Show current instances
    ///
    /// Without a target, every implemented type is fetched.
    Get(GetArgs),

    /// Show what `set` would change
    Diff(ManifestArgs),

    /// Enforce the resources declared in a manifest
    Set(SetArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, clap::Args)]
pub struct GetArgs {
    /// `type` or `type.name`
    pub target: Option<String>,

    /// Print resource hashes as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args)]
pub struct ManifestArgs {
    /// Resource type name
    pub type_name: String,

    /// Manifest file (.json or .toml)
    pub manifest: PathBuf,
}

#[derive(Debug, clap::Args)]
pub struct SetArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Report what would change without changing anything
    #[arg(long, short = 'n')]
    pub noop: bool,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}
