//! CLI argument definitions for mvs.
//!
//! Every command reads a requirement table (see `mvs_core::table`) and
//! resolves it from the table's `target` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "mvs",
    version,
    about = "Minimal version selection over a requirement table",
    long_about = "mvs computes build lists with minimal version selection: every module path \
                  gets the highest version required anywhere in the requirement graph of the \
                  target. Requirements are read from a TOML table."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Resolver configuration file
    #[arg(long, global = true, default_value = "mvs.toml", env = "MVS_CONFIG")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the build list of the target
    List {
        /// Requirement table
        table: PathBuf,
    },

    /// Print the requirement graph as a tree
    Tree {
        /// Requirement table
        table: PathBuf,
        /// Maximum depth to display
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Explain why a module path is in the build list
    Why {
        /// Requirement table
        table: PathBuf,
        /// Module path to explain
        path: String,
    },

    /// Print the smallest set of requirements that yields the same build list
    Minimize {
        /// Requirement table
        table: PathBuf,
        /// Paths that must stay listed
        #[arg(long = "base", value_name = "PATH")]
        base: Vec<String>,
    },

    /// Upgrade modules and print the new build list
    Upgrade {
        /// Requirement table
        table: PathBuf,
        /// Upgrade every module to its latest known version
        #[arg(long, conflicts_with = "modules")]
        all: bool,
        /// Modules to upgrade to, as path@version
        #[arg(value_name = "MODULE@VERSION")]
        modules: Vec<String>,
    },

    /// Downgrade modules and print the new build list
    Downgrade {
        /// Requirement table
        table: PathBuf,
        /// Highest allowed versions, as path@version (path@none removes)
        #[arg(value_name = "MODULE@VERSION", required = true)]
        modules: Vec<String>,
    },

    /// Add requirements and pin versions, printing the new roots
    Edit {
        /// Requirement table
        table: PathBuf,
        /// Requirements to add, as path@version
        #[arg(long = "add", value_name = "MODULE@VERSION")]
        add: Vec<String>,
        /// Versions that must be selected exactly, as path@version
        #[arg(long = "pin", value_name = "MODULE@VERSION")]
        pin: Vec<String>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
