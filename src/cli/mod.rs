//! CLI argument parsing types.
//!
//! This module provides the command-line interface structure for the tfeapi binary.

use clap::{Parser, Subcommand, ValueEnum};

/// TFE API command-line interface.
#[derive(Parser, Debug)]
#[command(name = "tfeapi", about = "Terraform Cloud / Enterprise API CLI", version)]
pub struct Cli {
    /// Output results as JSON instead of a table.
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Organization name, for entities scoped to an organization.
    #[arg(long, global = true, env = "TFE_ORGANIZATION")]
    pub org: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Get a single entity by name or ID.
    Get {
        /// The type of entity to get.
        entity: Entity,

        /// Organization name, workspace ID (or name with --org), or run ID.
        id: String,
    },

    /// List entities with pagination.
    List {
        /// The type of entity to list.
        entity: Entity,

        /// Workspace ID (required for runs and variables).
        #[arg(long)]
        workspace: Option<String>,

        /// Page number (1-indexed).
        #[arg(long)]
        page: Option<u32>,

        /// Number of items per page.
        #[arg(long)]
        page_size: Option<u32>,

        /// Fetch every page.
        #[arg(long, default_value = "false")]
        all: bool,
    },
}

/// Entity types that can be operated on.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    /// An organization.
    #[value(alias = "organizations", alias = "org", alias = "orgs")]
    Organization,
    /// A workspace.
    #[value(alias = "workspaces", alias = "ws")]
    Workspace,
    /// A run.
    #[value(alias = "runs")]
    Run,
    /// A workspace variable.
    #[value(alias = "variables", alias = "vars")]
    Variable,
}
