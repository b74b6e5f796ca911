use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// pipedeck - console for the pipeline platform
#[derive(Parser, Debug)]
#[command(name = "pipedeck", author, version, about, long_about = None)]
pub struct Cli {
    /// API base URL (overrides the config file)
    #[arg(long, global = true, env = "PIPEDECK_API_URL")]
    pub api_url: Option<String>,

    /// Keep the session in memory only; nothing is read from or written to disk
    #[arg(long, global = true, default_value_t = false)]
    pub ephemeral: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and store the session
    Login {
        #[arg(short, long, env = "PIPEDECK_USERNAME")]
        username: Option<String>,
    },

    /// End the session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
    },

    /// Edit the profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },

    /// Change the password
    Passwd,

    /// Pipelines and their runs
    Pipelines {
        #[command(subcommand)]
        command: PipelineCommand,
    },

    /// Build artifacts
    Artifacts {
        #[command(subcommand)]
        command: ArtifactCommand,
    },

    /// Pipeline counts and recent activity
    Dashboard {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Horizontal pod autoscaler policies
    Hpa {
        #[command(subcommand)]
        command: HpaCommand,
    },

    /// Kubernetes clusters
    Clusters {
        #[command(subcommand)]
        command: ClusterCommand,
    },

    /// Server configuration and health
    System {
        #[command(subcommand)]
        command: SystemCommand,
    },

    /// Run the route guard for a page path and print the outcome
    Open { path: String },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Update selected profile fields
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
    },
}

#[derive(clap::Args, Debug, Clone, Copy)]
pub struct PageArgs {
    #[arg(long, default_value_t = 1)]
    pub page: i64,
    #[arg(long, default_value_t = 10)]
    pub page_size: i64,
}

#[derive(Subcommand, Debug)]
pub enum PipelineCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
    },
    Show {
        id: u64,
    },
    /// Create from a JSON definition
    Create {
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
    /// Replace name, repository and branch from a JSON file
    Update {
        id: u64,
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
    Delete {
        id: u64,
    },
    Trigger {
        id: u64,
        #[arg(long)]
        branch: Option<String>,
    },
    Runs {
        id: u64,
        #[command(flatten)]
        page: PageArgs,
    },
    Run {
        id: u64,
        run_id: u64,
    },
    Logs {
        id: u64,
        run_id: u64,
    },
    Cancel {
        id: u64,
        run_id: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ArtifactCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        pipeline: Option<u64>,
    },
    Show {
        id: u64,
    },
    Delete {
        id: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum HpaCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Create from a JSON definition
    Create {
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ClusterCommand {
    List,
    Add {
        name: String,
        /// Path to the kubeconfig file
        #[arg(long, value_name = "FILE")]
        kubeconfig: PathBuf,
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SystemCommand {
    Config,
    Health,
}
