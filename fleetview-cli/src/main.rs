//! Fleetview CLI
//!
//! Terminal client for cluster nodes, DevOps pipelines and federated
//! services, built on the same page controllers as the browser console.

mod api;
mod commands;
mod config;
mod logging;
mod output;
mod prompts;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use commands::Session;
use fleetview_common::node::Taint;
use output::OutputFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// API server address
    #[arg(short, long, global = true, env = "FLEETVIEW_SERVER")]
    server: Option<String>,

    /// Bearer token
    #[arg(long, global = true, env = "FLEETVIEW_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    output: Option<OutputFormat>,

    /// Cluster to operate on
    #[arg(short, long, global = true)]
    cluster: Option<String>,

    /// Workspace of the project
    #[arg(short, long, global = true)]
    workspace: Option<String>,

    /// Answer yes to confirmation prompts
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage cluster nodes
    Nodes {
        #[command(subcommand)]
        command: NodeCommands,
    },
    /// Manage DevOps pipelines
    Pipelines {
        /// DevOps project
        #[arg(short, long)]
        devops: Option<String>,

        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Inspect and edit a federated service
    Service {
        /// Federated project
        #[arg(short, long)]
        namespace: String,

        #[command(subcommand)]
        command: ServiceCommands,
    },
    /// Show or change saved settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn parse_taint(s: &str) -> std::result::Result<Taint, String> {
    s.parse()
}

#[derive(Subcommand)]
enum NodeCommands {
    /// List nodes with their usage
    List {
        /// Filter by name
        #[arg(long)]
        search: Option<String>,
        /// Filter by status (running, unschedulable, warning)
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Mark a node unschedulable
    Cordon { node: String },
    /// Make a node schedulable again
    Uncordon { node: String },
    /// Delete nodes
    Delete {
        #[arg(required = true)]
        nodes: Vec<String>,
    },
    /// Edit the taints shared by the given nodes
    Taint {
        #[arg(required = true)]
        nodes: Vec<String>,
        /// Add a taint (key=value:effect)
        #[arg(long, value_parser = parse_taint)]
        add: Vec<Taint>,
        /// Remove taints with this key
        #[arg(long)]
        remove: Vec<String>,
        /// Start from an empty taint set
        #[arg(long)]
        clear: bool,
    },
}

/// Pipeline settings for create and edit
#[derive(Args, Clone, Debug, Default)]
struct ConfigFlags {
    #[arg(long)]
    description: Option<String>,
    /// Days to keep old builds
    #[arg(long)]
    days_to_keep: Option<String>,
    /// Number of old builds to keep
    #[arg(long)]
    num_to_keep: Option<String>,
    /// Cron schedule for timed builds
    #[arg(long)]
    cron: Option<String>,
    /// Keep every build
    #[arg(long, conflicts_with_all = ["days_to_keep", "num_to_keep"])]
    no_discarder: bool,
    /// Disable timed builds
    #[arg(long, conflicts_with = "cron")]
    no_timer: bool,
}

#[derive(Subcommand)]
enum PipelineCommands {
    /// List pipelines
    List {
        #[arg(long)]
        search: Option<String>,
        /// Filter by latest run status (running, success, failed, aborted,
        /// unstable, queued, paused, not_built)
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Run a pipeline
    Run {
        name: String,
        #[arg(long)]
        branch: Option<String>,
        /// Parameter value (NAME=VALUE)
        #[arg(long = "param", value_parser = prompts::parse_pair)]
        params: Vec<(String, String)>,
    },
    /// Show where a pipeline's runs are listed
    Activity { name: String },
    /// Create a pipeline
    Create {
        name: String,
        #[command(flatten)]
        flags: ConfigFlags,
    },
    /// Change a pipeline's settings
    Edit {
        name: String,
        #[command(flatten)]
        flags: ConfigFlags,
    },
    /// Delete pipelines
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ServiceCommands {
    /// Show attributes and per-cluster status
    Show { name: String },
    /// Change alias and description
    EditInfo {
        name: String,
        #[arg(long)]
        alias: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Replace the service with an edited YAML document
    EditYaml {
        name: String,
        /// Read the document from a file instead of $EDITOR
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Delete the service
    Delete { name: String },
}

impl ServiceCommands {
    fn name(&self) -> &str {
        match self {
            Self::Show { name }
            | Self::EditInfo { name, .. }
            | Self::EditYaml { name, .. }
            | Self::Delete { name } => name,
        }
    }
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the settings file
    Show,
    /// Change one setting (server, output, token, username, workspace,
    /// cluster, devops, page-size, actions, log-level, log-dir)
    Set { key: String, value: String },
}

async fn run(cli: Cli, mut config: config::Config) -> Result<()> {
    let server = cli.server.clone().unwrap_or_else(|| config.default_server.clone());
    let token = cli.token.clone().or_else(|| config.token.clone());
    let format = cli
        .output
        .unwrap_or_else(|| OutputFormat::parse(&config.default_output));
    let cluster = cli.cluster.clone().unwrap_or_else(|| config.cluster.clone());
    let workspace = cli.workspace.clone().or_else(|| config.workspace.clone());

    match cli.command {
        Commands::Config { command } => commands::config::handle_config_command(command, &mut config),
        Commands::Nodes { command } => {
            let session = Session::new(config, &server, token, format, cli.yes)?;
            commands::nodes::handle_node_command(command, &session, &cluster).await
        }
        Commands::Pipelines { devops, command } => {
            let devops = devops
                .or_else(|| config.devops.clone())
                .context("no DevOps project; pass --devops or run `fleetview config set devops <NAME>`")?;
            let workspace = workspace.context("no workspace; pass --workspace")?;
            let session = Session::new(config, &server, token, format, cli.yes)?;
            commands::pipelines::handle_pipeline_command(command, &session, &workspace, &cluster, &devops).await
        }
        Commands::Service { namespace, command } => {
            let session = Session::new(config, &server, token, format, cli.yes)?;
            commands::service::handle_service_command(command, &session, workspace.as_deref(), &cluster, &namespace)
                .await
        }
    }
}

// Controllers share state through `Rc`, so everything runs on one thread
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let config = match config::Config::load() {
        Ok(config) => config,
        Err(e) => {
            output::print_warning(&format!("Ignoring settings file: {:#}", e));
            config::Config::default()
        }
    };

    let logging = logging::LoggingConfig {
        level: logging::LoggingConfig::level_for(config.log.level.as_deref(), cli.verbose),
        directory: config.log.directory.clone(),
    };
    let guard = match logging.init() {
        Ok(guard) => guard,
        Err(e) => {
            output::print_warning(&format!("Logging disabled: {:#}", e));
            None
        }
    };

    let code = match run(cli, config).await {
        Ok(()) => 0,
        Err(e) => {
            if e.downcast_ref::<commands::Reported>().is_none() {
                output::print_error(&format!("{:#}", e));
            }
            1
        }
    };
    // Flush the file log before exiting
    drop(guard);
    std::process::exit(code);
}
