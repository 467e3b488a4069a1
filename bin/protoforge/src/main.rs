//! ---
//! pf_section: "06-command-line"
//! pf_subsection: "binary"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Command-line entry point for installing protoc and compiling schemas."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use protoforge_common::VersionInfo;

mod compile;
mod install;
mod project;

#[derive(Debug, Parser)]
#[command(
    name = "protoforge",
    author,
    disable_version_flag = true,
    about = "Installs the protocol buffer compiler and compiles project schemas",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,

    /// Project directory holding the schema root and build output.
    #[arg(long = "project-dir", value_name = "DIR", default_value = ".", global = true)]
    project_dir: PathBuf,

    /// Configuration file (defaults to protoforge.toml in the project directory).
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch and build the configured compiler version unless it is installed.
    Install,
    /// Run the compiler's uninstall target with elevated privileges.
    Uninstall,
    /// Compile schemas into generated sources, then run the downstream build.
    Compile(compile::CompileArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("{}", VersionInfo::current().extended());
        return Ok(());
    }
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let project = project::Project::load(&cli.project_dir, cli.config.as_deref())?;
    protoforge_common::init_tracing(
        "protoforge",
        &project.config.logging,
        project.layout.log_dir.as_deref(),
    )?;
    tracing::debug!(
        version = %VersionInfo::current().cli_string(),
        config = ?project.source,
        project_dir = %project.layout.project_dir.display(),
        "protoforge starting"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(async {
        match command {
            Commands::Install => install::install(&project).await,
            Commands::Uninstall => install::uninstall(&project).await,
            Commands::Compile(args) => compile::run(&project, args).await,
        }
    })
}
