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

use anyhow::Result;
use clap::Args;
use protoforge_core::{
    host_build_for, CompileOutcome, CompileReport, CompileRequest, CompilerSettings, Orchestrator,
};
use tracing::info;

use crate::project::Project;

#[derive(Debug, Args)]
pub struct CompileArgs {
    /// Schema files relative to the schema root (default: every discovered file).
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,

    /// Recompile even when generated sources are newer than every schema.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    force: bool,

    /// Do nothing; set by a downstream build that invokes protoforge again.
    #[arg(long = "skip-regen", env = "PROTOFORGE_SKIP_REGEN", action = clap::ArgAction::SetTrue)]
    skip_regen: bool,
}

impl From<CompileArgs> for CompileRequest {
    fn from(args: CompileArgs) -> Self {
        CompileRequest {
            files: (!args.files.is_empty()).then_some(args.files),
            force: args.force,
            skip_regeneration: args.skip_regen,
        }
    }
}

/// Install precondition, schema compilation, then the downstream build.
pub async fn run(project: &Project, args: CompileArgs) -> Result<()> {
    let request = CompileRequest::from(args);
    if request.skip_regeneration {
        info!("schema regeneration skipped");
        return Ok(());
    }

    let installer = project.installer()?;
    if project.config.auto_install {
        installer.install().await?;
    }
    let compiler = CompilerSettings::new(installer.protoc_binary(), &project.config);
    let runner = project.runner();
    let host = host_build_for(&project.config, &project.layout, runner.clone());
    let orchestrator = Orchestrator::new(project.layout.clone(), compiler, runner, host);

    match orchestrator.compile(request).await? {
        CompileOutcome::UpToDate => println!("Generated sources are up to date"),
        CompileOutcome::Skipped => println!("Schema regeneration skipped"),
        CompileOutcome::Compiled(report) => render_report(project, &report),
    }
    Ok(())
}

fn render_report(project: &Project, report: &CompileReport) {
    let failed = report.failures().count();
    println!(
        "Compiled {} of {} schema files into {}",
        report.files.len() - failed,
        report.files.len(),
        project.layout.generated_dir.display()
    );
    for import in &report.staged {
        println!("Staged {import}");
    }
    for import in &report.unresolved {
        eprintln!("warning: unresolved import {import}");
    }
    for failure in report.failures() {
        eprintln!("error: {failure}");
    }
}
