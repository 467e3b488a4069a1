//! ---
//! pf_section: "05-compilation-orchestrator"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Compilation orchestration and downstream build."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use protoforge_common::{ProcessRunner, ProcessSpec, ProjectConfig, ProjectLayout};
use protoforge_logging::{log_system_event, LogContext, SystemEventOutcome};
use tracing::info;

use crate::{CompileError, Result};

/// Child environment flag telling a re-entrant invocation not to regenerate schemas.
pub const SKIP_REGEN_ENV: &str = "PROTOFORGE_SKIP_REGEN";
/// Child environment variable naming the generated source root.
pub const SOURCE_ROOT_ENV: &str = "PROTOFORGE_SOURCE_ROOT";

/// The host build step that compiles generated sources.
#[async_trait]
pub trait HostBuild: Send + Sync {
    /// Compile everything under `source_root`.
    ///
    /// `skip_schema_regeneration` must be honoured by any step that could
    /// re-enter schema compilation.
    async fn compile_sources(&self, source_root: &Path, skip_schema_regeneration: bool)
        -> Result<()>;
}

/// Used when no downstream command is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHostBuild;

#[async_trait]
impl HostBuild for NoopHostBuild {
    async fn compile_sources(&self, source_root: &Path, _skip: bool) -> Result<()> {
        log_system_event(
            Some(&LogContext::new().with_phase("downstream")),
            "compile.downstream",
            &format!("no downstream command for {}", source_root.display()),
            SystemEventOutcome::Skipped,
        );
        Ok(())
    }
}

/// Runs a configured command with the generated source root in its environment.
#[derive(Clone)]
pub struct CommandHostBuild {
    runner: Arc<dyn ProcessRunner>,
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
    timeout: Duration,
}

impl std::fmt::Debug for CommandHostBuild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHostBuild")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("working_dir", &self.working_dir)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CommandHostBuild {
    /// `None` when `command` is empty.
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        command: &[String],
        working_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            runner,
            program: program.clone(),
            args: args.to_vec(),
            working_dir: working_dir.into(),
            timeout,
        })
    }
}

#[async_trait]
impl HostBuild for CommandHostBuild {
    async fn compile_sources(
        &self,
        source_root: &Path,
        skip_schema_regeneration: bool,
    ) -> Result<()> {
        let ctx = LogContext::new().with_phase("downstream");
        let mut spec = ProcessSpec::new(&self.program, self.timeout)
            .args(self.args.iter().cloned())
            .current_dir(&self.working_dir)
            .env(SOURCE_ROOT_ENV, source_root.display().to_string());
        if skip_schema_regeneration {
            spec = spec.env(SKIP_REGEN_ENV, "1");
        }
        let command = spec.command_line();
        info!(%command, source_root = %source_root.display(), "running downstream build");

        let output = self
            .runner
            .run(&spec)
            .await
            .map_err(CompileError::DownstreamProcess)?;
        if !output.success() {
            log_system_event(
                Some(&ctx),
                "compile.downstream",
                &format!("{command} failed: {}", output.stderr.trim()),
                SystemEventOutcome::Fault,
            );
            return Err(CompileError::Downstream {
                command,
                status: output.to_string(),
                stderr: output.stderr.trim().to_owned(),
            });
        }
        log_system_event(
            Some(&ctx),
            "compile.downstream",
            &format!("{command} completed"),
            SystemEventOutcome::Success,
        );
        Ok(())
    }
}

/// Host build described by the `[downstream]` section of `config`.
pub fn host_build_for(
    config: &ProjectConfig,
    layout: &ProjectLayout,
    runner: Arc<dyn ProcessRunner>,
) -> Arc<dyn HostBuild> {
    match CommandHostBuild::new(
        runner,
        &config.downstream.command,
        &layout.project_dir,
        config.timeouts.downstream,
    ) {
        Some(host) => Arc::new(host),
        None => Arc::new(NoopHostBuild),
    }
}
