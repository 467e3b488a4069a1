//! ---
//! pf_section: "05-compilation-orchestrator"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Compilation orchestration and downstream build."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use protoforge_common::{ProcessError, ProcessRunner, ProjectLayout};
use protoforge_logging::{log_system_event, pf_debug, pf_error, pf_info, LogContext, SystemEventOutcome};
use protoforge_schema::{extract_dependencies, is_stale, schema_files, BundledSchemas, FallbackSchemas};
use tracing::info;

use crate::compiler::CompilerSettings;
use crate::host::HostBuild;
use crate::{CompileError, Result};

/// Parameters of a single compilation run.
#[derive(Debug, Clone, Default)]
pub struct CompileRequest {
    /// Schema files relative to the schema root. `None` compiles every discovered file.
    pub files: Option<Vec<PathBuf>>,
    /// Ignore the staleness guard.
    pub force: bool,
    /// Return immediately; set when a downstream build re-enters the tool.
    pub skip_regeneration: bool,
}

/// Result of compiling one schema file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Compiled,
    Failed { code: Option<i32>, stderr: String },
    TimedOut { timeout: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
}

impl FileResult {
    pub fn succeeded(&self) -> bool {
        self.status == FileStatus::Compiled
    }
}

impl fmt::Display for FileResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            FileStatus::Compiled => write!(f, "{}: compiled", self.file.display()),
            FileStatus::Failed { code, stderr } => {
                let code = code.map_or_else(|| "signal".to_owned(), |c| c.to_string());
                write!(f, "{}: exit {code}: {}", self.file.display(), stderr.trim())
            }
            FileStatus::TimedOut { timeout } => {
                write!(f, "{}: timed out after {timeout:?}", self.file.display())
            }
        }
    }
}

/// Per-file results of a run that passed the staleness guard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    pub files: Vec<FileResult>,
    /// Imports staged from the fallback set, in staging order.
    pub staged: Vec<String>,
    /// Imports no source could satisfy.
    pub unresolved: Vec<String>,
}

impl CompileReport {
    pub fn failures(&self) -> impl Iterator<Item = &FileResult> {
        self.files.iter().filter(|result| !result.succeeded())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// Generated and compiled outputs are newer than every schema.
    UpToDate,
    /// Regeneration was suppressed by the caller.
    Skipped,
    Compiled(CompileReport),
}

/// Drives staging, compilation and the downstream build for one project.
pub struct Orchestrator {
    layout: ProjectLayout,
    compiler: CompilerSettings,
    runner: Arc<dyn ProcessRunner>,
    host: Arc<dyn HostBuild>,
    fallback: Box<dyn FallbackSchemas + Send + Sync>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("layout", &self.layout)
            .field("compiler", &self.compiler)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Orchestrator staging missing imports from the bundled well-known types.
    pub fn new(
        layout: ProjectLayout,
        compiler: CompilerSettings,
        runner: Arc<dyn ProcessRunner>,
        host: Arc<dyn HostBuild>,
    ) -> Self {
        Self {
            layout,
            compiler,
            runner,
            host,
            fallback: Box::new(BundledSchemas),
        }
    }

    /// Replace the fallback schema source.
    pub fn with_fallback(mut self, fallback: impl FallbackSchemas + Send + Sync + 'static) -> Self {
        self.fallback = Box::new(fallback);
        self
    }

    /// True when some schema is newer than both the generated and compiled outputs.
    pub fn is_stale(&self) -> bool {
        is_stale(
            &self.layout.proto_root,
            &[
                self.layout.generated_dir.as_path(),
                self.layout.compiled_dir.as_path(),
            ],
        )
    }

    /// Run one compilation pass.
    ///
    /// A compiler that exits non-zero or times out is recorded and the batch
    /// continues. Staging failures, a compiler that cannot be started and a
    /// failing downstream build abort the run.
    pub async fn compile(&self, request: CompileRequest) -> Result<CompileOutcome> {
        let ctx = LogContext::new().with_phase("compile");
        if request.skip_regeneration {
            log_system_event(
                Some(&ctx),
                "compile.guard",
                "schema regeneration suppressed",
                SystemEventOutcome::Skipped,
            );
            return Ok(CompileOutcome::Skipped);
        }
        if !request.force && !self.is_stale() {
            log_system_event(
                Some(&ctx),
                "compile.guard",
                "generated sources are up to date",
                SystemEventOutcome::Skipped,
            );
            return Ok(CompileOutcome::UpToDate);
        }

        for dir in [
            &self.layout.generated_dir,
            &self.layout.staging_dir,
            &self.layout.proto_root,
        ] {
            std::fs::create_dir_all(dir).map_err(|source| CompileError::Io {
                path: dir.clone(),
                source,
            })?;
        }

        let files = match request.files {
            Some(files) => files,
            None => schema_files(&self.layout.proto_root),
        };
        info!(count = files.len(), root = %self.layout.proto_root.display(), "compiling schemas");

        let mut report = CompileReport::default();
        for file in files {
            let status = self.compile_file(&file, &mut report).await?;
            report.files.push(FileResult { file, status });
        }

        let failed = report.failures().count();
        log_system_event(
            Some(&ctx),
            "compile.batch",
            &format!(
                "{} of {} schema files compiled",
                report.files.len() - failed,
                report.files.len()
            ),
            if failed == 0 {
                SystemEventOutcome::Success
            } else {
                SystemEventOutcome::Fault
            },
        );

        self.host
            .compile_sources(&self.layout.generated_dir, true)
            .await?;
        Ok(CompileOutcome::Compiled(report))
    }

    async fn compile_file(&self, file: &Path, report: &mut CompileReport) -> Result<FileStatus> {
        let schema = file.display().to_string();
        let ctx = LogContext::new().with_schema(&schema).with_phase("compile");

        let staging = extract_dependencies(
            &self.layout.proto_root,
            file,
            &self.layout.staging_dir,
            self.fallback.as_ref(),
        )?;
        report.staged.extend(staging.staged);
        report.unresolved.extend(staging.unresolved);

        let spec = self.compiler.invocation(&self.layout, file);
        pf_debug!(context = ctx, "running {}", spec.command_line());
        match self.runner.run(&spec).await {
            Ok(output) if output.success() => {
                pf_info!(context = ctx, "compiled");
                Ok(FileStatus::Compiled)
            }
            Ok(output) => {
                pf_error!(context = ctx, "compiler {}: {}", output, output.stderr.trim());
                Ok(FileStatus::Failed {
                    code: output.code,
                    stderr: output.stderr,
                })
            }
            Err(ProcessError::TimedOut { timeout, .. }) => {
                pf_error!(context = ctx, "compiler timed out after {:?}", timeout);
                Ok(FileStatus::TimedOut { timeout })
            }
            Err(err) => Err(CompileError::Compiler(err)),
        }
    }
}
