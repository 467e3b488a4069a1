//! ---
//! pf_section: "05-compilation-orchestrator"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Compilation orchestration and downstream build."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
//! Compilation orchestrator: staleness gating, dependency staging, one compiler
//! run per schema file and the downstream build of the generated sources.

use std::path::PathBuf;

use protoforge_common::ProcessError;
use protoforge_schema::SchemaError;
use thiserror::Error;

pub mod compiler;
pub mod host;
pub mod orchestrator;

pub use compiler::CompilerSettings;
pub use host::{host_build_for, CommandHostBuild, HostBuild, NoopHostBuild};
pub use orchestrator::{
    CompileOutcome, CompileReport, CompileRequest, FileResult, FileStatus, Orchestrator,
};

/// Failures that abort a compilation run.
///
/// Per-file compiler failures are not errors; they are recorded in the
/// [`CompileReport`].
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("unable to run schema compiler: {0}")]
    Compiler(#[source] ProcessError),
    #[error("downstream build `{command}` failed ({status}): {stderr}")]
    Downstream {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("unable to run downstream build: {0}")]
    DownstreamProcess(#[source] ProcessError),
    #[error("unable to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CompileError>;
