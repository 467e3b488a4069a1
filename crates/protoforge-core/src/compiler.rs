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
use std::time::Duration;

use protoforge_common::{ProcessSpec, ProjectConfig, ProjectLayout};

/// How the external schema compiler is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerSettings {
    pub protoc: PathBuf,
    /// Output language, used as `--<language>_out`.
    pub language: String,
    pub timeout: Duration,
}

impl CompilerSettings {
    pub fn new(protoc: impl Into<PathBuf>, config: &ProjectConfig) -> Self {
        Self {
            protoc: protoc.into(),
            language: config.language.clone(),
            timeout: config.timeouts.compiler,
        }
    }

    /// Process description compiling `file` (relative to the schema root).
    ///
    /// Include order is the project directory, the staging area, then the
    /// schema root. The process runs from the project directory.
    pub fn invocation(&self, layout: &ProjectLayout, file: &Path) -> ProcessSpec {
        ProcessSpec::new(&self.protoc, self.timeout)
            .arg(layout.proto_root.join(file).display().to_string())
            .arg(format!(
                "--{}_out={}",
                self.language,
                layout.generated_dir.display()
            ))
            .arg("-I.")
            .arg(format!("-I{}", layout.staging_dir.display()))
            .arg(format!("-I{}", layout.proto_root.display()))
            .current_dir(&layout.project_dir)
    }
}
