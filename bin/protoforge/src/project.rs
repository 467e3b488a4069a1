//! ---
//! pf_section: "06-command-line"
//! pf_subsection: "binary"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Command-line entry point for installing protoc and compiling schemas."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use protoforge_common::{
    ProcessRunner, ProjectConfig, ProjectLayout, SystemRunner, CONFIG_FILE_NAME,
};
use protoforge_installer::{CompilerInstaller, HttpFetcher, InstallerSettings};

/// Configuration and layout resolved for one invocation.
#[derive(Debug)]
pub struct Project {
    pub config: ProjectConfig,
    pub layout: ProjectLayout,
    /// File the configuration came from, `None` for built-in defaults.
    pub source: Option<PathBuf>,
}

impl Project {
    /// An explicit `--config` wins over `PROTOFORGE_CONFIG` and the project file.
    pub fn load(project_dir: &Path, config: Option<&Path>) -> Result<Self> {
        let project_dir = std::path::absolute(project_dir).with_context(|| {
            format!("unable to resolve project directory {}", project_dir.display())
        })?;
        let candidates = [project_dir.join(CONFIG_FILE_NAME)];
        let loaded = match config {
            Some(path) => ProjectConfig::load_from(Some(path), &candidates)?,
            None => ProjectConfig::load_with_source(&candidates)?,
        };
        let (config, source) = (loaded.config, loaded.source);
        let layout = ProjectLayout::new(&project_dir, &config);
        Ok(Self {
            config,
            layout,
            source,
        })
    }

    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::new(SystemRunner)
    }

    pub fn installer(&self) -> Result<CompilerInstaller> {
        let fetcher = HttpFetcher::new(self.config.timeouts.fetch)?;
        Ok(CompilerInstaller::new(
            InstallerSettings::from_config(&self.config, &self.layout),
            self.runner(),
            Arc::new(fetcher),
        ))
    }
}
