//! ---
//! pf_section: "01-core-functionality"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Shared configuration and process primitives."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

/// Compiler release used when the project does not pin one.
pub const DEFAULT_PROTOBUF_VERSION: &str = "3.20.3";
/// Release asset downloaded when the project does not configure one.
pub const DEFAULT_ARCHIVE_URL: &str =
    "https://github.com/protocolbuffers/protobuf/releases/download/v{version}/protobuf-cpp-{version}.zip";
/// Placeholder substituted with the configured version in archive URLs.
pub const VERSION_PLACEHOLDER: &str = "{version}";
/// File name looked up in the project directory when no explicit config is given.
pub const CONFIG_FILE_NAME: &str = "protoforge.toml";

fn default_protobuf_version() -> String {
    DEFAULT_PROTOBUF_VERSION.to_owned()
}

fn default_proto_path() -> PathBuf {
    PathBuf::from("proto")
}

fn default_target_path() -> PathBuf {
    PathBuf::from("target")
}

fn default_language() -> String {
    "cpp".to_owned()
}

fn default_archive_url() -> String {
    DEFAULT_ARCHIVE_URL.to_owned()
}

fn default_auto_install() -> bool {
    true
}

fn default_version_check_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_build_timeout() -> Duration {
    Duration::from_secs(3600)
}

fn default_compiler_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_downstream_timeout() -> Duration {
    Duration::from_secs(1800)
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Project options recognised by protoforge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    #[serde(default = "default_protobuf_version")]
    pub protobuf_version: String,
    #[serde(default = "default_proto_path")]
    pub proto_path: PathBuf,
    #[serde(default = "default_target_path")]
    pub target_path: PathBuf,
    /// Compiled-output directory consulted by the staleness check.
    /// Defaults to `<target-path>/classes`.
    #[serde(default)]
    pub compile_path: Option<PathBuf>,
    /// Explicit compiler binary, bypassing detection of the built tree.
    #[serde(default)]
    pub protoc: Option<PathBuf>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_archive_url")]
    pub archive_url: String,
    #[serde(default = "default_auto_install")]
    pub auto_install: bool,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub downstream: DownstreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where a [`ProjectConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedProjectConfig {
    pub config: ProjectConfig,
    /// `None` when no file was found and defaults apply.
    pub source: Option<PathBuf>,
}

impl ProjectConfig {
    pub const ENV_CONFIG_PATH: &str = "PROTOFORGE_CONFIG";

    /// Load configuration together with the effective source path.
    ///
    /// A path named by `PROTOFORGE_CONFIG` must exist; candidates are optional
    /// and the built-in defaults are used when none of them exists.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedProjectConfig> {
        let env_path = std::env::var_os(Self::ENV_CONFIG_PATH)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Self::load_from(env_path.as_deref(), candidates)
    }

    /// Load from `explicit` when given, otherwise from the first existing candidate.
    pub fn load_from<P: AsRef<Path>>(
        explicit: Option<&Path>,
        candidates: &[P],
    ) -> Result<LoadedProjectConfig> {
        if let Some(path) = explicit {
            return Ok(LoadedProjectConfig {
                config: Self::from_path(path)?,
                source: Some(path.to_path_buf()),
            });
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedProjectConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no project configuration found, using defaults"
        );
        Ok(LoadedProjectConfig {
            config: Self::default(),
            source: None,
        })
    }

    /// Load and validate a specific configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<ProjectConfig>()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Archive URL with the configured version substituted.
    pub fn resolved_archive_url(&self) -> String {
        self.archive_url
            .replace(VERSION_PLACEHOLDER, &self.protobuf_version)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.protobuf_version.trim().is_empty() {
            return Err(anyhow!("protobuf-version cannot be empty"));
        }
        if self.language.trim().is_empty() {
            return Err(anyhow!("language cannot be empty"));
        }
        if !self.archive_url.contains(VERSION_PLACEHOLDER) {
            return Err(anyhow!(
                "archive-url '{}' must contain the {} placeholder",
                self.archive_url,
                VERSION_PLACEHOLDER
            ));
        }
        self.timeouts.validate()?;
        Ok(())
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            protobuf_version: default_protobuf_version(),
            proto_path: default_proto_path(),
            target_path: default_target_path(),
            compile_path: None,
            protoc: None,
            language: default_language(),
            archive_url: default_archive_url(),
            auto_install: default_auto_install(),
            timeouts: TimeoutConfig::default(),
            downstream: DownstreamConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl std::str::FromStr for ProjectConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: ProjectConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Upper bounds for every blocking external interaction.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TimeoutConfig {
    #[serde(default = "default_version_check_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub version_check: Duration,
    #[serde(default = "default_fetch_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub fetch: Duration,
    #[serde(default = "default_build_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub build: Duration,
    #[serde(default = "default_compiler_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub compiler: Duration,
    #[serde(default = "default_downstream_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub downstream: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            version_check: default_version_check_timeout(),
            fetch: default_fetch_timeout(),
            build: default_build_timeout(),
            compiler: default_compiler_timeout(),
            downstream: default_downstream_timeout(),
        }
    }
}

impl TimeoutConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("version-check", self.version_check),
            ("fetch", self.fetch),
            ("build", self.build),
            ("compiler", self.compiler),
            ("downstream", self.downstream),
        ] {
            if value.is_zero() {
                return Err(anyhow!("timeouts.{} must be greater than zero", name));
            }
        }
        Ok(())
    }
}

/// Host build step run over the generated sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct DownstreamConfig {
    /// Program followed by its arguments. Empty disables the step.
    #[serde(default)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Rolling file sink directory. No file is written when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            directory: None,
            file_prefix: None,
        }
    }
}

/// Directory layout derived from a [`ProjectConfig`] rooted at a project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub project_dir: PathBuf,
    pub proto_root: PathBuf,
    pub target_root: PathBuf,
    pub generated_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub compiled_dir: PathBuf,
    pub compiler_source_dir: PathBuf,
    pub compiler_archive: PathBuf,
    /// Rolling log directory, when file logging is configured.
    pub log_dir: Option<PathBuf>,
}

impl ProjectLayout {
    pub const GENERATED_DIR: &str = "protosrc";
    pub const STAGING_DIR: &str = "proto";
    pub const COMPILED_DIR: &str = "classes";

    pub fn new<P: AsRef<Path>>(project_dir: P, config: &ProjectConfig) -> Self {
        let project_dir = project_dir.as_ref().to_path_buf();
        let proto_root = project_dir.join(&config.proto_path);
        let target_root = project_dir.join(&config.target_path);
        let compiled_dir = match &config.compile_path {
            Some(path) => project_dir.join(path),
            None => target_root.join(Self::COMPILED_DIR),
        };
        let release = format!("protobuf-{}", config.protobuf_version);
        Self {
            generated_dir: target_root.join(Self::GENERATED_DIR),
            staging_dir: target_root.join(Self::STAGING_DIR),
            compiler_source_dir: target_root.join(&release),
            compiler_archive: target_root.join(format!("{release}.zip")),
            log_dir: config
                .logging
                .directory
                .as_ref()
                .map(|dir| project_dir.join(dir)),
            project_dir,
            proto_root,
            target_root,
            compiled_dir,
        }
    }
}
