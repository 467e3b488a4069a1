//! ---
//! pf_section: "01-core-functionality"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Shared configuration and process primitives."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
//! Shared primitives for the protoforge workspace: project configuration and
//! layout, tracing setup, build metadata, and bounded external process
//! execution used by the installer and the compilation orchestrator.

pub mod config;
pub mod logging;
pub mod process;
pub mod version;

pub use config::{
    DownstreamConfig, LoadedProjectConfig, LoggingConfig, ProjectConfig, ProjectLayout,
    TimeoutConfig, CONFIG_FILE_NAME, DEFAULT_ARCHIVE_URL, DEFAULT_PROTOBUF_VERSION,
};
pub use logging::{init_tracing, LogFormat};
pub use process::{ProcessError, ProcessOutput, ProcessRunner, ProcessSpec, SystemRunner};
pub use version::VersionInfo;
