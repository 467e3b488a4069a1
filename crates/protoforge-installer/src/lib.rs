//! ---
//! pf_section: "04-compiler-installation"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Compiler installation lifecycle."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
#![warn(missing_docs)]

//! Lifecycle of the external protocol buffer compiler: detection by version
//! string, archive download and extraction, configure/make build, and
//! privileged uninstall.

use std::path::PathBuf;

use protoforge_common::ProcessError;
use thiserror::Error;

pub mod archive;
pub mod credential;
pub mod fetch;
pub mod installer;

pub use archive::extract_zip;
pub use credential::{CredentialSource, EnvCredential};
pub use fetch::{ArchiveFetcher, HttpFetcher};
pub use installer::{CompilerInstaller, InstallState, InstallerSettings};

/// Errors raised while installing or uninstalling the compiler.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Download failed or the URL was unusable.
    #[error("failed to download {url}: {message}")]
    Fetch {
        /// Requested URL.
        url: String,
        /// Transport or status failure.
        message: String,
    },
    /// The archive could not be read or extracted.
    #[error("invalid archive {path}: {message}")]
    Archive {
        /// Archive on disk.
        path: PathBuf,
        /// Reason reported by the zip reader.
        message: String,
    },
    /// Extraction finished without producing the expected source tree.
    #[error("archive {archive} did not unpack into {expected}")]
    MissingSourceTree {
        /// Archive on disk.
        archive: PathBuf,
        /// Directory the version implies.
        expected: PathBuf,
    },
    /// A build operation was requested before the sources were fetched.
    #[error("compiler sources not found at {0}; run install first")]
    NotFetched(PathBuf),
    /// An external step exited unsuccessfully.
    #[error("{step} failed ({status}): {stderr}")]
    Step {
        /// Command line of the step.
        step: String,
        /// Exit description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },
    /// An external step could not be run at all.
    #[error(transparent)]
    Process(#[from] ProcessError),
    /// Local filesystem failure.
    #[error("i/o error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// No credential could be obtained for a privileged step.
    #[error("credential unavailable: {0}")]
    Credential(String),
}

/// Result alias used throughout the installer crate.
pub type Result<T> = std::result::Result<T, InstallError>;
