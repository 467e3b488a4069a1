//! ---
//! pf_section: "01-core-functionality"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Shared configuration and process primitives."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use serde::Serialize;

use crate::config::{DEFAULT_ARCHIVE_URL, DEFAULT_PROTOBUF_VERSION};

/// Build metadata plus the compiler release this build installs by default.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub semver: String,
    /// Git commit hash captured by `vergen`.
    pub git_sha: String,
    pub build_timestamp: String,
    pub target: String,
    /// `protobuf-version` used when the project config leaves it unset.
    pub default_protoc: String,
    /// Release archive template, `{version}` still unexpanded.
    pub archive_template: String,
}

impl VersionInfo {
    #[must_use]
    pub fn current() -> Self {
        Self {
            semver: env!("CARGO_PKG_VERSION").to_owned(),
            git_sha: option_env!("VERGEN_GIT_SHA")
                .unwrap_or("UNKNOWN")
                .to_owned(),
            build_timestamp: option_env!("VERGEN_BUILD_TIMESTAMP")
                .unwrap_or("UNKNOWN")
                .to_owned(),
            target: option_env!("VERGEN_CARGO_TARGET_TRIPLE")
                .unwrap_or("UNKNOWN")
                .to_owned(),
            default_protoc: DEFAULT_PROTOBUF_VERSION.to_owned(),
            archive_template: DEFAULT_ARCHIVE_URL.to_owned(),
        }
    }

    /// Semantic version and git hash, for log lines.
    #[must_use]
    pub fn cli_string(&self) -> String {
        format!("{} ({})", self.semver, self.git_sha)
    }

    /// `User-Agent` sent when downloading compiler archives.
    #[must_use]
    pub fn user_agent(&self) -> String {
        format!("protoforge/{}", self.semver)
    }

    /// Multi-line report printed by `-V`.
    #[must_use]
    pub fn extended(&self) -> String {
        format!(
            "protoforge v{semver} (git {sha})\nBuilt: {built}\nTarget: {target}\n\
             Default protoc: {protoc}\nArchive: {archive}",
            semver = self.semver,
            sha = self.git_sha,
            built = self.build_timestamp,
            target = self.target,
            protoc = self.default_protoc,
            archive = self.archive_template,
        )
    }
}
