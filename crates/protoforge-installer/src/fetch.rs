//! ---
//! pf_section: "04-compiler-installation"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Compiler installation lifecycle."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use protoforge_common::VersionInfo;
use tokio::fs as async_fs;
use tracing::{debug, info};
use url::Url;

use crate::{InstallError, Result};

/// Downloads a release archive to a local file.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Fetch `url` into `dest`, returning the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// HTTP(S) fetcher backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client whose requests fail after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(VersionInfo::current().user_agent())
            .build()
            .map_err(|err| InstallError::Fetch {
                url: String::new(),
                message: format!("unable to construct HTTP client: {err}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArchiveFetcher for HttpFetcher {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let fetch_error = |message: String| InstallError::Fetch {
            url: url.to_owned(),
            message,
        };
        let parsed = Url::parse(url).map_err(|err| fetch_error(err.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(fetch_error(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        debug!(%url, dest = %dest.display(), "downloading archive");
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| fetch_error(err.to_string()))?;
        let body = response
            .bytes()
            .await
            .map_err(|err| fetch_error(err.to_string()))?;

        if let Some(parent) = dest.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|source| InstallError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        // Written under a temporary name so an interrupted download is never
        // mistaken for a complete archive.
        let partial = dest.with_extension("zip.partial");
        async_fs::write(&partial, &body)
            .await
            .map_err(|source| InstallError::Io {
                path: partial.clone(),
                source,
            })?;
        async_fs::rename(&partial, dest)
            .await
            .map_err(|source| InstallError::Io {
                path: dest.to_path_buf(),
                source,
            })?;

        info!(%url, bytes = body.len(), "archive downloaded");
        Ok(body.len() as u64)
    }
}
