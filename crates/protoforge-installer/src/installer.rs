//! ---
//! pf_section: "04-compiler-installation"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Compiler installation lifecycle."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use protoforge_common::{ProcessOutput, ProcessRunner, ProcessSpec, ProjectConfig, ProjectLayout};
use protoforge_logging::{log_system_event, LogContext, SystemEventOutcome};
use tracing::{debug, info};

use crate::archive::extract_zip;
use crate::credential::CredentialSource;
use crate::fetch::ArchiveFetcher;
use crate::{InstallError, Result};

/// Scripts shipped in the source archive that must be executable before configuring.
const CONFIG_SCRIPTS: &[&str] = &[
    "autogen.sh",
    "configure",
    "config.guess",
    "config.sub",
    "compile",
    "depcomp",
    "install-sh",
    "ltmain.sh",
    "missing",
    "test-driver",
];

/// Observed lifecycle state of the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    /// Nothing fetched and no matching binary.
    Uninstalled,
    /// Sources extracted but no matching binary yet.
    Fetched,
    /// A binary reporting the configured version answers.
    Installed,
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InstallState::Uninstalled => "uninstalled",
            InstallState::Fetched => "fetched",
            InstallState::Installed => "installed",
        })
    }
}

/// Inputs for a [`CompilerInstaller`].
#[derive(Debug, Clone)]
pub struct InstallerSettings {
    /// Expected compiler version string.
    pub version: String,
    /// Archive URL with the version already substituted.
    pub archive_url: String,
    /// Directory the archive is extracted into.
    pub target_root: PathBuf,
    /// Source tree the archive unpacks to.
    pub source_dir: PathBuf,
    /// Where the downloaded archive is kept.
    pub archive_path: PathBuf,
    /// Explicit binary overriding detection.
    pub protoc_override: Option<PathBuf>,
    /// Privilege-escalation helper for uninstall.
    pub privilege_helper: String,
    /// Upper bound for `protoc --version`.
    pub version_check_timeout: Duration,
    /// Upper bound for each configure/make step.
    pub build_timeout: Duration,
}

impl InstallerSettings {
    /// Derive settings from project configuration and its layout.
    #[must_use]
    pub fn from_config(config: &ProjectConfig, layout: &ProjectLayout) -> Self {
        Self {
            version: config.protobuf_version.clone(),
            archive_url: config.resolved_archive_url(),
            target_root: layout.target_root.clone(),
            source_dir: layout.compiler_source_dir.clone(),
            archive_path: layout.compiler_archive.clone(),
            protoc_override: config
                .protoc
                .as_ref()
                .map(|path| resolve_binary(&layout.project_dir, path)),
            privilege_helper: "sudo".to_owned(),
            version_check_timeout: config.timeouts.version_check,
            build_timeout: config.timeouts.build,
        }
    }
}

/// Bare names are looked up on `PATH`; anything with a separator is project-relative.
fn resolve_binary(project_dir: &Path, binary: &Path) -> PathBuf {
    if binary.components().count() > 1 && binary.is_relative() {
        project_dir.join(binary)
    } else {
        binary.to_path_buf()
    }
}

/// Drives the compiler through its install lifecycle.
#[derive(Clone)]
pub struct CompilerInstaller {
    settings: InstallerSettings,
    runner: Arc<dyn ProcessRunner>,
    fetcher: Arc<dyn ArchiveFetcher>,
}

impl fmt::Debug for CompilerInstaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerInstaller")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl CompilerInstaller {
    /// Construct an installer from settings and its I/O seams.
    #[must_use]
    pub fn new(
        settings: InstallerSettings,
        runner: Arc<dyn ProcessRunner>,
        fetcher: Arc<dyn ArchiveFetcher>,
    ) -> Self {
        Self {
            settings,
            runner,
            fetcher,
        }
    }

    /// Binary produced by building the fetched sources.
    #[must_use]
    pub fn built_binary(&self) -> PathBuf {
        self.settings.source_dir.join("src").join("protoc")
    }

    /// Binary used for detection and compilation.
    ///
    /// The explicit override wins, then the built tree, then `protoc` on `PATH`.
    #[must_use]
    pub fn protoc_binary(&self) -> PathBuf {
        if let Some(path) = &self.settings.protoc_override {
            return path.clone();
        }
        let built = self.built_binary();
        if built.is_file() {
            built
        } else {
            PathBuf::from("protoc")
        }
    }

    /// Version banner printed by the resolved binary, if it runs successfully.
    pub async fn installed_version(&self) -> Option<String> {
        let spec = ProcessSpec::new(self.protoc_binary(), self.settings.version_check_timeout)
            .arg("--version");
        match self.runner.run(&spec).await {
            Ok(output) if output.success() => Some(output.stdout.trim().to_owned()),
            Ok(output) => {
                debug!(binary = %spec.program.display(), status = %output, "version check failed");
                None
            }
            Err(err) => {
                debug!(binary = %spec.program.display(), error = %err, "version check failed");
                None
            }
        }
    }

    /// True when the resolved binary reports the configured version.
    ///
    /// Every failure is treated as "not installed".
    pub async fn is_installed(&self) -> bool {
        match self.installed_version().await {
            Some(banner) => banner
                .split_whitespace()
                .any(|token| token == self.settings.version),
            None => false,
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> InstallState {
        if self.is_installed().await {
            InstallState::Installed
        } else if self.settings.source_dir.is_dir() {
            InstallState::Fetched
        } else {
            InstallState::Uninstalled
        }
    }

    /// Download and extract the sources unless the source tree already exists.
    pub async fn fetch(&self) -> Result<PathBuf> {
        let ctx = self.context("fetch");
        let source_dir = self.settings.source_dir.clone();
        if source_dir.is_dir() {
            log_system_event(
                Some(&ctx),
                "install.fetch",
                &format!("sources already present at {}", source_dir.display()),
                SystemEventOutcome::Skipped,
            );
            return Ok(source_dir);
        }

        let archive = self.settings.archive_path.clone();
        if !archive.is_file() {
            if let Err(err) = self
                .fetcher
                .download(&self.settings.archive_url, &archive)
                .await
            {
                log_system_event(
                    Some(&ctx),
                    "install.fetch",
                    &err.to_string(),
                    SystemEventOutcome::Fault,
                );
                return Err(err);
            }
        }

        let into = self.settings.target_root.clone();
        let archive_for_task = archive.clone();
        let files = tokio::task::spawn_blocking(move || extract_zip(&archive_for_task, &into))
            .await
            .map_err(|err| InstallError::Archive {
                path: archive.clone(),
                message: format!("extraction task failed: {err}"),
            })??;

        if !source_dir.is_dir() {
            return Err(InstallError::MissingSourceTree {
                archive,
                expected: source_dir,
            });
        }
        log_system_event(
            Some(&ctx),
            "install.fetch",
            &format!("extracted {files} files into {}", source_dir.display()),
            SystemEventOutcome::Success,
        );
        Ok(source_dir)
    }

    /// Configure and build the fetched sources unless a built binary exists.
    pub async fn build(&self) -> Result<()> {
        let ctx = self.context("build");
        if self.built_binary().is_file() {
            log_system_event(
                Some(&ctx),
                "install.build",
                "compiler already built",
                SystemEventOutcome::Skipped,
            );
            return Ok(());
        }
        let source_dir = &self.settings.source_dir;
        if !source_dir.is_dir() {
            return Err(InstallError::NotFetched(source_dir.clone()));
        }

        mark_scripts_executable(source_dir)?;
        let configure = ProcessSpec::new(source_dir.join("configure"), self.settings.build_timeout)
            .current_dir(source_dir);
        self.run_step(&ctx, configure).await?;
        let make = ProcessSpec::new("make", self.settings.build_timeout).current_dir(source_dir);
        self.run_step(&ctx, make).await?;

        log_system_event(
            Some(&ctx),
            "install.build",
            &format!("built {}", self.built_binary().display()),
            SystemEventOutcome::Success,
        );
        Ok(())
    }

    /// Fetch and build when the configured version is not installed.
    pub async fn install(&self) -> Result<InstallState> {
        if self.is_installed().await {
            info!(version = %self.settings.version, binary = %self.protoc_binary().display(), "compiler already installed");
            return Ok(InstallState::Installed);
        }
        self.fetch().await?;
        self.build().await?;
        Ok(self.state().await)
    }

    /// Run the uninstall target with elevated privileges when installed.
    ///
    /// Returns `false` when there was nothing to uninstall.
    pub async fn uninstall(&self, credentials: &dyn CredentialSource) -> Result<bool> {
        let ctx = self.context("uninstall");
        if !self.is_installed().await {
            log_system_event(
                Some(&ctx),
                "install.uninstall",
                "compiler not installed",
                SystemEventOutcome::Skipped,
            );
            return Ok(false);
        }
        let source_dir = &self.settings.source_dir;
        if !source_dir.is_dir() {
            return Err(InstallError::NotFetched(source_dir.clone()));
        }

        let secret = credentials.credential()?;
        let spec = ProcessSpec::new(&self.settings.privilege_helper, self.settings.build_timeout)
            .args(["-S", "make", "uninstall"])
            .current_dir(source_dir)
            .stdin(format!("{secret}\n"));
        self.run_step(&ctx, spec).await?;

        log_system_event(
            Some(&ctx),
            "install.uninstall",
            "uninstall target completed",
            SystemEventOutcome::Success,
        );
        Ok(true)
    }

    async fn run_step(&self, ctx: &LogContext<'_>, spec: ProcessSpec) -> Result<ProcessOutput> {
        let step = spec.command_line();
        info!(%step, "running install step");
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            log_system_event(
                Some(ctx),
                "install.step",
                &format!("{step} failed: {}", output.stderr.trim()),
                SystemEventOutcome::Fault,
            );
            return Err(InstallError::Step {
                step,
                status: output.to_string(),
                stderr: output.stderr.trim().to_owned(),
            });
        }
        Ok(output)
    }

    fn context(&self, phase: &'static str) -> LogContext<'_> {
        LogContext::new()
            .with_phase(phase)
            .with_version(&self.settings.version)
    }
}

#[cfg(unix)]
fn mark_scripts_executable(source_dir: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    for script in CONFIG_SCRIPTS {
        let path = source_dir.join(script);
        let Ok(metadata) = std::fs::metadata(&path) else {
            continue;
        };
        let mut permissions = metadata.permissions();
        permissions.set_mode(permissions.mode() | 0o755);
        std::fs::set_permissions(&path, permissions)
            .map_err(|source| InstallError::Io { path, source })?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn mark_scripts_executable(_source_dir: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::fs;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use protoforge_common::ProcessError;

    use super::*;

    #[derive(Default)]
    struct ScriptedRunner {
        calls: Mutex<Vec<ProcessSpec>>,
        replies: Mutex<VecDeque<std::result::Result<ProcessOutput, ProcessError>>>,
    }

    impl ScriptedRunner {
        fn reply(self, code: i32, stdout: &str, stderr: &str) -> Self {
            self.replies.lock().unwrap().push_back(Ok(ProcessOutput {
                code: Some(code),
                stdout: stdout.to_owned(),
                stderr: stderr.to_owned(),
            }));
            self
        }

        fn missing_binary(self) -> Self {
            self.replies.lock().unwrap().push_back(Err(ProcessError::Spawn {
                program: "protoc".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            }));
            self
        }

        fn calls(&self) -> Vec<ProcessSpec> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessRunner for ScriptedRunner {
        async fn run(&self, spec: &ProcessSpec) -> std::result::Result<ProcessOutput, ProcessError> {
            self.calls.lock().unwrap().push(spec.clone());
            self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
                Ok(ProcessOutput {
                    code: Some(0),
                    stdout: String::new(),
                    stderr: String::new(),
                })
            })
        }
    }

    /// Serves a prebuilt archive and records requested URLs.
    struct LocalFetcher {
        payload: Vec<u8>,
        requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ArchiveFetcher for LocalFetcher {
        async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
            self.requests.lock().unwrap().push(url.to_owned());
            fs::create_dir_all(dest.parent().unwrap()).unwrap();
            fs::write(dest, &self.payload).unwrap();
            Ok(self.payload.len() as u64)
        }
    }

    fn zip_with_source_tree(version: &str) -> Vec<u8> {
        use std::io::Write;
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);
            writer
                .start_file(format!("protobuf-{version}/configure"), options)
                .unwrap();
            writer.write_all(b"#!/bin/sh\nexit 0\n").unwrap();
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    fn settings(root: &Path) -> InstallerSettings {
        let config = ProjectConfig::default();
        let layout = ProjectLayout::new(root, &config);
        InstallerSettings::from_config(&config, &layout)
    }

    fn installer(
        root: &Path,
        runner: Arc<ScriptedRunner>,
        fetcher: Arc<LocalFetcher>,
    ) -> CompilerInstaller {
        CompilerInstaller::new(settings(root), runner, fetcher)
    }

    fn fetcher(version: &str) -> Arc<LocalFetcher> {
        Arc::new(LocalFetcher {
            payload: zip_with_source_tree(version),
            requests: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn detection_matches_version_token() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::default().reply(0, "libprotoc 3.20.3\n", ""));
        let installer = installer(dir.path(), runner.clone(), fetcher("3.20.3"));
        assert!(installer.is_installed().await);
        assert_eq!(runner.calls()[0].args, vec!["--version"]);
        assert_eq!(runner.calls()[0].program, PathBuf::from("protoc"));
    }

    #[tokio::test]
    async fn detection_failures_are_soft() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(
            ScriptedRunner::default()
                .reply(0, "libprotoc 3.20.31\n", "")
                .reply(1, "", "boom")
                .missing_binary(),
        );
        let installer = installer(dir.path(), runner, fetcher("3.20.3"));
        assert!(!installer.is_installed().await);
        assert!(!installer.is_installed().await);
        assert!(!installer.is_installed().await);
    }

    #[tokio::test]
    async fn state_is_fetched_when_only_sources_exist() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::default().missing_binary().missing_binary());
        let installer = installer(dir.path(), runner, fetcher("3.20.3"));
        assert_eq!(installer.state().await, InstallState::Uninstalled);
        fs::create_dir_all(dir.path().join("target/protobuf-3.20.3")).unwrap();
        assert_eq!(installer.state().await, InstallState::Fetched);
    }

    #[tokio::test]
    async fn install_fetches_extracts_and_builds() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::default().missing_binary());
        let fetcher = fetcher("3.20.3");
        let installer = installer(dir.path(), runner.clone(), fetcher.clone());

        installer.install().await.unwrap();

        assert_eq!(
            fetcher.requests.lock().unwrap().as_slice(),
            ["https://github.com/protocolbuffers/protobuf/releases/download/v3.20.3/protobuf-cpp-3.20.3.zip"]
        );
        let source_dir = dir.path().join("target/protobuf-3.20.3");
        let calls = runner.calls();
        assert_eq!(calls[1].program, source_dir.join("configure"));
        assert_eq!(calls[1].cwd.as_deref(), Some(source_dir.as_path()));
        assert_eq!(calls[2].program, PathBuf::from("make"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(source_dir.join("configure"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[tokio::test]
    async fn fetch_skips_download_when_sources_exist() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("target/protobuf-3.20.3")).unwrap();
        let fetcher = fetcher("3.20.3");
        let installer = installer(dir.path(), Arc::new(ScriptedRunner::default()), fetcher.clone());
        installer.fetch().await.unwrap();
        assert!(fetcher.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn archive_for_another_version_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let installer = installer(
            dir.path(),
            Arc::new(ScriptedRunner::default()),
            fetcher("2.5.0"),
        );
        let err = installer.fetch().await.unwrap_err();
        assert!(matches!(err, InstallError::MissingSourceTree { .. }));
    }

    #[tokio::test]
    async fn build_is_skipped_when_binary_exists() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("target/protobuf-3.20.3/src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("protoc"), "").unwrap();
        let runner = Arc::new(ScriptedRunner::default());
        let installer = installer(dir.path(), runner.clone(), fetcher("3.20.3"));

        installer.build().await.unwrap();
        assert!(runner.calls().is_empty());
        assert_eq!(installer.protoc_binary(), src.join("protoc"));
    }

    #[tokio::test]
    async fn failing_configure_aborts_with_stderr() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("target/protobuf-3.20.3")).unwrap();
        let runner = Arc::new(ScriptedRunner::default().reply(1, "", "no C++ compiler found"));
        let installer = installer(dir.path(), runner.clone(), fetcher("3.20.3"));

        let err = installer.build().await.unwrap_err();
        assert!(err.to_string().contains("no C++ compiler found"));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn build_without_sources_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let installer = installer(dir.path(), Arc::new(ScriptedRunner::default()), fetcher("3.20.3"));
        assert!(matches!(
            installer.build().await.unwrap_err(),
            InstallError::NotFetched(_)
        ));
    }

    struct Fixed(&'static str);

    impl CredentialSource for Fixed {
        fn credential(&self) -> Result<String> {
            Ok(self.0.to_owned())
        }
    }

    struct Unreachable;

    impl CredentialSource for Unreachable {
        fn credential(&self) -> Result<String> {
            panic!("credential requested while nothing is installed");
        }
    }

    #[tokio::test]
    async fn uninstall_is_noop_when_not_installed() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::default().missing_binary());
        let installer = installer(dir.path(), runner.clone(), fetcher("3.20.3"));
        assert!(!installer.uninstall(&Unreachable).await.unwrap());
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn uninstall_feeds_credential_to_helper() {
        let dir = tempfile::tempdir().unwrap();
        let source_dir = dir.path().join("target/protobuf-3.20.3");
        fs::create_dir_all(&source_dir).unwrap();
        let runner = Arc::new(ScriptedRunner::default().reply(0, "libprotoc 3.20.3", ""));
        let installer = installer(dir.path(), runner.clone(), fetcher("3.20.3"));

        assert!(installer.uninstall(&Fixed("s3cret")).await.unwrap());
        let call = &runner.calls()[1];
        assert_eq!(call.program, PathBuf::from("sudo"));
        assert_eq!(call.args, vec!["-S", "make", "uninstall"]);
        assert_eq!(call.stdin.as_deref(), Some("s3cret\n"));
        assert_eq!(call.cwd.as_deref(), Some(source_dir.as_path()));
    }

    #[test]
    fn relative_override_with_directories_is_project_relative() {
        let project = Path::new("/work/app");
        assert_eq!(
            resolve_binary(project, Path::new("tools/protoc")),
            PathBuf::from("/work/app/tools/protoc")
        );
        assert_eq!(
            resolve_binary(project, Path::new("protoc")),
            PathBuf::from("protoc")
        );
        assert_eq!(
            resolve_binary(project, Path::new("/usr/bin/protoc")),
            PathBuf::from("/usr/bin/protoc")
        );
    }
}
