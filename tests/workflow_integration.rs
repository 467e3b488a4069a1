//! ---
//! pf_section: "07-testing"
//! pf_subsection: "integration-tests"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Install-then-compile workflow across the protoforge crates."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use protoforge_common::{
    ProcessError, ProcessOutput, ProcessRunner, ProcessSpec, ProjectConfig, ProjectLayout,
};
use protoforge_core::{
    CompileOutcome, CompileRequest, CompilerSettings, NoopHostBuild, Orchestrator,
};
use protoforge_installer::{
    ArchiveFetcher, CompilerInstaller, CredentialSource, InstallState, InstallerSettings,
};
use protoforge_schema::schema_files;

/// Stands in for the host toolchain: configure, make, and the built compiler.
#[derive(Default)]
struct FakeToolchain {
    built: AtomicBool,
    calls: Mutex<Vec<ProcessSpec>>,
}

impl FakeToolchain {
    fn reply(code: i32, stdout: &str) -> Result<ProcessOutput, ProcessError> {
        Ok(ProcessOutput {
            code: Some(code),
            stdout: stdout.to_owned(),
            stderr: String::new(),
        })
    }

    fn programs(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|spec| spec.program.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }
}

#[async_trait]
impl ProcessRunner for FakeToolchain {
    async fn run(&self, spec: &ProcessSpec) -> Result<ProcessOutput, ProcessError> {
        self.calls.lock().unwrap().push(spec.clone());
        if spec.args == ["--version"] {
            return if self.built.load(Ordering::SeqCst) {
                Self::reply(0, "libprotoc 3.20.3\n")
            } else {
                Err(ProcessError::Spawn {
                    program: spec.program.display().to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                })
            };
        }
        if spec.program == Path::new("make") && spec.args.is_empty() {
            let src = spec.cwd.as_ref().unwrap().join("src");
            fs::create_dir_all(&src).unwrap();
            fs::write(src.join("protoc"), "").unwrap();
            self.built.store(true, Ordering::SeqCst);
        }
        Self::reply(0, "")
    }
}

struct ZipFetcher;

#[async_trait]
impl ArchiveFetcher for ZipFetcher {
    async fn download(&self, _url: &str, dest: &Path) -> protoforge_installer::Result<u64> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);
            for name in ["configure", "install-sh", "src/google/protobuf/any.proto"] {
                writer
                    .start_file(format!("protobuf-3.20.3/{name}"), options)
                    .unwrap();
                writer.write_all(b"#!/bin/sh\n").unwrap();
            }
            writer.finish().unwrap();
        }
        let bytes = cursor.into_inner();
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(dest, &bytes).unwrap();
        Ok(bytes.len() as u64)
    }
}

struct Password;

impl CredentialSource for Password {
    fn credential(&self) -> protoforge_installer::Result<String> {
        Ok("hunter2".into())
    }
}

fn project() -> (tempfile::TempDir, ProjectConfig, ProjectLayout) {
    let dir = tempfile::tempdir().unwrap();
    let config = ProjectConfig::default();
    let layout = ProjectLayout::new(dir.path(), &config);
    fs::create_dir_all(&layout.proto_root).unwrap();
    fs::write(
        layout.proto_root.join("event.proto"),
        "syntax = \"proto3\";\nimport \"google/protobuf/timestamp.proto\";\nmessage Event {}\n",
    )
    .unwrap();
    (dir, config, layout)
}

#[tokio::test]
async fn install_then_compile_uses_built_compiler() {
    let (_dir, config, layout) = project();
    let toolchain = Arc::new(FakeToolchain::default());
    let installer = CompilerInstaller::new(
        InstallerSettings::from_config(&config, &layout),
        toolchain.clone(),
        Arc::new(ZipFetcher),
    );

    assert_eq!(installer.state().await, InstallState::Uninstalled);
    assert_eq!(installer.install().await.unwrap(), InstallState::Installed);
    let protoc = installer.protoc_binary();
    assert_eq!(protoc, layout.compiler_source_dir.join("src/protoc"));

    let orchestrator = Orchestrator::new(
        layout.clone(),
        CompilerSettings::new(protoc.clone(), &config),
        toolchain.clone(),
        Arc::new(NoopHostBuild),
    );
    let outcome = orchestrator.compile(CompileRequest::default()).await.unwrap();
    let CompileOutcome::Compiled(report) = outcome else {
        panic!("expected compilation, got {outcome:?}");
    };
    assert!(report.is_success());
    assert_eq!(report.staged, vec!["google/protobuf/timestamp.proto"]);
    assert_eq!(
        schema_files(&layout.staging_dir),
        vec![Path::new("google/protobuf/timestamp.proto")]
    );

    let calls = toolchain.calls.lock().unwrap().clone();
    let compile = calls.last().unwrap();
    assert_eq!(compile.program, protoc);
    assert!(compile.args[0].ends_with("event.proto"));
    assert_eq!(
        toolchain.programs(),
        ["protoc", "protoc", "configure", "make", "protoc", "protoc"]
    );
}

#[tokio::test]
async fn second_install_is_a_noop() {
    let (_dir, config, layout) = project();
    let toolchain = Arc::new(FakeToolchain::default());
    let installer = CompilerInstaller::new(
        InstallerSettings::from_config(&config, &layout),
        toolchain.clone(),
        Arc::new(ZipFetcher),
    );
    installer.install().await.unwrap();
    let before = toolchain.calls.lock().unwrap().len();

    assert_eq!(installer.install().await.unwrap(), InstallState::Installed);
    assert_eq!(toolchain.calls.lock().unwrap().len(), before + 1);
}

#[tokio::test]
async fn uninstall_after_install_runs_privileged_target() {
    let (_dir, config, layout) = project();
    let toolchain = Arc::new(FakeToolchain::default());
    let installer = CompilerInstaller::new(
        InstallerSettings::from_config(&config, &layout),
        toolchain.clone(),
        Arc::new(ZipFetcher),
    );
    installer.install().await.unwrap();

    assert!(installer.uninstall(&Password).await.unwrap());
    let calls = toolchain.calls.lock().unwrap().clone();
    let sudo = calls.last().unwrap();
    assert_eq!(sudo.command_line(), "sudo -S make uninstall");
    assert_eq!(sudo.stdin.as_deref(), Some("hunter2\n"));
    assert_eq!(sudo.cwd.as_ref(), Some(&layout.compiler_source_dir));
}
