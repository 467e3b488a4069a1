//! ---
//! pf_section: "06-command-line"
//! pf_subsection: "binary"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Command-line entry point for installing protoc and compiling schemas."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use std::io::{self, Write};

use anyhow::Result;
use protoforge_installer::{CredentialSource, EnvCredential, InstallError, InstallState};
use protoforge_logging::{log_system_event, LogContext, SystemEventOutcome};

use crate::project::Project;

/// Ensure the configured compiler version is fetched and built.
pub async fn install(project: &Project) -> Result<()> {
    let installer = project.installer()?;
    let state = installer.install().await?;
    let version = &project.config.protobuf_version;
    match state {
        InstallState::Installed => println!(
            "protoc {version} available at {}",
            installer.protoc_binary().display()
        ),
        InstallState::Fetched | InstallState::Uninstalled => println!(
            "protoc {version} built at {}",
            installer.built_binary().display()
        ),
    }
    log_system_event(
        Some(&LogContext::new().with_phase("install").with_version(version)),
        "install.complete",
        &format!("compiler state: {state}"),
        SystemEventOutcome::Success,
    );
    Ok(())
}

/// Uninstall the compiler, asking for the privilege credential when needed.
pub async fn uninstall(project: &Project) -> Result<()> {
    let installer = project.installer()?;
    let env = EnvCredential::default();
    let removed = if env.is_available() {
        installer.uninstall(&env).await?
    } else {
        installer.uninstall(&PromptCredential).await?
    };
    if removed {
        println!("protoc {} uninstalled", project.config.protobuf_version);
    } else {
        println!(
            "protoc {} is not installed; nothing to do",
            project.config.protobuf_version
        );
    }
    Ok(())
}

/// Reads the credential as one line from stdin after prompting on stderr.
struct PromptCredential;

impl CredentialSource for PromptCredential {
    fn credential(&self) -> protoforge_installer::Result<String> {
        eprint!("Password for privileged uninstall: ");
        io::stderr()
            .flush()
            .map_err(|err| InstallError::Credential(format!("failed to flush prompt: {err}")))?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .map_err(|err| InstallError::Credential(format!("failed to read stdin: {err}")))?;
        if read == 0 {
            return Err(InstallError::Credential("input stream closed".into()));
        }
        Ok(input.trim_end_matches(['\r', '\n']).to_owned())
    }
}
