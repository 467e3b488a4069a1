//! ---
//! pf_section: "04-compiler-installation"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Compiler installation lifecycle."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use crate::{InstallError, Result};

/// Supplies the secret fed to the privilege-escalation helper.
pub trait CredentialSource: Send + Sync {
    /// Obtain the credential. Called at most once per privileged step.
    fn credential(&self) -> Result<String>;
}

/// Reads the credential from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    /// Variable consulted by [`EnvCredential::default`].
    pub const DEFAULT_VAR: &'static str = "PROTOFORGE_SUDO_PASSWORD";

    /// Read from `var`.
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    /// True when the variable is set.
    pub fn is_available(&self) -> bool {
        std::env::var_os(&self.var).is_some()
    }
}

impl Default for EnvCredential {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VAR)
    }
}

impl CredentialSource for EnvCredential {
    fn credential(&self) -> Result<String> {
        std::env::var(&self.var)
            .map_err(|_| InstallError::Credential(format!("{} is not set", self.var)))
    }
}
