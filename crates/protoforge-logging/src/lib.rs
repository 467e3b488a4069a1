//! ---
//! pf_section: "03-logging"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Structured logging helpers."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
#![warn(missing_docs)]

//! Lifecycle events and context-enriched log macros shared by the installer,
//! the orchestrator and the CLI.

use tracing::Level;

pub mod macros;

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Schema file the event relates to.
    pub schema: Option<&'a str>,
    /// Workflow phase (install, stage, compile, downstream).
    pub phase: Option<&'a str>,
    /// Compiler version the event relates to.
    pub version: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a schema path.
    pub fn with_schema(mut self, schema: &'a str) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Attach a workflow phase.
    pub fn with_phase(mut self, phase: &'a str) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attach a compiler version.
    pub fn with_version(mut self, version: &'a str) -> Self {
        self.version = Some(version);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation was not needed.
    Skipped,
    /// The operation failed or was aborted.
    Fault,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Skipped => "skipped",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized lifecycle event with an outcome.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let default_ctx = LogContext::default();
    let ctx = context.unwrap_or(&default_ctx);
    // `tracing::event!` needs a constant level per call site.
    macro_rules! emit {
        ($level:expr) => {
            tracing::event!(
                $level,
                event,
                outcome = outcome.as_str(),
                schema = ctx.schema.unwrap_or(""),
                phase = ctx.phase.unwrap_or(""),
                version = ctx.version.unwrap_or(""),
                message = %message
            )
        };
    }
    match outcome {
        SystemEventOutcome::Success => emit!(Level::INFO),
        SystemEventOutcome::Skipped => emit!(Level::DEBUG),
        SystemEventOutcome::Fault => emit!(Level::ERROR),
    }
}
