//! ---
//! pf_section: "03-logging"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Structured logging helpers."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
/// Emit an informational log enriched with protoforge context.
#[macro_export]
macro_rules! pf_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::INFO,
            schema = ctx.schema.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            version = ctx.version.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::INFO,
            schema = ctx.schema.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            version = ctx.version.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit a debug log enriched with protoforge context.
#[macro_export]
macro_rules! pf_debug {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::DEBUG,
            schema = ctx.schema.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            version = ctx.version.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::DEBUG,
            schema = ctx.schema.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            version = ctx.version.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit a warning log enriched with protoforge context.
#[macro_export]
macro_rules! pf_warn {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::WARN,
            schema = ctx.schema.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            version = ctx.version.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::WARN,
            schema = ctx.schema.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            version = ctx.version.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an error log enriched with protoforge context.
#[macro_export]
macro_rules! pf_error {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::ERROR,
            schema = ctx.schema.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            version = ctx.version.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::ERROR,
            schema = ctx.schema.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            version = ctx.version.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}
