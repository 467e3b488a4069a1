//! ---
//! pf_section: "02-schema-resolution"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Schema discovery, staleness and import staging."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
#![warn(missing_docs)]

//! Everything protoforge knows about `.proto` files short of compiling them:
//! which ones exist, how fresh they are, what they import, and how missing
//! imports are staged from the bundled fallback set.

use std::path::PathBuf;

/// Result alias used throughout the schema crate.
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Error type for schema discovery and staging.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A schema file could not be read.
    #[error("unable to read schema {path}: {source}")]
    Read {
        /// Offending file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A staged copy could not be written.
    #[error("unable to stage schema {path}: {source}")]
    Write {
        /// Destination that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

pub mod bundled;
pub mod deps;
pub mod enumerate;
pub mod imports;
pub mod modtime;

pub use bundled::{BundledSchemas, FallbackSchemas};
pub use deps::{extract_dependencies, ExtractReport};
pub use enumerate::{is_schema_file_name, schema_files, SCHEMA_EXTENSION};
pub use imports::scan_imports;
pub use modtime::{is_stale, latest_modification};
