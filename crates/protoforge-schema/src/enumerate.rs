//! ---
//! pf_section: "02-schema-resolution"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Schema discovery, staleness and import staging."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// File name suffix identifying schema sources.
pub const SCHEMA_EXTENSION: &str = ".proto";

/// Schema files carry the extension and are not hidden.
pub fn is_schema_file_name(name: &str) -> bool {
    name.ends_with(SCHEMA_EXTENSION) && !name.starts_with('.')
}

/// Relative paths of every schema file below `root`, in lexical traversal order.
///
/// Symbolic links are followed, so a linked schema or schema directory is listed
/// under its link path. A missing root yields an empty list.
pub fn schema_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(is_schema_file_name)
        })
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(Path::to_path_buf)
        })
        .collect()
}
