//! ---
//! pf_section: "02-schema-resolution"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Schema discovery, staleness and import staging."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Component, Path};

use protoforge_logging::{pf_debug, pf_warn, LogContext};

use crate::bundled::FallbackSchemas;
use crate::imports::scan_imports;
use crate::{Result, SchemaError};

/// What a call to [`extract_dependencies`] found and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Imports copied from the fallback source into the destination.
    pub staged: Vec<String>,
    /// Imports already present in the schema root or the destination.
    pub present: Vec<String>,
    /// Imports with no local copy and no fallback.
    pub unresolved: Vec<String>,
}

impl ExtractReport {
    /// True when every transitive import is available somewhere.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Stage every missing transitive import of `file` into `dest`.
///
/// `file` is relative to `proto_root`. An import is satisfied when it exists
/// under `proto_root` or `dest`; otherwise the fallback copy keyed by the
/// import's own path is written to `dest`. Existing files are never
/// overwritten, each import path is visited once, and the imports of present
/// and staged files are followed in turn.
pub fn extract_dependencies(
    proto_root: &Path,
    file: &Path,
    dest: &Path,
    fallback: &dyn FallbackSchemas,
) -> Result<ExtractReport> {
    let schema = file.display().to_string();
    let ctx = LogContext::new().with_schema(&schema).with_phase("stage");

    let source_path = proto_root.join(file);
    let source = read_schema(&source_path)?;

    let mut report = ExtractReport::default();
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(normalise(file));
    let mut queue: VecDeque<String> = scan_imports(&source).into();

    while let Some(import) = queue.pop_front() {
        if !visited.insert(import.clone()) {
            continue;
        }

        if !is_contained(&import) {
            pf_warn!(context = ctx, "refusing to stage import '{}' outside the staging area", import);
            report.unresolved.push(import);
            continue;
        }

        let existing = [proto_root.join(&import), dest.join(&import)]
            .into_iter()
            .find(|candidate| candidate.is_file());
        if let Some(existing) = existing {
            let content = read_schema(&existing)?;
            queue.extend(scan_imports(&content));
            report.present.push(import);
            continue;
        }

        let Some(content) = fallback.lookup(&import) else {
            pf_warn!(context = ctx, "import '{}' not found and no bundled copy exists", import);
            report.unresolved.push(import);
            continue;
        };

        let target = dest.join(&import);
        write_schema(&target, &content)?;
        pf_debug!(context = ctx, "staged '{}' into {}", import, dest.display());
        queue.extend(scan_imports(&content));
        report.staged.push(import);
    }

    Ok(report)
}

fn read_schema(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| SchemaError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn write_schema(path: &Path, content: &str) -> Result<()> {
    let to_error = |source| SchemaError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(to_error)?;
    }
    fs::write(path, content).map_err(to_error)
}

/// Relative paths made only of normal components stay inside the join root.
fn is_contained(import: &str) -> bool {
    let path = Path::new(import);
    path.components().all(|c| matches!(c, Component::Normal(_)))
}

fn normalise(file: &Path) -> String {
    file.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
