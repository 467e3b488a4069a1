//! ---
//! pf_section: "02-schema-resolution"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Schema discovery, staleness and import staging."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use std::path::Path;
use std::time::SystemTime;

use tracing::warn;
use walkdir::WalkDir;

/// Latest modification time of any regular file below `dir`, following
/// symbolic links to their targets.
///
/// Returns [`SystemTime::UNIX_EPOCH`] when the directory is empty or missing,
/// so an absent output tree always compares as older than any source.
pub fn latest_modification(dir: &Path) -> SystemTime {
    let mut latest = SystemTime::UNIX_EPOCH;
    let walker = WalkDir::new(dir).min_depth(1).follow_links(true);
    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "unable to read metadata");
                continue;
            }
        };
        if let Ok(modified) = metadata.modified() {
            if modified > latest {
                latest = modified;
            }
        }
    }
    latest
}

/// True when `sources` holds a file newer than everything in each of `outputs`.
pub fn is_stale(sources: &Path, outputs: &[&Path]) -> bool {
    let newest_source = latest_modification(sources);
    outputs
        .iter()
        .all(|output| newest_source > latest_modification(output))
}
