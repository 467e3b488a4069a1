//! ---
//! pf_section: "04-compiler-installation"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Compiler installation lifecycle."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use std::fs::{self, File};
use std::io;
use std::path::Path;

use tracing::debug;

use crate::{InstallError, Result};

/// Unpack `archive` below `into`, returning the number of files written.
///
/// Entries whose names would land outside `into` abort the extraction.
/// Unix permission bits recorded in the archive are restored.
pub fn extract_zip(archive: &Path, into: &Path) -> Result<usize> {
    let archive_error = |message: String| InstallError::Archive {
        path: archive.to_path_buf(),
        message,
    };
    let io_error = |path: &Path, source: io::Error| InstallError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(archive).map_err(|err| io_error(archive, err))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|err| archive_error(err.to_string()))?;

    let mut written = 0;
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|err| archive_error(err.to_string()))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(archive_error(format!(
                "entry '{}' escapes the extraction directory",
                entry.name()
            )));
        };
        let target = into.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|err| io_error(&target, err))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| io_error(parent, err))?;
        }
        let mut out = File::create(&target).map_err(|err| io_error(&target, err))?;
        io::copy(&mut entry, &mut out).map_err(|err| io_error(&target, err))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o7777))
                .map_err(|err| io_error(&target, err))?;
        }
        written += 1;
    }

    debug!(archive = %archive.display(), into = %into.display(), files = written, "archive extracted");
    Ok(written)
}
