use std::path::Path;

use tracing::debug;

use crate::error::{MigrationError, Result};

/// Lists migration filenames in `dir`.
///
/// Only regular entries with a `.sql` extension are returned. Subdirectories
/// are skipped, nothing is read recursively, and the order is whatever the
/// filesystem yields.
pub fn list_available(dir: &Path) -> Result<Vec<String>> {
    let read_err = |e: std::io::Error| {
        MigrationError::io(
            format!(
                "failed to get list of migration files from {:?}",
                dir.display().to_string()
            ),
            e,
        )
    };

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        if entry.file_type().map_err(read_err)?.is_dir() {
            continue;
        }

        let path = entry.path();
        if path.extension().map(|e| e == "sql").unwrap_or(false) {
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => debug!("Skipping non UTF-8 migration filename {:?}", name),
            }
        }
    }

    debug!("Found {} migration files in {:?}", names.len(), dir);
    Ok(names)
}
