//! Compressed-input expansion with OS/tooling noise stripping.

use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ArchiveError;

/// Directory names stripped wholesale during expansion.
const NOISE_DIRS: [&str; 5] = [
    "__MACOSX",
    ".git",
    ".idea",
    "__pycache__",
    ".ipynb_checkpoints",
];

/// File names stripped during expansion.
const NOISE_FILES: [&str; 3] = [".DS_Store", "Thumbs.db", "desktop.ini"];

/// Editor backup suffixes stripped during expansion.
const NOISE_SUFFIXES: [&str; 2] = [".bak", ".swp"];

/// Returns true for platform metadata, editor/VCS/cache directories,
/// Office temp files (`~$*`) and editor backups.
pub fn is_system_noise(path: &Path) -> bool {
    for part in path.components() {
        let Some(name) = part.as_os_str().to_str() else {
            continue;
        };
        if NOISE_DIRS.contains(&name) {
            return true;
        }
    }

    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    NOISE_FILES.contains(&name)
        || name.starts_with("~$")
        || NOISE_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Expands a `.zip` input into `scratch_dir` and returns the contained file
/// paths in lexicographic order.
///
/// Entries that would land outside the scratch root are refused, deny-listed
/// noise is skipped, and paths differing only by case are rejected (they
/// cannot coexist after unpacking on case-insensitive filesystems).
pub fn expand(zip_path: &Path, scratch_dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let file = File::open(zip_path).map_err(|e| ArchiveError::Open {
        path: zip_path.to_path_buf(),
        source: e,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ArchiveError::Read {
        path: zip_path.to_path_buf(),
        source: e,
    })?;

    let mut extracted = Vec::new();
    let mut seen_lowercase: HashSet<String> = HashSet::new();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ArchiveError::Read {
                path: zip_path.to_path_buf(),
                source: e,
            })?;

        if entry.is_dir() {
            continue;
        }

        let raw_name = entry.name().to_string();
        let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            return Err(ArchiveError::Traversal {
                path: zip_path.to_path_buf(),
                name: raw_name,
            });
        };

        if is_system_noise(&relative) {
            debug!(entry = %relative.display(), "skipping system noise");
            continue;
        }

        let lowered = relative.to_string_lossy().to_lowercase();
        if !seen_lowercase.insert(lowered) {
            return Err(ArchiveError::CaseCollision {
                path: zip_path.to_path_buf(),
                name: raw_name,
            });
        }

        let destination = scratch_dir.join(&relative);
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArchiveError::Extract {
                path: zip_path.to_path_buf(),
                name: raw_name.clone(),
                source: e,
            })?;
        }

        let mut out = File::create(&destination).map_err(|e| ArchiveError::Extract {
            path: zip_path.to_path_buf(),
            name: raw_name.clone(),
            source: e,
        })?;
        io::copy(&mut entry, &mut out).map_err(|e| ArchiveError::Extract {
            path: zip_path.to_path_buf(),
            name: raw_name,
            source: e,
        })?;

        extracted.push(destination);
    }

    extracted.sort();
    debug!(
        archive = %zip_path.display(),
        count = extracted.len(),
        "expanded archive"
    );
    Ok(extracted)
}

/// Scratch directory removed on drop, regardless of how the tile exits.
#[derive(Debug)]
pub struct ScratchGuard {
    path: PathBuf,
}

impl ScratchGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if self.path.exists() {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}
