use crate::error::WalkError;
use ask_protocol::path_filters::{is_excluded_dir, should_include};
use ask_protocol::ExpansionPolicy;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A file selected by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    /// Location on disk.
    pub path: PathBuf,
    /// Path relative to the walk root, `/`-separated.
    pub relative: String,
}

/// Collect the files of `dir` that the policy admits.
///
/// At each level files come first, then subdirectories, both sorted by name.
/// Excluded directories are pruned and never entered. `depth` is the level of
/// `dir` itself: at or beyond `max_depth` nothing is returned. Only the root
/// call (`depth == 0`) fails when nothing matched; unreadable entries below the
/// root are logged and skipped.
pub fn walk(
    dir: &Path,
    policy: &ExpansionPolicy,
    recursive: bool,
    depth: usize,
) -> Result<Vec<WalkedFile>, WalkError> {
    if depth >= policy.max_depth {
        log::debug!(
            "Depth {depth} reached max_depth {} at {}",
            policy.max_depth,
            dir.display()
        );
        return Ok(Vec::new());
    }

    let display = dir.display().to_string();
    let meta = std::fs::metadata(dir).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            WalkError::DirectoryNotFound {
                path: display.clone(),
            }
        } else {
            WalkError::Io {
                path: display.clone(),
                source: err,
            }
        }
    })?;
    if !meta.is_dir() {
        return Err(WalkError::NotADirectory { path: display });
    }

    let remaining = policy.max_depth - depth;
    let levels = if recursive { remaining } else { 1 };

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(levels)
        .sort_by(files_first)
        .into_iter()
        .filter_entry(|entry| !is_pruned(entry, policy));

    let mut files = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("Skipping unreadable entry under {display}: {err}");
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }

        let relative = relative_path(entry.path(), dir);
        let name = entry.file_name().to_string_lossy();
        if should_include(&name, &relative, policy) {
            files.push(WalkedFile {
                path: entry.path().to_path_buf(),
                relative,
            });
        } else {
            log::debug!("Rejected {relative} under {display}");
        }
    }

    if files.is_empty() && depth == 0 {
        return Err(WalkError::NoMatchingFiles { path: display });
    }

    log::debug!("Walked {display}: {} files", files.len());
    Ok(files)
}

fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn is_pruned(entry: &DirEntry, policy: &ExpansionPolicy) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let pruned = is_excluded_dir(&entry.file_name().to_string_lossy(), policy);
    if pruned {
        log::debug!("Pruned excluded directory {}", entry.path().display());
    }
    pruned
}

fn relative_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
