use crate::error::{Result, SessionError};
use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Replace `path` with `bytes` via a sibling temp file and rename.
///
/// Readers observe either the old or the new content, never a partial write.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = tmp_path(path);

    let mut file = File::create(&tmp).map_err(|err| SessionError::io(&tmp, err))?;
    file.write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(|err| SessionError::io(&tmp, err))?;
    drop(file);

    std::fs::rename(&tmp, path).map_err(|err| {
        let _ = std::fs::remove_file(&tmp);
        SessionError::io(path, err)
    })?;

    log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("document"), OsString::from);
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn replaces_content_and_leaves_no_temp_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("session.md");
        std::fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        assert!(!temp.path().join("session.md.tmp").exists());
    }

    #[test]
    fn missing_parent_reports_temp_path() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("missing").join("session.md");
        let err = write_atomic(&path, b"x").unwrap_err();
        assert!(err.to_string().contains("session.md.tmp"), "{err}");
    }
}
