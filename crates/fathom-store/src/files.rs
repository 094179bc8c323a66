//! Content-addressed on-disk layout (spec §4.5, §6):
//! `<root>/crashfiles/<id>.raw`, `<root>/crashdata/<id>.txt`,
//! `<root>/templates/<id>.raw`.

use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    std::fs::write(path, bytes).map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn crashfile_path(root: &Path, crash_id: &str) -> PathBuf {
    root.join("crashfiles").join(format!("{crash_id}.raw"))
}

pub fn crashdata_path(root: &Path, crash_id: &str) -> PathBuf {
    root.join("crashdata").join(format!("{crash_id}.txt"))
}

pub fn template_path(root: &Path, template_id: &str) -> PathBuf {
    root.join("templates").join(format!("{template_id}.raw"))
}

pub fn write_crashfile(root: &Path, crash_id: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = crashfile_path(root, crash_id);
    write_file(&path, bytes)?;
    Ok(path)
}

pub fn write_crashdata(root: &Path, crash_id: &str, text: &str) -> Result<PathBuf> {
    let path = crashdata_path(root, crash_id);
    write_file(&path, text.as_bytes())?;
    Ok(path)
}

pub fn write_template(root: &Path, template_id: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = template_path(root, template_id);
    write_file(&path, bytes)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_under_expected_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_crashfile(dir.path(), "abc", b"\x00\x01").unwrap();
        assert_eq!(path, dir.path().join("crashfiles/abc.raw"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0, 1]);
    }
}
