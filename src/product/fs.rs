//! Filesystem helpers for workspaces and build outputs.

use std::fs;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::Result;

/// Recursively copy the contents of `src` into `dst`, overwriting files.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    debug!("copy {} to {}", src.display(), dst.display());
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(anyhow::Error::from)?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Make sure `dir` exists and is empty.
pub fn empty_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Move a file, copying when a rename is not possible.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn copy_dir_merges_into_target() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("nested/deeper")).unwrap();
        fs::write(src.join("top.txt"), "top").unwrap();
        fs::write(src.join("nested/deeper/leaf.txt"), "leaf").unwrap();

        let dst = temp.path().join("dst");
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("existing.txt"), "kept").unwrap();

        copy_dir(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("top.txt")).unwrap(), "top");
        assert_eq!(
            fs::read_to_string(dst.join("nested/deeper/leaf.txt")).unwrap(),
            "leaf"
        );
        assert_eq!(fs::read_to_string(dst.join("existing.txt")).unwrap(), "kept");
    }

    #[test]
    fn copy_dir_of_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        assert!(copy_dir(&temp.path().join("missing"), &temp.path().join("dst")).is_err());
    }

    #[test]
    fn empty_dir_clears_or_creates() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("build");

        empty_dir(&dir).unwrap();
        assert!(dir.is_dir());

        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(dir.join("sub/file"), "x").unwrap();
        fs::write(dir.join("file"), "x").unwrap();

        empty_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn move_file_creates_target_dir() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("dist/bundles.tar.gz");
        fs::create_dir_all(from.parent().unwrap()).unwrap();
        fs::write(&from, "bundle").unwrap();

        let to = temp.path().join("build/web.tar.gz");
        move_file(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read_to_string(to).unwrap(), "bundle");
    }
}
