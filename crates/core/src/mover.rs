//! The only code path that relocates media on disk.

use crate::error::{OrganizeError, Result};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default)]
pub struct MoveOptions {
    /// Always copy then delete instead of renaming.
    pub copy_then_delete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMethod {
    Renamed,
    Copied,
}

/// Moves a file or directory from `from` to `to`, creating missing parents.
///
/// Fails with `SourceNotFound` / `DestinationExists` before touching anything.
/// An existing destination is never overwritten or merged into. A rename that
/// crosses volumes falls back to copy and delete.
pub fn move_path(from: &Path, to: &Path, opts: MoveOptions) -> Result<MoveMethod> {
    let source_meta = match fs::symlink_metadata(from) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(OrganizeError::SourceNotFound(from.to_path_buf()))
        }
        Err(e) => return Err(OrganizeError::io(from, e)),
    };
    if fs::symlink_metadata(to).is_ok() {
        return Err(OrganizeError::DestinationExists(to.to_path_buf()));
    }
    if source_meta.is_dir() && to.starts_with(from) {
        return Err(OrganizeError::io(
            to,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot move a directory into itself",
            ),
        ));
    }

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| OrganizeError::io(parent, e))?;
    }

    let method = if opts.copy_then_delete {
        copy_then_delete(from, to, source_meta.is_dir())?;
        MoveMethod::Copied
    } else {
        match fs::rename(from, to) {
            Ok(()) => MoveMethod::Renamed,
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                debug!(from = %from.display(), to = %to.display(), "rename crosses devices, copying");
                copy_then_delete(from, to, source_meta.is_dir())?;
                MoveMethod::Copied
            }
            Err(e) => return Err(OrganizeError::io(from, e)),
        }
    };
    info!(from = %from.display(), to = %to.display(), ?method, "moved");
    Ok(method)
}

fn copy_then_delete(from: &Path, to: &Path, is_dir: bool) -> Result<()> {
    let copied = if is_dir {
        copy_tree(from, to)
    } else {
        copy_entry(from, to)
    };
    if let Err(e) = copied {
        // Leave the source intact and drop the half-written copy.
        let cleanup = if is_dir {
            fs::remove_dir_all(to)
        } else {
            fs::remove_file(to)
        };
        match cleanup {
            Err(ce) if ce.kind() != io::ErrorKind::NotFound => {
                warn!(path = %to.display(), error = %ce, "could not remove partial copy");
            }
            _ => {}
        }
        return Err(e);
    }
    let removed = if is_dir {
        fs::remove_dir_all(from)
    } else {
        fs::remove_file(from)
    };
    removed.map_err(|e| OrganizeError::io(from, e))
}

fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            OrganizeError::io(
                path,
                e.into_io_error()
                    .unwrap_or_else(|| io::Error::other("filesystem loop")),
            )
        })?;
        let Ok(rel) = entry.path().strip_prefix(from) else {
            continue;
        };
        let dest = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(|e| OrganizeError::io(&dest, e))?;
        } else {
            copy_entry(entry.path(), &dest)?;
        }
    }
    Ok(())
}

/// Copies one file; symlinks are recreated rather than followed.
fn copy_entry(from: &Path, to: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(from).map_err(|e| OrganizeError::io(from, e))?;
    if meta.file_type().is_symlink() {
        return copy_link(from, to);
    }
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| OrganizeError::io(from, e))
}

#[cfg(unix)]
fn copy_link(from: &Path, to: &Path) -> Result<()> {
    let target = fs::read_link(from).map_err(|e| OrganizeError::io(from, e))?;
    std::os::unix::fs::symlink(&target, to).map_err(|e| OrganizeError::io(to, e))
}

#[cfg(not(unix))]
fn copy_link(from: &Path, _to: &Path) -> Result<()> {
    warn!(path = %from.display(), "skipping symlink during copy");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("New Folder").join("x.mkv");
        let err = move_path(&dir.path().join("ghost.mkv"), &dst, MoveOptions::default())
            .unwrap_err();
        assert!(matches!(err, OrganizeError::SourceNotFound(_)));
        assert!(!dst.exists());
        assert!(!dir.path().join("New Folder").exists());
    }

    #[test]
    fn creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("bad_rip.mkv");
        fs::write(&src, b"movie").unwrap();
        let dst = dir
            .path()
            .join("Example Film (2012)")
            .join("nested")
            .join("Example Film (2012).mkv");

        let method = move_path(&src, &dst, MoveOptions::default()).unwrap();
        assert_eq!(method, MoveMethod::Renamed);
        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"movie");
    }

    #[test]
    fn existing_destination_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.mkv");
        let dst = dir.path().join("b.mkv");
        fs::write(&src, b"a").unwrap();
        fs::write(&dst, b"b").unwrap();

        let err = move_path(&src, &dst, MoveOptions::default()).unwrap_err();
        assert!(matches!(err, OrganizeError::DestinationExists(_)));
        assert_eq!(fs::read(&src).unwrap(), b"a");
        assert_eq!(fs::read(&dst).unwrap(), b"b");
    }

    #[test]
    fn directories_are_never_merged() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Show S01");
        let dst = dir.path().join("Show");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(src.join("e1.mkv"), b"1").unwrap();

        let err = move_path(&src, &dst, MoveOptions::default()).unwrap_err();
        assert!(matches!(err, OrganizeError::DestinationExists(_)));
        assert!(src.join("e1.mkv").exists());
        assert!(!dst.join("e1.mkv").exists());
    }

    #[test]
    fn copy_mode_moves_whole_directories() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Some Show");
        fs::create_dir_all(src.join("Season 01")).unwrap();
        fs::write(src.join("Season 01").join("e1.mkv"), b"1").unwrap();
        fs::write(src.join("poster.jpg"), b"p").unwrap();
        let dst = dir.path().join("TV").join("Some Show (2008)");

        let method = move_path(
            &src,
            &dst,
            MoveOptions {
                copy_then_delete: true,
            },
        )
        .unwrap();
        assert_eq!(method, MoveMethod::Copied);
        assert!(!src.exists());
        assert_eq!(fs::read(dst.join("Season 01").join("e1.mkv")).unwrap(), b"1");
        assert_eq!(fs::read(dst.join("poster.jpg")).unwrap(), b"p");
    }

    #[test]
    fn directory_cannot_move_into_itself() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Film");
        fs::create_dir_all(&src).unwrap();
        let err = move_path(&src, &src.join("inner"), MoveOptions::default()).unwrap_err();
        assert!(matches!(err, OrganizeError::Io { .. }));
        assert!(src.exists());
        assert!(!src.join("inner").exists());
    }

    #[cfg(unix)]
    #[test]
    fn copy_mode_recreates_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Some Show");
        fs::create_dir_all(src.join("Season 01")).unwrap();
        fs::write(src.join("Season 01").join("e1.mkv"), b"1").unwrap();
        std::os::unix::fs::symlink("Season 01", src.join("latest")).unwrap();
        let dst = dir.path().join("Some Show (2008)");

        move_path(
            &src,
            &dst,
            MoveOptions {
                copy_then_delete: true,
            },
        )
        .unwrap();
        assert!(!src.exists());
        let link = dst.join("latest");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), Path::new("Season 01"));
        assert_eq!(fs::read(link.join("e1.mkv")).unwrap(), b"1");
    }

    #[test]
    fn failed_copy_leaves_source_and_no_destination() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.mkv");
        fs::write(&src, b"a").unwrap();
        let dst = dir.path().join("missing-parent").join("a.mkv");

        let err = copy_then_delete(&src, &dst, false).unwrap_err();
        assert!(matches!(err, OrganizeError::Io { .. }));
        assert_eq!(fs::read(&src).unwrap(), b"a");
        assert!(!dst.exists());
    }
}
