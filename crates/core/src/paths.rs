use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Resolves `.` and `..` without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Joins relative paths onto `base`; absolute paths are kept as given.
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Returns true if `path` lies at or below `base` after lexical normalization.
pub fn is_within(path: &Path, base: &Path) -> bool {
    normalize(path).starts_with(normalize(base))
}

/// Like [`is_within`], but follows symlinks through the part of `path` that
/// already exists. Components that do not exist yet are appended lexically.
pub fn resolves_within(path: &Path, base: &Path) -> bool {
    let Ok(base) = base.canonicalize() else {
        return false;
    };
    let path = normalize(path);
    let mut existing = path.as_path();
    let mut missing: Vec<&OsStr> = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(real) => {
                let full = missing.iter().rev().fold(real, |acc, name| acc.join(name));
                return full.starts_with(&base);
            }
            // A dangling link: its target is unknown, so it cannot be trusted.
            Err(_) if existing.symlink_metadata().is_ok() => return false,
            Err(_) => match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name);
                    existing = parent;
                }
                _ => return false,
            },
        }
    }
}
