//! Per-folder content manifests. A folder holding a manifest is finished and
//! is never offered to the decision agent again.

use crate::error::{OrganizeError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Reserved name of the manifest file written at a finished folder's root.
pub const MANIFEST_FILE_NAME: &str = ".media_hashes.json";

const STAGING_FILE_NAME: &str = ".media_hashes.json.tmp";

const CHUNK_SIZE: usize = 64 * 1024;

/// Relative path (forward slashes) to hex digest.
pub type Manifest = BTreeMap<String, String>;

pub fn manifest_path(folder: &Path) -> PathBuf {
    folder.join(MANIFEST_FILE_NAME)
}

/// True for the manifest itself and for a staging file left behind by an
/// interrupted write.
pub fn is_manifest(path: &Path) -> bool {
    path.file_name()
        .map_or(false, |n| n == MANIFEST_FILE_NAME || n == STAGING_FILE_NAME)
}

pub fn is_finished(dir: &Path) -> bool {
    manifest_path(dir).is_file()
}

/// Streams a file through blake3 and returns the hex digest.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).map_err(|e| OrganizeError::io(path, e))?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).map_err(|e| OrganizeError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

fn relative_key(folder: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(folder).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

fn require_dir(folder: &Path) -> Result<()> {
    if !folder.is_dir() {
        return Err(OrganizeError::invalid_target(folder, "not a directory"));
    }
    Ok(())
}

/// Hashes every file below `folder` except manifests. Any unreadable file
/// fails the whole computation.
pub fn compute(folder: &Path) -> Result<Manifest> {
    require_dir(folder)?;
    let mut manifest = Manifest::new();
    for entry in WalkDir::new(folder).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(folder).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
            OrganizeError::io(path, source)
        })?;
        if !entry.file_type().is_file() || is_manifest(entry.path()) {
            continue;
        }
        let Some(key) = relative_key(folder, entry.path()) else {
            continue;
        };
        let digest = hash_file(entry.path())?;
        debug!(file = %key, %digest, "hashed");
        manifest.insert(key, digest);
    }
    Ok(manifest)
}

fn render(manifest: &Manifest) -> Result<String> {
    serde_json::to_string_pretty(manifest)
        .map_err(|e| OrganizeError::io(MANIFEST_FILE_NAME, std::io::Error::other(e)))
}

/// Computes and persists the manifest, marking `folder` as finished.
///
/// Nothing is written unless every file hashed successfully; the document is
/// staged beside the target and renamed into place.
pub fn write_manifest(folder: &Path) -> Result<PathBuf> {
    let manifest = compute(folder)?;
    let body = render(&manifest)?;
    let target = manifest_path(folder);
    let staging = folder.join(STAGING_FILE_NAME);
    fs::write(&staging, body).map_err(|e| OrganizeError::io(&staging, e))?;
    if let Err(e) = fs::rename(&staging, &target) {
        let _ = fs::remove_file(&staging);
        return Err(OrganizeError::io(&target, e));
    }
    info!(folder = %folder.display(), files = manifest.len(), "wrote manifest");
    Ok(target)
}

pub fn read_manifest(folder: &Path) -> Result<Manifest> {
    let path = manifest_path(folder);
    let raw = fs::read_to_string(&path).map_err(|e| OrganizeError::io(&path, e))?;
    serde_json::from_str(&raw).map_err(|e| {
        OrganizeError::io(
            &path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub matched: usize,
    pub mismatched: Vec<String>,
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty() && self.missing.is_empty() && self.unexpected.is_empty()
    }
}

/// Recomputes a finished folder's hashes and compares them with its manifest.
pub fn verify(folder: &Path) -> Result<VerifyReport> {
    require_dir(folder)?;
    let recorded = read_manifest(folder)?;
    let current = compute(folder)?;
    let mut report = VerifyReport::default();
    for (key, digest) in &recorded {
        match current.get(key) {
            Some(now) if now == digest => report.matched += 1,
            Some(_) => report.mismatched.push(key.clone()),
            None => report.missing.push(key.clone()),
        }
    }
    report.unexpected = current
        .keys()
        .filter(|k| !recorded.contains_key(*k))
        .cloned()
        .collect();
    Ok(report)
}
