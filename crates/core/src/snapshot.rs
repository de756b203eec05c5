//! Builds the per-iteration view of what is left to organize.

use crate::error::Result;
use crate::manifest;
use crate::models::{DirectoryState, FileEntry};
use crate::tracker::CompletionTracker;
use globset::{Glob, GlobSet, GlobSetBuilder};
use providers::MediaKind;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    pub excludes: GlobSet,
    pub follow_links: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            excludes: GlobSet::empty(),
            follow_links: false,
        }
    }
}

impl SnapshotOptions {
    pub fn new(exclude_patterns: &[String], follow_links: bool) -> Result<Self> {
        Ok(Self {
            excludes: build_globset(exclude_patterns)?,
            follow_links,
        })
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(Glob::new(pat)?);
    }
    Ok(builder.build()?)
}

/// Directories holding a manifest are finished; nothing below them is walked.
fn should_descend(entry: &DirEntry, options: &SnapshotOptions) -> bool {
    if options.excludes.is_match(entry.path()) {
        return false;
    }
    !(entry.file_type().is_dir() && manifest::is_finished(entry.path()))
}

fn to_entry(entry: &DirEntry) -> Option<FileEntry> {
    let meta = match entry.metadata() {
        Ok(m) => m,
        Err(e) => {
            warn!(path = %entry.path().display(), error = %e, "skipping unreadable file");
            return None;
        }
    };
    let path = entry.path().to_path_buf();
    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Some(FileEntry {
        name: entry.file_name().to_string_lossy().into_owned(),
        size: meta.len(),
        parent,
        path,
    })
}

/// Walks `target` and lists every regular file that is not a manifest, not
/// inside a finished folder and not yet marked completed.
///
/// Unreadable subtrees are skipped with a warning.
pub fn snapshot(
    target: &Path,
    kind: MediaKind,
    tracker: &CompletionTracker,
    options: &SnapshotOptions,
) -> DirectoryState {
    let mut files = Vec::new();
    let walker = WalkDir::new(target)
        .follow_links(options.follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| should_descend(e, options));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(
                    path = %e.path().unwrap_or(target).display(),
                    error = %e,
                    "skipping unreadable subtree"
                );
                continue;
            }
        };
        if !entry.file_type().is_file() || manifest::is_manifest(entry.path()) {
            continue;
        }
        if tracker.is_completed(entry.path()) {
            continue;
        }
        if let Some(file) = to_entry(&entry) {
            files.push(file);
        }
    }

    debug!(target = %target.display(), remaining = files.len(), "snapshot");
    DirectoryState {
        directory: target.to_path_buf(),
        media_type: kind,
        total_files: files.len(),
        files,
    }
}
