use providers::{MediaKind, MediaMatch};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One regular file seen by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub parent: PathBuf,
}

/// The unfinished, unprocessed files under the target at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryState {
    pub directory: PathBuf,
    pub media_type: MediaKind,
    pub files: Vec<FileEntry>,
    pub total_files: usize,
}

impl DirectoryState {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    pub media_type: MediaKind,
}

impl MediaInfo {
    pub fn from_match(m: &MediaMatch, kind: MediaKind) -> Self {
        Self {
            title: m.title.clone(),
            year: m.year,
            season: None,
            episode: None,
            media_type: kind,
        }
    }
}
