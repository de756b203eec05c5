//! Tools the decision agent may call. Each returns a plain message for the
//! model to read; failures are reported in the message, never raised.

use crate::actions::{ActionKind, ActionLog, ActionRecord};
use crate::manifest;
use crate::models::MediaInfo;
use crate::mover::{self, MoveOptions};
use crate::paths;
use providers::{LookupOutcome, MediaKind, MetadataLookup, ToolDefinition};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub const MOVE_RENAME_FILE: &str = "move_rename_file";
pub const MARK_COMPLETED: &str = "mark_completed";
pub const CALCULATE_FOLDER_HASHES: &str = "calculate_folder_hashes";
pub const SEARCH_METADATA: &str = "search_metadata";

#[derive(Deserialize)]
struct MoveArgs {
    old_path: String,
    new_path: String,
}

#[derive(Deserialize)]
struct MarkArgs {
    file_path: String,
}

#[derive(Deserialize)]
struct HashArgs {
    folder_path: String,
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    media_type: Option<MediaKind>,
}

#[derive(Serialize)]
struct SearchReply<'a> {
    #[serde(flatten)]
    info: MediaInfo,
    overview: &'a str,
}

/// Executes agent tool calls against one target directory and records every
/// effect in an [`ActionLog`].
pub struct Toolbox {
    root: PathBuf,
    kind: MediaKind,
    move_options: MoveOptions,
    lookup: Arc<dyn MetadataLookup>,
    log: ActionLog,
}

impl Toolbox {
    pub fn new(
        root: impl Into<PathBuf>,
        kind: MediaKind,
        lookup: Arc<dyn MetadataLookup>,
        move_options: MoveOptions,
    ) -> Self {
        Self {
            root: root.into(),
            kind,
            move_options,
            lookup,
            log: ActionLog::new(),
        }
    }

    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    pub fn drain_actions(&mut self) -> Vec<ActionRecord> {
        self.log.drain()
    }

    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::function(
                SEARCH_METADATA,
                "Search the movie/TV database for a title. Returns JSON with title, year and overview, or an error field when nothing matched.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "Title to search for"},
                        "media_type": {"type": "string", "enum": ["movie", "tv", "audiobook"]}
                    },
                    "required": ["query"]
                }),
            ),
            ToolDefinition::function(
                MOVE_RENAME_FILE,
                "Move and rename a file or folder. Missing destination folders are created; an existing destination is never overwritten.",
                json!({
                    "type": "object",
                    "properties": {
                        "old_path": {"type": "string"},
                        "new_path": {"type": "string"}
                    },
                    "required": ["old_path", "new_path"]
                }),
            ),
            ToolDefinition::function(
                MARK_COMPLETED,
                "Mark a file (or every file in a folder) as properly organized so it is not offered again.",
                json!({
                    "type": "object",
                    "properties": {"file_path": {"type": "string"}},
                    "required": ["file_path"]
                }),
            ),
            ToolDefinition::function(
                CALCULATE_FOLDER_HASHES,
                "Record content hashes for a finished folder. The folder is skipped on every later pass.",
                json!({
                    "type": "object",
                    "properties": {"folder_path": {"type": "string"}},
                    "required": ["folder_path"]
                }),
            ),
        ]
    }

    /// Dispatches a tool call by name with JSON-encoded arguments.
    pub async fn call(&mut self, name: &str, arguments: &str) -> String {
        match name {
            MOVE_RENAME_FILE => match serde_json::from_str::<MoveArgs>(arguments) {
                Ok(args) => self.move_rename_file(&args.old_path, &args.new_path),
                Err(e) => bad_arguments(name, e),
            },
            MARK_COMPLETED => match serde_json::from_str::<MarkArgs>(arguments) {
                Ok(args) => self.mark_completed(&args.file_path),
                Err(e) => bad_arguments(name, e),
            },
            CALCULATE_FOLDER_HASHES => match serde_json::from_str::<HashArgs>(arguments) {
                Ok(args) => self.calculate_folder_hashes(&args.folder_path),
                Err(e) => bad_arguments(name, e),
            },
            SEARCH_METADATA => match serde_json::from_str::<SearchArgs>(arguments) {
                Ok(args) => {
                    let kind = args.media_type.unwrap_or(self.kind);
                    self.search_metadata(&args.query, kind).await
                }
                Err(e) => bad_arguments(name, e),
            },
            other => {
                warn!(tool = other, "unknown tool requested");
                format!("Error: unknown tool {}", other)
            }
        }
    }

    /// Resolves an agent-supplied path and keeps it inside the target, also
    /// after following any symlinks on the way there.
    fn contained(&self, raw: &str) -> Result<PathBuf, String> {
        let path = paths::resolve(&self.root, Path::new(raw));
        if paths::is_within(&path, &self.root) && paths::resolves_within(&path, &self.root) {
            Ok(path)
        } else {
            Err(format!(
                "Error: {} is outside the target directory {}",
                path.display(),
                self.root.display()
            ))
        }
    }

    pub fn move_rename_file(&mut self, old_path: &str, new_path: &str) -> String {
        let (from, to) = match (self.contained(old_path), self.contained(new_path)) {
            (Ok(from), Ok(to)) => (from, to),
            (Err(msg), _) | (_, Err(msg)) => return msg,
        };
        match mover::move_path(&from, &to, self.move_options) {
            Ok(_) => {
                self.log.record(ActionKind::Moved {
                    from: from.clone(),
                    to: to.clone(),
                });
                format!("Successfully moved {} to {}", from.display(), to.display())
            }
            Err(crate::error::OrganizeError::SourceNotFound(p)) => {
                format!("Error: Source path {} does not exist", p.display())
            }
            Err(crate::error::OrganizeError::DestinationExists(p)) => format!(
                "Error: Destination {} already exists; choose another name",
                p.display()
            ),
            Err(e) => {
                warn!(from = %from.display(), to = %to.display(), error = %e, "move failed");
                format!("Error moving file: {}", e)
            }
        }
    }

    pub fn mark_completed(&mut self, file_path: &str) -> String {
        let path = match self.contained(file_path) {
            Ok(p) => p,
            Err(msg) => return msg,
        };
        info!(path = %path.display(), "marked completed");
        let reply = format!(
            "File {} has been marked as completed and properly organized.",
            path.display()
        );
        self.log.record(ActionKind::MarkedCompleted { path });
        reply
    }

    pub fn calculate_folder_hashes(&mut self, folder_path: &str) -> String {
        let folder = match self.contained(folder_path) {
            Ok(p) => p,
            Err(msg) => return msg,
        };
        match manifest::write_manifest(&folder) {
            Ok(_) => {
                self.log.record(ActionKind::FolderHashed {
                    folder: folder.clone(),
                });
                format!("Successfully created hash file for {}", folder.display())
            }
            Err(crate::error::OrganizeError::InvalidTarget { .. }) => {
                format!("Error: {} is not a directory", folder.display())
            }
            Err(e) => {
                warn!(folder = %folder.display(), error = %e, "hashing failed");
                format!("Error calculating hashes: {}", e)
            }
        }
    }

    /// Lookup misses and lookup errors are both reported as data.
    pub async fn search_metadata(&self, query: &str, kind: MediaKind) -> String {
        match self.lookup.search(query, kind).await {
            Ok(LookupOutcome::Found(found)) => {
                let reply = SearchReply {
                    info: MediaInfo::from_match(&found, kind),
                    overview: &found.overview,
                };
                serde_json::to_string(&reply)
                    .unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string())
            }
            Ok(LookupOutcome::NotFound) => json!({ "error": "No results found" }).to_string(),
            Err(e) => json!({ "error": e.to_string() }).to_string(),
        }
    }
}

fn bad_arguments(tool: &str, err: serde_json::Error) -> String {
    format!("Error: invalid arguments for {}: {}", tool, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::{MediaMatch, ProviderError};
    use std::fs;

    struct FixedLookup(Option<MediaMatch>);

    #[async_trait::async_trait]
    impl MetadataLookup for FixedLookup {
        async fn search(
            &self,
            _query: &str,
            _kind: MediaKind,
        ) -> Result<LookupOutcome, ProviderError> {
            Ok(match &self.0 {
                Some(m) => LookupOutcome::Found(m.clone()),
                None => LookupOutcome::NotFound,
            })
        }
    }

    struct BrokenLookup;

    #[async_trait::async_trait]
    impl MetadataLookup for BrokenLookup {
        async fn search(
            &self,
            _query: &str,
            _kind: MediaKind,
        ) -> Result<LookupOutcome, ProviderError> {
            Err(ProviderError::RequestFailed("connection reset".into()))
        }
    }

    fn toolbox(root: &Path, lookup: Arc<dyn MetadataLookup>) -> Toolbox {
        Toolbox::new(root, MediaKind::Movie, lookup, MoveOptions::default())
    }

    #[tokio::test]
    async fn move_tool_records_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("bad_rip.mkv"), b"m").unwrap();
        let mut tools = toolbox(root, Arc::new(FixedLookup(None)));

        let args = json!({
            "old_path": root.join("bad_rip.mkv"),
            "new_path": "Example Film (2012)/Example Film (2012).mkv"
        })
        .to_string();
        let reply = tools.call(MOVE_RENAME_FILE, &args).await;
        assert!(reply.starts_with("Successfully moved"), "{reply}");

        let moved_to = root.join("Example Film (2012)").join("Example Film (2012).mkv");
        assert!(moved_to.exists());
        assert_eq!(
            tools.log().entries()[0].action,
            ActionKind::Moved {
                from: root.join("bad_rip.mkv"),
                to: moved_to,
            }
        );
    }

    #[tokio::test]
    async fn failed_move_is_a_message_and_not_logged() {
        let dir = tempfile::tempdir().unwrap();
        let mut tools = toolbox(dir.path(), Arc::new(FixedLookup(None)));
        let reply = tools.move_rename_file("ghost.mkv", "Ghost/ghost.mkv");
        assert!(reply.contains("does not exist"), "{reply}");
        assert!(tools.log().is_empty());
        assert!(!dir.path().join("Ghost").exists());
    }

    #[tokio::test]
    async fn paths_outside_the_target_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("movies");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.mkv"), b"a").unwrap();
        let mut tools = toolbox(&root, Arc::new(FixedLookup(None)));

        let reply = tools.move_rename_file("a.mkv", "../escaped.mkv");
        assert!(reply.contains("outside the target"), "{reply}");
        assert!(root.join("a.mkv").exists());
        assert!(!dir.path().join("escaped.mkv").exists());

        let reply = tools.mark_completed("/etc/passwd");
        assert!(reply.contains("outside the target"));
        assert!(tools.log().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_folders_cannot_lead_outside_the_target() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("movies");
        let outside = dir.path().join("outside");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&outside).unwrap();
        fs::write(root.join("a.mkv"), b"a").unwrap();
        std::os::unix::fs::symlink("../outside", root.join("lib")).unwrap();
        let mut tools = toolbox(&root, Arc::new(FixedLookup(None)));

        let reply = tools.move_rename_file("a.mkv", "lib/a.mkv");
        assert!(reply.contains("outside the target"), "{reply}");
        assert!(root.join("a.mkv").exists());
        assert!(!outside.join("a.mkv").exists());

        let reply = tools.calculate_folder_hashes("lib");
        assert!(reply.contains("outside the target"), "{reply}");
        assert!(!manifest::is_finished(&outside));
        assert!(tools.log().is_empty());
    }

    #[tokio::test]
    async fn mark_and_hash_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("Film (1999)");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("Film (1999).mkv"), b"f").unwrap();
        let mut tools = toolbox(dir.path(), Arc::new(FixedLookup(None)));

        let reply = tools
            .call(
                MARK_COMPLETED,
                &json!({ "file_path": folder.join("Film (1999).mkv") }).to_string(),
            )
            .await;
        assert!(reply.contains("marked as completed"));

        let reply = tools
            .call(
                CALCULATE_FOLDER_HASHES,
                &json!({ "folder_path": "Film (1999)" }).to_string(),
            )
            .await;
        assert!(reply.starts_with("Successfully created hash file"), "{reply}");
        assert!(manifest::is_finished(&folder));

        let kinds: Vec<ActionKind> = tools.drain_actions().into_iter().map(|r| r.action).collect();
        assert_eq!(
            kinds,
            vec![
                ActionKind::MarkedCompleted {
                    path: folder.join("Film (1999).mkv")
                },
                ActionKind::FolderHashed { folder },
            ]
        );
    }

    #[tokio::test]
    async fn hashing_a_file_reports_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.mkv"), b"a").unwrap();
        let mut tools = toolbox(dir.path(), Arc::new(FixedLookup(None)));
        let reply = tools.calculate_folder_hashes("a.mkv");
        assert!(reply.contains("is not a directory"), "{reply}");
        assert!(tools.log().is_empty());
    }

    #[tokio::test]
    async fn search_returns_json_for_hits_misses_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let hit = toolbox(
            dir.path(),
            Arc::new(FixedLookup(Some(MediaMatch {
                title: "Example Film".into(),
                year: Some(2012),
                overview: "Things happen.".into(),
            }))),
        );
        let value: serde_json::Value =
            serde_json::from_str(&hit.search_metadata("bad rip", MediaKind::Movie).await).unwrap();
        assert_eq!(value["title"], "Example Film");
        assert_eq!(value["year"], 2012);
        assert_eq!(value["overview"], "Things happen.");
        assert_eq!(value["media_type"], "movie");

        let miss = toolbox(dir.path(), Arc::new(FixedLookup(None)));
        let value: serde_json::Value =
            serde_json::from_str(&miss.search_metadata("zzz", MediaKind::Tv).await).unwrap();
        assert_eq!(value["error"], "No results found");

        let broken = toolbox(dir.path(), Arc::new(BrokenLookup));
        let value: serde_json::Value =
            serde_json::from_str(&broken.search_metadata("x", MediaKind::Movie).await).unwrap();
        assert!(value["error"].as_str().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn malformed_arguments_and_unknown_tools_are_messages() {
        let dir = tempfile::tempdir().unwrap();
        let mut tools = toolbox(dir.path(), Arc::new(FixedLookup(None)));
        let reply = tools.call(MOVE_RENAME_FILE, "{\"old_path\": 3}").await;
        assert!(reply.starts_with("Error: invalid arguments"));
        let reply = tools.call("delete_everything", "{}").await;
        assert!(reply.contains("unknown tool"));
    }

    #[test]
    fn definitions_cover_every_tool() {
        let names: Vec<&str> = Toolbox::definitions()
            .iter()
            .map(|d| d.function.name)
            .collect();
        assert_eq!(
            names,
            vec![
                SEARCH_METADATA,
                MOVE_RENAME_FILE,
                MARK_COMPLETED,
                CALCULATE_FOLDER_HASHES
            ]
        );
    }
}
