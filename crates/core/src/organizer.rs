//! The organization control loop: snapshot, ask the agent, apply, repeat.

use crate::actions::{ActionKind, ActionRecord};
use crate::agent::{AgentReport, DecisionAgent};
use crate::config::AppConfig;
use crate::error::{OrganizeError, Result};
use crate::manifest;
use crate::models::DirectoryState;
use crate::mover::MoveOptions;
use crate::paths;
use crate::snapshot::{self, SnapshotOptions};
use crate::tools::Toolbox;
use crate::tracker::CompletionTracker;
use providers::{MediaKind, MetadataLookup};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Scanning,
    AwaitingDecision,
    Applying,
    Done,
    Aborted,
}

#[derive(Debug, Clone)]
pub struct LoopOptions {
    pub snapshot: SnapshotOptions,
    pub move_options: MoveOptions,
    pub max_iterations: Option<usize>,
    /// Consecutive iterations in which no offered file was settled before
    /// giving up.
    /// Zero disables the check.
    pub max_idle_passes: usize,
    pub decision_timeout: Option<Duration>,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            snapshot: SnapshotOptions::default(),
            move_options: MoveOptions::default(),
            max_iterations: None,
            max_idle_passes: 3,
            decision_timeout: None,
        }
    }
}

impl LoopOptions {
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        Ok(Self {
            snapshot: SnapshotOptions::new(&cfg.scan.exclude, cfg.scan.follow_links)?,
            move_options: MoveOptions {
                copy_then_delete: cfg.organizer.copy_then_delete,
            },
            max_iterations: cfg.organizer.max_iterations,
            max_idle_passes: cfg.organizer.max_idle_passes,
            decision_timeout: cfg.agent.timeout_secs.map(Duration::from_secs),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: usize,
    pub moved: usize,
    pub marked: usize,
    pub folders_finished: usize,
}

pub struct OrganizationLoop<A> {
    target: PathBuf,
    kind: MediaKind,
    agent: A,
    tools: Toolbox,
    tracker: CompletionTracker,
    options: LoopOptions,
    state: LoopState,
    summary: RunSummary,
}

impl<A: DecisionAgent> OrganizationLoop<A> {
    /// The target must already exist as a directory; it is never created here.
    pub fn new(
        target: &Path,
        kind: MediaKind,
        agent: A,
        lookup: Arc<dyn MetadataLookup>,
        options: LoopOptions,
    ) -> Result<Self> {
        if !target.is_dir() {
            return Err(OrganizeError::invalid_target(
                target,
                "does not exist or is not a directory",
            ));
        }
        let target = target
            .canonicalize()
            .map_err(|e| OrganizeError::io(target, e))?;
        let tools = Toolbox::new(&target, kind, lookup, options.move_options);
        Ok(Self {
            target,
            kind,
            agent,
            tools,
            tracker: CompletionTracker::new(),
            options,
            state: LoopState::Scanning,
            summary: RunSummary::default(),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn tracker(&self) -> &CompletionTracker {
        &self.tracker
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn snapshot(&self) -> DirectoryState {
        snapshot::snapshot(
            &self.target,
            self.kind,
            &self.tracker,
            &self.options.snapshot,
        )
    }

    /// Runs until nothing is left (`Done`) or the agent fails (`Aborted`, the
    /// triggering error is returned). There is no rollback on abort.
    pub async fn run(&mut self) -> Result<RunSummary> {
        info!(target = %self.target.display(), kind = %self.kind, "organizing");
        let mut idle_passes = 0usize;
        loop {
            self.transition(LoopState::Scanning);
            let state = self.snapshot();
            if state.is_empty() {
                self.transition(LoopState::Done);
                info!(iterations = self.summary.iterations, "no more files to process");
                return Ok(self.summary.clone());
            }
            if let Some(max) = self.options.max_iterations {
                if self.summary.iterations >= max {
                    return self.abort(OrganizeError::AgentFailure(format!(
                        "{} files still unorganized after {} iterations",
                        state.total_files, max
                    )));
                }
            }

            self.transition(LoopState::AwaitingDecision);
            self.summary.iterations += 1;
            info!(
                iteration = self.summary.iterations,
                remaining = state.total_files,
                "asking agent"
            );
            let report = match self.decide(&state).await {
                Ok(report) => report,
                Err(e) => return self.abort(e),
            };

            self.transition(LoopState::Applying);
            if self.apply(&state, report) {
                idle_passes = 0;
            } else {
                idle_passes += 1;
                warn!(idle_passes, "no offered file was settled this iteration");
                if self.options.max_idle_passes > 0 && idle_passes >= self.options.max_idle_passes
                {
                    return self.abort(OrganizeError::AgentFailure(format!(
                        "no progress in {} consecutive iterations; {} files remain",
                        idle_passes, state.total_files
                    )));
                }
            }
        }
    }

    async fn decide(&mut self, state: &DirectoryState) -> Result<AgentReport> {
        let decision = self.agent.decide(state, &mut self.tools);
        match self.options.decision_timeout {
            Some(limit) => tokio::time::timeout(limit, decision)
                .await
                .map_err(|_| {
                    OrganizeError::AgentFailure(format!("decision timed out after {:?}", limit))
                })?,
            None => decision.await,
        }
    }

    /// Folds the executor's action log into the tracker and finishes any
    /// folders the agent declared final. Returns whether at least one offered
    /// file left the pending set; logged actions alone do not count.
    fn apply(&mut self, offered: &DirectoryState, report: AgentReport) -> bool {
        for record in self.tools.drain_actions() {
            self.apply_record(record);
        }

        for folder in report.finished_folders {
            let folder = paths::resolve(&self.target, &folder);
            if !paths::is_within(&folder, &self.target)
                || !paths::resolves_within(&folder, &self.target)
            {
                warn!(folder = %folder.display(), "ignoring finished folder outside target");
                continue;
            }
            if manifest::is_finished(&folder) {
                continue;
            }
            match manifest::write_manifest(&folder) {
                Ok(_) => self.summary.folders_finished += 1,
                Err(e) => warn!(folder = %folder.display(), error = %e, "could not finish folder"),
            }
        }
        offered.files.iter().any(|f| self.is_settled(&f.path))
    }

    /// Completed, gone from disk, or inside a finished folder.
    fn is_settled(&self, path: &Path) -> bool {
        if self.tracker.is_completed(path) || fs::symlink_metadata(path).is_err() {
            return true;
        }
        path.ancestors()
            .skip(1)
            .take_while(|dir| dir.starts_with(&self.target))
            .any(manifest::is_finished)
    }

    fn apply_record(&mut self, record: ActionRecord) {
        match record.action {
            ActionKind::Moved { from, to } => {
                self.summary.moved += 1;
                self.tracker.mark_completed(from);
                self.mark_tree(&to);
            }
            ActionKind::MarkedCompleted { path } => {
                self.summary.marked += 1;
                self.mark_tree(&path);
            }
            ActionKind::FolderHashed { folder } => {
                self.summary.folders_finished += 1;
                debug!(folder = %folder.display(), "folder finished by agent");
            }
        }
    }

    /// Marks `path` and, for a directory, every file below it.
    fn mark_tree(&mut self, path: &Path) {
        if path.is_dir() {
            for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_file() {
                    self.tracker.mark_completed(entry.path());
                }
            }
        }
        self.tracker.mark_completed(path);
    }

    fn transition(&mut self, next: LoopState) {
        debug!(from = ?self.state, to = ?next, "loop state");
        self.state = next;
    }

    fn abort<T>(&mut self, err: OrganizeError) -> Result<T> {
        self.transition(LoopState::Aborted);
        error!(error = %err, "organization aborted");
        Err(err)
    }
}
