use anyhow::{Context, Result};
use mediasort_core::agent::LlmAgent;
use mediasort_core::config::{AppConfig, Credentials};
use mediasort_core::manifest::{self, VerifyReport};
use mediasort_core::organizer::{LoopOptions, OrganizationLoop, RunSummary};
use mediasort_core::MediaKind;
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::tmdb::{TmdbClient, TmdbConfig};
use providers::MetadataLookup;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub fn build_lookup(cfg: &AppConfig, creds: &Credentials) -> Arc<dyn MetadataLookup> {
    Arc::new(TmdbClient::new(TmdbConfig {
        api_key: creds.metadata_api_key.clone(),
        base_url: cfg.metadata.base_url.clone(),
        language: cfg.metadata.language.clone(),
    }))
}

pub fn build_agent(cfg: &AppConfig, creds: &Credentials) -> Result<LlmAgent> {
    let chat = OpenAiProvider::new(OpenAiConfig {
        api_key: creds.agent_api_key.clone(),
        base_url: cfg.agent.base_url.clone(),
        chat_model: cfg.agent.model.clone(),
        temperature: cfg.agent.temperature,
        request_timeout: cfg.agent.timeout_secs.map(Duration::from_secs),
    })
    .context("chat client")?;
    Ok(LlmAgent::new(Arc::new(chat), cfg.agent.max_steps))
}

/// Validates the target, wires the providers and runs the loop to completion.
pub async fn organize(
    cfg: &AppConfig,
    creds: &Credentials,
    dir: &Path,
    kind: MediaKind,
) -> Result<RunSummary> {
    let options = LoopOptions::from_config(cfg)?;
    let agent = build_agent(cfg, creds)?;
    let lookup = build_lookup(cfg, creds);
    let mut organizer = OrganizationLoop::new(dir, kind, agent, lookup, options)?;
    let summary = organizer
        .run()
        .await
        .with_context(|| format!("organizing {} stopped", organizer.target().display()))?;
    info!(
        iterations = summary.iterations,
        moved = summary.moved,
        marked = summary.marked,
        folders = summary.folders_finished,
        "organization complete"
    );
    Ok(summary)
}

pub fn hash_folder(folder: &Path) -> Result<PathBuf> {
    let path = manifest::write_manifest(folder)
        .with_context(|| format!("hashing {}", folder.display()))?;
    Ok(path)
}

pub fn verify_folder(folder: &Path) -> Result<VerifyReport> {
    let report =
        manifest::verify(folder).with_context(|| format!("verifying {}", folder.display()))?;
    Ok(report)
}
