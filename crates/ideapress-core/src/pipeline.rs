//! Registry update: resolve every configured plugin concurrently, then merge
//! and persist once.

use crate::archive;
use crate::config::{Config, PluginEntry};
use crate::errors::{PluginFailure, RepoError, Result};
use crate::net::Fetch;
use crate::registry::{Registry, Upsert};
use crate::release::ReleaseResolver;
use crate::types::PluginRecord;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

/// A configured plugin together with the release and record it resolved to.
#[derive(Debug, Clone)]
pub struct ResolvedPlugin {
    pub entry: PluginEntry,
    pub tag: String,
    pub record: PluginRecord,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    /// In configured order.
    pub plugins: Vec<ResolvedPlugin>,
    /// Upsert outcome per plugin id, in configured order.
    pub changes: Vec<(String, Upsert)>,
}

impl RunReport {
    pub fn updated_ids(&self) -> impl Iterator<Item = &str> {
        self.changes
            .iter()
            .filter(|(_, change)| *change != Upsert::Unchanged)
            .map(|(id, _)| id.as_str())
    }
}

/// Resolve one plugin: release -> distribution asset -> descriptor.
pub async fn resolve_plugin(
    config: &Config,
    fetch: &dyn Fetch,
    entry: &PluginEntry,
) -> Result<ResolvedPlugin> {
    let resolver = ReleaseResolver::new(fetch, &config.api);
    let release = resolver
        .resolve(&config.user, &entry.repo, entry.tag.as_deref())
        .await?;

    let asset = release.asset(&release.distribution_name(&entry.artifact))?;
    info!(repo = %entry.repo, asset = %asset.name, "downloading distribution");
    let bytes = fetch.fetch(&asset.download_url, None).await?;

    let record = archive::extract(bytes, &asset.download_url, config.max_archive_bytes)?;
    info!(repo = %entry.repo, id = %record.id, version = %record.version, "extracted descriptor");

    Ok(ResolvedPlugin {
        entry: entry.clone(),
        tag: release.tag,
        record,
    })
}

/// Update the registry at `config.repo_config`.
///
/// Every plugin is resolved before anything is applied. If any plugin fails,
/// nothing is written and the error lists all failures.
pub async fn run(config: &Config, fetch: &dyn Fetch) -> Result<RunReport> {
    let mut registry = Registry::load(&config.repo_config)?;
    info!(plugins = config.plugins.len(), existing = registry.len(), "updating registry");

    let tasks = config
        .plugins
        .iter()
        .map(|entry| resolve_plugin(config, fetch, entry));
    // Both preserve input order in their output.
    let outcomes = match config.max_concurrency {
        Some(limit) => stream::iter(tasks).buffered(limit).collect::<Vec<_>>().await,
        None => join_all(tasks).await,
    };

    let mut resolved = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for (entry, outcome) in config.plugins.iter().zip(outcomes) {
        match outcome {
            Ok(plugin) => resolved.push(plugin),
            Err(error) => {
                warn!(repo = %entry.repo, artifact = %entry.artifact, %error, "plugin failed");
                failures.push(PluginFailure {
                    repo: entry.repo.clone(),
                    artifact: entry.artifact.clone(),
                    error,
                });
            }
        }
    }
    if !failures.is_empty() {
        return Err(RepoError::PartialResolutionFailure(failures));
    }

    let changes: Vec<(String, Upsert)> = resolved
        .iter()
        .map(|plugin| {
            let change = registry.upsert(plugin.record.clone());
            info!(id = %plugin.record.id, ?change, "upsert");
            (plugin.record.id.clone(), change)
        })
        .collect();

    registry.persist(&config.repo_config)?;

    Ok(RunReport {
        plugins: resolved,
        changes,
    })
}
