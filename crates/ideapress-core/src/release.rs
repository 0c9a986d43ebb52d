//! GitHub release resolution.

use crate::errors::{RepoError, Result};
use crate::net::{Fetch, GITHUB_JSON};
use crate::types::{Release, ReleaseAsset};
use once_cell::sync::Lazy;
use semver::Version;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Public GitHub REST API; config can point elsewhere (GHE, test servers).
pub static DEFAULT_API_URL: Lazy<String> = Lazy::new(|| "https://api.github.com".to_string());

/// One entry of the release listing. Other fields in the payload are ignored.
#[derive(Debug, Deserialize)]
struct ReleasePayload {
    tag_name: String,
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

/// Parse a release tag as a semantic version, ignoring leading `v`s.
pub fn tag_version(tag: &str) -> Option<Version> {
    Version::parse(tag.trim_start_matches('v')).ok()
}

pub struct ReleaseResolver<'a> {
    fetch: &'a dyn Fetch,
    api: &'a str,
}

impl<'a> ReleaseResolver<'a> {
    pub fn new(fetch: &'a dyn Fetch, api: &'a str) -> Self {
        Self { fetch, api }
    }

    pub fn releases_url(&self, owner: &str, repo: &str) -> String {
        format!(
            "{}/repos/{owner}/{repo}/releases",
            self.api.trim_end_matches('/')
        )
    }

    /// Resolve `tag`, or the highest semantic version when `tag` is `None`.
    pub async fn resolve(&self, owner: &str, repo: &str, tag: Option<&str>) -> Result<Release> {
        let url = self.releases_url(owner, repo);
        let body = self.fetch.fetch(&url, Some(GITHUB_JSON)).await?;
        let listing: Vec<ReleasePayload> = serde_json::from_slice(&body)
            .map_err(|source| RepoError::InvalidReleaseListing {
                url: url.clone(),
                source,
            })?;
        debug!(owner, repo, releases = listing.len(), "fetched release listing");

        let release = select(listing, owner, repo, tag)?;
        info!(owner, repo, tag = %release.tag, version = %release.version, "selected release");
        Ok(release)
    }
}

fn select(
    listing: Vec<ReleasePayload>,
    owner: &str,
    repo: &str,
    tag: Option<&str>,
) -> Result<Release> {
    let payload = match tag {
        Some(tag) => {
            let mut by_tag: HashMap<String, ReleasePayload> = listing
                .into_iter()
                .map(|r| (r.tag_name.clone(), r))
                .collect();
            by_tag.remove(tag).ok_or_else(|| RepoError::ReleaseNotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
                tag: tag.to_string(),
            })?
        }
        None => {
            let mut best: Option<(Version, ReleasePayload)> = None;
            for payload in listing {
                let Some(version) = tag_version(&payload.tag_name) else {
                    debug!(tag = %payload.tag_name, "skipping non-semver tag");
                    continue;
                };
                // strictly greater: ties keep the earlier listing entry
                if best.as_ref().map_or(true, |(v, _)| version > *v) {
                    best = Some((version, payload));
                }
            }
            best.map(|(_, payload)| payload)
                .ok_or_else(|| RepoError::NoReleases {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })?
        }
    };

    let version = tag_version(&payload.tag_name)
        .ok_or_else(|| RepoError::InvalidVersionTag(payload.tag_name.clone()))?;
    let assets: BTreeMap<String, ReleaseAsset> = payload
        .assets
        .into_iter()
        .map(|a| (a.name.clone(), a))
        .collect();

    Ok(Release {
        tag: payload.tag_name,
        version,
        assets,
    })
}
