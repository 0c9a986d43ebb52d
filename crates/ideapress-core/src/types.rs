use crate::errors::{RepoError, Result};
use semver::Version;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Attribute name -> value, e.g. `since-build` / `until-build`.
pub type Compatibility = BTreeMap<String, String>;

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

/// A resolved release: its tag, the version parsed from it, and its assets by name.
#[derive(Debug, Clone)]
pub struct Release {
    pub tag: String,
    pub version: Version,
    pub assets: BTreeMap<String, ReleaseAsset>,
}

impl Release {
    pub fn asset(&self, name: &str) -> Result<&ReleaseAsset> {
        self.assets.get(name).ok_or_else(|| RepoError::AssetNotFound {
            name: name.to_string(),
            tag: self.tag.clone(),
        })
    }

    /// Asset name of a plugin distribution in this release: `{artifact}-{version}.zip`.
    pub fn distribution_name(&self, artifact: &str) -> String {
        format!("{artifact}-{}.zip", self.version)
    }
}

/// Metadata for one plugin, keyed by `id` across the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRecord {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub compatibility: Compatibility,
    /// Download URL of the distribution asset the record was extracted from.
    pub source_url: String,
}
