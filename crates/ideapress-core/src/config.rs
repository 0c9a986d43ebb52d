//! Run configuration, loaded from TOML.
//!
//! ```toml
//! user = "octocat"
//! repo_config = "dist/updatePlugins.xml"
//!
//! [[plugins]]
//! repo = "idea-foo"
//! artifact = "foo"
//!
//! [content]
//! src = "templates"
//! dist = "dist"
//! templates = ["index.html"]
//! ```

use crate::errors::{RepoError, Result};
use crate::release::DEFAULT_API_URL;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// GitHub owner of every plugin repo.
    pub user: String,
    #[serde(default = "default_api")]
    pub api: String,
    /// Where the registry XML is persisted.
    pub repo_config: PathBuf,
    /// Size ceiling for downloaded archives and their entries.
    #[serde(default)]
    pub max_archive_bytes: Option<u64>,
    /// Cap on concurrent plugin resolutions; unbounded when absent.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
    #[serde(default)]
    pub content: Content,
}

/// One configured plugin: a repo under `user` and the artifact name of its distribution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginEntry {
    pub repo: String,
    pub artifact: String,
    /// Pin a release tag instead of taking the highest version.
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Content {
    #[serde(default = "default_src")]
    pub src: PathBuf,
    #[serde(default = "default_dist")]
    pub dist: PathBuf,
    #[serde(default)]
    pub templates: Vec<String>,
}

impl Default for Content {
    fn default() -> Self {
        Self {
            src: default_src(),
            dist: default_dist(),
            templates: Vec::new(),
        }
    }
}

fn default_api() -> String {
    DEFAULT_API_URL.clone()
}

fn default_src() -> PathBuf {
    PathBuf::from("templates")
}

fn default_dist() -> PathBuf {
    PathBuf::from("dist")
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| RepoError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
            .map_err(|e| RepoError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(text: &str) -> std::result::Result<Self, String> {
        let config: Config = toml::from_str(text).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.user.trim().is_empty() {
            return Err("`user` must not be empty".into());
        }
        if self.max_concurrency == Some(0) {
            return Err("`max_concurrency` must be at least 1".into());
        }
        for (i, plugin) in self.plugins.iter().enumerate() {
            if plugin.repo.trim().is_empty() || plugin.artifact.trim().is_empty() {
                return Err(format!("plugins[{i}]: `repo` and `artifact` are required"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            user = "octo"
            repo_config = "dist/updatePlugins.xml"

            [[plugins]]
            repo = "idea-foo"
            artifact = "foo"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.api, "https://api.github.com");
        assert_eq!(cfg.plugins.len(), 1);
        assert_eq!(cfg.plugins[0].tag, None);
        assert_eq!(cfg.max_concurrency, None);
        assert_eq!(cfg.content.dist, PathBuf::from("dist"));
        assert!(cfg.content.templates.is_empty());
    }

    #[test]
    fn test_full_config() {
        let cfg = Config::from_toml_str(
            r#"
            user = "octo"
            api = "http://localhost:9999"
            repo_config = "out/repo.xml"
            max_archive_bytes = 1048576
            max_concurrency = 4

            [[plugins]]
            repo = "idea-foo"
            artifact = "foo"
            tag = "v1.2.0"

            [[plugins]]
            repo = "idea-bar"
            artifact = "bar"

            [content]
            src = "site"
            dist = "public"
            templates = ["index.html", "plugins.json"]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.plugins[0].tag.as_deref(), Some("v1.2.0"));
        assert_eq!(cfg.max_archive_bytes, Some(1 << 20));
        assert_eq!(cfg.content.templates, ["index.html", "plugins.json"]);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(Config::from_toml_str("user = \"\"\nrepo_config = \"x\"").is_err());
        assert!(Config::from_toml_str("user = \"u\"\nrepo_config = \"x\"\nmax_concurrency = 0").is_err());
        assert!(Config::from_toml_str(
            "user = \"u\"\nrepo_config = \"x\"\n[[plugins]]\nrepo = \"r\"\nartifact = \"\""
        )
        .is_err());
        // typo'd keys are caught rather than ignored
        assert!(Config::from_toml_str("user = \"u\"\nrepo_confg = \"x\"").is_err());
    }

    #[test]
    fn test_load_reports_path() {
        let err = Config::load(Path::new("/definitely/missing/config.toml"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("/definitely/missing/config.toml"));
    }
}
