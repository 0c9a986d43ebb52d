//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use ideapress_core::{Config, Fetch, RepoError, Result};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Mutex;
use zip::write::FileOptions;
use zip::ZipWriter;

pub fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, FileOptions::default()).unwrap();
        } else {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

pub fn plugin_xml(id: &str, version: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<idea-plugin>
  <id>{id}</id>
  <name>{id} name</name>
  <version>{version}</version>
  <description><![CDATA[<p>{id} description</p>]]></description>
  <idea-version since-build="221" until-build="241.*"/>
</idea-plugin>
"#
    )
}

/// `<root>/lib/<root>.jar` holding the descriptor, next to a bundled dependency.
pub fn distribution(root: &str, id: &str, version: &str) -> Vec<u8> {
    let jar = zip_of(&[("META-INF/plugin.xml", plugin_xml(id, version).as_bytes())]);
    let dep = zip_of(&[("kotlin/Unit.class", b"\xca\xfe\xba\xbe")]);
    let lib = format!("{root}/lib/{root}.jar");
    let dep_path = format!("{root}/lib/kotlin-stdlib-1.9.0.jar");
    zip_of(&[(dep_path.as_str(), dep.as_slice()), (lib.as_str(), jar.as_slice())])
}

/// Same layout, but no library named after the root directory.
pub fn distribution_without_library(root: &str) -> Vec<u8> {
    let dep = zip_of(&[("kotlin/Unit.class", b"\xca\xfe\xba\xbe")]);
    let dep_path = format!("{root}/lib/kotlin-stdlib-1.9.0.jar");
    zip_of(&[(dep_path.as_str(), dep.as_slice())])
}

pub fn release_json(tag: &str, assets: &[(&str, &str)]) -> serde_json::Value {
    serde_json::json!({
        "tag_name": tag,
        "name": tag,
        "prerelease": false,
        "assets": assets
            .iter()
            .map(|(name, url)| serde_json::json!({
                "name": name,
                "browser_download_url": url,
                "content_type": "application/zip",
            }))
            .collect::<Vec<_>>(),
    })
}

/// In-memory `Fetch`: URL -> body, recording every request.
#[derive(Default)]
pub struct StaticFetch {
    bodies: HashMap<String, Vec<u8>>,
    pub requests: Mutex<Vec<String>>,
}

impl StaticFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    pub fn with_json(self, url: &str, value: serde_json::Value) -> Self {
        let body = serde_json::to_vec(&value).unwrap();
        self.with(url, body)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for StaticFetch {
    async fn fetch(&self, url: &str, _accept: Option<&str>) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| RepoError::ProviderUnavailable {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".into(),
            })
    }
}

pub fn config(api: &str, repo_config: &Path, plugins: &[(&str, &str)]) -> Config {
    let mut toml = format!(
        "user = \"octo\"\napi = \"{api}\"\nrepo_config = \"{}\"\n",
        repo_config.display()
    );
    for (repo, artifact) in plugins {
        toml.push_str(&format!(
            "\n[[plugins]]\nrepo = \"{repo}\"\nartifact = \"{artifact}\"\n"
        ));
    }
    Config::from_toml_str(&toml).unwrap()
}

pub fn failures_of(err: RepoError) -> Vec<ideapress_core::PluginFailure> {
    match err {
        RepoError::PartialResolutionFailure(failures) => failures,
        other => panic!("expected PartialResolutionFailure, got {other}"),
    }
}
