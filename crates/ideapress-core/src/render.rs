//! Static page rendering from resolved plugins.
//!
//! Templates are Handlebars files under `content.src`; each renders to the
//! same name under `content.dist`. Output is not HTML-escaped, since plugin
//! descriptions are already HTML.

use crate::config::Config;
use crate::errors::{RepoError, Result};
use crate::persist::write_atomic;
use crate::pipeline::ResolvedPlugin;
use crate::types::Compatibility;
use handlebars::Handlebars;
use reqwest::Url;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct PageContext {
    pub user: String,
    pub plugins: Vec<PluginView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PluginView {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub compatibility: Compatibility,
    pub url: String,
    pub repo: String,
    pub artifact: String,
    pub tag: String,
    pub repo_url: Option<String>,
}

impl PageContext {
    pub fn new(user: &str, plugins: &[ResolvedPlugin]) -> Self {
        let plugins = plugins
            .iter()
            .map(|p| PluginView {
                id: p.record.id.clone(),
                name: p.record.name.clone(),
                version: p.record.version.clone(),
                description: p.record.description.clone(),
                compatibility: p.record.compatibility.clone(),
                url: p.record.source_url.clone(),
                repo: p.entry.repo.clone(),
                artifact: p.entry.artifact.clone(),
                tag: p.tag.clone(),
                repo_url: repo_url(&p.record.source_url),
            })
            .collect();
        Self {
            user: user.to_string(),
            plugins,
        }
    }
}

/// Project page for a release download URL: the path up to its `releases` segment.
///
/// `https://github.com/u/r/releases/download/v1/x.zip` -> `https://github.com/u/r`
pub fn repo_url(download_url: &str) -> Option<String> {
    let mut url = Url::parse(download_url).ok()?;
    let segments: Vec<String> = url.path_segments()?.map(str::to_string).collect();
    let cut = segments.iter().position(|s| s == "releases")?;
    url.set_path(&format!("/{}", segments[..cut].join("/")));
    url.set_query(None);
    url.set_fragment(None);
    Some(url.as_str().trim_end_matches('/').to_string())
}

pub struct Renderer {
    handlebars: Handlebars<'static>,
    src: PathBuf,
}

impl Renderer {
    pub fn new(src: impl Into<PathBuf>) -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        Self {
            handlebars,
            src: src.into(),
        }
    }

    /// Render template `name` (a file under the source directory).
    pub fn render(&mut self, name: &str, context: &PageContext) -> Result<Vec<u8>> {
        if !self.handlebars.has_template(name) {
            let path = self.src.join(name);
            let template = std::fs::read_to_string(&path)
                .map_err(|e| RepoError::Render(format!("{}: {e}", path.display())))?;
            self.handlebars
                .register_template_string(name, template)
                .map_err(|e| RepoError::Render(format!("{name}: {e}")))?;
        }
        let out = self
            .handlebars
            .render(name, context)
            .map_err(|e| RepoError::Render(format!("{name}: {e}")))?;
        Ok(out.into_bytes())
    }
}

/// Render every configured template into the dist directory; returns the written paths.
pub fn render_pages(config: &Config, plugins: &[ResolvedPlugin]) -> Result<Vec<PathBuf>> {
    let context = PageContext::new(&config.user, plugins);
    let mut renderer = Renderer::new(&config.content.src);
    let mut written = Vec::with_capacity(config.content.templates.len());

    for name in &config.content.templates {
        let page = renderer.render(name, &context)?;
        let path = config.content.dist.join(name);
        write_page(&path, &page)?;
        info!(path = %path.display(), "rendered page");
        written.push(path);
    }
    Ok(written)
}

fn write_page(path: &Path, page: &[u8]) -> Result<()> {
    write_atomic(path, |file| file.write_all(page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PluginEntry;
    use crate::types::PluginRecord;

    fn resolved() -> ResolvedPlugin {
        ResolvedPlugin {
            entry: PluginEntry {
                repo: "idea-foo".into(),
                artifact: "foo".into(),
                tag: None,
            },
            tag: "v1.0.0".into(),
            record: PluginRecord {
                id: "com.example.foo".into(),
                name: "Foo".into(),
                version: "1.0.0".into(),
                description: "<p>Foo</p>".into(),
                compatibility: Compatibility::from([("since-build".into(), "221".into())]),
                source_url: "https://github.com/octo/idea-foo/releases/download/v1.0.0/foo-1.0.0.zip"
                    .into(),
            },
        }
    }

    #[test]
    fn test_repo_url() {
        assert_eq!(
            repo_url("https://github.com/octo/idea-foo/releases/download/v1.0.0/foo-1.0.0.zip")
                .as_deref(),
            Some("https://github.com/octo/idea-foo")
        );
        assert_eq!(repo_url("https://cdn.example.com/foo.zip"), None);
        assert_eq!(repo_url("not a url"), None);
    }

    #[test]
    fn test_render_unescaped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("index.html"),
            "<h1>{{user}}</h1>{{#each plugins}}<a href=\"{{repo_url}}\">{{name}}</a> \
             {{version}} ({{compatibility.[since-build]}}){{{description}}}{{description}}{{/each}}",
        )
        .unwrap();

        let context = PageContext::new("octo", &[resolved()]);
        let out = Renderer::new(dir.path()).render("index.html", &context).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<h1>octo</h1><a href=\"https://github.com/octo/idea-foo\">Foo</a> 1.0.0 (221)<p>Foo</p><p>Foo</p>"
        );
    }

    #[test]
    fn test_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let context = PageContext::new("octo", &[]);
        let err = Renderer::new(dir.path())
            .render("nope.html", &context)
            .err()
            .unwrap();
        assert!(matches!(err, RepoError::Render(_)));
    }
}
