//! ideapress-core
//!
//! Builds a custom IDE plugin repository from GitHub releases.
//! - Resolves each configured plugin's release (pinned tag or highest semver).
//! - Downloads the distribution zip and reads `META-INF/plugin.xml` from the
//!   plugin's own jar inside it.
//! - Upserts the results into `updatePlugins.xml` and replaces it atomically.
//! - Renders static pages from the same data.

pub mod archive;
pub mod config;
pub mod errors;
pub mod net;
pub mod persist;
pub mod pipeline;
pub mod registry;
pub mod release;
pub mod render;
pub mod types;

pub use archive::{extract, Archive};
pub use config::{Config, PluginEntry};
pub use errors::{PluginFailure, RepoError, Result};
pub use net::{Fetch, HttpFetcher};
pub use persist::write_atomic;
pub use pipeline::{resolve_plugin, run, ResolvedPlugin, RunReport};
pub use registry::{Registry, Upsert};
pub use release::ReleaseResolver;
pub use render::{render_pages, PageContext, Renderer};
pub use types::*;
