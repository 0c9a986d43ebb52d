use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("provider unavailable: {url}: {reason}")]
    ProviderUnavailable { url: String, reason: String },

    #[error("invalid release listing from {url}: {source}")]
    InvalidReleaseListing {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no releases with a semantic version tag in {owner}/{repo}")]
    NoReleases { owner: String, repo: String },

    #[error("release {tag} not found in {owner}/{repo}")]
    ReleaseNotFound {
        owner: String,
        repo: String,
        tag: String,
    },

    #[error("release tag {0} is not a semantic version")]
    InvalidVersionTag(String),

    #[error("asset {name} not found in release {tag}")]
    AssetNotFound { name: String, tag: String },

    #[error("corrupt archive: {0}")]
    CorruptArchive(#[source] zip::result::ZipError),

    #[error("archive entry not found: {0}")]
    EntryNotFound(String),

    #[error("archive data too large ({size} bytes, limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    #[error("malformed distribution: {0}")]
    MalformedDistribution(String),

    #[error("no plugin library matching {root} under {root}/lib/")]
    LibraryNotFound { root: String },

    #[error("descriptor not found in {library}: {reason}")]
    DescriptorNotFound { library: String, reason: String },

    #[error("descriptor is missing <{0}>")]
    IncompleteDescriptor(&'static str),

    #[error("{} plugin(s) failed to resolve: {}", .0.len(), failed_names(.0))]
    PartialResolutionFailure(Vec<PluginFailure>),

    #[error("could not persist {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid registry {}: {reason}", .path.display())]
    InvalidRegistry { path: PathBuf, reason: String },

    #[error("registry serialization failed: {0}")]
    Serialize(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One configured plugin that could not be resolved, with its own error.
#[derive(Debug)]
pub struct PluginFailure {
    pub repo: String,
    pub artifact: String,
    pub error: RepoError,
}

impl PluginFailure {
    /// `repo/artifact`, the identifier used in failure summaries.
    pub fn plugin(&self) -> String {
        format!("{}/{}", self.repo, self.artifact)
    }
}

impl fmt::Display for PluginFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.plugin(), self.error)
    }
}

fn failed_names(failures: &[PluginFailure]) -> String {
    failures
        .iter()
        .map(PluginFailure::plugin)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, RepoError>;
