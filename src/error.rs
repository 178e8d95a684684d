use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("`{command}` failed in {} ({status})\n{output}", .directory.display())]
    Resolver {
        command: String,
        directory: PathBuf,
        status: String,
        output: String,
    },

    #[error("Unexpected response from package feed for {package}:\n{response}")]
    FeedFormat { package: String, response: String },

    #[error("Could not resolve the stable channel version of {package}: {reason}")]
    ChannelLookup { package: String, reason: String },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Invalid configuration: {0}\n\n\
             Hint: relock reads relock.toml from the repository root.\n\
             Set RELOCK_CONFIG to point at a different file.")]
    InvalidConfig(String),

    #[error("{step} failed: {source}")]
    Step {
        step: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{primary}\n(restoring the lock configuration also failed: {restore})")]
    RestoreFailed {
        primary: Box<Error>,
        restore: Box<Error>,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The underlying cause, looking through step labels and attached
    /// restoration failures.
    pub fn root(&self) -> &Error {
        match self {
            Error::Step { source, .. } => source.root(),
            Error::RestoreFailed { primary, .. } => primary.root(),
            other => other,
        }
    }

    pub(crate) fn in_step(self, step: impl Into<String>) -> Self {
        Error::Step {
            step: step.into(),
            source: Box::new(self),
        }
    }
}
