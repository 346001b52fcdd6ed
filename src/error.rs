use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited by provider: {0}")]
    RateLimit(String),

    #[error("LLM error {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Could not materialize test file: {0}")]
    Materialization(String),

    #[error("Could not start test runner `{program}`: {source}")]
    RunnerInvocation {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Could not read application at {}: {reason}", path.display())]
    Introspection { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
