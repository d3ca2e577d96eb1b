use thiserror::Error;

/// Rejected engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("total request count must be greater than zero")]
    ZeroRequests,

    #[error("invalid target URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported URL scheme {0:?}, expected http or https")]
    UnsupportedScheme(String),

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Errors surfaced synchronously to whoever drives a [`DispatchEngine`].
///
/// Individual request failures never show up here; they are logged and
/// counted inside the batch.
///
/// [`DispatchEngine`]: crate::DispatchEngine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid engine state: {0}")]
    InvalidState(&'static str),

    #[error("run aborted before the batch finished")]
    Aborted,
}
