//! Error types shared across the engine, middlewares and collaborators.
//!
//! Two classifications exist side by side. [`CrawlError`] is the crate-wide
//! error enum carried by `Result` returns and by [`MiddlewareAction::Fail`].
//! [`ResponseError`] is the single error slot on a [`Response`]: the
//! downloader boundary reports both transport failures and intentional
//! stops ("file written, go no further") through it, tagged by kind.
//!
//! [`MiddlewareAction::Fail`]: crate::middleware::MiddlewareAction::Fail
//! [`Response`]: crate::response::Response

use std::fmt;

/// Crate-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// The engine was assembled with an invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A URL could not be parsed.
    #[error("invalid url `{url}`: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// HTTP transport failure reported by the downloader.
    #[error("http transport: {0}")]
    Http(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The sub-process browser bridge failed or returned a bad reply.
    #[error("browser bridge: {0}")]
    Bridge(String),

    #[cfg(feature = "redis-store")]
    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for CrawlError {
    fn from(err: reqwest::Error) -> Self {
        CrawlError::Http(err.to_string())
    }
}

/// Error stored on a response by the downloader.
///
/// The retry middleware keys off the kind: `None` proceeds, [`Drop`] is
/// propagated as an intentional stop and never retried, [`Fail`] is the
/// only automatic-recovery path.
///
/// [`Drop`]: ResponseError::Drop
/// [`Fail`]: ResponseError::Fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// Intentional stop: the work is done (a file was written) or filtered.
    Drop(String),
    /// Unexpected failure: timeout, connection refused, bad reply.
    Fail(String),
}

impl ResponseError {
    pub fn is_drop(&self) -> bool {
        matches!(self, ResponseError::Drop(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ResponseError::Drop(msg) | ResponseError::Fail(msg) => msg,
        }
    }
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
