use thiserror::Error;

/// Failure to retrieve or parse one page.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no document at {0}")]
    NotFound(String),
}

/// Failure of one catalog build step.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// An element the page layout is expected to carry was not found.
    #[error("{what} not found on {url}")]
    MissingElement { what: String, url: String },
}

impl ExtractError {
    pub(crate) fn missing(what: impl Into<String>, url: &reqwest::Url) -> Self {
        ExtractError::MissingElement {
            what: what.into(),
            url: url.to_string(),
        }
    }
}
