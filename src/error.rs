use thiserror::Error;

/// Errors raised while reading a screenshot name
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("invalid date '{raw}' in file name: {source}")]
    InvalidDate {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Anything that keeps a provider from producing a usable description.
/// The pipeline turns every variant into a skipped file.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("credential variable {0} is not set")]
    MissingCredential(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("unusable answer: {0}")]
    Degenerate(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Failures that will hit every later image the same way. Timeouts and
    /// bad answers are per-image.
    pub fn is_unavailable(&self) -> bool {
        match self {
            ProviderError::MissingCredential(_) | ProviderError::Unavailable(_) => true,
            ProviderError::Transport(e) => e.is_connect(),
            _ => false,
        }
    }
}

/// Why a file was left with its original name
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("not a legacy screenshot name")]
    NotEligible,

    #[error("{0}")]
    InvalidDate(String),

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("no description: {0}")]
    NoDescription(String),

    #[error("description '{0}' leaves nothing usable for a file name")]
    EmptyName(String),

    #[error("could not read file: {0}")]
    Unreadable(String),

    #[error("rename failed: {0}")]
    RenameFailed(String),
}
