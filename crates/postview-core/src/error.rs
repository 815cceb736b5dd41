use thiserror::Error;

/// Content that cannot be repaired even with an inert parse.
///
/// The pipeline never surfaces this to its caller; it falls back to rendering
/// the content as legacy plain text.
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum RepairError {
    #[error("content is {len} bytes, above the {limit} byte repair limit")]
    TooLarge { len: usize, limit: usize },

    #[error("markup nests deeper than {limit} elements")]
    TooDeep { limit: usize },
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("API base URL must start with http:// or https://, got {0:?}")]
    InvalidApiBase(String),

    #[error("image size variant must be non-empty lowercase ascii, got {0:?}")]
    InvalidImageSize(String),
}
