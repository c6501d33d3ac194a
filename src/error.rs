use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("server returned HTTP {0}")]
    Status(u16),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("failed to decode image: {0}")]
    Decode(String),
}

impl FetchError {
    /// Timeouts and connection failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Timeout | FetchError::Connect(_))
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to access catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed catalog: {0}")]
    Csv(#[from] csv::Error),

    #[error("catalog is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Reasons a recommendation query cannot be answered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoRecommendation {
    #[error("could not determine a skin tone from the submitted photo")]
    NoUserTone,

    #[error("no products found for gender '{gender}'")]
    NoGenderMatch { gender: String },

    #[error("no products for gender '{gender}' have usable skin tone data")]
    NoUsableColor { gender: String },

    #[error("at least one recommendation must be requested")]
    NothingRequested,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not an (r, g, b) color: {0:?}")]
pub struct ParseToneError(pub String);
