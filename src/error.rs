//! Error types for the trend and news flows

use chrono::NaiveDate;
use thiserror::Error;

/// Message shown whenever a news search produces nothing to summarize.
pub const NO_ARTICLES_MESSAGE: &str = "No articles found. Try different keywords.";

#[derive(Debug, Error)]
pub enum TrendError {
    #[error("Date {date} is outside the available range {min} to {max}")]
    DateOutOfRange {
        date: NaiveDate,
        min: NaiveDate,
        max: NaiveDate,
    },

    #[error("Warehouse request failed: {0}")]
    RequestFailed(String),

    /// Non-success HTTP status from the warehouse
    #[error("Warehouse error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Warehouse query did not complete")]
    Incomplete,

    #[error("Failed to parse warehouse response: {0}")]
    ParseError(String),

    #[error("No search trend data for {0}")]
    NoData(NaiveDate),

    #[error("Warehouse is not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("News feed request failed: {0}")]
    RequestFailed(String),

    #[error("News feed error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse news feed response: {0}")]
    ParseError(String),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to build model request: {0}")]
    BuildRequest(String),

    #[error("Model call failed: {0}")]
    ModelCall(String),

    #[error("Model call timed out after {0} seconds")]
    Timeout(u64),

    #[error("No valid content in model response")]
    EmptyResponse,

    #[error("Failed to parse model response: {0}")]
    ParseError(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Provide at least one keyword")]
    MissingKeyword,

    #[error("At most 3 keywords are supported, got {0}")]
    TooManyKeywords(usize),

    #[error("Maximum number of news articles must be between 1 and 20, got {0}")]
    MaxRecordsOutOfRange(u32),

    /// The feed answered but nothing matched.
    #[error("No articles found. Try different keywords.")]
    NoArticles,

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

impl PipelineError {
    /// What the user sees. Empty results and feed failures share one message;
    /// the cause of a feed failure only goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::NoArticles | PipelineError::Retrieval(_) => {
                NO_ARTICLES_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingKeyword
                | PipelineError::TooManyKeywords(_)
                | PipelineError::MaxRecordsOutOfRange(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_failed_retrievals_share_a_message() {
        let empty = PipelineError::NoArticles;
        let failed = PipelineError::from(RetrievalError::RequestFailed("connection reset".into()));

        assert_eq!(empty.to_string(), NO_ARTICLES_MESSAGE);
        assert_eq!(empty.user_message(), NO_ARTICLES_MESSAGE);
        assert_eq!(failed.user_message(), NO_ARTICLES_MESSAGE);
        assert!(failed.to_string().contains("connection reset"));
    }

    #[test]
    fn invalid_input_keeps_its_own_message() {
        let err = PipelineError::MissingKeyword;
        assert!(err.is_invalid_input());
        assert_eq!(err.user_message(), "Provide at least one keyword");
    }
}
