use crate::library::LibraryError;
use thiserror::Error;

pub type ForgeResult<T> = Result<T, ForgeError>;

#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("All {attempts} API keys failed. Last error: {last_error}")]
    AllCredentialsExhausted { attempts: usize, last_error: String },
    #[error("Model request failed: {0}")]
    Fatal(String),
    /// `raw` is kept for logs only and is not part of the message.
    #[error("The model returned an invalid JSON format ({context}). Please try again.")]
    MalformedResponse { context: &'static str, raw: String },
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error(transparent)]
    Library(#[from] LibraryError),
}

impl ForgeError {
    pub fn validation(message: impl Into<String>) -> Self {
        ForgeError::Validation(message.into())
    }

    pub fn malformed(context: &'static str, raw: impl Into<String>) -> Self {
        ForgeError::MalformedResponse {
            context,
            raw: raw.into(),
        }
    }
}
