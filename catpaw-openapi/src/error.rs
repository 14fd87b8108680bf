// Error types for OpenAPI generation

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenApiError {
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, OpenApiError>;

impl From<OpenApiError> for catpaw_core::Error {
    fn from(error: OpenApiError) -> Self {
        catpaw_core::Error::Serialization(error.to_string())
    }
}
