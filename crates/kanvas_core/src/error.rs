use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("failed to load encoder `{model}`: {reason}")]
    EncoderLoad { model: String, reason: String },

    #[error("encoding failed: {0}")]
    Encode(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("faq index {index} not found (knowledge base has {len} entries)")]
    NotFound { index: usize, len: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ChatError {
    pub fn encoder_load(model: impl Into<String>, reason: impl ToString) -> Self {
        Self::EncoderLoad {
            model: model.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
