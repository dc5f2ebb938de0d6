use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShareError {
    /// Wrong action or a MIME type outside the allow-list.
    #[error("Unsupported share event: {0}")]
    UnsupportedEvent(String),

    #[error("Share event carries no source reference")]
    MissingSource,

    #[error("Source unreadable: {0}")]
    SourceUnreadable(String),

    #[error("Copy failed: {0}")]
    CopyFailed(String),

    #[error("Notify failed: {0}")]
    NotifyFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl serde::Serialize for ShareError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShareError>;
