use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeftError {
    // Participant errors
    #[error("participant '{identity}' failed: {message}")]
    Participant { identity: String, message: String },

    // Graph configuration errors
    #[error("unknown step: {0}")]
    UnknownStep(String),

    #[error("step '{step}' routed to unmapped label '{label}'")]
    UnmappedLabel { step: String, label: String },

    // Traversal guards
    #[error("step '{step}' exceeded revisit limit ({limit})")]
    RevisitLimit { step: String, limit: usize },

    #[error("bus delivery exceeded round limit ({0})")]
    RoundLimit(usize),

    // Config errors
    #[error("config error: {0}")]
    Config(String),

    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WeftError>;
