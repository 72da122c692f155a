/// Crate-wide result alias.
pub type KineticResult<T> = Result<T, KineticError>;

/// Errors surfaced by fallible internals (decoding, raster work, validation).
///
/// Playback and orchestration never return these for ordinary control flow; absent resources are
/// reported as `None` plus a log line instead.
#[derive(thiserror::Error, Debug)]
pub enum KineticError {
    /// A composition or argument violated a static invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// A bitmap, font or file could not be produced.
    #[error("resource error: {0}")]
    Resource(String),

    /// A canvas backend failed while drawing.
    #[error("render error: {0}")]
    Render(String),

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Any other error, with its source chain preserved.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KineticError {
    /// Build a [`KineticError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`KineticError::Resource`].
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Build a [`KineticError::Render`].
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`KineticError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for KineticError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
