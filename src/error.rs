/// Convenience result type for scene processing.
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors raised by the scene pipeline.
///
/// Only *structural* problems surface here: a scene that cannot be trusted
/// as input (duplicate identifiers, non-finite geometry, unparseable
/// documents). Boundary violations are never errors; they come back as
/// [`crate::enforce::Diagnostic`] values in a successful result.
#[derive(thiserror::Error, Debug)]
pub enum SceneError {
    /// The scene document is well-formed but structurally invalid.
    #[error("malformed scene: {0}")]
    Structure(String),

    /// The scene document could not be deserialized.
    #[error("failed to parse scene document: {0}")]
    Parse(String),

    /// Wrapped IO error from reading or writing scene material.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SceneError {
    /// Build a [`SceneError::Structure`] value.
    pub fn structure(msg: impl Into<String>) -> Self {
        Self::Structure(msg.into())
    }

    /// Build a [`SceneError::Parse`] value.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
