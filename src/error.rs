//! Error types for the marking and staging engine

/// Errors surfaced at the library seams
#[derive(Debug, thiserror::Error)]
pub enum UnstageError {
    /// A required collaborator (stage primitive, repository) is unavailable
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// Range with start after end
    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange { start: u64, end: u64 },

    /// Line selection that cannot be parsed
    #[error("Invalid line selection '{0}': expected N or N..M (1-based)")]
    InvalidSelection(String),

    /// Edit that cannot be expressed as a line range replacement
    #[error("Unsupported edit: {0}")]
    UnsupportedEdit(String),

    /// Reading a document's content failed
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The stage primitive rejected the content for a path
    #[error("Failed to stage {path}: {message}")]
    Stage { path: String, message: String },

    /// Git-related errors
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
}

impl UnstageError {
    pub fn missing_dependency<S: Into<String>>(msg: S) -> Self {
        UnstageError::MissingDependency(msg.into())
    }

    pub fn stage<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        UnstageError::Stage {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error means staging cannot run at all
    pub fn is_missing_dependency(&self) -> bool {
        matches!(self, UnstageError::MissingDependency(_))
    }
}
