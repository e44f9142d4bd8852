use thiserror::Error;

/// Result type for expansion operations
pub type Result<T> = std::result::Result<T, ExpandError>;

/// Failures of the directory walker.
#[derive(Error, Debug)]
pub enum WalkError {
    #[error("directory '{path}' not found")]
    DirectoryNotFound { path: String },

    #[error("'{path}' is not a directory")]
    NotADirectory { path: String },

    /// Raised only at the root of a walk; deeper empty levels contribute nothing.
    #[error("no matching files in directory '{path}'")]
    NoMatchingFiles { path: String },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A reference in a human turn could not be resolved.
///
/// Every variant names the literal reference path and the owning turn so the
/// message points the user at the exact token to fix.
#[derive(Error, Debug)]
pub enum ExpandError {
    #[error("cannot find '{path}' referenced in turn {turn}")]
    NotFound { path: String, turn: u32 },

    #[error("failed to read '{path}' referenced in turn {turn}: {source}")]
    ReadFailure {
        path: String,
        turn: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to expand directory '{path}' referenced in turn {turn}: {source}")]
    Directory {
        path: String,
        turn: u32,
        #[source]
        source: WalkError,
    },
}

impl ExpandError {
    /// Literal path of the reference that failed.
    pub fn path(&self) -> &str {
        match self {
            Self::NotFound { path, .. }
            | Self::ReadFailure { path, .. }
            | Self::Directory { path, .. } => path,
        }
    }

    pub fn turn(&self) -> u32 {
        match self {
            Self::NotFound { turn, .. }
            | Self::ReadFailure { turn, .. }
            | Self::Directory { turn, .. } => *turn,
        }
    }
}
