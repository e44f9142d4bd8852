use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no turns found: the document needs a '# [N] Human' heading")]
    NoTurnsFound,

    #[error("no Human turn found in the document")]
    NoHumanTurn,

    #[error("Human turn {turn} is empty; write something before sending")]
    EmptyTurnContent { turn: u32 },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stream writer for turn {turn} is already closed")]
    WriterClosed { turn: u32 },
}

impl SessionError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
