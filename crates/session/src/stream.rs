use crate::error::{Result, SessionError};
use crate::parser::{AI_FENCE_CLOSE, AI_FENCE_OPEN};
use ask_protocol::{turn_heading, Role};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Lifecycle of a [`StreamWriter`].
///
/// `Idle → HeaderPending → Streaming → {Interrupted | Completed} → Closed`.
/// A writer closed from `Idle` never touched the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Opened, nothing written yet.
    Idle,
    /// First chunk arrived; the AI heading is being written.
    HeaderPending,
    /// Heading on disk, chunks are being appended.
    Streaming,
    /// Cancelled; further chunks are ignored.
    Interrupted,
    /// The model finished; only closing remains.
    Completed,
    Closed,
}

/// Snapshot of what the writer has put on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamState {
    pub header_written: bool,
    pub content_written: bool,
    pub interrupted: bool,
}

/// How the model stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed { tokens: usize },
    Interrupted { tokens: usize },
}

/// Appends one AI turn to a session document as chunks arrive.
///
/// The heading and fence are written lazily on the first non-empty chunk.
/// Every write is flushed before the next chunk is accepted, so a crash leaves
/// the document truncated but well formed up to the last chunk.
pub struct StreamWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    turn_number: u32,
    phase: StreamPhase,
    header_written: bool,
    content_written: bool,
}

impl StreamWriter {
    /// Open `path` for appending the AI turn `turn_number`.
    pub fn open(path: &Path, turn_number: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|err| SessionError::io(path, err))?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            turn_number,
            phase: StreamPhase::Idle,
            header_written: false,
            content_written: false,
        })
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn state(&self) -> StreamState {
        StreamState {
            header_written: self.header_written,
            content_written: self.content_written,
            interrupted: self.phase == StreamPhase::Interrupted,
        }
    }

    /// Append one chunk. Empty chunks and chunks after interruption are ignored.
    pub fn write_chunk(&mut self, chunk: &str) -> Result<()> {
        match self.phase {
            StreamPhase::Closed => {
                return Err(SessionError::WriterClosed {
                    turn: self.turn_number,
                })
            }
            StreamPhase::Interrupted | StreamPhase::Completed => return Ok(()),
            _ => {}
        }
        if chunk.is_empty() {
            return Ok(());
        }

        if self.phase == StreamPhase::Idle {
            self.phase = StreamPhase::HeaderPending;
            let header = format!(
                "\n\n{}\n\n{AI_FENCE_OPEN}\n",
                turn_heading(self.turn_number, Role::Ai)
            );
            self.write_flushed(header.as_bytes())?;
            self.header_written = true;
            self.phase = StreamPhase::Streaming;
        }

        self.write_flushed(chunk.as_bytes())?;
        self.content_written = true;
        Ok(())
    }

    /// Stop accepting chunks; content written so far is kept.
    pub fn interrupt(&mut self) {
        if matches!(
            self.phase,
            StreamPhase::Idle | StreamPhase::HeaderPending | StreamPhase::Streaming
        ) {
            log::debug!("Stream for turn {} interrupted", self.turn_number);
            self.phase = StreamPhase::Interrupted;
        }
    }

    /// Finish the turn: interruption marker, closing fence, next Human heading.
    ///
    /// Nothing is written when no chunk ever reached the document. Returns the
    /// state as it was before closing. Closing twice is a no-op.
    pub fn close(&mut self, outcome: StreamOutcome) -> Result<StreamState> {
        if self.phase == StreamPhase::Closed {
            return Ok(self.state());
        }
        let interrupted = match outcome {
            StreamOutcome::Interrupted { .. } => {
                self.interrupt();
                true
            }
            StreamOutcome::Completed { .. } => {
                if self.phase == StreamPhase::Streaming {
                    self.phase = StreamPhase::Completed;
                }
                false
            }
        };
        let state = self.state();

        let header_attempted = state.header_written || self.phase == StreamPhase::HeaderPending;
        if !header_attempted {
            self.phase = StreamPhase::Closed;
            return Ok(state);
        }

        let mut tail = String::new();
        if interrupted && self.content_written {
            tail.push_str(&format!("\n[Interrupted after {} tokens]", outcome.tokens()));
        }
        tail.push('\n');
        tail.push_str(AI_FENCE_CLOSE);
        tail.push('\n');
        tail.push_str("\n\n");
        tail.push_str(&turn_heading(self.turn_number.saturating_add(1), Role::Human));
        tail.push_str("\n\n");

        self.write_flushed(tail.as_bytes())?;
        self.writer
            .get_ref()
            .sync_data()
            .map_err(|err| SessionError::io(&self.path, err))?;
        self.phase = StreamPhase::Closed;

        log::debug!(
            "Closed AI turn {} ({} tokens, interrupted: {interrupted})",
            self.turn_number,
            outcome.tokens()
        );
        Ok(state)
    }

    fn write_flushed(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer
            .write_all(bytes)
            .and_then(|()| self.writer.flush())
            .map_err(|err| SessionError::io(&self.path, err))
    }
}

impl StreamOutcome {
    pub fn tokens(self) -> usize {
        match self {
            Self::Completed { tokens } | Self::Interrupted { tokens } => tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn session(initial: &str) -> (tempfile::TempDir, PathBuf) {
        let temp = tempdir().unwrap();
        let path = temp.path().join("session.md");
        fs::write(&path, initial).unwrap();
        (temp, path)
    }

    #[test]
    fn writes_header_lazily_and_closes() {
        let (_temp, path) = session("# [1] Human\n\nhi\n");
        let mut writer = StreamWriter::open(&path, 2).unwrap();
        writer.write_chunk("").unwrap();
        assert_eq!(writer.phase(), StreamPhase::Idle);
        assert_eq!(fs::read_to_string(&path).unwrap(), "# [1] Human\n\nhi\n");

        writer.write_chunk("Hello").unwrap();
        assert_eq!(writer.phase(), StreamPhase::Streaming);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "# [1] Human\n\nhi\n\n\n# [2] AI\n\n````markdown\nHello"
        );

        let state = writer.close(StreamOutcome::Completed { tokens: 1 }).unwrap();
        assert!(state.content_written && !state.interrupted);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "# [1] Human\n\nhi\n\n\n# [2] AI\n\n````markdown\nHello\n````\n\n\n# [3] Human\n\n"
        );
    }

    #[test]
    fn untouched_writer_leaves_document_alone() {
        let (_temp, path) = session("# [1] Human\n\nhi\n");
        let mut writer = StreamWriter::open(&path, 2).unwrap();
        let state = writer.close(StreamOutcome::Interrupted { tokens: 0 }).unwrap();
        assert_eq!(state, StreamState { interrupted: true, ..StreamState::default() });
        assert_eq!(fs::read_to_string(&path).unwrap(), "# [1] Human\n\nhi\n");
    }

    #[test]
    fn chunks_after_interrupt_are_ignored() {
        let (_temp, path) = session("# [4] Human\n\nq\n");
        let mut writer = StreamWriter::open(&path, 5).unwrap();
        writer.write_chunk("kept").unwrap();
        writer.interrupt();
        writer.write_chunk(" dropped").unwrap();
        writer.close(StreamOutcome::Interrupted { tokens: 7 }).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("kept\n[Interrupted after 7 tokens]\n````\n"), "{text}");
        assert!(!text.contains("dropped"));
        assert!(text.ends_with("# [6] Human\n\n"));
    }

    #[test]
    fn writing_after_close_is_an_error() {
        let (_temp, path) = session("# [1] Human\n\nq\n");
        let mut writer = StreamWriter::open(&path, 2).unwrap();
        writer.write_chunk("done").unwrap();
        writer.close(StreamOutcome::Completed { tokens: 1 }).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        assert_eq!(writer.phase(), StreamPhase::Closed);
        assert!(matches!(
            writer.write_chunk("late"),
            Err(SessionError::WriterClosed { turn: 2 })
        ));
        writer.close(StreamOutcome::Completed { tokens: 1 }).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn open_missing_file_fails() {
        let temp = tempdir().unwrap();
        assert!(matches!(
            StreamWriter::open(&temp.path().join("none.md"), 1),
            Err(SessionError::Io { .. })
        ));
    }
}
