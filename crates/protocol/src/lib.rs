use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod path_filters;
mod policy;

pub use policy::{ExpansionPolicy, ExcludeRules, FilterPolicy, HeaderPair, IncludeRules};

/// Shared cancellation flag, raised by the signal handler and polled by long-running loops.
pub type CancelSignal = Arc<AtomicBool>;

#[must_use]
pub fn new_cancel_signal() -> CancelSignal {
    Arc::new(AtomicBool::new(false))
}

#[must_use]
pub fn is_cancelled(signal: &CancelSignal) -> bool {
    signal.load(Ordering::SeqCst)
}

pub fn raise(signal: &CancelSignal) {
    signal.store(true, Ordering::SeqCst);
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Human,
    #[serde(rename = "AI")]
    Ai,
}

impl Role {
    /// Label used in turn headings (`# [N] Human`, `# [N] AI`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Human => "Human",
            Self::Ai => "AI",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Human" => Some(Self::Human),
            "AI" => Some(Self::Ai),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One numbered, role-tagged block of a session document.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Turn {
    pub number: u32,
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(number: u32, role: Role, content: impl Into<String>) -> Self {
        Self {
            number,
            role,
            content: content.into(),
        }
    }

    /// Heading line that introduces this turn in the document.
    #[must_use]
    pub fn heading(&self) -> String {
        turn_heading(self.number, self.role)
    }
}

#[must_use]
pub fn turn_heading(number: u32, role: Role) -> String {
    format!("# [{number}] {}", role.label())
}

/// Accounting record for one expanded file, surfaced to the user for display.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub path: String,
    pub tokens: usize,
}

impl FileStat {
    /// Approximate token count: content length divided by four.
    pub fn from_content(path: impl Into<String>, content: &str) -> Self {
        Self {
            path: path.into(),
            tokens: approximate_tokens(content),
        }
    }
}

#[must_use]
pub const fn approximate_tokens(text: &str) -> usize {
    text.len() / 4
}
