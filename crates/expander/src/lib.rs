//! # Ask Expander
//!
//! Turns `[[path]]`, `[[dir/]]` and `[[dir/**/]]` tokens in a human turn into
//! numbered, fenced content sections.
//!
//! ## Architecture
//!
//! ```text
//! Turn content
//!     │
//!     ├──> Reference scan (skips fenced code)
//!     │
//!     ├──> Per span, against the original text
//!     │    ├─> Markdown context (heading level, number prefix)
//!     │    ├─> File read, or directory walk under ExpansionPolicy
//!     │    ├─> Binary check (zero byte → dropped)
//!     │    ├─> Filter pipeline (headers, then comments)
//!     │    └─> Section format with language hint
//!     │
//!     └──> Single splice pass → Expansion { content, stats }
//! ```
//!
//! ## Example
//!
//! ```rust
//! use ask_expander::Expander;
//! use ask_protocol::{ExpansionPolicy, FilterPolicy};
//!
//! let expander = Expander::new(ExpansionPolicy::default(), FilterPolicy::default());
//! let expansion = expander.expand("nothing to expand", 1).unwrap();
//! assert_eq!(expansion.content, "nothing to expand");
//! assert!(expansion.stats.is_empty());
//! ```

pub mod context;
mod error;
mod expander;
pub mod filter;
pub mod language;
pub mod reference;
pub mod section;
pub mod walker;

pub use context::MarkdownContext;
pub use error::{ExpandError, Result, WalkError};
pub use expander::{Expander, Expansion};
pub use filter::{filter, filter_for_path};
pub use language::{language_hint, CommentSyntax};
pub use reference::{find_references, Reference, ReferenceSpan};
pub use walker::{walk, WalkedFile};
