//! # Ask Session
//!
//! The session document is a markdown file of numbered, role-tagged turns:
//!
//! `````text
//! # [1] Human
//!
//! Explain [[src/main.rs]]
//!
//! # [2] AI
//!
//! ````markdown
//! ...reply...
//! ````
//!
//! # [3] Human
//! `````
//!
//! Whole-document rewrites go through [`write_atomic`]; the AI reply is appended
//! chunk by chunk through [`StreamWriter`].

mod atomic;
mod error;
mod mutator;
mod parser;
mod stream;

pub use atomic::write_atomic;
pub use error::{Result, SessionError};
pub use mutator::{append_turn, replace_turn_content};
pub use parser::{
    find_last_human_turn, next_turn_number, parse_all, unwrap_ai_fence, AI_FENCE_CLOSE,
    AI_FENCE_OPEN,
};
pub use stream::{StreamOutcome, StreamPhase, StreamState, StreamWriter};
