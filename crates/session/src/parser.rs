//! Turn grammar.
//!
//! A boundary is a whole line `# [<digits>] Human` or `# [<digits>] AI`
//! (a trailing `\r` is tolerated). Boundaries are recognised anywhere in the
//! document, including inside code fences. A turn's content is the trimmed text
//! between the end of its boundary line and the start of the next boundary, or
//! the end of the document.

use crate::error::{Result, SessionError};
use ask_protocol::{Role, Turn};
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// Opening line of the presentation fence around AI turn bodies.
pub const AI_FENCE_OPEN: &str = "````markdown";
pub const AI_FENCE_CLOSE: &str = "````";

/// A turn heading located in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Boundary {
    /// Byte range of the heading line, excluding its newline.
    pub range: Range<usize>,
    pub number: u32,
    pub role: Role,
}

fn boundary_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^# \[(\d+)\] (Human|AI)\r?$").expect("turn boundary pattern")
    })
}

pub(crate) fn boundaries(document: &str) -> Vec<Boundary> {
    boundary_pattern()
        .captures_iter(document)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let number = match caps[1].parse::<u32>() {
                Ok(n) => n,
                Err(_) => {
                    log::warn!("Ignoring turn heading with out-of-range number: {}", whole.as_str());
                    return None;
                }
            };
            let role = Role::from_label(&caps[2])?;
            Some(Boundary {
                range: whole.range(),
                number,
                role,
            })
        })
        .collect()
}

/// Split a document into its ordered turns.
pub fn parse_all(document: &str) -> Result<Vec<Turn>> {
    let found = boundaries(document);
    if found.is_empty() {
        return Err(SessionError::NoTurnsFound);
    }

    let turns = found
        .iter()
        .enumerate()
        .map(|(idx, boundary)| {
            let end = found
                .get(idx + 1)
                .map_or(document.len(), |next| next.range.start);
            let body = document[boundary.range.end..end].trim();
            let content = match boundary.role {
                Role::Ai => unwrap_ai_fence(body),
                Role::Human => body,
            };
            Turn::new(boundary.number, boundary.role, content)
        })
        .collect::<Vec<_>>();

    log::debug!("Parsed {} turns", turns.len());
    Ok(turns)
}

/// The most recent Human turn, which must have content.
pub fn find_last_human_turn(document: &str) -> Result<Turn> {
    let turns = parse_all(document)?;
    let turn = turns
        .into_iter()
        .rev()
        .find(|turn| turn.role == Role::Human)
        .ok_or(SessionError::NoHumanTurn)?;

    if turn.content.is_empty() {
        return Err(SessionError::EmptyTurnContent { turn: turn.number });
    }
    Ok(turn)
}

/// Number for the turn that follows the last one in `turns`.
pub fn next_turn_number(turns: &[Turn]) -> u32 {
    turns.last().map_or(1, |turn| turn.number.saturating_add(1))
}

/// Strip the `````markdown` wrapper from an AI body, if present.
pub fn unwrap_ai_fence(body: &str) -> &str {
    let Some(rest) = body.strip_prefix(AI_FENCE_OPEN) else {
        return body;
    };
    let Some(rest) = rest.strip_suffix(AI_FENCE_CLOSE) else {
        return body;
    };
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')).unwrap_or(rest);
    rest.trim()
}
