use crate::parser::{boundaries, AI_FENCE_CLOSE, AI_FENCE_OPEN};
use ask_protocol::{turn_heading, Role};

/// Replace the body of the last turn headed `# [turn_number] role`.
///
/// The body becomes a blank line, the trimmed `new_content` and a newline.
/// A following turn is separated by one blank line. Returns the document
/// unchanged when the heading does not exist.
pub fn replace_turn_content(
    document: &str,
    turn_number: u32,
    role: Role,
    new_content: &str,
) -> String {
    let found = boundaries(document);
    let Some(idx) = found
        .iter()
        .rposition(|b| b.number == turn_number && b.role == role)
    else {
        log::debug!("Heading {} not found; nothing replaced", turn_heading(turn_number, role));
        return document.to_string();
    };

    let target = &found[idx];
    let mut out = String::with_capacity(document.len() + new_content.len());
    out.push_str(&document[..target.range.start]);
    out.push_str(&turn_heading(turn_number, role));
    out.push_str("\n\n");
    out.push_str(new_content.trim());
    out.push('\n');

    if let Some(next) = found.get(idx + 1) {
        out.push('\n');
        out.push_str(&document[next.range.start..]);
    }
    out
}

/// Append a new turn at the end of the document.
///
/// AI content is wrapped in the `````markdown` fence the streaming writer uses.
pub fn append_turn(document: &str, turn_number: u32, role: Role, content: &str) -> String {
    let mut out = document.trim_end().to_string();
    if !out.is_empty() {
        out.push_str("\n\n");
    }
    out.push_str(&turn_heading(turn_number, role));
    out.push_str("\n\n");

    let content = content.trim();
    match role {
        Role::Ai => {
            out.push_str(AI_FENCE_OPEN);
            out.push('\n');
            out.push_str(content);
            out.push('\n');
            out.push_str(AI_FENCE_CLOSE);
            out.push('\n');
        }
        Role::Human => {
            out.push_str(content);
            if !content.is_empty() {
                out.push('\n');
            }
        }
    }
    out
}
