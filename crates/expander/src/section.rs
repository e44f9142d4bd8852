use crate::context::MarkdownContext;

/// Render one expanded file as a heading plus a fenced code block.
pub fn format_section(
    ctx: &MarkdownContext,
    turn_number: u32,
    section_number: usize,
    path: &str,
    language_hint: &str,
    content: &str,
) -> String {
    let hashes = "#".repeat(ctx.header_level);
    let index = ctx.section_index(turn_number, section_number);
    let fence = fence_for(content);
    format!("{hashes} {index} {path}\n{fence}{language_hint}\n{content}\n{fence}")
}

/// Three backticks, or one more than the longest backtick run in the content.
fn fence_for(content: &str) -> String {
    let mut longest = 0usize;
    let mut run = 0usize;
    for ch in content.chars() {
        if ch == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    let width = if longest >= 3 { longest + 1 } else { 3 };
    "`".repeat(width)
}
