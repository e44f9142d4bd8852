use regex::Regex;
use std::sync::OnceLock;

const MAX_HEADER_LEVEL: usize = 6;

/// Heading depth and numbering inherited from the markdown around a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownContext {
    /// Level used for the expanded section heading (1-6).
    pub header_level: usize,
    /// Section number found in the enclosing heading, e.g. `1.2` from `[1.2]`.
    pub number_prefix: String,
}

impl Default for MarkdownContext {
    fn default() -> Self {
        Self {
            header_level: 2,
            number_prefix: String::new(),
        }
    }
}

impl MarkdownContext {
    /// Bracketed index for the n-th section under this context.
    pub fn section_index(&self, turn_number: u32, section_number: usize) -> String {
        if self.number_prefix.is_empty() {
            format!("[{turn_number}.{section_number}]")
        } else {
            format!("[{}.{section_number}]", self.number_prefix)
        }
    }
}

/// Infer the context for a reference at `offset` from the nearest preceding heading.
pub fn detect(text: &str, offset: usize) -> MarkdownContext {
    if offset == 0 || offset > text.len() || !text.is_char_boundary(offset) {
        return MarkdownContext::default();
    }

    text[..offset]
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('#'))
        .map(parse_heading)
        .unwrap_or_default()
}

/// Parse a heading line into the context for content nested beneath it.
pub fn parse_heading(line: &str) -> MarkdownContext {
    let mut ctx = MarkdownContext::default();
    let line = line.trim();

    let hashes = line.chars().take_while(|c| *c == '#').count();
    if (1..=MAX_HEADER_LEVEL).contains(&hashes) {
        ctx.header_level = (hashes + 1).min(MAX_HEADER_LEVEL);
    }

    if let Some(number) = number_pattern()
        .captures(line)
        .and_then(|caps| caps.get(1))
    {
        ctx.number_prefix = number.as_str().to_string();
    }

    ctx
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[([0-9.]+)\]").expect("section number pattern"))
}
