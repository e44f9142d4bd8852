use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// A `[[...]]` token found in a human turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    File(String),
    Directory { path: String, forced_recursive: bool },
}

impl Reference {
    /// Classify the literal captured between the brackets.
    ///
    /// `dir/**/` forces recursion, `dir/` is a directory reference, anything
    /// else names a single file.
    pub fn classify(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(dir) = raw.strip_suffix("/**/") {
            return Self::Directory {
                path: non_empty_dir(dir),
                forced_recursive: true,
            };
        }
        if let Some(dir) = raw.strip_suffix('/') {
            return Self::Directory {
                path: non_empty_dir(dir),
                forced_recursive: false,
            };
        }
        Self::File(raw.to_string())
    }
}

fn non_empty_dir(dir: &str) -> String {
    if dir.is_empty() {
        "/".to_string()
    } else {
        dir.to_string()
    }
}

/// Location of one reference token in the original turn text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSpan {
    /// Byte range of the whole token including brackets.
    pub range: Range<usize>,
    /// The literal token text, e.g. `[[src/]]`.
    pub literal: String,
    pub reference: Reference,
}

/// Find all non-overlapping reference tokens, left to right.
///
/// Tokens inside fenced code blocks are content, not references, and are skipped.
pub fn find_references(text: &str) -> Vec<ReferenceSpan> {
    let fenced = fenced_ranges(text);
    token_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let inner = caps.get(1)?;
            if fenced.iter().any(|r| r.contains(&whole.start())) {
                log::debug!("Ignoring reference {} inside code fence", whole.as_str());
                return None;
            }
            Some(ReferenceSpan {
                range: whole.range(),
                literal: whole.as_str().to_string(),
                reference: Reference::classify(inner.as_str()),
            })
        })
        .collect()
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("reference token pattern"))
}

/// Byte ranges covered by fenced code blocks, fence lines included.
///
/// A fence opens with three or more backticks or tildes (indented at most three
/// spaces) and closes with a line of at least as many of the same character.
/// An unclosed fence runs to the end of the text.
pub fn fenced_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut open: Option<(usize, char, usize)> = None;
    let mut offset = 0usize;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        let Some((marker, width, rest)) = fence_marker(line) else {
            continue;
        };

        match open {
            None => open = Some((line_start, marker, width)),
            Some((start, open_marker, open_width))
                if marker == open_marker && width >= open_width && rest.trim().is_empty() =>
            {
                ranges.push(start..offset);
                open = None;
            }
            Some(_) => {}
        }
    }

    if let Some((start, _, _)) = open {
        ranges.push(start..text.len());
    }
    ranges
}

fn fence_marker(line: &str) -> Option<(char, usize, &str)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let body = &line[indent..];
    let marker = body.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let width = body.chars().take_while(|c| *c == marker).count();
    if width < 3 {
        return None;
    }
    Some((marker, width, &body[width..]))
}
