use crate::language::CommentSyntax;
use ask_protocol::FilterPolicy;
use std::path::Path;

/// Apply the filter pipeline using the generic comment syntax.
pub fn filter(content: &str, policy: &FilterPolicy) -> String {
    filter_with(content, policy, &CommentSyntax::GENERIC)
}

/// Apply the filter pipeline with comment syntax chosen from the file's language.
pub fn filter_for_path(content: &str, path: impl AsRef<Path>, policy: &FilterPolicy) -> String {
    filter_with(content, policy, &CommentSyntax::for_path(path))
}

pub fn filter_with(content: &str, policy: &FilterPolicy, syntax: &CommentSyntax) -> String {
    if !policy.enabled {
        return content.to_string();
    }

    let mut filtered = if policy.strip_headers {
        strip_headers(content, policy)
    } else {
        content.to_string()
    };

    if policy.strip_all_comments {
        filtered = strip_comments(&filtered, syntax);
    }

    filtered
}

/// Remove leading header blocks delimited by the policy's remove pairs.
///
/// Content whose first non-blank text starts with a preserve prefix is returned
/// unchanged. Consecutive header blocks are removed one after another until the
/// remainder no longer starts with a remove pattern or starts with a preserved
/// directive. An unterminated block is left in place.
pub fn strip_headers(content: &str, policy: &FilterPolicy) -> String {
    let trimmed = content.trim_start();
    if starts_with_preserved(trimmed, policy) {
        return content.to_string();
    }

    let mut rest = trimmed;
    let mut stripped = false;

    while let Some(pair) = policy
        .header_remove
        .iter()
        .find(|pair| !pair.start.is_empty() && rest.starts_with(pair.start.as_str()))
    {
        let body = &rest[pair.start.len()..];
        let Some(end) = body.find(pair.end.as_str()) else {
            break;
        };
        rest = trim_leading_blank_lines(&body[end + pair.end.len()..]);
        stripped = true;

        if rest.is_empty() || starts_with_preserved(rest.trim_start(), policy) {
            break;
        }
    }

    if stripped {
        rest.to_string()
    } else {
        content.to_string()
    }
}

fn starts_with_preserved(text: &str, policy: &FilterPolicy) -> bool {
    policy
        .header_preserve
        .iter()
        .any(|prefix| !prefix.is_empty() && text.starts_with(prefix.as_str()))
}

fn trim_leading_blank_lines(mut text: &str) -> &str {
    loop {
        match text.find('\n') {
            Some(idx) if text[..idx].trim().is_empty() => text = &text[idx + 1..],
            Some(_) => return text,
            None if text.trim().is_empty() => return "",
            None => return text,
        }
    }
}

/// Drop comment lines and comment blocks, line by line.
///
/// Only comments that start a line (after indentation) are recognised; trailing
/// comments after code stay. Text following a block terminator on the same line
/// is kept. Runs of three or more blank lines collapse to one.
pub fn strip_comments(content: &str, syntax: &CommentSyntax) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut open_block: Option<&str> = None;

    for line in content.lines() {
        if let Some(end) = open_block {
            if let Some(idx) = line.find(end) {
                open_block = None;
                let after = &line[idx + end.len()..];
                if !after.trim().is_empty() {
                    kept.push(after);
                }
            }
            continue;
        }

        let trimmed = line.trim_start();
        if syntax
            .line_prefixes
            .iter()
            .any(|prefix| trimmed.starts_with(prefix))
        {
            continue;
        }

        if let Some((start, end)) = syntax
            .blocks
            .iter()
            .find(|(start, _)| trimmed.starts_with(start))
        {
            let body = &trimmed[start.len()..];
            match body.find(end) {
                Some(idx) => {
                    let after = &body[idx + end.len()..];
                    if !after.trim().is_empty() {
                        kept.push(after);
                    }
                }
                None => open_block = Some(end),
            }
            continue;
        }

        kept.push(line);
    }

    collapse_blank_runs(&kept).trim().to_string()
}

fn collapse_blank_runs(lines: &[&str]) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut blank_run = 0usize;

    for line in lines {
        if line.trim().is_empty() {
            blank_run += 1;
            continue;
        }
        let blanks = if blank_run >= 3 { 1 } else { blank_run };
        out.extend(std::iter::repeat("").take(blanks));
        blank_run = 0;
        out.push(line);
    }

    out.join("\n")
}
