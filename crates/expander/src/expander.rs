use crate::context::{self, MarkdownContext};
use crate::error::{ExpandError, Result, WalkError};
use crate::filter::filter_for_path;
use crate::language::language_hint;
use crate::reference::{find_references, Reference, ReferenceSpan};
use crate::section::format_section;
use crate::walker::walk;
use ask_protocol::{ExpansionPolicy, FileStat, FilterPolicy};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Result of expanding one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Turn content with every reference token replaced.
    pub content: String,
    /// One record per file that produced a section, in output order.
    pub stats: Vec<FileStat>,
    /// Number of tokens replaced with empty text: binary files, or directories
    /// whose files were all binary or unreadable.
    pub dropped: usize,
}

impl Expansion {
    fn unchanged(content: &str) -> Self {
        Self {
            content: content.to_string(),
            ..Self::default()
        }
    }

    /// Whether the expansion produced a section or dropped a reference.
    pub fn changed(&self) -> bool {
        !self.stats.is_empty() || self.dropped > 0
    }
}

/// Replacement text computed for a single reference span.
#[derive(Default)]
struct Resolved {
    text: String,
    stats: Vec<FileStat>,
    dropped: bool,
}

enum Loaded {
    Text(String),
    Binary,
}

/// Expands `[[path]]` tokens in human turns.
///
/// Holds the policies for one run. Relative reference paths resolve against
/// `base_dir`, which defaults to the process working directory.
#[derive(Debug, Clone)]
pub struct Expander {
    expansion: ExpansionPolicy,
    filter: FilterPolicy,
    base_dir: PathBuf,
}

impl Expander {
    pub fn new(expansion: ExpansionPolicy, filter: FilterPolicy) -> Self {
        Self {
            expansion,
            filter,
            base_dir: PathBuf::new(),
        }
    }

    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Rewrite `content`, replacing each reference with its formatted sections.
    ///
    /// Spans and their markdown context are computed against the original text,
    /// then the output is assembled in a single splice pass. Identical literals
    /// are resolved independently at their own offsets.
    pub fn expand(&self, content: &str, turn_number: u32) -> Result<Expansion> {
        let spans = find_references(content);
        if spans.is_empty() {
            return Ok(Expansion::unchanged(content));
        }
        warn_duplicates(&spans, turn_number);

        let mut next_section = 1usize;
        let mut resolved = Vec::with_capacity(spans.len());
        for span in &spans {
            let ctx = context::detect(content, span.range.start);
            let replacement = self.resolve(span, &ctx, turn_number, &mut next_section)?;
            resolved.push(replacement);
        }

        let mut expansion = Expansion {
            content: String::with_capacity(content.len()),
            ..Expansion::default()
        };
        let mut cursor = 0usize;
        for (span, replacement) in spans.iter().zip(resolved) {
            expansion.content.push_str(&content[cursor..span.range.start]);
            expansion.content.push_str(&replacement.text);
            cursor = span.range.end;

            expansion.stats.extend(replacement.stats);
            if replacement.dropped {
                expansion.dropped += 1;
            }
        }
        expansion.content.push_str(&content[cursor..]);

        log::info!(
            "Expanded turn {turn_number}: {} references, {} files, {} dropped",
            spans.len(),
            expansion.stats.len(),
            expansion.dropped
        );
        Ok(expansion)
    }

    fn resolve(
        &self,
        span: &ReferenceSpan,
        ctx: &MarkdownContext,
        turn_number: u32,
        next_section: &mut usize,
    ) -> Result<Resolved> {
        match &span.reference {
            Reference::File(path) => self.resolve_file(path, ctx, turn_number, next_section),
            Reference::Directory {
                path,
                forced_recursive,
            } => self.resolve_directory(
                path,
                *forced_recursive || self.expansion.recursive,
                ctx,
                turn_number,
                next_section,
            ),
        }
    }

    fn resolve_file(
        &self,
        path: &str,
        ctx: &MarkdownContext,
        turn_number: u32,
        next_section: &mut usize,
    ) -> Result<Resolved> {
        let full = self.base_dir.join(path);
        let loaded = load(&full).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                ExpandError::NotFound {
                    path: path.to_string(),
                    turn: turn_number,
                }
            } else {
                ExpandError::ReadFailure {
                    path: path.to_string(),
                    turn: turn_number,
                    source: err,
                }
            }
        })?;

        match loaded {
            Loaded::Binary => {
                log::warn!("Skipping binary file {path}");
                Ok(Resolved {
                    dropped: true,
                    ..Resolved::default()
                })
            }
            Loaded::Text(text) => {
                let (section, stat) = self.render(ctx, turn_number, *next_section, path, &text);
                *next_section += 1;
                Ok(Resolved {
                    text: section,
                    stats: vec![stat],
                    dropped: false,
                })
            }
        }
    }

    fn resolve_directory(
        &self,
        path: &str,
        recursive: bool,
        ctx: &MarkdownContext,
        turn_number: u32,
        next_section: &mut usize,
    ) -> Result<Resolved> {
        let full = self.base_dir.join(path);
        let files = walk(&full, &self.expansion, recursive, 0).map_err(|err| match err {
            WalkError::DirectoryNotFound { .. } => ExpandError::NotFound {
                path: path.to_string(),
                turn: turn_number,
            },
            other => ExpandError::Directory {
                path: path.to_string(),
                turn: turn_number,
                source: other,
            },
        })?;

        let mut sections = Vec::with_capacity(files.len());
        let mut stats = Vec::with_capacity(files.len());
        for file in files {
            let display = join_display(path, &file.relative);
            match load(&file.path) {
                Ok(Loaded::Text(text)) => {
                    let (section, stat) =
                        self.render(ctx, turn_number, *next_section, &display, &text);
                    *next_section += 1;
                    sections.push(section);
                    stats.push(stat);
                }
                Ok(Loaded::Binary) => log::debug!("Skipping binary file {display}"),
                Err(err) => log::warn!("Skipping unreadable file {display}: {err}"),
            }
        }

        if sections.is_empty() {
            log::warn!("Directory {path} produced no readable text files");
        }
        Ok(Resolved {
            dropped: sections.is_empty(),
            text: sections.join("\n\n"),
            stats,
        })
    }

    fn render(
        &self,
        ctx: &MarkdownContext,
        turn_number: u32,
        section_number: usize,
        display: &str,
        text: &str,
    ) -> (String, FileStat) {
        let filtered = filter_for_path(text, display, &self.filter);
        let hint = language_hint(display);
        let section = format_section(ctx, turn_number, section_number, display, &hint, &filtered);
        (section, FileStat::from_content(display, &filtered))
    }
}

/// Read a file, classifying content with a zero byte as binary.
fn load(path: &Path) -> io::Result<Loaded> {
    let bytes = std::fs::read(path)?;
    if bytes.contains(&0) {
        return Ok(Loaded::Binary);
    }
    Ok(Loaded::Text(String::from_utf8_lossy(&bytes).into_owned()))
}

fn join_display(dir: &str, relative: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{relative}")
    } else {
        format!("{dir}/{relative}")
    }
}

fn warn_duplicates(spans: &[ReferenceSpan], turn_number: u32) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for span in spans {
        *counts.entry(span.literal.as_str()).or_default() += 1;
    }
    let mut duplicated: Vec<_> = counts.into_iter().filter(|(_, n)| *n > 1).collect();
    duplicated.sort_unstable();
    for (literal, n) in duplicated {
        log::warn!("Reference {literal} appears {n} times in turn {turn_number}; expanding each");
    }
}
