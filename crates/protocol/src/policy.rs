use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Directory expansion rules, immutable for the duration of one run.
///
/// Field mapping to the expansion contract: `max_depth` bounds recursion,
/// `recursive` is the default for plain `[[dir/]]` references, `include` lists
/// accepted extensions and file-name globs, `exclude` lists pruned directory
/// names and rejected path/name globs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionPolicy {
    pub max_depth: usize,
    pub recursive: bool,
    pub include: IncludeRules,
    pub exclude: ExcludeRules,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncludeRules {
    pub extensions: Vec<String>,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeRules {
    pub directories: Vec<String>,
    pub patterns: Vec<String>,
}

impl Default for ExpansionPolicy {
    fn default() -> Self {
        Self {
            max_depth: 3,
            recursive: false,
            include: IncludeRules::default(),
            exclude: ExcludeRules::default(),
        }
    }
}

impl Default for IncludeRules {
    fn default() -> Self {
        Self {
            extensions: to_strings(DEFAULT_INCLUDE_EXTENSIONS),
            patterns: to_strings(&[
                "Makefile",
                "Dockerfile",
                ".gitignore",
                ".env.example",
                "README",
                "LICENSE",
            ]),
        }
    }
}

impl Default for ExcludeRules {
    fn default() -> Self {
        Self {
            directories: to_strings(&[
                "vendor",
                "node_modules",
                ".git",
                "dist",
                "build",
                "target",
                "bin",
                "obj",
                ".idea",
                ".vscode",
                "__pycache__",
                ".pytest_cache",
                ".next",
                ".nuxt",
                ".output",
            ]),
            patterns: to_strings(&[
                "*_test.go",
                "*.pb.go",
                "*_generated.go",
                "*.min.js",
                "*.min.css",
                "*.map",
            ]),
        }
    }
}

impl ExpansionPolicy {
    /// Reject policies that would silently never match anything.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(anyhow!("expand.max_depth must be > 0"));
        }
        validate_globs("expand.include.patterns", &self.include.patterns)?;
        validate_globs("expand.exclude.patterns", &self.exclude.patterns)?;
        for dir in &self.exclude.directories {
            if dir.trim().is_empty() || dir.contains('/') {
                return Err(anyhow!(
                    "expand.exclude.directories entry {dir:?} must be a single directory name"
                ));
            }
        }
        Ok(())
    }
}

/// One `(start, end)` delimiter pair that marks a removable header block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderPair {
    pub start: String,
    pub end: String,
}

impl HeaderPair {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// Content filtering rules applied to every expanded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterPolicy {
    pub enabled: bool,
    pub strip_headers: bool,
    pub strip_all_comments: bool,
    pub header_remove: Vec<HeaderPair>,
    pub header_preserve: Vec<String>,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            strip_headers: true,
            strip_all_comments: false,
            header_remove: vec![HeaderPair::new("/*", "*/")],
            header_preserve: to_strings(&["#!", "//go:build", "// +build", "<?xml"]),
        }
    }
}

impl FilterPolicy {
    /// A policy that leaves content untouched.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (idx, pair) in self.header_remove.iter().enumerate() {
            if pair.start.is_empty() || pair.end.is_empty() {
                return Err(anyhow!(
                    "filter.header_remove[{idx}] needs non-empty start and end delimiters"
                ));
            }
        }
        if self.header_preserve.iter().any(|p| p.trim().is_empty()) {
            return Err(anyhow!("filter.header_preserve entries must not be blank"));
        }
        Ok(())
    }
}

fn validate_globs(field: &str, patterns: &[String]) -> Result<()> {
    for pattern in patterns {
        glob::Pattern::new(pattern)
            .map_err(|err| anyhow!("{field}: invalid glob {pattern:?}: {err}"))?;
    }
    Ok(())
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

const DEFAULT_INCLUDE_EXTENSIONS: &[&str] = &[
    "go", "rs", "py", "js", "ts", "jsx", "tsx", "java", "cpp", "c", "h", "hpp", "cs", "rb", "php",
    "swift", "kt", "scala", "sh", "bash", "zsh", "fish", "ps1", "md", "txt", "json", "yaml", "yml",
    "toml", "xml", "html", "css", "scss", "sass", "sql", "proto",
];
