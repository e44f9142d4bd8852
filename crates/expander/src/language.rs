use std::path::Path;

/// Resolve the fence info string for a file.
///
/// Exact file names win over extensions; an unknown extension is used as-is
/// (without the dot), and files without an extension fall back to `text`.
pub fn language_hint(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();

    if let Some(hint) = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(hint_for_file_name)
    {
        return hint.to_string();
    }

    let Some(ext) = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
    else {
        return "text".to_string();
    };

    hint_for_extension(&ext).map_or(ext, str::to_string)
}

fn hint_for_file_name(name: &str) -> Option<&'static str> {
    let hint = match name {
        "Makefile" | "makefile" | "GNUmakefile" => "makefile",
        "Dockerfile" => "dockerfile",
        "Cargo.toml" => "toml",
        "go.mod" => "go",
        "go.sum" | ".gitignore" | "README" | "LICENSE" => "text",
        "package.json" | "tsconfig.json" | ".eslintrc" | ".prettierrc" | ".babelrc" => "json",
        ".env" | ".env.example" => "bash",
        "webpack.config.js" | "vite.config.js" | "next.config.js" | "tailwind.config.js" => {
            "javascript"
        }
        _ => return None,
    };
    Some(hint)
}

fn hint_for_extension(ext: &str) -> Option<&'static str> {
    let hint = match ext {
        "go" => "go",
        "rs" => "rust",
        "md" | "mdx" => "markdown",
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "json" => "json",
        "proto" => "protobuf",
        "html" | "htm" => "html",
        "sql" => "sql",
        "vue" => "vue",
        "svelte" => "svelte",
        "astro" => "astro",
        "graphql" | "gql" => "graphql",
        "c" | "h" => "c",
        "cpp" | "hpp" | "cc" | "cxx" | "hh" | "hxx" => "cpp",
        "java" => "java",
        "cs" => "csharp",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "scala" => "scala",
        "py" | "pyw" => "python",
        "rb" => "ruby",
        "php" => "php",
        "sh" | "bash" => "bash",
        "zsh" => "zsh",
        "fish" => "fish",
        "ps1" => "powershell",
        "lua" => "lua",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        "txt" => "text",
        "css" => "css",
        "scss" => "scss",
        "sass" => "sass",
        "less" => "less",
        "styl" => "stylus",
        "ejs" => "ejs",
        "hbs" => "handlebars",
        "pug" => "pug",
        _ => return None,
    };
    Some(hint)
}

/// Comment delimiters recognised by the comment-stripping filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSyntax {
    pub line_prefixes: &'static [&'static str],
    pub blocks: &'static [(&'static str, &'static str)],
}

impl CommentSyntax {
    /// Used when the language is unknown.
    pub const GENERIC: Self = Self {
        line_prefixes: &["//"],
        blocks: &[("/*", "*/"), ("<!--", "-->"), ("\"\"\"", "\"\"\""), ("'''", "'''")],
    };

    pub const C_STYLE: Self = Self {
        line_prefixes: &["//"],
        blocks: &[("/*", "*/")],
    };

    pub const HASH: Self = Self {
        line_prefixes: &["#"],
        blocks: &[],
    };

    pub const PYTHON: Self = Self {
        line_prefixes: &["#"],
        blocks: &[("\"\"\"", "\"\"\""), ("'''", "'''")],
    };

    pub const DASH: Self = Self {
        line_prefixes: &["--"],
        blocks: &[("/*", "*/")],
    };

    pub const LUA: Self = Self {
        line_prefixes: &["--"],
        blocks: &[("--[[", "]]")],
    };

    pub const MARKUP: Self = Self {
        line_prefixes: &[],
        blocks: &[("<!--", "-->")],
    };

    /// Pick the syntax for a resolved language hint.
    pub fn for_hint(hint: &str) -> Self {
        match hint {
            "go" | "rust" | "typescript" | "javascript" | "c" | "cpp" | "java" | "csharp"
            | "swift" | "kotlin" | "scala" | "php" | "protobuf" | "css" | "scss" | "less"
            | "graphql" => Self::C_STYLE,
            "python" => Self::PYTHON,
            "ruby" | "bash" | "zsh" | "fish" | "powershell" | "yaml" | "toml" | "makefile"
            | "dockerfile" => Self::HASH,
            "sql" => Self::DASH,
            "lua" => Self::LUA,
            "markdown" | "html" | "xml" | "vue" | "svelte" => Self::MARKUP,
            _ => Self::GENERIC,
        }
    }

    pub fn for_path(path: impl AsRef<Path>) -> Self {
        Self::for_hint(&language_hint(path))
    }
}
