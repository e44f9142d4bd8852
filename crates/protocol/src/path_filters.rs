use crate::ExpansionPolicy;
use glob::{MatchOptions, Pattern};

/// Glob semantics for policy patterns: `*` and `?` never cross a `/`.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Decide whether a candidate file takes part in a directory expansion.
///
/// `relative_path` is the file's path relative to the expansion root. Rules are
/// evaluated in order and the first decisive one wins: excluded directory
/// component, exclude glob (path or name), included extension, include glob
/// (name only), otherwise reject.
pub fn should_include(name: &str, relative_path: &str, policy: &ExpansionPolicy) -> bool {
    let rel_path = relative_path.replace('\\', "/");

    if has_excluded_component(&rel_path, &policy.exclude.directories) {
        return false;
    }

    if policy
        .exclude
        .patterns
        .iter()
        .any(|pattern| glob_matches(pattern, &rel_path) || glob_matches(pattern, name))
    {
        return false;
    }

    if let Some(ext) = extension_of(name) {
        if policy
            .include
            .extensions
            .iter()
            .any(|candidate| candidate.trim_start_matches('.').eq_ignore_ascii_case(ext))
        {
            return true;
        }
    }

    policy
        .include
        .patterns
        .iter()
        .any(|pattern| glob_matches(pattern, name))
}

/// True when the directory name is pruned by the policy.
pub fn is_excluded_dir(name: &str, policy: &ExpansionPolicy) -> bool {
    policy.exclude.directories.iter().any(|dir| dir == name)
}

fn has_excluded_component(rel_path: &str, excluded: &[String]) -> bool {
    rel_path
        .split('/')
        .any(|part| excluded.iter().any(|dir| dir == part))
}

fn extension_of(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        // `.gitignore` has no extension; include patterns cover it.
        return None;
    }
    Some(ext)
}

fn glob_matches(pattern: &str, candidate: &str) -> bool {
    Pattern::new(pattern)
        .map(|p| p.matches_with(candidate, MATCH_OPTIONS))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ExpansionPolicy {
        ExpansionPolicy::default()
    }

    #[test]
    fn excluded_directory_component_wins_over_extension() {
        let policy = policy();
        assert!(!should_include("c.go", "vendor/c.go", &policy));
        assert!(!should_include("x.rs", "src/target/x.rs", &policy));
        assert!(should_include("x.rs", "src/x.rs", &policy));
    }

    #[test]
    fn exclude_globs_match_name_or_path() {
        let mut policy = policy();
        assert!(!should_include("b.min.js", "b.min.js", &policy));
        assert!(!should_include("a_test.go", "pkg/a_test.go", &policy));

        policy.exclude.patterns = vec!["gen/*.rs".to_string()];
        assert!(!should_include("x.rs", "gen/x.rs", &policy));
        assert!(should_include("x.rs", "src/gen/x.rs", &policy));
    }

    #[test]
    fn extensions_are_case_insensitive() {
        let mut policy = policy();
        policy.include.extensions = vec!["GO".to_string(), ".md".to_string()];
        assert!(should_include("main.go", "main.go", &policy));
        assert!(should_include("README.MD", "README.MD", &policy));
        assert!(!should_include("main.rs", "main.rs", &policy));
    }

    #[test]
    fn include_patterns_cover_extensionless_files() {
        let policy = policy();
        assert!(should_include("Makefile", "Makefile", &policy));
        assert!(should_include(".gitignore", "sub/.gitignore", &policy));
        assert!(!should_include("Procfile", "Procfile", &policy));
    }

    #[test]
    fn invalid_patterns_never_match() {
        let mut policy = policy();
        policy.exclude.patterns = vec!["[".to_string()];
        assert!(should_include("a.go", "a.go", &policy));
    }
}
