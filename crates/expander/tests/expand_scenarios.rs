use ask_expander::{filter, walk, ExpandError, Expander};
use ask_protocol::{ExpansionPolicy, FileStat, FilterPolicy, HeaderPair};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, content).expect("write fixture");
}

fn expander(root: &Path) -> Expander {
    Expander::new(ExpansionPolicy::default(), FilterPolicy::default()).with_base_dir(root)
}

#[test]
fn non_recursive_directory_yields_only_included_top_level_file() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write(root, "proj/a.go", b"package a");
    write(root, "proj/b.min.js", b"var b");
    write(root, "proj/vendor/c.go", b"package c");

    let expansion = expander(root).expand("[[proj/]]", 1).expect("expand");

    assert_eq!(
        expansion.stats,
        vec![FileStat::from_content("proj/a.go", "package a")]
    );
    assert_eq!(expansion.content, "## [1.1] proj/a.go\n```go\npackage a\n```");
}

#[test]
fn binary_reference_is_dropped_without_error() {
    let temp = TempDir::new().expect("tempdir");
    write(temp.path(), "x.bin", b"\x7fELF\x00\x01");

    let expansion = expander(temp.path())
        .expand("See [[x.bin]]", 3)
        .expect("expand");

    assert_eq!(expansion.content, "See ");
    assert!(expansion.stats.is_empty());
    assert_eq!(expansion.dropped, 1);
    assert!(expansion.changed());
}

#[test]
fn zero_byte_wins_over_included_extension() {
    let temp = TempDir::new().expect("tempdir");
    write(temp.path(), "src/text.go", b"package text");
    write(temp.path(), "src/blob.go", b"package\x00blob");

    let expansion = expander(temp.path()).expand("[[src/]]", 1).expect("expand");
    let paths: Vec<_> = expansion.stats.iter().map(|s| s.path.as_str()).collect();
    assert_eq!(paths, vec!["src/text.go"]);
}

#[test]
fn header_filter_applies_to_expanded_files() {
    let temp = TempDir::new().expect("tempdir");
    write(temp.path(), "main.go", b"/* Copyright */\n\npackage main");

    let expansion = expander(temp.path()).expand("[[main.go]]", 2).expect("expand");
    assert_eq!(expansion.content, "## [2.1] main.go\n```go\npackage main\n```");

    let policy = FilterPolicy {
        header_remove: vec![HeaderPair::new("/*", "*/")],
        header_preserve: Vec::new(),
        ..FilterPolicy::default()
    };
    assert_eq!(
        filter("/* Copyright */\n\npackage main", &policy),
        "package main"
    );
}

#[test]
fn excluded_directories_never_contribute_even_when_recursive() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write(root, "app/main.go", b"package main");
    write(root, "app/node_modules/lib/index.js", b"module.exports = 1");
    write(root, "app/pkg/vendor/dep.go", b"package dep");
    write(root, "app/pkg/util.go", b"package pkg");

    let policy = ExpansionPolicy {
        recursive: true,
        ..ExpansionPolicy::default()
    };
    let files = walk(&root.join("app"), &policy, true, 0).expect("walk");
    let relatives: Vec<_> = files.iter().map(|f| f.relative.as_str()).collect();
    assert_eq!(relatives, vec!["main.go", "pkg/util.go"]);
}

#[test]
fn forced_recursion_respects_max_depth_without_error() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write(root, "tree/one.md", b"one");
    write(root, "tree/l1/two.md", b"two");
    write(root, "tree/l1/l2/three.md", b"three");
    write(root, "tree/l1/l2/l3/four.md", b"four");

    let policy = ExpansionPolicy {
        max_depth: 3,
        ..ExpansionPolicy::default()
    };
    let expander = Expander::new(policy, FilterPolicy::default()).with_base_dir(root);

    let shallow = expander.expand("[[tree/]]", 1).expect("non-recursive");
    assert_eq!(shallow.stats.len(), 1);

    let deep = expander.expand("[[tree/**/]]", 1).expect("forced recursive");
    let paths: Vec<_> = deep.stats.iter().map(|s| s.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["tree/one.md", "tree/l1/two.md", "tree/l1/l2/three.md"]
    );
}

#[test]
fn duplicate_literals_expand_at_each_occurrence() {
    let temp = TempDir::new().expect("tempdir");
    write(temp.path(), "a.rs", b"fn a() {}");

    let content = "# [1.1] First\n[[a.rs]]\n# [1.2] Second\n[[a.rs]]";
    let expansion = expander(temp.path()).expand(content, 5).expect("expand");

    assert_eq!(
        expansion.content,
        "# [1.1] First\n## [1.1.1] a.rs\n```rust\nfn a() {}\n```\n# [1.2] Second\n## [1.2.2] a.rs\n```rust\nfn a() {}\n```"
    );
    assert_eq!(expansion.stats.len(), 2);
}

#[test]
fn references_inside_code_fences_are_left_alone() {
    let temp = TempDir::new().expect("tempdir");
    let content = "Example:\n```md\nwrite [[file.go]] to embed\n```";
    let expansion = expander(temp.path()).expand(content, 1).expect("expand");
    assert_eq!(expansion.content, content);
    assert!(!expansion.changed());
}

#[test]
fn empty_directory_is_fatal_at_root() {
    let temp = TempDir::new().expect("tempdir");
    write(temp.path(), "assets/logo.png", b"png");

    let err = expander(temp.path())
        .expand("[[assets/]]", 4)
        .expect_err("no matching files");
    assert!(matches!(err, ExpandError::Directory { .. }));
    assert_eq!(err.turn(), 4);
    assert!(err.to_string().contains("assets"));
}

#[test]
fn missing_directory_is_not_found() {
    let temp = TempDir::new().expect("tempdir");
    let err = expander(temp.path())
        .expand("[[ghost/]]", 2)
        .expect_err("missing dir");
    assert!(matches!(err, ExpandError::NotFound { .. }));
    assert_eq!(err.path(), "ghost");
}

#[test]
fn failed_reference_aborts_whole_turn() {
    let temp = TempDir::new().expect("tempdir");
    write(temp.path(), "ok.go", b"package ok");

    let result = expander(temp.path()).expand("[[ok.go]] and [[missing.go]]", 1);
    assert!(matches!(result, Err(ExpandError::NotFound { .. })));
}

/// Removes all permissions; returns false when the file stays readable (e.g. root).
#[cfg(unix)]
fn make_unreadable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o000)).expect("chmod 000");
    fs::read(path).is_err()
}

#[cfg(unix)]
#[test]
fn unreadable_explicit_reference_is_fatal() {
    let temp = TempDir::new().expect("tempdir");
    write(temp.path(), "secret.go", b"package secret");
    if !make_unreadable(&temp.path().join("secret.go")) {
        return;
    }

    let err = expander(temp.path())
        .expand("Read [[secret.go]]", 3)
        .expect_err("unreadable file");
    assert!(matches!(err, ExpandError::ReadFailure { .. }), "{err}");
    assert_eq!(err.path(), "secret.go");
    assert_eq!(err.turn(), 3);
}

#[cfg(unix)]
#[test]
fn unreadable_file_in_directory_is_skipped() {
    let temp = TempDir::new().expect("tempdir");
    write(temp.path(), "pkg/a.go", b"package a");
    write(temp.path(), "pkg/b.go", b"package b");
    if !make_unreadable(&temp.path().join("pkg/b.go")) {
        return;
    }

    let expansion = expander(temp.path()).expand("[[pkg/]]", 1).expect("expand");
    assert_eq!(
        expansion.stats,
        vec![FileStat::from_content("pkg/a.go", "package a")]
    );
    assert_eq!(expansion.content, "## [1.1] pkg/a.go\n```go\npackage a\n```");
    assert_eq!(expansion.dropped, 0);
}

#[cfg(unix)]
#[test]
fn directory_with_only_unreadable_files_is_dropped() {
    let temp = TempDir::new().expect("tempdir");
    write(temp.path(), "locked/only.go", b"package only");
    if !make_unreadable(&temp.path().join("locked/only.go")) {
        return;
    }

    let expansion = expander(temp.path())
        .expand("See [[locked/]]", 1)
        .expect("expand");
    assert_eq!(expansion.content, "See ");
    assert_eq!(expansion.dropped, 1);
    assert!(expansion.changed());
}
