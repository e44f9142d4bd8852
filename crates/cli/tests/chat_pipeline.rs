use std::fs;
use std::path::PathBuf;

use ask_cli::chat::{run_chat, ChatOptions};
use ask_cli::config::AppConfig;
use ask_expander::ExpandError;
use ask_model::ScriptedClient;
use ask_protocol::{new_cancel_signal, FileStat, Role};
use ask_session::{parse_all, SessionError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn workspace(document: &str) -> (TempDir, PathBuf) {
    let temp = TempDir::new().expect("tempdir");
    let session = temp.path().join("session.md");
    fs::write(&session, document).expect("seed session");
    (temp, session)
}

fn options(session: &PathBuf) -> ChatOptions {
    ChatOptions {
        session: session.clone(),
        quiet: true,
    }
}

#[tokio::test]
async fn completed_reply_is_appended_with_next_human_turn() {
    let (_temp, session) = workspace("# [1] Human\n\nSay hello\n");
    let client = ScriptedClient::new(["Hello", " world"]);
    let cancel = new_cancel_signal();

    let report = run_chat(&options(&session), &AppConfig::default(), &client, &cancel)
        .await
        .expect("chat");

    assert_eq!(report.ai_turn, 2);
    assert!(!report.summary.cancelled);
    assert!(!report.persisted_expansion);

    let document = fs::read_to_string(&session).expect("read");
    assert!(document.starts_with("# [1] Human\n\nSay hello\n"), "{document}");
    assert!(
        document.contains("# [2] AI\n\n````markdown\nHello world\n````\n"),
        "{document}"
    );
    assert!(document.ends_with("# [3] Human\n\n"), "{document}");
}

#[tokio::test]
async fn cancelled_reply_keeps_partial_text() {
    let (_temp, session) = workspace("# [1] Human\n\nWrite an essay\n");
    let client = ScriptedClient::new(["Partial", " more"]).cancel_after(1);
    let cancel = new_cancel_signal();

    let report = run_chat(&options(&session), &AppConfig::default(), &client, &cancel)
        .await
        .expect("chat");
    assert!(report.summary.cancelled);

    let document = fs::read_to_string(&session).expect("read");
    let turns = parse_all(&document).expect("parse");
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[1].content, "Partial\n[Interrupted after 1 tokens]");
    assert_eq!(turns[2].role, Role::Human);
    assert_eq!(turns[2].number, 3);
}

#[tokio::test]
async fn last_human_expansion_is_persisted_before_streaming() {
    let (temp, session) = workspace("# [1] Human\n\n[[a.go]]\n");
    fs::write(temp.path().join("a.go"), "package a").expect("fixture");
    let client = ScriptedClient::new(["ok"]);
    let cancel = new_cancel_signal();

    let report = run_chat(&options(&session), &AppConfig::default(), &client, &cancel)
        .await
        .expect("chat");

    assert!(report.persisted_expansion);
    assert_eq!(report.stats, vec![FileStat::from_content("a.go", "package a")]);

    let expanded = "## [1.1] a.go\n```go\npackage a\n```";
    let document = fs::read_to_string(&session).expect("read");
    assert!(
        document.starts_with(&format!("# [1] Human\n\n{expanded}\n")),
        "{document}"
    );

    let sent = client.received();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0][0].content, expanded);
}

#[tokio::test]
async fn binary_only_directory_reference_is_replaced() {
    let (temp, session) = workspace("# [1] Human\n\nSee [[bins/]]\n");
    fs::create_dir_all(temp.path().join("bins")).expect("fixture dir");
    fs::write(temp.path().join("bins/a.go"), b"pack\x00age").expect("fixture");
    let client = ScriptedClient::new(["ok"]);
    let cancel = new_cancel_signal();

    let report = run_chat(&options(&session), &AppConfig::default(), &client, &cancel)
        .await
        .expect("chat");

    assert!(report.persisted_expansion);
    assert!(report.stats.is_empty());
    assert_eq!(client.received()[0][0].content, "See");

    let document = fs::read_to_string(&session).expect("read");
    assert!(document.starts_with("# [1] Human\n\nSee\n"), "{document}");
    assert!(!document.contains("[[bins/]]"), "{document}");
}

#[tokio::test]
async fn earlier_turns_are_expanded_for_the_model_only() {
    let (temp, session) = workspace(
        "# [1] Human\n\n[[a.go]]\n\n# [2] AI\n\n````markdown\nSeen it\n````\n\n# [3] Human\n\nThanks\n",
    );
    fs::write(temp.path().join("a.go"), "package a").expect("fixture");
    let client = ScriptedClient::new(["Welcome"]);
    let cancel = new_cancel_signal();

    let report = run_chat(&options(&session), &AppConfig::default(), &client, &cancel)
        .await
        .expect("chat");

    assert!(!report.persisted_expansion);
    assert_eq!(report.ai_turn, 4);

    let sent = &client.received()[0];
    assert_eq!(sent.len(), 3);
    assert!(sent[0].content.starts_with("## [1.1] a.go"));
    assert_eq!(sent[1].content, "Seen it");

    let document = fs::read_to_string(&session).expect("read");
    assert!(document.starts_with("# [1] Human\n\n[[a.go]]\n"), "{document}");
}

#[tokio::test]
async fn empty_last_human_turn_stops_before_the_model() {
    let original = "# [1] Human\n\nq\n\n# [2] AI\n\n````markdown\na\n````\n\n# [3] Human\n\n";
    let (_temp, session) = workspace(original);
    let client = ScriptedClient::new(["never"]);
    let cancel = new_cancel_signal();

    let err = run_chat(&options(&session), &AppConfig::default(), &client, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<SessionError>(),
        Some(SessionError::EmptyTurnContent { turn: 3 })
    ));
    assert!(client.received().is_empty());
    assert_eq!(fs::read_to_string(&session).expect("read"), original);
}

#[tokio::test]
async fn missing_reference_leaves_document_untouched() {
    let original = "# [1] Human\n\nExplain [[missing.go]]\n";
    let (_temp, session) = workspace(original);
    let client = ScriptedClient::new(["never"]);
    let cancel = new_cancel_signal();

    let err = run_chat(&options(&session), &AppConfig::default(), &client, &cancel)
        .await
        .unwrap_err();

    match err.downcast_ref::<ExpandError>() {
        Some(ExpandError::NotFound { path, turn }) => {
            assert_eq!(path, "missing.go");
            assert_eq!(*turn, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(client.received().is_empty());
    assert_eq!(fs::read_to_string(&session).expect("read"), original);
}

#[tokio::test]
async fn model_failure_still_closes_the_ai_turn() {
    let (_temp, session) = workspace("# [1] Human\n\nq\n");
    let client = ScriptedClient::new(["Half", " rest"]).fail_after(1);
    let cancel = new_cancel_signal();

    let err = run_chat(&options(&session), &AppConfig::default(), &client, &cancel)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("Overloaded"), "{err:#}");

    let document = fs::read_to_string(&session).expect("read");
    assert!(document.contains("````markdown\nHalf\n````\n"), "{document}");
    assert!(!document.contains("[Interrupted"));
    assert!(document.ends_with("# [3] Human\n\n"), "{document}");
}

#[tokio::test]
async fn missing_session_suggests_init() {
    let temp = TempDir::new().expect("tempdir");
    let session = temp.path().join("absent.md");
    let client = ScriptedClient::new(["x"]);
    let cancel = new_cancel_signal();

    let err = run_chat(&options(&session), &AppConfig::default(), &client, &cancel)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Run 'ask init' to start"), "{err}");
}
