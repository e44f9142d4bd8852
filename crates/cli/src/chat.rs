use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as AnyhowContext, Result};
use ask_expander::Expander;
use ask_model::{ModelClient, StreamSummary};
use ask_protocol::{CancelSignal, FileStat, Role};
use ask_session::{
    find_last_human_turn, next_turn_number, parse_all, replace_turn_content, write_atomic,
    StreamOutcome, StreamWriter,
};

use crate::config::AppConfig;
use crate::report::{expansion_lines, print_line, stream_progress, streaming_message};

/// What one `ask chat` run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReport {
    pub stats: Vec<FileStat>,
    /// Whether the expanded last Human turn was written back to the document.
    pub persisted_expansion: bool,
    pub ai_turn: u32,
    pub summary: StreamSummary,
}

/// Options for a chat run that do not come from the config file.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub session: PathBuf,
    /// Hide the progress spinner.
    pub quiet: bool,
}

/// Read the session, expand references, persist the expansion, stream the reply.
///
/// Reference paths resolve against the session file's directory. Validation
/// and expansion failures stop the run before the model is contacted.
pub async fn run_chat(
    options: &ChatOptions,
    config: &AppConfig,
    client: &dyn ModelClient,
    cancel: &CancelSignal,
) -> Result<ChatReport> {
    let session = options.session.as_path();
    let document = read_session(session)?;

    let last_human = find_last_human_turn(&document)
        .with_context(|| format!("Cannot chat from {}", session.display()))?;
    let mut turns = parse_all(&document)?;

    let expander = Expander::new(config.expand.clone(), config.filter.clone())
        .with_base_dir(base_dir(session));

    let mut stats = Vec::new();
    let mut updated: Option<String> = None;
    let last_idx = turns
        .iter()
        .rposition(|turn| turn.role == Role::Human && turn.number == last_human.number);

    for (idx, turn) in turns.iter_mut().enumerate() {
        if turn.role != Role::Human {
            continue;
        }
        let expansion = expander
            .expand(&turn.content, turn.number)
            .with_context(|| format!("Failed to expand references in turn {}", turn.number))?;
        if !expansion.changed() {
            continue;
        }
        if Some(idx) == last_idx {
            updated = Some(replace_turn_content(
                &document,
                turn.number,
                Role::Human,
                &expansion.content,
            ));
        }
        stats.extend(expansion.stats);
        turn.content = expansion.content.trim().to_string();
    }

    for line in expansion_lines(&stats) {
        print_line(&line)?;
    }
    print_line(&format!("Model: {}", client.model_id()))?;
    if let Some(budget) = config.thinking_tokens() {
        print_line(&format!("Thinking: enabled (budget: {budget} tokens)"))?;
    }

    let persisted_expansion = updated.is_some();
    if let Some(updated) = updated {
        write_atomic(session, updated.as_bytes())
            .with_context(|| format!("Failed to update {}", session.display()))?;
    }

    let ai_turn = next_turn_number(&turns);
    let summary = stream_reply(session, ai_turn, &turns, client, cancel, options.quiet).await?;

    if summary.cancelled {
        print_line(&format!(
            "Response interrupted after {} tokens",
            summary.output_tokens
        ))?;
    } else {
        print_line(&format!("Response complete: {} tokens", summary.output_tokens))?;
    }

    Ok(ChatReport {
        stats,
        persisted_expansion,
        ai_turn,
        summary,
    })
}

async fn stream_reply(
    session: &Path,
    ai_turn: u32,
    turns: &[ask_protocol::Turn],
    client: &dyn ModelClient,
    cancel: &CancelSignal,
    quiet: bool,
) -> Result<StreamSummary> {
    let mut writer = StreamWriter::open(session, ai_turn)
        .with_context(|| format!("Failed to open {} for streaming", session.display()))?;
    let progress = stream_progress(quiet)?;

    let result = {
        let mut on_chunk = |chunk: &str, tokens: usize| -> Result<()> {
            writer.write_chunk(chunk)?;
            progress.set_message(streaming_message(tokens));
            Ok(())
        };
        client.stream_history(turns, cancel, &mut on_chunk).await
    };
    progress.finish_and_clear();

    let outcome = match &result {
        Ok(summary) if summary.cancelled => StreamOutcome::Interrupted {
            tokens: summary.output_tokens,
        },
        Ok(summary) => StreamOutcome::Completed {
            tokens: summary.output_tokens,
        },
        Err(_) => StreamOutcome::Completed { tokens: 0 },
    };

    let closed = writer.close(outcome);
    let summary = match (result, closed) {
        (Ok(summary), Ok(_)) => summary,
        (Ok(_), Err(close_err)) => {
            return Err(close_err).context("Failed to finish the AI turn");
        }
        (Err(model_err), Ok(_)) => {
            return Err(model_err).context("Model request failed");
        }
        (Err(model_err), Err(close_err)) => {
            log::error!("Failed to finish the AI turn: {close_err}");
            return Err(model_err).context("Model request failed");
        }
    };
    Ok(summary)
}

fn read_session(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(document) => Ok(document),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            bail!("No {} found. Run 'ask init' to start", path.display())
        }
        Err(err) => Err(err).with_context(|| format!("Failed to read {}", path.display())),
    }
}

fn base_dir(session: &Path) -> PathBuf {
    match session.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
