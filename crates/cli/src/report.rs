use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use ask_protocol::FileStat;
use indicatif::{ProgressBar, ProgressStyle};

/// Write one status line to stdout, ignoring a closed pipe.
pub(crate) fn print_line(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.write_all(b"\n"))
        .and_then(|()| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

pub(crate) fn expansion_lines(stats: &[FileStat]) -> Vec<String> {
    if stats.is_empty() {
        return Vec::new();
    }
    let mut lines = Vec::with_capacity(stats.len() + 1);
    let noun = if stats.len() == 1 { "reference" } else { "references" };
    lines.push(format!("Expanding {} file {noun}...", stats.len()));
    lines.extend(
        stats
            .iter()
            .map(|stat| format!("  {} ({} tokens)", stat.path, stat.tokens)),
    );
    lines
}

pub(crate) fn streaming_message(tokens: usize) -> String {
    format!("Streaming response... {tokens} tokens [ctrl+c to interrupt]")
}

/// Spinner on stderr showing the running token count; hidden when `quiet`.
pub(crate) fn stream_progress(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    progress.set_message(streaming_message(0));
    progress.enable_steady_tick(Duration::from_millis(120));
    Ok(progress)
}
