//! The line-oriented chat loop.
//!
//! Reads one query per line, answers it, and stops at end of input or when
//! the line equals the sentinel (case-insensitive). A failed turn is
//! reported and the loop continues.

use ragway_agent::Assistant;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub fn is_sentinel(line: &str, sentinel: &str) -> bool {
    line.trim().eq_ignore_ascii_case(sentinel.trim())
}

/// Counts for the closing summary.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub answered: usize,
    pub failed: usize,
}

pub async fn run<R, W>(
    assistant: &mut Assistant,
    input: R,
    out: &mut W,
    sentinel: &str,
) -> std::io::Result<SessionStats>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut stats = SessionStats::default();

    loop {
        write!(out, "  You > ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if is_sentinel(query, sentinel) {
            break;
        }

        match assistant.ask(query).await {
            Ok(answer) => {
                stats.answered += 1;
                writeln!(out)?;
                for line in answer.text.lines() {
                    writeln!(out, "  Assistant > {line}")?;
                }
                writeln!(out)?;
            }
            Err(e) => {
                stats.failed += 1;
                eprintln!("  [Error] {e}");
                writeln!(out)?;
            }
        }
    }

    Ok(stats)
}
