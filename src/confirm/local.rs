//! Local interactive prompt backend.
//!
//! Synchronous stdin reads run on the blocking pool so the single
//! logical flow can await them like any other confirmation source.

use std::io::{BufRead, Write};

use crate::{AppError, Result};

/// Print a prompt and read one trimmed line from stdin.
///
/// There is no timeout; the flow suspends until the operator answers.
///
/// # Errors
///
/// Returns `AppError::Confirm` if stdin is closed or unreadable.
pub async fn prompt_line(message: &str) -> Result<String> {
    let message = message.to_owned();
    tokio::task::spawn_blocking(move || read_line_blocking(&message))
        .await
        .map_err(|err| AppError::Confirm(format!("prompt task panicked: {err}")))?
}

fn read_line_blocking(message: &str) -> Result<String> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{message} ")
        .and_then(|()| stdout.flush())
        .map_err(|err| AppError::Confirm(format!("failed to write prompt: {err}")))?;

    let mut line = String::new();
    let read = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|err| AppError::Confirm(format!("failed to read local input: {err}")))?;
    if read == 0 {
        return Err(AppError::Confirm("stdin closed while awaiting input".into()));
    }
    Ok(line.trim().to_owned())
}
