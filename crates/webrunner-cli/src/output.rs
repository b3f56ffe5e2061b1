//! JSON lines written to stdout.

use std::io::Write;

use serde::Serialize;
use serde_json::Value;
use webrunner_core::RunnerEvent;
use webrunner_runtime::RunnerSnapshot;

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputLine<'a> {
    Mount { url: &'a str, script_bytes: usize },
    Unmount,
    Inject { script: &'a str },
    Reload,
    Forwarded { envelope: &'a Value },
    Event { event: RunnerEvent },
    State { snapshot: &'a RunnerSnapshot },
    UpdatePrompt {
        detected_major: u32,
        minimum_major: u32,
        store_url: &'a str,
    },
    Error { message: String },
}

/// Write one line. Stdout is locked per line so concurrent writers never
/// interleave.
pub fn emit(line: &OutputLine<'_>) {
    let json = match serde_json::to_string(line) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode output line");
            return;
        }
    };
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{json}").and_then(|()| stdout.flush()) {
        tracing::warn!(error = %e, "Failed to write output line");
    }
}
