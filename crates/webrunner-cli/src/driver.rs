//! Stdin line protocol.
//!
//! Lines starting with `:` are host commands, anything else is handed to
//! the runner as a raw envelope. Input ends at EOF.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use webrunner_core::Subscription;
use webrunner_runtime::{AppState, WebRunnerHandle};

use crate::output::{OutputLine, emit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    Foreground,
    Background,
    Online,
    Offline,
    Sleep,
    Activate,
    Reload,
    Rerender,
    State,
}

impl HostCommand {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "foreground" => Self::Foreground,
            "background" => Self::Background,
            "online" => Self::Online,
            "offline" => Self::Offline,
            "sleep" => Self::Sleep,
            "activate" => Self::Activate,
            "reload" => Self::Reload,
            "rerender" => Self::Rerender,
            "state" => Self::State,
            _ => return None,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Command(HostCommand),
    Envelope(&'a str),
    Unknown(&'a str),
}

impl<'a> Input<'a> {
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        Some(match line.strip_prefix(':') {
            Some(name) => HostCommand::parse(name).map_or(Input::Unknown(name), Input::Command),
            None => Input::Envelope(line),
        })
    }
}

/// Drive `runner` from stdin until EOF, mirroring bus events to stdout.
pub async fn run(runner: &WebRunnerHandle, mut events: Subscription) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Input::parse(&line) {
                    None => {}
                    Some(Input::Envelope(raw)) => runner.deliver(raw)?,
                    Some(Input::Command(command)) => apply(runner, command).await?,
                    Some(Input::Unknown(name)) => emit(&OutputLine::Error {
                        message: format!("unknown command :{name}"),
                    }),
                }
            }
            Some(event) = events.recv() => emit(&OutputLine::Event { event }),
        }
    }

    // Round-trip once so everything queued before EOF has been handled.
    runner.snapshot().await?;
    for event in events.drain() {
        emit(&OutputLine::Event { event });
    }
    Ok(())
}

async fn apply(runner: &WebRunnerHandle, command: HostCommand) -> Result<()> {
    tracing::debug!(command = ?command, "Host command");
    match command {
        HostCommand::Foreground => runner.app_state_changed(AppState::Foreground)?,
        HostCommand::Background => runner.app_state_changed(AppState::Background)?,
        HostCommand::Online => runner.connectivity_changed(Some(true))?,
        HostCommand::Offline => runner.connectivity_changed(Some(false))?,
        HostCommand::Sleep => runner.sleep()?,
        HostCommand::Activate => runner.activate()?,
        HostCommand::Reload => runner.reload()?,
        HostCommand::Rerender => runner.rerender()?,
        HostCommand::State => {
            let snapshot = runner.snapshot().await?;
            emit(&OutputLine::State {
                snapshot: &snapshot,
            });
        }
    }
    Ok(())
}
