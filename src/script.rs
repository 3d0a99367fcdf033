//! Command grammar shared by the interactive REPL and script replay.
//!
//! ```text
//! n | normal            submit a NORMAL order
//! v | vip | h | high    submit a HIGH order
//! + | add | add-bot     grow the bot pool
//! - | del | del-bot     shrink the bot pool (newest bot first)
//! s | status            print the compact status line
//! wait <ms>             sleep before the next command
//! quit | exit           stop reading commands
//! ```

use std::str::FromStr;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

use crate::error::{OrderlineError, Result};
use crate::scheduler::{Order, OrderClass, Scheduler};
use crate::status::StatusSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit(OrderClass),
    AddBot,
    RemoveBot,
    Status,
    Wait(Duration),
    Quit,
}

impl FromStr for Command {
    type Err = OrderlineError;

    fn from_str(line: &str) -> Result<Self> {
        let lower = line.trim().to_ascii_lowercase();
        let mut parts = lower.split_whitespace();
        let Some(head) = parts.next() else {
            return Err(OrderlineError::UnknownCommand(String::new()));
        };

        let command = match head {
            "+" | "add" | "add-bot" => Command::AddBot,
            "-" | "del" | "del-bot" => Command::RemoveBot,
            "s" | "status" => Command::Status,
            "quit" | "exit" => Command::Quit,
            "wait" => {
                let ms = parts
                    .next()
                    .ok_or_else(|| OrderlineError::InvalidArgument("usage: wait <ms>".into()))?;
                let ms: u64 = ms.parse().map_err(|_| {
                    OrderlineError::InvalidArgument(format!("invalid wait duration: {}", ms))
                })?;
                Command::Wait(Duration::from_millis(ms))
            }
            other => match other.parse::<OrderClass>() {
                Ok(class) => Command::Submit(class),
                Err(_) => return Err(OrderlineError::UnknownCommand(line.trim().to_string())),
            },
        };

        if parts.next().is_some() {
            return Err(OrderlineError::InvalidArgument(format!(
                "unexpected arguments: {}",
                line.trim()
            )));
        }
        Ok(command)
    }
}

/// What a command did, for the caller to render.
#[derive(Debug, Clone)]
pub enum Reply {
    Submitted(Order),
    BotAdded(u64),
    BotRemoved(u64),
    Status(StatusSnapshot),
    Waited(Duration),
    Quit,
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Submitted(order) => write!(f, "NEW {} ORDER #{}", order.class, order.id),
            Reply::BotAdded(id) => write!(f, "BOT + #{}", id),
            Reply::BotRemoved(id) => write!(f, "BOT - #{}", id),
            Reply::Status(snapshot) => write!(f, "STATUS {}", snapshot),
            Reply::Waited(d) => write!(f, "WAITED {}ms", d.as_millis()),
            Reply::Quit => write!(f, "BYE"),
        }
    }
}

/// Execute one command against the scheduler.
///
/// `wait` returns `Cancelled` as soon as `stop` fires.
pub async fn dispatch(
    scheduler: &Scheduler,
    command: Command,
    stop: &CancellationToken,
) -> Result<Reply> {
    match command {
        Command::Submit(class) => scheduler.submit(class).await.map(Reply::Submitted),
        Command::AddBot => scheduler.grow_pool().await.map(Reply::BotAdded),
        Command::RemoveBot => scheduler.shrink_pool().await.map(Reply::BotRemoved),
        Command::Status => Ok(Reply::Status(scheduler.status().await)),
        Command::Wait(d) => tokio::select! {
            biased;
            _ = stop.cancelled() => Err(OrderlineError::Cancelled),
            _ = tokio::time::sleep(d) => Ok(Reply::Waited(d)),
        },
        Command::Quit => Ok(Reply::Quit),
    }
}

/// Parse and execute one input line. Blank lines and `#` comments yield `None`.
pub async fn dispatch_line(
    scheduler: &Scheduler,
    line: &str,
    stop: &CancellationToken,
) -> Result<Option<Reply>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let command: Command = line.parse()?;
    dispatch(scheduler, command, stop).await.map(Some)
}

/// Replay commands from `reader` until EOF, `quit` or `stop`.
///
/// A failing command is logged and skipped. Only I/O errors abort the run.
/// Returns the number of commands that succeeded.
pub async fn run_script<R, F>(
    scheduler: &Scheduler,
    reader: R,
    stop: &CancellationToken,
    mut on_reply: F,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    F: FnMut(&Reply),
{
    let mut lines = reader.lines();
    let mut executed = 0;

    loop {
        let line = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };

        match dispatch_line(scheduler, &line, stop).await {
            Ok(Some(reply)) => {
                executed += 1;
                on_reply(&reply);
                if matches!(reply, Reply::Quit) {
                    break;
                }
            }
            Ok(None) => {}
            Err(OrderlineError::Cancelled) => break,
            Err(e) => {
                tracing::warn!(line = %line.trim(), error = %e, "Command failed");
            }
        }
    }

    if stop.is_cancelled() {
        tracing::info!(executed, "Script interrupted");
    }
    Ok(executed)
}
