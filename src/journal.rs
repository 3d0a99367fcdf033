//! Timestamped run journal.
//!
//! Every command reply and every reconciled bot event is written as one
//! `[HH:MM:SS] <text>` line, to stdout and to the result file.

use std::fmt::Display;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Local, Utc};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::worker::BotEvent;

pub const DEFAULT_RESULT_PATH: &str = "scripts/result.txt";

#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    file: Mutex<File>,
}

impl Journal {
    /// Create (or truncate) the result file, creating parent directories.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one line stamped with `at` in local time.
    pub fn record(&self, at: DateTime<Utc>, text: impl Display) {
        let line = format!("{} {}", stamp(at), text);
        println!("{}", line);

        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(file, "{}", line) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write journal line");
        }
    }

    /// Journal every event from `events` until `done` is cancelled, then
    /// drain whatever is already buffered.
    pub fn follow(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<BotEvent>,
        done: CancellationToken,
    ) -> JoinHandle<()> {
        let journal = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    received = events.recv() => match received {
                        Ok(event) => journal.record(event.timestamp, &event),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Journal fell behind the event stream");
                        }
                        Err(RecvError::Closed) => return,
                    },
                    _ = done.cancelled() => break,
                }
            }

            loop {
                match events.try_recv() {
                    Ok(event) => journal.record(event.timestamp, &event),
                    Err(TryRecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Journal fell behind the event stream");
                    }
                    Err(_) => break,
                }
            }
        })
    }
}

/// `[HH:MM:SS]` in local time
pub fn stamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("[%H:%M:%S]").to_string()
}
