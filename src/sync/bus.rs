//! The sync bus: one JSON command in a shared file, replaced atomically

use std::io;
use std::path::{Path, PathBuf};

use crate::error::SyncReadError;
use crate::models::{BusCommand, BusMessage};
use crate::utils::filesystem::write_atomic;

/// Reader and writer of the bus file
#[derive(Debug, Clone)]
pub struct SyncBus {
    path: PathBuf,
    last_written: Option<i64>,
}

impl SyncBus {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_written: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current command; `Ok(None)` when there is no bus file
    pub fn try_read(&self) -> Result<Option<BusMessage>, SyncReadError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Err(SyncReadError::Empty);
        }

        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Read the current command, treating every failure as "no command"
    pub fn read(&self) -> Option<BusMessage> {
        match self.try_read() {
            Ok(msg) => msg,
            Err(e) => {
                tracing::trace!("ignoring bus file: {}", e);
                None
            }
        }
    }

    /// Write a new command and return its version
    ///
    /// The version is one past the newest seen in the file or written by this bus,
    /// 0 when neither exists.
    pub fn broadcast(
        &mut self,
        cmd: BusCommand,
        sid: Option<String>,
        index: Option<usize>,
        title: Option<String>,
        at_utc: f64,
        write_utc: f64,
    ) -> io::Result<i64> {
        let previous = match (self.read().map(|m| m.v), self.last_written) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let v = previous.map(|v| v + 1).unwrap_or(0);

        let msg = BusMessage {
            v,
            cmd,
            sid,
            title,
            index: BusMessage::encode_index(index),
            at_utc,
            write_utc,
        };

        let content = serde_json::to_vec(&msg)?;
        write_atomic(&self.path, &content)?;
        self.last_written = Some(v);

        tracing::debug!("broadcast v{} {} at {:.3}", v, cmd, at_utc);
        Ok(v)
    }
}
