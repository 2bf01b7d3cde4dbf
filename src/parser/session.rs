//! Long-lived external parser process.
//!
//! The protocol carries no request identifiers, so at most one request may
//! be in flight: the transport sits behind a mutex and every call holds it
//! until the full reply has been read. A watchdog thread kills the process
//! once it outlives its configured lifetime; later requests then fail with
//! a stream error.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::parser::{FileRecord, ImportParser, ParseRequest, ParserError};
use crate::util::process::ProcessBuilder;

/// Default bound on the parser process lifetime.
pub const DEFAULT_PARSER_LIFETIME: Duration = Duration::from_secs(5 * 60);

struct Transport {
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

struct Watchdog {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// A running parser process.
pub struct ParserSession {
    command: String,
    transport: Mutex<Transport>,
    child: Arc<Mutex<Child>>,
    watchdog: Option<Watchdog>,
}

impl ParserSession {
    /// Spawn the parser and its watchdog.
    pub fn start(process: &ProcessBuilder, lifetime: Duration) -> Result<Self> {
        let command = process.display_command();
        let mut child = process.spawn_piped()?;

        let stdin = child
            .stdin
            .take()
            .with_context(|| format!("failed to open stdin of `{}`", command))?;
        let stdout = child
            .stdout
            .take()
            .with_context(|| format!("failed to open stdout of `{}`", command))?;

        let child = Arc::new(Mutex::new(child));
        let watchdog = spawn_watchdog(Arc::clone(&child), command.clone(), lifetime)?;

        tracing::debug!("started parser `{}`", command);

        Ok(ParserSession {
            command,
            transport: Mutex::new(Transport {
                stdin: Some(stdin),
                stdout: BufReader::new(stdout),
            }),
            child,
            watchdog: Some(watchdog),
        })
    }

    /// Send one request and read its reply.
    pub fn request(&self, request: &ParseRequest) -> Result<Vec<FileRecord>, ParserError> {
        let mut guard = self.transport.lock().map_err(|_| ParserError::Poisoned)?;
        let transport = &mut *guard;

        let stdin = transport.stdin.as_mut().ok_or(ParserError::Closed)?;
        serde_json::to_writer(&mut *stdin, request).map_err(ParserError::Encode)?;
        stdin.write_all(b"\n")?;
        stdin.flush()?;

        let mut reply = Vec::new();
        transport.stdout.read_until(0, &mut reply)?;
        if reply.pop() != Some(0) {
            return Err(ParserError::Exited);
        }

        let records: Vec<FileRecord> =
            serde_json::from_slice(&reply).map_err(ParserError::Malformed)?;
        if records.len() != request.filenames.len() {
            return Err(ParserError::RecordCount {
                expected: request.filenames.len(),
                found: records.len(),
            });
        }
        Ok(records)
    }

    /// Close the parser's input and reap the process.
    pub fn shutdown(&mut self) -> Result<()> {
        if let Ok(mut transport) = self.transport.lock() {
            // Dropping stdin signals end of input.
            transport.stdin.take();
        }

        if let Some(watchdog) = self.watchdog.take() {
            let _ = watchdog.stop.send(());
            let _ = watchdog.handle.join();
        }

        let mut child = self
            .child
            .lock()
            .map_err(|_| anyhow::anyhow!("parser process lock poisoned"))?;
        // The process may already be gone; only the wait result matters.
        let _ = child.kill();
        child
            .wait()
            .with_context(|| format!("failed to wait for parser `{}`", self.command))?;
        Ok(())
    }
}

impl ImportParser for ParserSession {
    fn parse(&self, request: &ParseRequest) -> Result<Vec<FileRecord>, ParserError> {
        self.request(request)
    }
}

impl Drop for ParserSession {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("{:#}", e);
        }
    }
}

fn spawn_watchdog(
    child: Arc<Mutex<Child>>,
    command: String,
    lifetime: Duration,
) -> Result<Watchdog> {
    let (stop, stopped) = mpsc::channel::<()>();
    let handle = thread::Builder::new()
        .name("quay-parser-watchdog".to_string())
        .spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = stopped.recv_timeout(lifetime) {
                tracing::error!(
                    "parser `{}` exceeded its lifetime of {}s, terminating it",
                    command,
                    lifetime.as_secs()
                );
                if let Ok(mut child) = child.lock() {
                    let _ = child.kill();
                }
            }
        })
        .context("failed to start parser watchdog")?;

    Ok(Watchdog { stop, handle })
}
