use native_messaging::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from the temp file store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to create temp directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to create temp file in {dir}: {source}")]
    CreateFile {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write temp file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read temp file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No live session owns this file. Never reported to the client.
    #[error("{0} is not a live session file")]
    UnknownFile(String),
}

impl StoreError {
    pub fn is_unknown_file(&self) -> bool {
        matches!(self, StoreError::UnknownFile(_))
    }
}

/// Errors decoding the editor argument template.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("invalid editor command: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("editor command is empty")]
    Empty,
}

/// Errors from the directory watcher.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to watch {path}: {source}")]
    Start {
        path: PathBuf,
        source: notify::Error,
    },

    #[error("watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error("watcher event stream closed")]
    Closed,

    #[error("failed to publish update: {0}")]
    Store(#[from] StoreError),

    #[error("watcher task aborted: {0}")]
    Aborted(String),
}

/// Errors launching or waiting on the editor process.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },

    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Exited {
        program: String,
        status: std::process::ExitStatus,
    },
}

/// Terminal error of one editing session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Editor(#[from] EditorError),
}

/// Terminal error of one top-level host task.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("session {id} failed: {source}")]
    Session { id: String, source: SessionError },

    #[error("task panicked: {0}")]
    Panicked(String),
}
