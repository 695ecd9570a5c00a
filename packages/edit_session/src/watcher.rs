//! Change Watcher
//!
//! Bridges filesystem notifications for one session's temp file to
//! `text_update` messages.

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{StoreError, WatchError};
use crate::outbound::Outbound;
use crate::store::TempStore;

/// Whether an event can mean the file's content changed.
///
/// Editors that save by atomic replace show up as a create or a rename onto
/// the file rather than a data modification.
fn is_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(
                RenameMode::To | RenameMode::Both | RenameMode::Any
            ))
    )
}

/// A directory watch scoped to one session's file.
pub struct ChangeWatcher {
    _watcher: Option<RecommendedWatcher>,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    filename: String,
}

impl ChangeWatcher {
    /// Start watching `dir`. Events are buffered until [`ChangeWatcher::run`]
    /// is polled, so nothing written after this returns is missed.
    pub fn start(dir: &Path, filename: &str) -> Result<Self, WatchError> {
        let (tx, events) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })
        .map_err(|source| WatchError::Start {
            path: dir.to_path_buf(),
            source,
        })?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Start {
                path: dir.to_path_buf(),
                source,
            })?;

        debug!(dir = %dir.display(), file = %filename, "watching temp directory");
        Ok(Self {
            _watcher: Some(watcher),
            events,
            filename: filename.to_string(),
        })
    }

    /// A watcher fed by hand instead of by the OS.
    #[cfg(test)]
    pub(crate) fn from_channel(
        filename: &str,
    ) -> (mpsc::UnboundedSender<notify::Result<Event>>, Self) {
        let (tx, events) = mpsc::unbounded_channel();
        let watcher = Self {
            _watcher: None,
            events,
            filename: filename.to_string(),
        };
        (tx, watcher)
    }

    /// Relay changes until the session is cancelled or its editor finishes.
    ///
    /// A closed or failing notification stream ends the watch with an error.
    pub async fn run(
        mut self,
        store: Arc<TempStore>,
        outbound: Outbound,
        cancel: CancellationToken,
        mut finished: oneshot::Receiver<()>,
    ) -> Result<(), WatchError> {
        loop {
            tokio::select! {
                biased;
                event = self.events.recv() => match event {
                    Some(Ok(event)) => self.handle(event, &store, &outbound).await?,
                    Some(Err(e)) => {
                        warn!(file = %self.filename, "watcher error: {}", e);
                        return Err(WatchError::Notify(e));
                    }
                    None => return Err(WatchError::Closed),
                },
                _ = &mut finished => {
                    debug!(file = %self.filename, "editor finished, stopping watcher");
                    return Ok(());
                }
                _ = cancel.cancelled() => {
                    debug!(file = %self.filename, "watcher cancelled");
                    return Ok(());
                }
            }
        }
    }

    async fn handle(
        &self,
        event: Event,
        store: &TempStore,
        outbound: &Outbound,
    ) -> Result<(), WatchError> {
        if !is_write(&event.kind) {
            return Ok(());
        }

        let ours = event
            .paths
            .iter()
            .filter_map(|p| p.file_name())
            .any(|name| name == self.filename.as_str());
        if !ours {
            return Ok(());
        }

        match store.read(&self.filename).await {
            Ok((id, text)) => {
                debug!(session = %id, len = text.len(), kind = ?event.kind, "file changed");
                outbound.text_update(&id, text).await;
                Ok(())
            }
            Err(e) if e.is_unknown_file() => {
                debug!(file = %self.filename, "ignoring event for file with no live session");
                Ok(())
            }
            Err(StoreError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                // Mid-replace; the create/rename event follows.
                debug!(file = %self.filename, "file vanished before read");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
