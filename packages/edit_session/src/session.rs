//! Session Orchestrator
//!
//! Drives one `new_text` request end to end:
//!
//! ```text
//! Created ──create file──▶ FileWritten ──start watcher, launch editor──▶ Running
//!    │                          │                                          │
//!    │ (store error)            │ (template / watch error)                 │ editor exits
//!    ▼                          ▼                                          ▼
//! Terminated ◀──────────────────────────── cleanup ◀───────────────── Draining
//! ```
//!
//! Cleanup is unconditional and ordered: cancel the watcher scope, report any
//! error, clear the registry entry, delete the file, send `death_notice`.

use native_messaging::NewText;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::editor::{self, parse_template, resolve_args};
use crate::error::{SessionError, WatchError};
use crate::outbound::Outbound;
use crate::position::CaretPosition;
use crate::store::{TempFile, TempStore};
use crate::watcher::ChangeWatcher;

/// Lifecycle stage of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    FileWritten,
    Running,
    Draining,
    Terminated,
}

/// Shared collaborators every session needs.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub store: Arc<TempStore>,
    pub outbound: Outbound,
    /// Process-wide scope; each session derives its own child from it.
    pub root: CancellationToken,
}

/// One editing session.
pub struct Session {
    request: NewText,
    state: SessionState,
    scope: CancellationToken,
    /// A watcher failure seen while the editor was still open has already
    /// been sent to the client.
    watch_error_reported: bool,
}

fn flatten_join(joined: Result<Result<(), WatchError>, JoinError>) -> Result<(), WatchError> {
    joined.unwrap_or_else(|e| Err(WatchError::Aborted(e.to_string())))
}

impl Session {
    pub fn new(request: NewText, root: &CancellationToken) -> Self {
        Self {
            request,
            state: SessionState::Created,
            scope: root.child_token(),
            watch_error_reported: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.request.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug!(session = %self.request.id, from = ?self.state, to = ?next, "session transition");
        self.state = next;
    }

    /// Run the session to completion. Always ends with a `death_notice`.
    pub async fn run(mut self, ctx: &SessionContext) -> Result<(), SessionError> {
        info!(session = %self.id(), subject = %self.request.subject, "starting edit session");

        let (file, result) = match ctx.store.create(&self.request).await {
            Ok(file) => {
                self.transition(SessionState::FileWritten);
                let result = self.edit(ctx, &file).await;
                (Some(file), result)
            }
            Err(e) => (None, Err(e.into())),
        };

        self.terminate(ctx, file.as_ref(), &result).await;
        result
    }

    async fn edit(&mut self, ctx: &SessionContext, file: &TempFile) -> Result<(), SessionError> {
        let args = self.editor_args(file)?;
        let watcher = ChangeWatcher::start(ctx.store.dir(), &file.filename)?;
        self.supervise(ctx, watcher, &args).await
    }

    fn editor_args(&self, file: &TempFile) -> Result<Vec<String>, SessionError> {
        let template = parse_template(self.request.editor_template())?;
        let caret = CaretPosition::locate(&self.request.text, self.request.caret);
        let args = resolve_args(&template, &file.path, caret);
        debug!(session = %self.id(), ?args, line = caret.line, column = caret.column, "resolved editor arguments");
        Ok(args)
    }

    /// Run the editor with `watcher` relaying saves until it exits.
    async fn supervise(
        &mut self,
        ctx: &SessionContext,
        watcher: ChangeWatcher,
        args: &[String],
    ) -> Result<(), SessionError> {
        let (finished_tx, finished_rx) = oneshot::channel();
        let mut watch_task = tokio::spawn(watcher.run(
            ctx.store.clone(),
            ctx.outbound.clone(),
            self.scope.clone(),
            finished_rx,
        ));
        self.transition(SessionState::Running);

        let mut editor_exit = std::pin::pin!(editor::run(args));
        let mut watch_result = None;
        let editor_result = loop {
            tokio::select! {
                result = &mut editor_exit => break result,
                joined = &mut watch_task, if watch_result.is_none() => {
                    let result = flatten_join(joined);
                    if let Err(e) = &result {
                        warn!(session = %self.request.id, "watcher stopped early: {}", e);
                        ctx.outbound.error(e).await;
                        self.watch_error_reported = true;
                    }
                    watch_result = Some(result);
                }
            }
        };
        self.transition(SessionState::Draining);

        // Non-blocking; dropped if the watcher is already gone.
        let _ = finished_tx.send(());
        self.scope.cancel();

        let watch_result = match watch_result {
            Some(result) => result,
            None => flatten_join(watch_task.await),
        };

        editor_result?;
        watch_result?;
        Ok(())
    }

    async fn terminate(
        &mut self,
        ctx: &SessionContext,
        file: Option<&TempFile>,
        result: &Result<(), SessionError>,
    ) {
        self.scope.cancel();

        if let Err(e) = result {
            let already_sent = matches!(e, SessionError::Watch(_)) && self.watch_error_reported;
            warn!(session = %self.request.id, "edit session failed: {}", e);
            if !already_sent {
                ctx.outbound.error(e).await;
            }
        }

        if let Some(file) = file {
            ctx.store.registry().clear(&file.filename).await;
            ctx.store.remove(&file.path).await;
        }

        ctx.outbound.death_notice(&self.request.id).await;
        self.transition(SessionState::Terminated);
        info!(session = %self.request.id, "edit session ended");
    }
}
