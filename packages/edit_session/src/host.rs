//! Main loop and shutdown aggregation.
//!
//! [`Host::serve`] reads frames sequentially, spawns one task per
//! `new_text`, and owns the single writer task that drains the outbound
//! queue. Every task it starts reports back into a [`ShutdownReport`].

use native_messaging::{FrameReader, FrameWriter, Inbound, NewText, OutboundMessage, ProtocolError};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::HostError;
use crate::outbound::Outbound;
use crate::session::{Session, SessionContext};
use crate::store::TempStore;

/// Default cap on inbound frame size (64 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Default capacity of the outbound queue.
pub const DEFAULT_OUTBOUND_QUEUE: usize = 100;

/// Runtime knobs for the host loop.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub max_frame_bytes: usize,
    pub outbound_queue: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
        }
    }
}

/// Terminal results of every top-level task.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Tasks that finished without error.
    pub completed: usize,
    pub errors: Vec<HostError>,
}

impl ShutdownReport {
    fn record(&mut self, result: Result<(), HostError>) {
        match result {
            Ok(()) => self.completed += 1,
            Err(e) => {
                error!("{}", e);
                self.errors.push(e);
            }
        }
    }

    fn record_join(&mut self, joined: Result<Result<(), HostError>, JoinError>) {
        self.record(joined.unwrap_or_else(|e| Err(HostError::Panicked(e.to_string()))));
    }

    pub fn failed(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 0 when every task succeeded, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.failed() { 1 } else { 0 }
    }
}

/// The editor host: one per process.
pub struct Host {
    store: Arc<TempStore>,
    root: CancellationToken,
    config: HostConfig,
}

impl Host {
    pub fn new(store: Arc<TempStore>, config: HostConfig) -> Self {
        Self {
            store,
            root: CancellationToken::new(),
            config,
        }
    }

    /// Serve one client until its input ends, then wait for every session it
    /// started and for the writer to flush.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> ShutdownReport
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound, rx) = Outbound::channel(self.config.outbound_queue);
        let writer_task = tokio::spawn(write_loop(FrameWriter::new(writer), rx));

        let ctx = SessionContext {
            store: self.store.clone(),
            outbound,
            root: self.root.clone(),
        };
        let mut sessions: JoinSet<Result<(), HostError>> = JoinSet::new();
        let mut report = ShutdownReport::default();
        let mut frames = FrameReader::new(reader, self.config.max_frame_bytes);

        let read_result = loop {
            tokio::select! {
                next = frames.next_message() => match next {
                    Ok(Some(Inbound::NewText(request))) => dispatch(&mut sessions, &ctx, request),
                    Ok(Some(Inbound::Other(_))) => {}
                    Ok(None) => {
                        info!("input closed");
                        break Ok(());
                    }
                    Err(e) => break Err(e),
                },
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    report.record_join(joined);
                }
            }
        };

        if let Err(e) = &read_result {
            ctx.outbound.error(e).await;
        }
        report.record(read_result.map_err(HostError::from));

        if !sessions.is_empty() {
            info!(active = sessions.len(), "waiting for open editors to exit");
        }
        while let Some(joined) = sessions.join_next().await {
            report.record_join(joined);
        }

        // Last sender goes away here; the writer drains what is queued and stops.
        drop(ctx);
        report.record_join(
            writer_task
                .await
                .map(|result| result.map_err(HostError::from)),
        );

        info!(
            completed = report.completed,
            failed = report.errors.len(),
            "host finished"
        );
        report
    }
}

fn dispatch(
    sessions: &mut JoinSet<Result<(), HostError>>,
    ctx: &SessionContext,
    request: NewText,
) {
    debug!(session = %request.id, "dispatching new_text");
    let ctx = ctx.clone();
    sessions.spawn(async move {
        let id = request.id.clone();
        Session::new(request, &ctx.root)
            .run(&ctx)
            .await
            .map_err(|source| HostError::Session { id, source })
    });
}

async fn write_loop<W>(
    mut writer: FrameWriter<W>,
    mut rx: mpsc::Receiver<OutboundMessage>,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(msg) = rx.recv().await {
        debug!(session = ?msg.session_id(), "writing outbound message");
        writer.send(&msg).await?;
    }
    Ok(())
}
