//! TCP bridge to the platform sidecar.
//!
//! The sidecar owns the authenticated platform session. It forwards every
//! feed notification as a `{"kind":"event"}` line and answers each request
//! line with a `{"kind":"reply"}` line carrying the same `id`.
//!
//! # Architecture
//!
//! - **Writer task**: drains an mpsc queue of [`Request`]s into the socket.
//! - **Reader task**: routes replies to the waiting caller through a map of
//!   pending oneshot senders, and pushes decoded events onto the feed. A
//!   full feed drops the event rather than stall reply routing.
//! - **Shutdown**: when the socket closes the feed ends and every pending
//!   call resolves to [`PlatformError::Disconnected`].

use super::PlatformClient;
use crate::error::PlatformError;
use crate::metrics;
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use nickwarden_proto::{Event, Frame, Op, Request, ThreadInfo};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, warn};

/// Longest line accepted from the sidecar. App-state exports are the largest frames.
const MAX_LINE_LENGTH: usize = 4 * 1024 * 1024;

/// Outbound requests buffered before callers wait on the writer.
const OUTBOUND_QUEUE_SIZE: usize = 64;

type ReplySender = oneshot::Sender<Result<Value, String>>;

/// [`PlatformClient`] backed by a line-delimited JSON bridge.
pub struct BridgeClient {
    outbound: mpsc::Sender<Request>,
    pending: Arc<DashMap<u64, ReplySender>>,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
}

impl BridgeClient {
    /// Connect to the sidecar and start the I/O tasks.
    ///
    /// Returns the client and the receiving end of the event feed.
    pub async fn connect(
        addr: &str,
        event_buffer: usize,
    ) -> Result<(Self, mpsc::Receiver<Event>), PlatformError> {
        let stream = TcpStream::connect(addr).await?;
        info!(addr = %addr, "Connected to platform bridge");
        Ok(Self::from_stream(stream, event_buffer))
    }

    /// Run the bridge protocol over an already-established stream.
    pub fn from_stream<S>(stream: S, event_buffer: usize) -> (Self, mpsc::Receiver<Event>)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        let (mut sink, mut source) = framed.split();

        let (outbound, mut outbound_rx) = mpsc::channel::<Request>(OUTBOUND_QUEUE_SIZE);
        let (event_tx, event_rx) = mpsc::channel::<Event>(event_buffer);
        let pending: Arc<DashMap<u64, ReplySender>> = Arc::new(DashMap::new());
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(async move {
            while let Some(request) = outbound_rx.recv().await {
                let line = match request.to_line() {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(op = request.op.name(), error = %e, "Failed to encode bridge request");
                        continue;
                    }
                };
                if let Err(e) = sink.send(line).await {
                    warn!(error = %e, "Bridge write failed");
                    break;
                }
            }
        });

        {
            let pending = Arc::clone(&pending);
            let closed = Arc::clone(&closed);
            tokio::spawn(async move {
                while let Some(line) = source.next().await {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            warn!(error = %e, "Bridge read failed");
                            break;
                        }
                    };

                    match Frame::from_line(&line) {
                        // Never wait on the feed: replies behind this event must still be routed.
                        Ok(Frame::Event { event }) => match Event::from_value(event) {
                            Ok(event) => match event_tx.try_send(event) {
                                Ok(()) => {}
                                Err(TrySendError::Full(event)) => {
                                    metrics::record_dropped_event();
                                    warn!(
                                        thread = event.thread_id().unwrap_or_default(),
                                        "Event feed full, dropping platform event"
                                    );
                                }
                                Err(TrySendError::Closed(_)) => {
                                    debug!("Event feed receiver dropped");
                                    break;
                                }
                            },
                            Err(e) => warn!(error = %e, "Dropping malformed platform event"),
                        },
                        Ok(Frame::Reply { id, error, result }) => {
                            match pending.remove(&id) {
                                Some((_, tx)) => {
                                    let _ = tx.send(match error {
                                        Some(reason) => Err(reason),
                                        None => Ok(result),
                                    });
                                }
                                None => debug!(id, "Reply for unknown bridge request"),
                            }
                        }
                        Err(e) => warn!(error = %e, "Dropping undecodable bridge line"),
                    }
                }

                // Order matters: callers re-check `closed` after registering.
                closed.store(true, Ordering::SeqCst);
                pending.clear();
                info!("Platform bridge closed");
            });
        }

        let client = Self {
            outbound,
            pending,
            closed,
            next_id: AtomicU64::new(1),
        };
        (client, event_rx)
    }

    async fn call(&self, op: Op) -> Result<Value, PlatformError> {
        let name = op.name();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        self.pending.insert(id, tx);
        if self.closed.load(Ordering::SeqCst) {
            self.pending.remove(&id);
            return Err(PlatformError::Disconnected);
        }
        if self.outbound.send(Request { id, op }).await.is_err() {
            self.pending.remove(&id);
            return Err(PlatformError::Disconnected);
        }

        match rx.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(reason)) => Err(PlatformError::Rejected { op: name, reason }),
            Err(_) => Err(PlatformError::Disconnected),
        }
    }
}

#[async_trait]
impl PlatformClient for BridgeClient {
    async fn change_nickname(
        &self,
        thread_id: &str,
        user_id: &str,
        nickname: &str,
    ) -> Result<(), PlatformError> {
        self.call(Op::ChangeNickname {
            nickname: nickname.to_string(),
            thread_id: thread_id.to_string(),
            participant_id: user_id.to_string(),
        })
        .await
        .map(drop)
    }

    async fn set_title(&self, thread_id: &str, title: &str) -> Result<(), PlatformError> {
        self.call(Op::SetTitle {
            title: title.to_string(),
            thread_id: thread_id.to_string(),
        })
        .await
        .map(drop)
    }

    async fn thread_info(&self, thread_id: &str) -> Result<ThreadInfo, PlatformError> {
        let value = self
            .call(Op::GetThreadInfo {
                thread_id: thread_id.to_string(),
            })
            .await?;
        ThreadInfo::from_value(value).map_err(|source| PlatformError::Malformed {
            op: "getThreadInfo",
            source,
        })
    }

    async fn send_typing(&self, thread_id: &str, typing: bool) -> Result<(), PlatformError> {
        self.call(Op::SendTypingIndicator {
            thread_id: thread_id.to_string(),
            typing,
        })
        .await
        .map(drop)
    }

    async fn app_state(&self) -> Result<Value, PlatformError> {
        self.call(Op::GetAppState).await
    }
}
