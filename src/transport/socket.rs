//! Persistent socket transport over `tokio-tungstenite`
//!
//! A background driver owns the websocket. It reconnects with exponential
//! backoff after a loss and reports every (re)connection as
//! [`TransportSignal::Established`]; the controller decides what to request.

use super::{SignalReceiver, SignalSender, Transport, TransportError, TransportSignal};
use crate::protocol::{Envelope, OutboundFrame};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Connection and reconnection policy
#[derive(Debug, Clone)]
pub struct SocketOptions {
    pub connect_timeout: Duration,
    /// Consecutive failed attempts before the driver gives up
    pub reconnect_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            reconnect_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Frame queued for the connection that was live when it was emitted
type Queued = (u64, String);

/// Outbound half of a websocket connection
pub struct SocketTransport {
    outbound_tx: mpsc::Sender<Queued>,
    /// Generation of the live connection, 0 while down
    live: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl SocketTransport {
    /// Start connecting to `endpoint` in the background
    pub fn connect(endpoint: impl Into<String>, options: SocketOptions) -> (Self, SignalReceiver) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::channel(64);
        let live = Arc::new(AtomicU64::new(0));
        let cancel = CancellationToken::new();

        let driver = Driver {
            endpoint: endpoint.into(),
            options,
            signal_tx,
            outbound_rx,
            live: live.clone(),
            cancel: cancel.clone(),
        };
        tokio::spawn(driver.run());

        (
            Self {
                outbound_tx,
                live,
                cancel,
            },
            signal_rx,
        )
    }

    pub fn is_connected(&self) -> bool {
        self.live.load(Ordering::Acquire) != 0
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn emit(&self, frame: OutboundFrame) -> Result<(), TransportError> {
        // No offline queue: frames emitted while down are refused.
        let generation = self.live.load(Ordering::Acquire);
        if generation == 0 {
            return Err(TransportError::disconnect("socket is not connected"));
        }
        let text = Envelope::encode(&frame).map_err(|e| TransportError::protocol(e.to_string()))?;
        self.outbound_tx
            .send((generation, text))
            .await
            .map_err(|_| TransportError::disconnect("socket driver stopped"))
    }

    async fn close(&self) {
        self.cancel.cancel();
    }
}

/// Why a live connection ended
enum SessionEnd {
    Cancelled,
    Lost(TransportError),
}

struct Driver {
    endpoint: String,
    options: SocketOptions,
    signal_tx: SignalSender,
    outbound_rx: mpsc::Receiver<Queued>,
    live: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl Driver {
    async fn run(mut self) {
        let mut failures: u32 = 0;
        let mut generation: u64 = 0;

        loop {
            let attempt = tokio::select! {
                () = self.cancel.cancelled() => break,
                result = tokio::time::timeout(
                    self.options.connect_timeout,
                    tokio_tungstenite::connect_async(self.endpoint.as_str()),
                ) => result,
            };

            match attempt {
                Ok(Ok((ws, _response))) => {
                    failures = 0;
                    generation += 1;
                    tracing::info!(endpoint = %self.endpoint, generation, "Socket connected");
                    self.live.store(generation, Ordering::Release);
                    self.signal(TransportSignal::Established);

                    let end = self.serve(ws, generation).await;
                    self.live.store(0, Ordering::Release);
                    self.discard_unsent();

                    match end {
                        SessionEnd::Cancelled => break,
                        SessionEnd::Lost(error) => {
                            tracing::warn!(error = %error, "Socket connection lost");
                            self.signal(TransportSignal::Disconnected(error));
                        }
                    }
                }
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::warn!(error = %e, attempt = failures, "Socket connect failed");
                    self.signal(TransportSignal::Error(TransportError::connect(e.to_string())));
                }
                Err(_) => {
                    failures += 1;
                    tracing::warn!(attempt = failures, "Socket connect timed out");
                    self.signal(TransportSignal::Error(TransportError::timeout(format!(
                        "no connection within {:?}",
                        self.options.connect_timeout
                    ))));
                }
            }

            if failures >= self.options.reconnect_attempts {
                tracing::error!(attempts = failures, "Giving up on socket reconnection");
                break;
            }

            let delay = backoff_delay(&self.options, failures);
            tracing::debug!(delay_ms = %delay.as_millis(), "Reconnecting");
            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        tracing::info!(endpoint = %self.endpoint, "Socket driver stopped");
    }

    async fn serve<S>(
        &mut self,
        ws: tokio_tungstenite::WebSocketStream<S>,
        generation: u64,
    ) -> SessionEnd
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        let (mut ws_tx, mut ws_rx) = ws.split();

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return SessionEnd::Cancelled;
                }
                outbound = self.outbound_rx.recv() => {
                    let Some((emitted_for, text)) = outbound else {
                        return SessionEnd::Cancelled;
                    };
                    if emitted_for != generation {
                        tracing::warn!(
                            emitted_for,
                            generation,
                            "Dropping frame emitted for an earlier connection"
                        );
                        continue;
                    }
                    if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                        return SessionEnd::Lost(TransportError::disconnect(e.to_string()));
                    }
                }
                inbound = ws_rx.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => self.decode(text.as_str()),
                        Some(Ok(Message::Close(frame))) => {
                            let reason = frame.map_or_else(
                                || "closed by peer".to_string(),
                                |f| format!("closed by peer: {} {}", f.code, f.reason.as_str()),
                            );
                            return SessionEnd::Lost(TransportError::disconnect(reason));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return SessionEnd::Lost(TransportError::disconnect(e.to_string()));
                        }
                        None => {
                            return SessionEnd::Lost(TransportError::disconnect("stream ended"));
                        }
                    }
                }
            }
        }
    }

    fn decode(&self, text: &str) {
        match Envelope::decode(text) {
            Ok(Some(frame)) => self.signal(TransportSignal::Inbound(frame)),
            Ok(None) => tracing::debug!("Ignoring unconsumed socket event"),
            Err(e) => {
                tracing::warn!(error = %e, "Undecodable socket frame");
                self.signal(TransportSignal::Error(TransportError::protocol(format!(
                    "{e}: {text}"
                ))));
            }
        }
    }

    /// Frames queued for a connection that no longer exists are dropped
    fn discard_unsent(&mut self) {
        let mut dropped = 0usize;
        while self.outbound_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::warn!(dropped, "Discarded frames queued before disconnect");
        }
    }

    fn signal(&self, signal: TransportSignal) {
        // Receiver gone means the widget is shutting down
        let _ = self.signal_tx.send(signal);
    }
}

/// Exponential backoff with jitter, capped at `max_delay`
fn backoff_delay(options: &SocketOptions, failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(16);
    let base = options.base_delay.saturating_mul(1u32 << exponent);
    let capped = base.min(options.max_delay);
    let jitter_ms = u64::try_from(capped.as_millis() / 4).unwrap_or(0);
    let jitter = if jitter_ms > 0 {
        rand::thread_rng().gen_range(0..=jitter_ms)
    } else {
        0
    };
    capped + Duration::from_millis(jitter)
}
