//! Request/response webhook transport
//!
//! One POST of `{sender, message}` per utterance; the body of the answer is
//! the list of agent events produced for it.

use super::{SignalReceiver, SignalSender, Transport, TransportError, TransportSignal};
use crate::protocol::{AgentEvent, InboundFrame, OutboundFrame, SessionConfirm};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Serialize)]
struct WebhookRequest<'a> {
    sender: &'a str,
    message: &'a str,
}

/// Stateless webhook client
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    endpoint: String,
}

impl RestClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::connect(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// One round trip: post the utterance, return the agent's events in order
    pub async fn send(&self, sender: &str, message: &str) -> Result<Vec<AgentEvent>, TransportError> {
        tracing::debug!(endpoint = %self.endpoint, sender, "> Webhook request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&WebhookRequest { sender, message })
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        tracing::debug!(status = %status, bytes = body.len(), "< Webhook response");

        if !status.is_success() {
            let raw = format!("HTTP {status}: {body}");
            return Err(if status.is_server_error() {
                TransportError::connect(raw)
            } else {
                TransportError::protocol(raw)
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| TransportError::protocol(format!("Failed to parse response: {e} - body: {body}")))
    }
}

/// Adapts [`RestClient`] to the signal contract shared with the socket.
///
/// There is no handshake on the webhook: the sender id is the session, so a
/// session request is confirmed locally.
pub struct RestTransport {
    client: RestClient,
    signal_tx: SignalSender,
    closed: AtomicBool,
}

impl RestTransport {
    pub fn connect(client: RestClient) -> (Self, SignalReceiver) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let _ = signal_tx.send(TransportSignal::Established);
        (
            Self {
                client,
                signal_tx,
                closed: AtomicBool::new(false),
            },
            signal_rx,
        )
    }

    fn signal(&self, signal: TransportSignal) {
        let _ = self.signal_tx.send(signal);
    }
}

#[async_trait]
impl Transport for RestTransport {
    async fn emit(&self, frame: OutboundFrame) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::disconnect("transport closed"));
        }

        match frame {
            OutboundFrame::SessionRequest(request) => {
                let session_id = request
                    .session_id
                    .ok_or_else(|| TransportError::protocol("webhook sessions need an id"))?;
                self.signal(TransportSignal::Inbound(InboundFrame::SessionConfirm(
                    SessionConfirm { session_id },
                )));
            }
            OutboundFrame::UserUttered(utterance) => {
                match self
                    .client
                    .send(&utterance.session_id, &utterance.message)
                    .await
                {
                    Ok(events) => {
                        tracing::debug!(count = events.len(), "Webhook answered");
                        for event in events {
                            self.signal(TransportSignal::Inbound(InboundFrame::Agent(event)));
                        }
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "Webhook round trip failed");
                        self.signal(TransportSignal::Error(error));
                    }
                }
            }
        }
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
