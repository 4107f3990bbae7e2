//! Transport adapter
//!
//! Presents the persistent socket and the request/response webhook behind
//! one contract: frames go out through [`Transport::emit`], and everything
//! that comes back (connection changes, agent frames, failures) arrives as
//! a [`TransportSignal`] on the channel returned at connect time.

mod error;
pub mod rest;
pub mod socket;

pub use error::{TransportError, TransportErrorKind};
pub use rest::{RestClient, RestTransport};
pub use socket::{SocketOptions, SocketTransport};

use crate::protocol::{InboundFrame, OutboundFrame};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Signals delivered by a connected transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportSignal {
    /// The channel is (again) usable
    Established,
    Inbound(InboundFrame),
    Error(TransportError),
    Disconnected(TransportError),
}

/// Receiving half handed to the runtime at connect time
pub type SignalReceiver = mpsc::UnboundedReceiver<TransportSignal>;

/// Sending half owned by the transport implementation
pub type SignalSender = mpsc::UnboundedSender<TransportSignal>;

/// Outbound half of a connected transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a frame to the agent. Socket emits are fire-and-forget; the
    /// request/response variant completes one round trip before returning.
    async fn emit(&self, frame: OutboundFrame) -> Result<(), TransportError>;

    /// Tear the connection down
    async fn close(&self);
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn emit(&self, frame: OutboundFrame) -> Result<(), TransportError> {
        (**self).emit(frame).await
    }

    async fn close(&self) {
        (**self).close().await;
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn emit(&self, frame: OutboundFrame) -> Result<(), TransportError> {
        (**self).emit(frame).await
    }

    async fn close(&self) {
        (**self).close().await;
    }
}
