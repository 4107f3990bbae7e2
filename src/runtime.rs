//! Widget runtime
//!
//! A [`Widget`] is a handle to one spawned [`WidgetRuntime`]. The handle
//! sends commands; the runtime owns the session, the timeline and the
//! transport, and publishes a [`WidgetView`] after every step.

mod executor;
mod ids;
pub mod traits;


pub use executor::WidgetRuntime;
pub use ids::SessionIdGenerator;
pub use traits::*;

use crate::config::{TransportKind, WidgetConfig};
use crate::protocol::OptionItem;
use crate::state_machine::{SessionContext, SessionState, TransitionError};
use crate::timeline::{EntryId, MessageEntry};
use crate::transport::{
    RestClient, RestTransport, SignalReceiver, SocketOptions, SocketTransport, Transport,
    TransportError,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

const COMMAND_BUFFER: usize = 32;

/// Errors surfaced to the embedding application
#[derive(Debug, Clone, Error)]
pub enum WidgetError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("action rejected: {0}")]
    Rejected(#[from] TransitionError),
    #[error("widget runtime has stopped")]
    Closed,
}

/// Requests from the handle to the runtime
#[derive(Debug)]
pub enum Command {
    SetDraft(String),
    SendDraft,
    Utter {
        text: String,
        value: Option<String>,
    },
    /// Select an option of the entry at `index`
    SelectOption {
        index: usize,
        option: OptionItem,
    },
    SelectOptionById {
        entry_id: EntryId,
        option: OptionItem,
    },
    Restart,
    /// Acknowledged once every earlier command and queued signal is handled
    Sync(oneshot::Sender<()>),
    Shutdown,
}

/// What a front end renders
#[derive(Debug, Clone, Default)]
pub struct WidgetView {
    pub session: SessionState,
    pub timeline: Vec<MessageEntry>,
    pub draft: String,
}

/// Handle to a running widget
pub struct Widget {
    command_tx: mpsc::Sender<Command>,
    view_rx: watch::Receiver<WidgetView>,
    task: JoinHandle<()>,
}

impl Widget {
    /// Open the configured transport and start the runtime.
    pub fn connect<C, F>(config: &WidgetConfig, callbacks: C, focus: F) -> Result<Self, WidgetError>
    where
        C: WidgetCallbacks + 'static,
        F: InputFocus + 'static,
    {
        tracing::info!(endpoint = %config.endpoint, transport = ?config.transport, "Connecting widget");
        match config.transport {
            TransportKind::Socket => {
                let options = SocketOptions {
                    connect_timeout: config.timeout,
                    reconnect_attempts: config.reconnect_attempts,
                    ..SocketOptions::default()
                };
                let (transport, signals) = SocketTransport::connect(&config.endpoint, options);
                Ok(Self::with_transport(config, transport, signals, callbacks, focus))
            }
            TransportKind::Rest => {
                let client = RestClient::new(&config.endpoint, config.timeout)?;
                let (transport, signals) = RestTransport::connect(client);
                Ok(Self::with_transport(config, transport, signals, callbacks, focus))
            }
        }
    }

    /// Start a runtime over an already connected transport.
    pub fn with_transport<T, C, F>(
        config: &WidgetConfig,
        transport: T,
        signals: SignalReceiver,
        callbacks: C,
        focus: F,
    ) -> Self
    where
        T: Transport + 'static,
        C: WidgetCallbacks + 'static,
        F: InputFocus + 'static,
    {
        let client_id = config
            .client_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut ids = SessionIdGenerator::new(client_id.clone());
        let initial_session_id = config.session_id.clone().unwrap_or_else(|| ids.next_id());

        let mut context = SessionContext::new(client_id, initial_session_id);
        if let Some(message) = &config.initial_message {
            context = context.with_initial_message(message.clone());
        }

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (view_tx, view_rx) = watch::channel(WidgetView::default());

        let runtime = WidgetRuntime::new(
            context, ids, transport, signals, callbacks, focus, command_rx, view_tx,
        );
        let task = tokio::spawn(runtime.run());

        Self {
            command_tx,
            view_rx,
            task,
        }
    }

    async fn send(&self, command: Command) -> Result<(), WidgetError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| WidgetError::Closed)
    }

    pub async fn set_draft(&self, text: impl Into<String>) -> Result<(), WidgetError> {
        self.send(Command::SetDraft(text.into())).await
    }

    /// Send the current draft as an utterance. Blank drafts are ignored and
    /// the draft is kept when the session cannot take it.
    pub async fn send_current_draft(&self) -> Result<(), WidgetError> {
        self.send(Command::SendDraft).await
    }

    /// Send `text`, or `value` in its place on the wire when given
    pub async fn utter(
        &self,
        text: impl Into<String>,
        value: Option<String>,
    ) -> Result<(), WidgetError> {
        self.send(Command::Utter {
            text: text.into(),
            value,
        })
        .await
    }

    pub async fn select_option(&self, index: usize, option: OptionItem) -> Result<(), WidgetError> {
        self.send(Command::SelectOption { index, option }).await
    }

    pub async fn select_option_by_id(
        &self,
        entry_id: EntryId,
        option: OptionItem,
    ) -> Result<(), WidgetError> {
        self.send(Command::SelectOptionById { entry_id, option })
            .await
    }

    /// Abandon the current session and request a freshly generated one
    pub async fn restart_session(&self) -> Result<(), WidgetError> {
        self.send(Command::Restart).await
    }

    /// Wait until the runtime has handled everything queued so far
    pub async fn sync(&self) -> Result<(), WidgetError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Sync(tx)).await?;
        rx.await.map_err(|_| WidgetError::Closed)
    }

    pub fn view(&self) -> WidgetView {
        self.view_rx.borrow().clone()
    }

    pub fn snapshot(&self) -> Vec<MessageEntry> {
        self.view_rx.borrow().timeline.clone()
    }

    pub fn session(&self) -> SessionState {
        self.view_rx.borrow().session.clone()
    }

    pub fn draft(&self) -> String {
        self.view_rx.borrow().draft.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WidgetView> {
        self.view_rx.clone()
    }

    /// Stop the runtime and close the transport
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(Command::Shutdown).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Widget runtime task failed");
        }
    }
}
