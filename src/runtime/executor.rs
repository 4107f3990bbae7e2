//! Widget runtime executor

use super::ids::SessionIdGenerator;
use super::traits::{append_entry, Appender, InputFocus, WidgetCallbacks};
use super::{Command, WidgetError, WidgetView};

use crate::affordance::Affordances;
use crate::protocol::InboundFrame;
use crate::state_machine::{transition, Effect, Event, SessionContext, SessionState};
use crate::timeline::Timeline;
use crate::transport::{SignalReceiver, Transport, TransportError, TransportSignal};
use tokio::sync::{mpsc, watch};

impl From<TransportSignal> for Event {
    fn from(signal: TransportSignal) -> Self {
        match signal {
            TransportSignal::Established => Event::Established,
            TransportSignal::Inbound(InboundFrame::SessionConfirm(confirm)) => {
                Event::SessionConfirmed {
                    session_id: confirm.session_id,
                }
            }
            TransportSignal::Inbound(InboundFrame::Agent(event)) => Event::Agent(event),
            TransportSignal::Error(error) => Event::TransportError(error),
            TransportSignal::Disconnected(error) => Event::Disconnected(error),
        }
    }
}

/// Owns the session, the timeline and the transport of one widget. All
/// mutations happen inside [`WidgetRuntime::run`], one event at a time.
pub struct WidgetRuntime<T, C, F>
where
    T: Transport + 'static,
    C: WidgetCallbacks + 'static,
    F: InputFocus + 'static,
{
    context: SessionContext,
    state: SessionState,
    timeline: Timeline,
    affordances: Affordances,
    draft: String,
    ids: SessionIdGenerator,
    transport: T,
    callbacks: C,
    focus: F,
    command_rx: mpsc::Receiver<Command>,
    signal_rx: SignalReceiver,
    view_tx: watch::Sender<WidgetView>,
}

impl<T, C, F> WidgetRuntime<T, C, F>
where
    T: Transport + 'static,
    C: WidgetCallbacks + 'static,
    F: InputFocus + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: SessionContext,
        ids: SessionIdGenerator,
        transport: T,
        signal_rx: SignalReceiver,
        callbacks: C,
        focus: F,
        command_rx: mpsc::Receiver<Command>,
        view_tx: watch::Sender<WidgetView>,
    ) -> Self {
        Self {
            context,
            state: SessionState::Unestablished,
            timeline: Timeline::new(),
            affordances: Affordances::new(),
            draft: String::new(),
            ids,
            transport,
            callbacks,
            focus,
            command_rx,
            signal_rx,
            view_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(client_id = %self.context.client_id, "Starting widget runtime");

        self.process_event(Event::Mounted).await;
        self.publish();

        let mut signals_open = true;
        loop {
            tokio::select! {
                // Signals first: a sync acknowledgement then covers every
                // signal queued before it.
                biased;

                signal = self.signal_rx.recv(), if signals_open => {
                    match signal {
                        Some(signal) => {
                            self.process_event(signal.into()).await;
                        }
                        None => {
                            tracing::info!("Transport signal channel closed");
                            signals_open = false;
                        }
                    }
                }
                command = self.command_rx.recv() => {
                    match command {
                        Some(Command::Shutdown) | None => break,
                        Some(command) => self.handle_command(command).await,
                    }
                }
            }
            self.publish();
        }

        self.transport.close().await;
        self.publish();
        tracing::info!(client_id = %self.context.client_id, "Widget runtime stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetDraft(text) => self.draft = text,

            Command::SendDraft => {
                if self.draft.trim().is_empty() {
                    tracing::debug!("Ignoring empty draft");
                    return;
                }
                let text = self.draft.clone();
                if self.process_event(Event::UserUtter { text, value: None }).await {
                    self.draft.clear();
                }
            }

            Command::Utter { text, value } => {
                self.process_event(Event::UserUtter { text, value }).await;
            }

            Command::SelectOption { index, option } => {
                match self.affordances.resolve(&self.timeline, index, &option) {
                    Some(owner) => {
                        self.process_event(Event::OptionSelected { owner, option })
                            .await;
                    }
                    None => tracing::debug!(index, "Selected option is no longer offered"),
                }
            }

            Command::SelectOptionById { entry_id, option } => {
                match self
                    .affordances
                    .resolve_by_id(&self.timeline, entry_id, &option)
                {
                    Some(owner) => {
                        self.process_event(Event::OptionSelected { owner, option })
                            .await;
                    }
                    None => tracing::debug!(entry = %entry_id, "Selected option is no longer offered"),
                }
            }

            Command::Restart => {
                let fresh_session_id = self.ids.next_id();
                self.process_event(Event::RestartRequested { fresh_session_id })
                    .await;
            }

            Command::Sync(ack) => {
                let _ = ack.send(());
            }

            Command::Shutdown => {}
        }
    }

    /// Run one event through the state machine. Returns whether it was
    /// accepted and all of its frames went out.
    async fn process_event(&mut self, event: Event) -> bool {
        let name = event.name();
        let result = match transition(&self.state, &self.context, event) {
            Ok(result) => result,
            Err(e) if e.is_silent() => {
                tracing::debug!(event = name, reason = %e, "Dropping stale traffic");
                return false;
            }
            Err(e) => {
                tracing::warn!(event = name, error = %e, "Event rejected");
                self.callbacks.on_error(&WidgetError::Rejected(e));
                return false;
            }
        };

        if result.new_state != self.state {
            tracing::debug!(
                event = name,
                from = ?self.state.lifecycle(),
                to = ?result.new_state.lifecycle(),
                session_id = ?result.new_state.session_id(),
                "Session transition"
            );
        }
        self.state = result.new_state;

        // Nothing after a failed emit is applied
        for effect in result.effects {
            if let Err(e) = self.execute_effect(effect).await {
                self.callbacks.on_error(&WidgetError::Transport(e));
                return false;
            }
        }
        true
    }

    async fn execute_effect(&mut self, effect: Effect) -> Result<(), TransportError> {
        match effect {
            Effect::Emit(frame) => {
                let event = frame.event_name();
                if let Err(e) = self.transport.emit(frame).await {
                    tracing::warn!(event, error = %e, "Emit failed");
                    return Err(e);
                }
            }

            Effect::ResetTimeline => {
                tracing::info!(
                    session_id = ?self.state.session_id(),
                    discarded = self.timeline.len(),
                    groups = self.affordances.len(),
                    "Session confirmed, timeline reset"
                );
                self.timeline.clear();
                self.affordances.clear();
            }

            Effect::AppendEntry(draft) => {
                append_entry(
                    &mut self.timeline,
                    &mut self.affordances,
                    &self.callbacks,
                    draft,
                );
            }

            Effect::RemoveEntry { index, entry_id } => {
                if self.timeline.remove_at(index, entry_id).is_none() {
                    tracing::debug!(entry = %entry_id, "Entry already removed");
                }
                self.affordances.retire(entry_id);
            }

            Effect::DelegateCustom { payload, metadata } => {
                let mut appender = Appender::new(
                    &mut self.timeline,
                    &mut self.affordances,
                    &self.callbacks,
                    metadata,
                );
                self.callbacks.on_custom_event(&payload, &mut appender);
            }

            Effect::ReleaseFocus => self.focus.release(),
            Effect::RestoreFocus => self.focus.restore(),

            Effect::ReportError(error) => {
                self.callbacks.on_error(&WidgetError::Transport(error));
            }
        }
        Ok(())
    }

    fn publish(&self) {
        self.view_tx.send_replace(WidgetView {
            session: self.state.clone(),
            timeline: self.timeline.snapshot(),
            draft: self.draft.clone(),
        });
    }
}
