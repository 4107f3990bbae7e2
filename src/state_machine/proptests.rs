//! Property-based tests for the session state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use crate::affordance::OptionOwner;
use crate::protocol::{AgentEvent, OptionItem, OutboundFrame};
use crate::timeline::{Direction, EntryDraft, EntryId, Payload, Timeline};
use crate::transport::{TransportError, TransportErrorKind};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> SessionContext {
    SessionContext::new("web", "web1000")
}

fn requested_session(effects: &[Effect]) -> Option<String> {
    effects.iter().find_map(|effect| match effect {
        Effect::Emit(OutboundFrame::SessionRequest(request)) => request.session_id.clone(),
        _ => None,
    })
}

fn some_entry_id() -> EntryId {
    let mut timeline = Timeline::new();
    timeline.append(EntryDraft::outbound_text("x")).id
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_session_id() -> impl Strategy<Value = String> {
    "[a-z]{2,6}[0-9]{1,4}"
}

fn arb_option() -> impl Strategy<Value = OptionItem> {
    ("[A-Za-z]{1,8}", proptest::option::of("/[a-z]{1,8}"))
        .prop_map(|(label, value)| OptionItem { label, value })
}

fn arb_options() -> impl Strategy<Value = Vec<OptionItem>> {
    proptest::collection::vec(arb_option(), 1..4)
}

fn arb_agent_event() -> impl Strategy<Value = AgentEvent> {
    (
        proptest::option::of("[a-zA-Z !?]{1,30}"),
        proptest::option::of(arb_options()),
        proptest::option::of(arb_options()),
        proptest::option::of("[a-z]{1,8}".prop_map(|intent| json!({ "intent": intent }))),
        proptest::option::of("[a-z]{1,8}".prop_map(|kind| json!({ "kind": kind }))),
    )
        .prop_map(|(text, quick_replies, buttons, metadata, custom)| AgentEvent {
            text,
            quick_replies,
            buttons,
            metadata,
            custom,
            session_id: None,
        })
}

fn arb_error_kind() -> impl Strategy<Value = TransportErrorKind> {
    prop_oneof![
        Just(TransportErrorKind::Connect),
        Just(TransportErrorKind::Timeout),
        Just(TransportErrorKind::Protocol),
        Just(TransportErrorKind::Disconnect),
    ]
}

fn arb_transport_error() -> impl Strategy<Value = TransportError> {
    (arb_error_kind(), "[a-z ]{1,20}").prop_map(|(kind, raw)| TransportError::new(kind, raw))
}

fn arb_active_state() -> impl Strategy<Value = SessionState> {
    arb_session_id().prop_map(|session_id| SessionState::Active { session_id })
}

fn arb_pending_state() -> impl Strategy<Value = SessionState> {
    (
        proptest::option::of(arb_session_id()),
        proptest::option::of(arb_session_id()),
    )
        .prop_map(|(requested, previous)| SessionState::Pending {
            requested,
            previous,
        })
}

fn arb_lost_state() -> impl Strategy<Value = SessionState> {
    proptest::option::of(arb_session_id()).prop_map(|previous| SessionState::Lost { previous })
}

fn arb_inactive_state() -> impl Strategy<Value = SessionState> {
    prop_oneof![
        Just(SessionState::Unestablished),
        arb_pending_state(),
        arb_lost_state(),
    ]
}

fn arb_state() -> impl Strategy<Value = SessionState> {
    prop_oneof![arb_inactive_state(), arb_active_state()]
}

/// Events a running widget can receive, excluding `Mounted`
fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::Established),
        arb_session_id().prop_map(|session_id| Event::SessionConfirmed { session_id }),
        arb_transport_error().prop_map(Event::TransportError),
        arb_transport_error().prop_map(Event::Disconnected),
        arb_agent_event().prop_map(Event::Agent),
        "[a-z ]{1,20}".prop_map(|text| Event::UserUtter { text, value: None }),
        arb_session_id().prop_map(|fresh_session_id| Event::RestartRequested { fresh_session_id }),
    ]
}

// ============================================================================
// Session Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Active is only ever entered by confirming the id that was requested
    #[test]
    fn prop_active_requires_matching_confirmation(
        events in proptest::collection::vec(arb_event(), 0..30)
    ) {
        let context = test_context();
        let mut state = transition(&SessionState::Unestablished, &context, Event::Mounted)
            .unwrap()
            .new_state;

        for event in events {
            let Ok(result) = transition(&state, &context, event) else {
                continue;
            };
            if let SessionState::Active { session_id } = &result.new_state {
                if !state.is_active() {
                    match &state {
                        SessionState::Pending { requested: Some(requested), .. } => {
                            prop_assert_eq!(requested, session_id);
                        }
                        other => prop_assert!(false, "entered Active from {:?}", other),
                    }
                    prop_assert_eq!(&result.effects[0], &Effect::ResetTimeline);
                }
            }
            state = result.new_state;
        }
    }

    /// A regained connection asks for the last confirmed session, or the
    /// configured one when nothing was ever confirmed
    #[test]
    fn prop_established_rejoins_confirmed_session(state in arb_state()) {
        let context = test_context();
        let expected = state
            .confirmed_id()
            .map_or_else(|| context.initial_session_id.clone(), str::to_string);

        let result = transition(&state, &context, Event::Established).unwrap();
        prop_assert_eq!(requested_session(&result.effects), Some(expected.clone()));
        prop_assert_eq!(result.new_state.session_id(), Some(expected.as_str()));
    }

    #[test]
    fn prop_restart_requests_fresh_session(
        state in arb_active_state(),
        fresh in "[A-Z]{8}",
    ) {
        let previous = state.confirmed_id().map(str::to_string);
        let result = transition(
            &state,
            &test_context(),
            Event::RestartRequested { fresh_session_id: fresh.clone() },
        )
        .unwrap();

        prop_assert_eq!(result.effects.len(), 1);
        prop_assert_eq!(requested_session(&result.effects), Some(fresh.clone()));
        prop_assert_eq!(
            result.new_state,
            SessionState::Pending { requested: Some(fresh), previous }
        );
    }

    #[test]
    fn prop_user_turns_need_active_session(
        state in arb_inactive_state(),
        text in "[a-z ]{1,20}",
    ) {
        let result = transition(&state, &test_context(), Event::UserUtter { text, value: None });
        prop_assert_eq!(result.unwrap_err(), TransitionError::SessionUnavailable);

        let owner = OptionOwner { entry_id: some_entry_id(), index: 0, consumable: true };
        let result = transition(
            &state,
            &test_context(),
            Event::OptionSelected { owner, option: OptionItem::labelled("Yes") },
        );
        prop_assert_eq!(result.unwrap_err(), TransitionError::SessionUnavailable);
    }

    /// Transport errors outside connection setup never touch the session
    #[test]
    fn prop_errors_while_active_keep_session(
        state in arb_active_state(),
        error in arb_transport_error(),
    ) {
        let result = transition(&state, &test_context(), Event::TransportError(error.clone())).unwrap();
        prop_assert_eq!(&result.new_state, &state);
        prop_assert_eq!(result.effects, vec![Effect::ReportError(error)]);
    }

    #[test]
    fn prop_stale_agent_events_dropped_silently(
        session_id in arb_session_id(),
        event in arb_agent_event(),
    ) {
        let state = SessionState::Active { session_id: session_id.clone() };
        let stale = event.with_session(format!("{session_id}-old"));
        let error = transition(&state, &test_context(), Event::Agent(stale)).unwrap_err();
        prop_assert!(error.is_silent());
    }
}

// ============================================================================
// Turn Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// One entry per recognized field, in field order, each with the event's
    /// metadata; custom payloads are delegated after them
    #[test]
    fn prop_agent_event_fan_out(
        state in arb_active_state(),
        event in arb_agent_event(),
    ) {
        let result = transition(&state, &test_context(), Event::Agent(event.clone())).unwrap();
        prop_assert_eq!(&result.new_state, &state);

        let appended: Vec<&EntryDraft> = result
            .effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::AppendEntry(draft) => Some(draft),
                _ => None,
            })
            .collect();

        let mut expected_kinds = Vec::new();
        if event.text.is_some() {
            expected_kinds.push("text");
        }
        if event.quick_replies.is_some() {
            expected_kinds.push("quick_replies");
        }
        if event.buttons.is_some() {
            expected_kinds.push("buttons");
        }
        let kinds: Vec<&str> = appended
            .iter()
            .map(|draft| match draft.payload.options() {
                Some((_, true)) => "quick_replies",
                Some((_, false)) => "buttons",
                None => draft.payload.kind(),
            })
            .collect();
        prop_assert_eq!(kinds, expected_kinds);

        for draft in &appended {
            prop_assert_eq!(draft.direction, Direction::Inbound);
            prop_assert_eq!(&draft.metadata, &event.metadata);
        }

        let releases = result.effects.iter().filter(|e| **e == Effect::ReleaseFocus).count();
        prop_assert_eq!(releases, usize::from(event.offers_options()));

        let delegated = result
            .effects
            .iter()
            .position(|e| matches!(e, Effect::DelegateCustom { .. }));
        let should_delegate = event.custom.is_some() || !event.has_recognized_field();
        prop_assert_eq!(delegated.is_some(), should_delegate);
        if let Some(position) = delegated {
            prop_assert_eq!(position, result.effects.len() - 1);
        }
    }

    /// A selection emits the option's token and shows its label; only
    /// consumable groups are removed
    #[test]
    fn prop_selection_effects(
        session_id in arb_session_id(),
        option in arb_option(),
        consumable in any::<bool>(),
        index in 0usize..10,
    ) {
        let state = SessionState::Active { session_id: session_id.clone() };
        let owner = OptionOwner { entry_id: some_entry_id(), index, consumable };
        let result = transition(
            &state,
            &test_context(),
            Event::OptionSelected { owner, option: option.clone() },
        )
        .unwrap();

        prop_assert_eq!(&result.effects[0], &Effect::utterance(session_id, option.token()));
        let removes = result
            .effects
            .iter()
            .filter(|e| matches!(e, Effect::RemoveEntry { .. }))
            .count();
        prop_assert_eq!(removes, usize::from(consumable));
        prop_assert!(result.effects.contains(&Effect::append_outbound(option.label.clone())));
        prop_assert_eq!(result.effects.last(), Some(&Effect::RestoreFocus));
    }
}

// ============================================================================
// Timeline Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Identities strictly increase and creation times never go backwards
    #[test]
    fn prop_timeline_append_order(texts in proptest::collection::vec("[a-z]{1,10}", 0..40)) {
        let mut timeline = Timeline::new();
        for text in &texts {
            timeline.append(EntryDraft::outbound_text(text.clone()));
        }

        prop_assert_eq!(timeline.len(), texts.len());
        for pair in timeline.entries().windows(2) {
            prop_assert!(pair[0].id < pair[1].id);
            prop_assert!(pair[0].timestamp <= pair[1].timestamp);
        }
        let stored: Vec<&str> = timeline.entries().iter().filter_map(|e| e.text()).collect();
        let expected: Vec<&str> = texts.iter().map(String::as_str).collect();
        prop_assert_eq!(stored, expected);
    }

    /// Removing the same entry twice removes exactly one entry
    #[test]
    fn prop_remove_at_is_idempotent(
        count in 1usize..20,
        pick in any::<prop::sample::Index>(),
        shift in 0usize..5,
    ) {
        let mut timeline = Timeline::new();
        for n in 0..count {
            timeline.append(EntryDraft::inbound(
                Payload::quick_replies(vec![OptionItem::labelled(format!("opt{n}"))]),
                None,
            ));
        }
        let index = pick.index(count);
        let target = timeline.get(index).unwrap().id;

        // Stale index: entries may have shifted since the selection was made
        let removed = timeline.remove_at(index + shift, target);
        prop_assert_eq!(removed.map(|e| e.id), Some(target));
        prop_assert_eq!(timeline.remove_at(index, target), None);
        prop_assert_eq!(timeline.len(), count - 1);
        prop_assert!(timeline.find(target).is_none());
    }
}
