// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Ticket event-log data model and materialization (spec §3, §4.7).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::TicketEventId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketEventType {
    TicketCreated,
    TicketStatusChanged,
    TicketUpdated,
    /// Any other event type the log may carry; ignored by materialization.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketEvent {
    pub event_id: TicketEventId,
    pub timestamp: i64,
    pub actor: String,
    #[serde(default)]
    pub project: Option<String>,
    pub ticket_id: String,
    #[serde(rename = "type")]
    pub event_type: TicketEventType,
    pub payload: Value,
}

/// The materialized state of a single ticket: a left-fold over its events,
/// ordered by `(timestamp, event_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Ticket {
    pub ticket_id: String,
    pub title: Option<String>,
    pub status: Option<String>,
    pub fields: serde_json::Map<String, Value>,
}

/// Fold a ticket's events (already sorted by `(timestamp, event_id)`) into
/// its materialized state.
pub fn materialize(ticket_id: &str, events: &[TicketEvent]) -> Ticket {
    let mut ticket = Ticket { ticket_id: ticket_id.to_string(), ..Default::default() };
    for event in events {
        if event.ticket_id != ticket_id {
            continue;
        }
        match event.event_type {
            TicketEventType::TicketCreated | TicketEventType::TicketUpdated => {
                if let Some(title) = event.payload.get("title").and_then(Value::as_str) {
                    ticket.title = Some(title.to_string());
                }
                if let Some(status) = event.payload.get("status").and_then(Value::as_str) {
                    ticket.status = Some(status.to_string());
                }
                if let Some(obj) = event.payload.as_object() {
                    for (k, v) in obj {
                        ticket.fields.insert(k.clone(), v.clone());
                    }
                }
            }
            TicketEventType::TicketStatusChanged => {
                if let Some(status) = event.payload.get("status").and_then(Value::as_str) {
                    ticket.status = Some(status.to_string());
                }
            }
            TicketEventType::Other => {}
        }
    }
    ticket
}

/// Sort events by `(timestamp, eventId)` and drop duplicate `eventId`s,
/// keeping the first occurrence (spec §3, §8 S6).
pub fn dedupe_and_order(mut events: Vec<TicketEvent>) -> Vec<TicketEvent> {
    events.sort_by(|a, b| (a.timestamp, &a.event_id).cmp(&(b.timestamp, &b.event_id)));
    let mut seen = std::collections::HashSet::new();
    events.retain(|e| seen.insert(e.event_id.clone()));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(id: &str, ts: i64, ticket_id: &str, ty: TicketEventType, payload: Value) -> TicketEvent {
        TicketEvent {
            event_id: TicketEventId::from_string(id),
            timestamp: ts,
            actor: "alice".into(),
            project: None,
            ticket_id: ticket_id.into(),
            event_type: ty,
            payload,
        }
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let events = vec![
            event("e1", 1, "T-00001", TicketEventType::TicketCreated, json!({"title": "first"})),
            event("e1", 2, "T-00001", TicketEventType::TicketCreated, json!({"title": "second"})),
        ];
        let deduped = dedupe_and_order(events);
        assert_eq!(deduped.len(), 1);
    }

    #[test]
    fn materialize_folds_in_order() {
        let events = vec![
            event(
                "e1",
                1,
                "T-00001",
                TicketEventType::TicketCreated,
                json!({"title": "Fix bug", "status": "open"}),
            ),
            event(
                "e2",
                2,
                "T-00001",
                TicketEventType::TicketStatusChanged,
                json!({"status": "closed"}),
            ),
        ];
        let ticket = materialize("T-00001", &events);
        assert_eq!(ticket.title.as_deref(), Some("Fix bug"));
        assert_eq!(ticket.status.as_deref(), Some("closed"));
    }
}
