use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::error::{StreamError, TransportError};
use crate::sse::SseEvent;
use crate::story::ItemId;
use crate::transport::{EventSource, EventStream};

// Firebase ends a listen with one of these instead of closing the socket.
const REVOKING_EVENTS: [&str; 2] = ["cancel", "auth_revoked"];

/// Connects to the new-stories event source and turns its events into id batches.
pub struct StreamReader<S> {
    source: S,
}

impl<S: EventSource> StreamReader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Open one connection epoch.
    pub fn open(&self) -> Result<Batches, TransportError> {
        Ok(Batches {
            events: self.source.connect()?,
            done: false,
        })
    }
}

/// Batches of one connection, each sorted ascending. Events without ids are
/// skipped. Yields at most one error, after which the epoch is over.
pub struct Batches {
    events: EventStream,
    done: bool,
}

impl Iterator for Batches {
    type Item = Result<Vec<ItemId>, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let event = match self.events.next() {
                Some(Ok(event)) => event,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.done = true;
                    return None;
                }
            };
            if REVOKING_EVENTS.contains(&event.event.as_str()) {
                self.done = true;
                return Some(Err(StreamError::Revoked(event.event)));
            }
            if let Some(batch) = parse_batch(&event) {
                return Some(Ok(batch));
            }
        }
    }
}

/// Ids carried by one event, sorted ascending; `None` when it carries none.
pub fn parse_batch(event: &SseEvent) -> Option<Vec<ItemId>> {
    let data = event.data.trim();
    if data.is_empty() {
        return None;
    }

    let payload: JsonValue = match serde_json::from_str(data) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(event = %event.event, error = %e, "undecodable event payload");
            return None;
        }
    };

    let ids = match payload.get("data") {
        Some(JsonValue::Array(ids)) => ids,
        Some(JsonValue::Null) | None => return None,
        Some(other) => {
            debug!(event = %event.event, data = %other, "event data is not an id list");
            return None;
        }
    };

    let mut batch: Vec<ItemId> = ids
        .iter()
        .filter_map(|v| match v.as_u64() {
            Some(raw) if raw > 0 => Some(ItemId(raw)),
            _ => {
                debug!(value = %v, "skipping non-id entry");
                None
            }
        })
        .collect();
    if batch.is_empty() {
        return None;
    }
    batch.sort_unstable();
    Some(batch)
}
