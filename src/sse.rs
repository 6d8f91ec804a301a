//! Incremental decoder for the `text/event-stream` wire format.
//!
//! Lines are fed one at a time (without their terminator). A blank line
//! dispatches the event accumulated so far; `data:` fields are joined with
//! `\n`; lines starting with `:` are comments; unknown fields are ignored.

const DEFAULT_EVENT: &str = "message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

impl SseEvent {
    pub fn message(data: impl Into<String>) -> Self {
        Self::named(DEFAULT_EVENT, data)
    }

    pub fn named(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
            id: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    event: Option<String>,
    data: Vec<String>,
    last_id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line; returns an event when the line completes one.
    pub fn push_line(&mut self, line: &str) -> Option<SseEvent> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: event
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            data,
            id: self.last_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(input: &str) -> Vec<SseEvent> {
        let mut decoder = SseDecoder::new();
        input.split('\n').filter_map(|l| decoder.push_line(l)).collect()
    }

    #[test]
    fn firebase_put_event() {
        let events = decode("event: put\ndata: {\"path\":\"/\",\"data\":[1,2]}\n\n");
        assert_eq!(
            events,
            vec![SseEvent::named("put", "{\"path\":\"/\",\"data\":[1,2]}")]
        );
    }

    #[test]
    fn multi_line_data_is_joined() {
        let events = decode("data: first\ndata:second\n\n");
        assert_eq!(events, vec![SseEvent::message("first\nsecond")]);
    }

    #[test]
    fn comments_and_crlf() {
        let events = decode(": ping\r\nevent: keep-alive\r\ndata: null\r\n\r\n");
        assert_eq!(events, vec![SseEvent::named("keep-alive", "null")]);
    }

    #[test]
    fn blank_line_without_data_dispatches_nothing() {
        let events = decode("event: put\n\ndata: x\n\n");
        // the event name from the empty block does not leak into the next one
        assert_eq!(events, vec![SseEvent::message("x")]);
    }

    #[test]
    fn last_event_id_is_sticky() {
        let events = decode("id: 7\ndata: a\n\ndata: b\n\n");
        assert_eq!(events[0].id.as_deref(), Some("7"));
        assert_eq!(events[1].id.as_deref(), Some("7"));
    }

    #[test]
    fn unterminated_event_is_not_dispatched() {
        assert!(decode("data: partial").is_empty());
    }
}
