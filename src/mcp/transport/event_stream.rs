//! Incremental `text/event-stream` parser
//!
//! [`SseParser`] consumes raw byte chunks as they arrive from the network and
//! yields complete [`SseEvent`]s. It is shared by the Streamable HTTP
//! transport (SSE-framed POST responses) and the legacy SSE transport (the
//! long-lived GET stream).
//!
//! Field handling follows the WHATWG event-stream rules that matter for MCP:
//!
//! - lines end in `\n` or `\r\n`; a blank line dispatches the event;
//! - `data:` lines accumulate and are joined with `\n`;
//! - `event:` and `id:` set the event name and ID;
//! - lines starting with `:` are comments; `retry:` is ignored;
//! - a single space after the colon is stripped.

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name; `None` means the default `message` event.
    pub event: Option<String>,
    /// Joined `data:` payload.
    pub data: String,
    /// Event ID, if the block carried one.
    pub id: Option<String>,
}

impl SseEvent {
    /// Event name, defaulting to `message`.
    pub fn name(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }

    /// Keepalive events that carry no protocol message.
    pub fn is_ping(&self) -> bool {
        self.name().eq_ignore_ascii_case("ping") || self.data.eq_ignore_ascii_case("[ping]")
    }
}

/// Incremental parser for an event stream.
///
/// # Examples
///
/// ```
/// use mcp_remote_client::mcp::transport::event_stream::SseParser;
///
/// let mut parser = SseParser::default();
/// assert!(parser.feed(b"event: endpoint\ndata: /messages").is_empty());
/// let events = parser.feed(b"?sessionId=1\n\n");
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].name(), "endpoint");
/// assert_eq!(events[0].data, "/messages?sessionId=1");
/// ```
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    data: Vec<String>,
    event: Option<String>,
    id: Option<String>,
}

impl SseParser {
    /// Feed a chunk and return every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event that was not followed by a blank line.
    pub fn finish(mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest).into_owned();
            self.process_line(line.trim_end_matches('\r'));
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
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
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        let id = self.id.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent { event, data, id })
    }
}
