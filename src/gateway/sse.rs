//! Incremental decoder for the provider's event stream
//!
//! Accepts raw body chunks in arrival order and yields one JSON value per
//! complete Server-Sent-Events record. Bare newline-delimited JSON lines are
//! accepted as well, since some provider endpoints stream that instead.

use serde_json::Value;
use tracing::debug;

/// Sentinel some providers send to mark the end of a stream
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a body chunk, returning every record completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Value> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        // Decode per complete line; a chunk may end inside a multi-byte character
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            self.handle_line(line.trim_end_matches(&['\n', '\r'][..]), &mut events);
        }
        events
    }

    /// Flushes whatever remains once the body has ended
    pub fn finish(mut self) -> Vec<Value> {
        let mut events = Vec::new();
        let raw = std::mem::take(&mut self.buffer);
        let rest = String::from_utf8_lossy(&raw);
        if !rest.trim().is_empty() {
            self.handle_line(rest.trim_end_matches(&['\n', '\r'][..]), &mut events);
        }
        self.dispatch(&mut events);
        events
    }

    fn handle_line(&mut self, line: &str, events: &mut Vec<Value>) {
        if line.is_empty() {
            self.dispatch(events);
        } else if let Some(data) = line.strip_prefix("data:") {
            self.data_lines
                .push(data.strip_prefix(' ').unwrap_or(data).to_string());
        } else if line.starts_with(':')
            || line.starts_with("event:")
            || line.starts_with("id:")
            || line.starts_with("retry:")
        {
            // SSE metadata and comments carry no text
        } else if line.trim_start().starts_with('{') {
            self.dispatch(events);
            Self::parse_into(line, events);
        }
    }

    fn dispatch(&mut self, events: &mut Vec<Value>) {
        if self.data_lines.is_empty() {
            return;
        }
        let payload = self.data_lines.join("\n");
        self.data_lines.clear();
        Self::parse_into(&payload, events);
    }

    fn parse_into(payload: &str, events: &mut Vec<Value>) {
        let payload = payload.trim();
        if payload.is_empty() || payload == DONE_SENTINEL {
            return;
        }
        match serde_json::from_str::<Value>(payload) {
            Ok(value) => events.push(value),
            Err(e) => debug!(error = %e, "Skipping non-JSON stream record"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_decodes_records_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let mut events = decoder.push(b"event: message\ndata: {\"text\":");
        assert!(events.is_empty());
        events.extend(decoder.push(b"\"hel\"}\n\ndata: {\"text\":\"lo\"}\n"));
        events.extend(decoder.push(b"\n"));
        events.extend(decoder.finish());
        assert_eq!(events, vec![json!({"text": "hel"}), json!({"text": "lo"})]);
    }

    #[test]
    fn test_skips_done_sentinel_and_comments() {
        let mut decoder = SseDecoder::new();
        let mut events = decoder.push(b": keep-alive\n\ndata: [DONE]\n\n");
        events.extend(decoder.finish());
        assert!(events.is_empty());
    }

    #[test]
    fn test_accepts_ndjson_lines() {
        let mut decoder = SseDecoder::new();
        let mut events = decoder.push(b"{\"text\":\"a\"}\r\n{\"text\":\"b\"}");
        events.extend(decoder.finish());
        assert_eq!(events, vec![json!({"text": "a"}), json!({"text": "b"})]);
    }

    #[test]
    fn test_flushes_unterminated_record_on_finish() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {\"delta\":{\"text\":\"x\"}}\n");
        assert!(events.is_empty());
        assert_eq!(decoder.finish(), vec![json!({"delta": {"text": "x"}})]);
    }

    #[test]
    fn test_multibyte_text_split_across_chunks() {
        let record = "data: {\"text\":\"µ\"}\n\n".as_bytes();
        let split = record.iter().position(|b| *b > 0x7f).unwrap() + 1;
        let mut decoder = SseDecoder::new();
        let mut events = decoder.push(&record[..split]);
        events.extend(decoder.push(&record[split..]));
        assert_eq!(events, vec![json!({"text": "µ"})]);
    }
}
