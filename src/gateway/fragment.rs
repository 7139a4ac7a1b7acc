//! Stream event classification
//!
//! The chat provider emits heterogeneous event records. Each one is mapped
//! onto a closed set of known shapes; anything else is skipped.

use serde_json::Value;

/// A text-bearing shape recognised in a provider stream event
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFragment {
    /// `{"type": "text_delta", "text": "..."}`
    TextDelta(String),
    /// `{"data": {"text": "..."}}`
    DataText(String),
    /// `{"delta": {"text": "..."}}`
    MessageDelta(String),
    /// `{"type": "text_content_block", "content": {"text": "..."}}`
    ContentBlock(String),
    /// `{"text": "..."}` with no recognised type
    BareText(String),
    /// `{"content": [{"type": "text", "text": "..."}, ...]}`
    ContentArray(Vec<String>),
    /// Any other event (status updates, tool calls, keep-alives)
    Unrecognized,
}

impl StreamFragment {
    /// Classifies an event, checking the known shapes in order of preference
    pub fn classify(event: &Value) -> Self {
        let event_type = event.get("type").and_then(Value::as_str);

        if event_type == Some("text_delta") {
            if let Some(text) = non_empty_str(event.get("text")) {
                return StreamFragment::TextDelta(text);
            }
        }
        if let Some(text) = non_empty_str(event.get("data").and_then(|d| d.get("text"))) {
            return StreamFragment::DataText(text);
        }
        if let Some(text) = non_empty_str(event.get("delta").and_then(|d| d.get("text"))) {
            return StreamFragment::MessageDelta(text);
        }
        if event_type == Some("text_content_block") {
            if let Some(text) = non_empty_str(event.get("content").and_then(|c| c.get("text"))) {
                return StreamFragment::ContentBlock(text);
            }
        }
        if let Some(text) = event.get("text").and_then(Value::as_str) {
            return StreamFragment::BareText(text.to_string());
        }
        if let Some(parts) = event.get("content").and_then(Value::as_array) {
            let texts = parts
                .iter()
                .filter_map(|part| non_empty_str(part.get("text")))
                .collect();
            return StreamFragment::ContentArray(texts);
        }

        StreamFragment::Unrecognized
    }

    /// Appends this fragment's text to `buf`, returning whether anything was recognised
    pub fn append_to(self, buf: &mut String) -> bool {
        match self {
            StreamFragment::TextDelta(text)
            | StreamFragment::DataText(text)
            | StreamFragment::MessageDelta(text)
            | StreamFragment::ContentBlock(text)
            | StreamFragment::BareText(text) => {
                buf.push_str(&text);
                true
            }
            StreamFragment::ContentArray(texts) => {
                for text in texts {
                    buf.push_str(&text);
                }
                true
            }
            StreamFragment::Unrecognized => false,
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
