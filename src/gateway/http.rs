//! HTTP transport for the hosted chat provider

use futures::StreamExt;
use reqwest::Client as ReqwestClient;
use serde::Serialize;
use tracing::debug;

use super::{AiConfig, EventStream, EventTransport, GatewayError, SseDecoder};

#[derive(Serialize)]
struct ContentPart<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Serialize)]
struct RunMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreadRef<'a> {
    user_key: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunRequest<'a> {
    message: RunMessage<'a>,
    user_key: &'a str,
    thread: ThreadRef<'a>,
}

/// Opens streaming runs with a single user message over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: ReqwestClient,
    base_url: String,
    user_key: String,
}

impl HttpTransport {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            http_client: ReqwestClient::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_key: config.user_key.clone(),
        }
    }
}

#[async_trait::async_trait]
impl EventTransport for HttpTransport {
    async fn open(&self, api_key: &str, prompt: &str) -> Result<EventStream, GatewayError> {
        let url = format!("{}/threads/runs", self.base_url);
        let request = RunRequest {
            message: RunMessage {
                role: "user",
                content: vec![ContentPart {
                    kind: "text",
                    text: prompt,
                }],
            },
            user_key: &self.user_key,
            thread: ThreadRef {
                user_key: &self.user_key,
            },
        };

        debug!(%url, "Starting provider run");
        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", api_key)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Provider(format!("HTTP {}: {}", status, body)));
        }

        // Each body chunk may complete zero or more records; the decoder's
        // remainder is flushed once the body ends.
        let body = response.bytes_stream().boxed();
        let events = futures::stream::unfold(
            (body, Some(SseDecoder::new())),
            |(mut body, decoder)| async move {
                let mut decoder = decoder?;
                match body.next().await {
                    Some(Ok(chunk)) => {
                        let batch: Vec<Result<_, GatewayError>> =
                            decoder.push(&chunk).into_iter().map(Ok).collect();
                        Some((batch, (body, Some(decoder))))
                    }
                    Some(Err(e)) => Some((
                        vec![Err(GatewayError::Provider(e.to_string()))],
                        (body, None),
                    )),
                    None => {
                        let batch: Vec<Result<_, GatewayError>> =
                            decoder.finish().into_iter().map(Ok).collect();
                        Some((batch, (body, None)))
                    }
                }
            },
        )
        .flat_map(futures::stream::iter);

        Ok(events.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_request_shape() {
        let request = RunRequest {
            message: RunMessage {
                role: "user",
                content: vec![ContentPart {
                    kind: "text",
                    text: "hello",
                }],
            },
            user_key: "user-1",
            thread: ThreadRef { user_key: "user-1" },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "message": {"role": "user", "content": [{"type": "text", "text": "hello"}]},
                "userKey": "user-1",
                "thread": {"userKey": "user-1"}
            })
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let transport = HttpTransport::new(&AiConfig {
            base_url: "http://localhost:9000/".to_string(),
            ..AiConfig::default()
        });
        assert_eq!(transport.base_url, "http://localhost:9000");
    }
}
