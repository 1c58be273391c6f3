use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::error::ExchangeError;

/// Reply fields, probed in this order.
pub const REPLY_FIELDS: [&str; 3] = ["response", "output", "text"];

/// Used when a well-formed reply carries none of the reply fields.
pub const NO_CONTENT_REPLY: &str = "No response received.";

/// The remote side of an exchange: takes a prompt, returns reply text.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, prompt: &str) -> Result<String, ExchangeError>;
}

// The prompt goes out under two keys since responders disagree on the name.
#[derive(Serialize)]
struct RelayRequest<'a> {
    prompt: &'a str,
    message: &'a str,
}

#[derive(Clone)]
pub struct HttpResponder {
    client: Client,
    url: String,
}

impl HttpResponder {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Responder for HttpResponder {
    async fn respond(&self, prompt: &str) -> Result<String, ExchangeError> {
        let request = RelayRequest {
            prompt,
            message: prompt,
        };

        // .json() sets Content-Type: application/json
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_reply_body(&body)
    }
}

/// Turn a 2xx body into reply text.
///
/// Plain-text bodies are not accepted as replies: anything that is not JSON
/// is a failure, even with a success status.
pub fn parse_reply_body(body: &str) -> Result<String, ExchangeError> {
    if body.trim().is_empty() {
        return Err(ExchangeError::EmptyResponse);
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| ExchangeError::MalformedResponse(e.to_string()))?;

    Ok(extract_reply(&value))
}

/// Probe the reply fields in priority order. Empty strings and non-string
/// values are skipped.
pub fn extract_reply(value: &Value) -> String {
    REPLY_FIELDS
        .iter()
        .filter_map(|field| value.get(field).and_then(Value::as_str))
        .find(|reply| !reply.is_empty())
        .unwrap_or(NO_CONTENT_REPLY)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_wins_over_output() {
        let value = json!({ "output": "second", "response": "first" });
        assert_eq!(extract_reply(&value), "first");
    }

    #[test]
    fn test_text_used_when_alone() {
        let value = json!({ "text": "third" });
        assert_eq!(extract_reply(&value), "third");
    }

    #[test]
    fn test_output_before_text() {
        let value = json!({ "text": "third", "output": "second" });
        assert_eq!(extract_reply(&value), "second");
    }

    #[test]
    fn test_missing_fields_use_default() {
        assert_eq!(extract_reply(&json!({ "answer": "nope" })), NO_CONTENT_REPLY);
        assert_eq!(extract_reply(&json!("bare string")), NO_CONTENT_REPLY);
        assert_eq!(extract_reply(&json!([1, 2, 3])), NO_CONTENT_REPLY);
    }

    #[test]
    fn test_empty_and_non_string_fields_fall_through() {
        let value = json!({ "response": "", "output": 42, "text": "fallback" });
        assert_eq!(extract_reply(&value), "fallback");
    }

    #[test]
    fn test_empty_body_is_failure() {
        assert_eq!(parse_reply_body(""), Err(ExchangeError::EmptyResponse));
        assert_eq!(parse_reply_body("  \n"), Err(ExchangeError::EmptyResponse));
    }

    #[test]
    fn test_plain_text_body_is_failure() {
        let result = parse_reply_body("hi there");
        assert!(matches!(result, Err(ExchangeError::MalformedResponse(_))));
    }

    #[test]
    fn test_request_payload_duplicates_prompt() {
        let payload = serde_json::to_value(RelayRequest {
            prompt: "hello",
            message: "hello",
        })
        .unwrap();
        assert_eq!(payload, json!({ "prompt": "hello", "message": "hello" }));
    }
}
