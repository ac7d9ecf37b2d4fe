//! 翻译服务客户端
//!
//! 把一批未命中的文本编码为单个 `generateContent` 请求，并按 id 取回译文

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::translation::config::TranslationConfig;
use crate::translation::error::{helpers, TranslationError, TranslationResult};

/// 发给服务的格式要求，附在提示词之后
pub const FORMAT_INSTRUCTIONS: &str = "Instructions: \
1. The input is a JSON array of objects with an integer \"id\" and a string \"value\". \
2. Translate only each \"value\" and keep every \"id\" exactly as given. \
3. Respond with a strict JSON array of {\"id\", \"value\"} objects, one per input item. \
4. Do not add markdown, code fences, markup or any other text around the array. \
5. If an item raises a safety issue, return the translation of a safe version of it.";

/// 请求与响应中的单个条目，`id` 为其在请求中的位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceItem {
    pub id: usize,
    pub value: String,
}

/// 一次成功调用的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceOutcome {
    Translated(Vec<ServiceItem>),
    /// 服务未返回内容（安全策略等），附带原因
    Blocked(String),
}

/// 传输层返回的原始响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub retry_after: Option<Duration>,
    pub body: String,
}

/// HTTP 传输抽象
#[async_trait(?Send)]
pub trait ServiceTransport {
    async fn post_json(
        &self,
        url: &str,
        api_key: Option<&str>,
        body: &Value,
    ) -> TranslationResult<TransportResponse>;
}

/// 基于 reqwest 的传输实现
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> TranslationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait(?Send)]
impl ServiceTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        api_key: Option<&str>,
        body: &Value,
    ) -> TranslationResult<TransportResponse> {
        let mut request = self.client.post(url).json(body);
        if let Some(key) = api_key {
            request = request.header("x-goog-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// 解析以秒为单位的 `Retry-After`
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// 翻译服务客户端
pub struct TranslationClient<T = HttpTransport> {
    transport: T,
    endpoint: String,
    api_key: Option<String>,
}

impl TranslationClient<HttpTransport> {
    /// 按配置创建 HTTP 客户端
    pub fn from_config(config: &TranslationConfig) -> TranslationResult<Self> {
        let transport = HttpTransport::new(config.request_timeout())?;
        Ok(Self::new(
            transport,
            &config.api_url,
            &config.model,
            config.api_key.clone(),
        ))
    }
}

impl<T: ServiceTransport> TranslationClient<T> {
    pub fn new(transport: T, api_url: &str, model: &str, api_key: Option<String>) -> Self {
        let endpoint = format!(
            "{}/{}:generateContent",
            api_url.trim_end_matches('/'),
            model.trim()
        );
        Self {
            transport,
            endpoint,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 发送一次请求，不做重试
    pub async fn translate(
        &self,
        prompt: &str,
        texts: &[String],
    ) -> TranslationResult<ServiceOutcome> {
        if texts.is_empty() {
            return Ok(ServiceOutcome::Translated(Vec::new()));
        }

        let items: Vec<ServiceItem> = texts
            .iter()
            .enumerate()
            .map(|(id, value)| ServiceItem {
                id,
                value: value.clone(),
            })
            .collect();
        let body = build_request_body(prompt, &items)?;

        tracing::debug!("发送 {} 条文本到 {}", items.len(), self.endpoint);
        let response = self
            .transport
            .post_json(&self.endpoint, self.api_key.as_deref(), &body)
            .await?;

        parse_response(&response)
    }
}

/// 构建 `generateContent` 请求体
pub fn build_request_body(prompt: &str, items: &[ServiceItem]) -> TranslationResult<Value> {
    let encoded = serde_json::to_string(items)?;
    let text = format!("{}\n\n{}\n\n{}", prompt.trim(), FORMAT_INSTRUCTIONS, encoded);

    Ok(json!({
        "contents": [
            {
                "role": "user",
                "parts": [{ "text": text }]
            }
        ],
        "generationConfig": {
            "responseMimeType": "application/json"
        }
    }))
}

/// 按状态码解释响应
pub fn parse_response(response: &TransportResponse) -> TranslationResult<ServiceOutcome> {
    match response.status {
        200..=299 => parse_envelope(&response.body),
        429 => Err(TranslationError::RateLimitExceeded {
            retry_after: response.retry_after,
        }),
        status @ 500..=599 => Err(TranslationError::ServiceUnavailable(status)),
        status => Err(TranslationError::ServiceRejected {
            status,
            message: extract_service_error(&response.body)
                .unwrap_or_else(|| response.body.chars().take(200).collect()),
        }),
    }
}

/// 解析候选信封；无内容视为被拦截
pub fn parse_envelope(body: &str) -> TranslationResult<ServiceOutcome> {
    let envelope: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| helpers::malformed(format!("响应信封不是合法 JSON: {}", e)))?;

    let block_reason = envelope
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason);
    if let Some(reason) = block_reason {
        return Ok(ServiceOutcome::Blocked(reason));
    }

    let Some(candidate) = envelope.candidates.into_iter().next() else {
        return Ok(ServiceOutcome::Blocked("NO_CANDIDATES".to_string()));
    };
    let Some(content) = candidate.content else {
        return Ok(ServiceOutcome::Blocked(
            candidate
                .finish_reason
                .unwrap_or_else(|| "NO_CONTENT".to_string()),
        ));
    };

    let text: String = content
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect();

    parse_payload(&text).map(ServiceOutcome::Translated)
}

/// 严格解析 `[{id, value}]` 文本
pub fn parse_payload(text: &str) -> TranslationResult<Vec<ServiceItem>> {
    let text = text.trim();
    if !(text.starts_with('[') && text.ends_with(']')) {
        return Err(helpers::malformed(format!(
            "响应不是 JSON 数组: {}",
            text.chars().take(80).collect::<String>()
        )));
    }

    let raw: Vec<RawItem> = serde_json::from_str(text)
        .map_err(|e| helpers::malformed(format!("无法解析译文数组: {}", e)))?;

    Ok(raw
        .into_iter()
        .filter_map(|item| {
            let id = item.id.as_index()?;
            let value = item.value?;
            Some(ServiceItem { id, value })
        })
        .collect())
}

fn extract_service_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<ServiceErrorDetail>,
    }

    #[derive(Deserialize)]
    struct ServiceErrorDetail {
        message: Option<String>,
        status: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    match (error.message, error.status) {
        (Some(message), Some(status)) => Some(format!("{} ({})", message, status)),
        (Some(message), None) => Some(message),
        (None, Some(status)) => Some(status),
        (None, None) => None,
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    id: RawId,
    #[serde(default)]
    value: Option<String>,
}

/// 服务有时把 id 作为字符串返回
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl RawId {
    fn as_index(&self) -> Option<usize> {
        match self {
            RawId::Number(n) => usize::try_from(*n).ok(),
            RawId::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(text: &str) -> String {
        json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] }, "finishReason": "STOP" }]
        })
        .to_string()
    }

    fn ok(body: String) -> TransportResponse {
        TransportResponse {
            status: 200,
            retry_after: None,
            body,
        }
    }

    #[test]
    fn test_request_body_shape() {
        let items = vec![
            ServiceItem { id: 0, value: "Hello".into() },
            ServiceItem { id: 1, value: "World".into() },
        ];
        let body = build_request_body("Translate to French", &items).unwrap();
        let text = body["contents"][0]["parts"][0]["text"].as_str().unwrap();

        assert!(text.starts_with("Translate to French"));
        assert!(text.contains(FORMAT_INSTRUCTIONS));
        assert!(text.ends_with(r#"[{"id":0,"value":"Hello"},{"id":1,"value":"World"}]"#));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_parse_translated_items() {
        let outcome = parse_response(&ok(envelope(
            r#" [{"id": 1, "value": "Monde"}, {"id": "0", "value": "Bonjour"}] "#,
        )))
        .unwrap();

        assert_eq!(
            outcome,
            ServiceOutcome::Translated(vec![
                ServiceItem { id: 1, value: "Monde".into() },
                ServiceItem { id: 0, value: "Bonjour".into() },
            ])
        );
    }

    #[test]
    fn test_blocked_envelopes() {
        let no_content = json!({ "candidates": [{ "finishReason": "SAFETY" }] }).to_string();
        assert_eq!(
            parse_response(&ok(no_content)).unwrap(),
            ServiceOutcome::Blocked("SAFETY".into())
        );

        let feedback = json!({ "promptFeedback": { "blockReason": "OTHER" } }).to_string();
        assert_eq!(
            parse_response(&ok(feedback)).unwrap(),
            ServiceOutcome::Blocked("OTHER".into())
        );
    }

    #[test]
    fn test_malformed_payload_is_retryable() {
        let fenced = envelope("```json\n[{\"id\":0,\"value\":\"x\"}]\n```");
        let err = parse_response(&ok(fenced)).unwrap_err();
        assert!(matches!(err, TranslationError::MalformedResponse(_)));
        assert!(err.is_retryable());

        let err = parse_response(&ok(envelope("[not json]"))).unwrap_err();
        assert!(err.is_retryable());

        let err = parse_response(&ok("<html>".into())).unwrap_err();
        assert!(matches!(err, TranslationError::MalformedResponse(_)));
    }

    #[test]
    fn test_status_mapping() {
        let rate_limited = TransportResponse {
            status: 429,
            retry_after: Some(Duration::from_secs(3)),
            body: String::new(),
        };
        assert_eq!(
            parse_response(&rate_limited).unwrap_err(),
            TranslationError::RateLimitExceeded {
                retry_after: Some(Duration::from_secs(3))
            }
        );

        let unavailable = TransportResponse {
            status: 503,
            retry_after: None,
            body: String::new(),
        };
        assert!(parse_response(&unavailable).unwrap_err().is_retryable());

        let rejected = TransportResponse {
            status: 400,
            retry_after: None,
            body: json!({"error": {"message": "API key not valid", "status": "INVALID_ARGUMENT"}})
                .to_string(),
        };
        let err = parse_response(&rejected).unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(
            err,
            TranslationError::ServiceRejected {
                status: 400,
                message: "API key not valid (INVALID_ARGUMENT)".into()
            }
        );
    }

    #[test]
    fn test_items_without_value_are_dropped() {
        let items = parse_payload(r#"[{"id":0},{"id":1,"value":"ok"},{"id":"x","value":"?"}]"#)
            .unwrap();
        assert_eq!(items, vec![ServiceItem { id: 1, value: "ok".into() }]);
    }

    #[test]
    fn test_retry_after_parsing() {
        assert_eq!(parse_retry_after(" 12 "), Some(Duration::from_secs(12)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }
}
