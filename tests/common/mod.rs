// 集成测试公共模块
//
// 提供测试页面、可编程的翻译端与传输层

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::Instant;

use live_translate::parsers::html::RcDomTree;
use live_translate::translation::config::SiteSettings;
use live_translate::translation::core::client::{ServiceTransport, TransportResponse};
use live_translate::translation::core::{
    RetryPolicy, TranslateTextRequest, TranslateTextResponse, TranslatedText, TranslationBackend,
    TranslationClient, TranslationWorker,
};
use live_translate::translation::error::{TranslationError, TranslationResult};
use live_translate::translation::pipeline::QueueOrder;
use live_translate::translation::{Orchestrator, OrchestratorOptions};

pub const PROMPT: &str = "Translate to French";

/// HTML测试辅助工具
pub struct HtmlTestHelper;

#[allow(dead_code)]
impl HtmlTestHelper {
    pub fn tree(html: &str) -> RcDomTree {
        RcDomTree::parse(html).expect("test HTML should parse")
    }

    pub fn simple_page() -> String {
        r#"<!DOCTYPE html>
<html>
<head><title>Test Page</title><style>.a { color: red; }</style></head>
<body>
  <h1>Welcome to the test page</h1>
  <p>This is a test paragraph with <b>bold words</b> inside.</p>
  <script>console.log("hi")</script>
  <div hidden>Hidden content</div>
</body>
</html>"#
            .to_string()
    }

    /// 同一文本在页面中出现两次
    pub fn repeated_page() -> String {
        "<html><body><div><p>Hello</p><p>World</p><p>Hello</p></div></body></html>".to_string()
    }

    pub fn paragraphs(texts: &[&str]) -> String {
        let body: String = texts.iter().map(|t| format!("<p>{}</p>", t)).collect();
        format!("<html><body>{}</body></html>", body)
    }

    pub fn body_text(tree: &RcDomTree) -> String {
        let html = tree.to_html().expect("serialization should succeed");
        let start = html.find("<body>").map(|i| i + "<body>".len()).unwrap_or(0);
        let end = html.rfind("</body>").unwrap_or(html.len());
        html[start..end].to_string()
    }
}

/// 翻译端的回应方式
#[allow(dead_code)]
pub enum BackendMode {
    /// 每条文本加前缀
    Prefix(&'static str),
    /// 每次都返回错误
    Error(&'static str),
    /// 每条文本都回退为原文
    Fallback,
    /// 按顺序返回预设响应，用完后加前缀 "FR:"
    Scripted(RefCell<VecDeque<TranslateTextResponse>>),
}

/// 记录所有请求的翻译端
pub struct RecordingBackend {
    mode: BackendMode,
    requests: RefCell<Vec<TranslateTextRequest>>,
    call_times: RefCell<Vec<Instant>>,
}

#[allow(dead_code)]
impl RecordingBackend {
    pub fn new(mode: BackendMode) -> Self {
        Self {
            mode,
            requests: RefCell::new(Vec::new()),
            call_times: RefCell::new(Vec::new()),
        }
    }

    pub fn french() -> Self {
        Self::new(BackendMode::Prefix("FR:"))
    }

    pub fn scripted(responses: Vec<TranslateTextResponse>) -> Self {
        Self::new(BackendMode::Scripted(RefCell::new(responses.into())))
    }

    pub fn requests(&self) -> Vec<TranslateTextRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.borrow().clone()
    }

    fn prefixed(prefix: &str, texts: &[String]) -> TranslateTextResponse {
        TranslateTextResponse::Translated {
            translated_texts: texts
                .iter()
                .map(|t| TranslatedText::translated(t, &format!("{}{}", prefix, t)))
                .collect(),
        }
    }
}

#[async_trait(?Send)]
impl TranslationBackend for RecordingBackend {
    async fn translate_texts(&self, request: TranslateTextRequest) -> TranslateTextResponse {
        self.call_times.borrow_mut().push(Instant::now());
        self.requests.borrow_mut().push(request.clone());

        // 模拟一次跨进程往返
        tokio::task::yield_now().await;

        match &self.mode {
            BackendMode::Prefix(prefix) => Self::prefixed(prefix, &request.texts),
            BackendMode::Error(message) => TranslateTextResponse::error(*message),
            BackendMode::Fallback => TranslateTextResponse::all_fallback(&request.texts),
            BackendMode::Scripted(queue) => {
                let next = queue.borrow_mut().pop_front();
                next.unwrap_or_else(|| Self::prefixed("FR:", &request.texts))
            }
        }
    }
}

/// 按顺序返回预设响应的传输层
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<TranslationResult<TransportResponse>>>,
    bodies: RefCell<Vec<Value>>,
    urls: RefCell<Vec<String>>,
    keys: RefCell<Vec<Option<String>>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new(responses: Vec<TranslationResult<TransportResponse>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            bodies: RefCell::new(Vec::new()),
            urls: RefCell::new(Vec::new()),
            keys: RefCell::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.bodies.borrow().len()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.borrow().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.borrow().clone()
    }

    pub fn keys(&self) -> Vec<Option<String>> {
        self.keys.borrow().clone()
    }

    /// 200 响应，候选内容为给定文本
    pub fn ok(text: &str) -> TranslationResult<TransportResponse> {
        Ok(TransportResponse {
            status: 200,
            retry_after: None,
            body: json!({
                "candidates": [{ "content": { "parts": [{ "text": text }] } }]
            })
            .to_string(),
        })
    }

    /// 200 响应，按 id 顺序返回译文数组
    pub fn items(values: &[&str]) -> TranslationResult<TransportResponse> {
        let items: Vec<Value> = values
            .iter()
            .enumerate()
            .map(|(id, value)| json!({ "id": id, "value": value }))
            .collect();
        Self::ok(&Value::Array(items).to_string())
    }

    pub fn status(status: u16, body: &str) -> TranslationResult<TransportResponse> {
        Ok(TransportResponse {
            status,
            retry_after: None,
            body: body.to_string(),
        })
    }

    pub fn rate_limited(retry_after: Option<Duration>) -> TranslationResult<TransportResponse> {
        Ok(TransportResponse {
            status: 429,
            retry_after,
            body: r#"{"error":{"message":"quota","status":"RESOURCE_EXHAUSTED"}}"#.to_string(),
        })
    }

    pub fn blocked() -> TranslationResult<TransportResponse> {
        Ok(TransportResponse {
            status: 200,
            retry_after: None,
            body: json!({ "promptFeedback": { "blockReason": "SAFETY" } }).to_string(),
        })
    }

    /// 发送给服务的 `[{id, value}]` 条目
    pub fn submitted_items(body: &Value) -> Vec<Value> {
        let text = body["contents"][0]["parts"][0]["text"]
            .as_str()
            .expect("request text");
        let start = text.rfind("\n\n[").expect("encoded items") + 2;
        serde_json::from_str(&text[start..]).expect("items should be JSON")
    }
}

#[async_trait(?Send)]
impl ServiceTransport for ScriptedTransport {
    async fn post_json(
        &self,
        url: &str,
        api_key: Option<&str>,
        body: &Value,
    ) -> TranslationResult<TransportResponse> {
        self.bodies.borrow_mut().push(body.clone());
        self.urls.borrow_mut().push(url.to_string());
        self.keys.borrow_mut().push(api_key.map(str::to_string));

        let next = self.responses.borrow_mut().pop_front();
        next.unwrap_or_else(|| {
            Err(TranslationError::InternalError(
                "scripted transport exhausted".to_string(),
            ))
        })
    }
}

#[allow(dead_code)]
pub fn worker(transport: ScriptedTransport) -> TranslationWorker<ScriptedTransport> {
    let client = TranslationClient::new(
        transport,
        "https://translate.test/v1beta/models",
        "test-model",
        Some("secret".to_string()),
    );
    TranslationWorker::new(client, RetryPolicy::default())
}

#[allow(dead_code)]
pub fn settings(prompt: &str) -> SiteSettings {
    SiteSettings::new(true, prompt, "")
}

/// 无等待的流水线参数
#[allow(dead_code)]
pub fn fast_options() -> OrchestratorOptions {
    OrchestratorOptions {
        max_batch_chars: 3000,
        batch_pacing: Duration::ZERO,
        settle_delay: Duration::ZERO,
        debounce: Duration::ZERO,
        queue_order: QueueOrder::Fifo,
    }
}

/// 用给定页面和翻译端创建流水线
#[allow(dead_code)]
pub fn orchestrator<B: TranslationBackend>(
    html: &str,
    backend: B,
    options: OrchestratorOptions,
) -> Orchestrator<RcDomTree, B> {
    Orchestrator::new(
        HtmlTestHelper::tree(html),
        backend,
        settings(PROMPT),
        "example.org",
        options,
    )
}

/// 把 `<body>` 下的所有元素标记为可见
#[allow(dead_code)]
pub fn reveal_body<B: TranslationBackend>(orchestrator: &Orchestrator<RcDomTree, B>) -> usize {
    orchestrator
        .tree()
        .body_elements()
        .iter()
        .map(|node| orchestrator.notify_subtree(node))
        .sum()
}
