//! 发现端与翻译端之间的消息约定
//!
//! 发现端只通过 `TranslationBackend` 与翻译端交互；`TranslationWorker`
//! 是生产实现，组合了服务客户端与重试策略，并把一切失败吸收为回退

use std::cell::{Cell, RefCell};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::{HttpTransport, ServiceOutcome, ServiceTransport, TranslationClient};
use super::retry::RetryPolicy;
use crate::translation::config::TranslationConfig;
use crate::translation::error::{helpers, ErrorStats, TranslationResult};

/// 翻译请求的消息类型
pub const TRANSLATE_TEXT: &str = "TRANSLATE_TEXT";

/// 翻译请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateTextRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub texts: Vec<String>,
    pub prompt: String,
}

impl TranslateTextRequest {
    pub fn new(texts: Vec<String>, prompt: &str) -> Self {
        Self {
            kind: TRANSLATE_TEXT.to_string(),
            texts,
            prompt: prompt.to_string(),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// 单条译文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedText {
    pub original_text: String,
    pub translated_text: String,
    /// 译文为原文回退时为 `true`
    #[serde(default, skip_serializing_if = "is_false")]
    pub fallback: bool,
}

impl TranslatedText {
    pub fn translated(original: &str, translated: &str) -> Self {
        Self {
            original_text: original.to_string(),
            translated_text: translated.to_string(),
            fallback: false,
        }
    }

    pub fn fallback(original: &str) -> Self {
        Self {
            original_text: original.to_string(),
            translated_text: original.to_string(),
            fallback: true,
        }
    }
}

/// 翻译响应，长度与顺序和请求的 `texts` 一致
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranslateTextResponse {
    Translated {
        #[serde(rename = "translatedTexts")]
        translated_texts: Vec<TranslatedText>,
    },
    Error {
        error: String,
    },
}

impl TranslateTextResponse {
    pub fn error(message: impl Into<String>) -> Self {
        TranslateTextResponse::Error {
            error: message.into(),
        }
    }

    /// 全部回退为原文
    pub fn all_fallback(texts: &[String]) -> Self {
        TranslateTextResponse::Translated {
            translated_texts: texts.iter().map(|t| TranslatedText::fallback(t)).collect(),
        }
    }
}

/// 翻译端接口
#[async_trait(?Send)]
pub trait TranslationBackend {
    async fn translate_texts(&self, request: TranslateTextRequest) -> TranslateTextResponse;
}

/// 生产环境翻译端
pub struct TranslationWorker<T = HttpTransport> {
    client: TranslationClient<T>,
    retry: RetryPolicy,
    errors: RefCell<ErrorStats>,
    requests: Cell<usize>,
}

impl TranslationWorker<HttpTransport> {
    pub fn from_config(config: &TranslationConfig) -> TranslationResult<Self> {
        Ok(Self::new(
            TranslationClient::from_config(config)?,
            config.retry_policy(),
        ))
    }
}

impl<T: ServiceTransport> TranslationWorker<T> {
    pub fn new(client: TranslationClient<T>, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            errors: RefCell::new(ErrorStats::default()),
            requests: Cell::new(0),
        }
    }

    pub fn client(&self) -> &TranslationClient<T> {
        &self.client
    }

    /// 已处理的请求数
    pub fn request_count(&self) -> usize {
        self.requests.get()
    }

    pub fn error_stats(&self) -> ErrorStats {
        self.errors.borrow().clone()
    }

    async fn resolve(&self, texts: &[String], prompt: &str) -> Vec<TranslatedText> {
        let outcome = self
            .retry
            .run("翻译请求", |_| async move {
                let result = self.client.translate(prompt, texts).await;
                if let Err(error) = &result {
                    self.errors.borrow_mut().record_error(error);
                }
                result
            })
            .await;

        match outcome {
            Ok(ServiceOutcome::Translated(items)) => {
                let mut values: Vec<Option<String>> = vec![None; texts.len()];
                for item in items {
                    match values.get_mut(item.id) {
                        Some(slot) if slot.is_none() => *slot = Some(item.value),
                        Some(_) => tracing::debug!("忽略重复的 id {}", item.id),
                        None => tracing::debug!("忽略越界的 id {}", item.id),
                    }
                }

                let missing = values.iter().filter(|v| v.is_none()).count();
                if missing > 0 {
                    tracing::warn!("响应缺少 {} / {} 条译文，使用原文", missing, texts.len());
                }

                texts
                    .iter()
                    .zip(values)
                    .map(|(original, value)| match value {
                        Some(value) if !value.trim().is_empty() => {
                            TranslatedText::translated(original, value.trim())
                        }
                        _ => TranslatedText::fallback(original),
                    })
                    .collect()
            }
            Ok(ServiceOutcome::Blocked(reason)) => {
                tracing::warn!("翻译服务拒绝返回内容: {}，{} 条文本使用原文", reason, texts.len());
                texts.iter().map(|t| TranslatedText::fallback(t)).collect()
            }
            Err(error) => {
                helpers::log_error(&error);
                texts.iter().map(|t| TranslatedText::fallback(t)).collect()
            }
        }
    }
}

#[async_trait(?Send)]
impl<T: ServiceTransport> TranslationBackend for TranslationWorker<T> {
    async fn translate_texts(&self, request: TranslateTextRequest) -> TranslateTextResponse {
        if request.kind != TRANSLATE_TEXT {
            return TranslateTextResponse::error(format!("未知的消息类型: {}", request.kind));
        }
        if request.prompt.trim().is_empty() {
            return TranslateTextResponse::error("提示词为空");
        }
        if request.texts.is_empty() {
            return TranslateTextResponse::Translated {
                translated_texts: Vec::new(),
            };
        }

        self.requests.set(self.requests.get() + 1);
        let translated_texts = self.resolve(&request.texts, &request.prompt).await;
        TranslateTextResponse::Translated { translated_texts }
    }
}
