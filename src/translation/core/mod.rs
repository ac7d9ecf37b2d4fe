//! 翻译系统核心模块
//!
//! 本模块负责把发现到的文本送到翻译服务并把结果交还给流水线。
//!
//! ## 架构设计
//!
//! - **流水线层** (`service.rs`): 状态机、批次处理与启用切换
//! - **消息层** (`messaging.rs`): 流水线与翻译端之间的请求/响应约定
//! - **客户端层** (`client.rs`): 调用生成式翻译服务并解析结构化结果
//! - **重试层** (`retry.rs`): 有界的指数退避
//!
//! ## 模块依赖关系
//!
//! ```text
//! Orchestrator (service.rs)
//!     ├── DiscoveryQueue (pipeline/collector.rs)
//!     ├── build_batches (pipeline/batch.rs)
//!     ├── TranslationCache (storage/cache.rs)
//!     ├── Reinserter (processor.rs)
//!     └── TranslationBackend (messaging.rs)
//!             └── TranslationWorker
//!                     ├── RetryPolicy (retry.rs)
//!                     └── TranslationClient (client.rs)
//! ```

pub mod client;
pub mod messaging;
pub mod retry;
pub mod service;

pub use client::{
    HttpTransport, ServiceItem, ServiceOutcome, ServiceTransport, TranslationClient,
    TransportResponse,
};
pub use messaging::{
    TranslateTextRequest, TranslateTextResponse, TranslatedText, TranslationBackend,
    TranslationWorker, TRANSLATE_TEXT,
};
pub use retry::RetryPolicy;
pub use service::{Orchestrator, OrchestratorOptions, PageEvent, Phase, ServiceStats};
