//! 翻译模块
//!
//! 在已渲染的文档中就地翻译可见文本，采用分层的模块化架构：
//! - **config**: 配置与站点设置
//! - **core**: 流水线、翻译端、服务客户端与重试
//! - **pipeline**: 树能力抽象、文本分类、内容发现与批次构建
//! - **storage**: 会话级缓存
//! - **processor**: 译文回写与原文/译文切换
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```ignore
//! use live_translate::parsers::html::RcDomTree;
//! use live_translate::translation::{ConfigManager, Orchestrator, TranslationWorker};
//!
//! let config = ConfigManager::new()?.into_config();
//! let tree = RcDomTree::parse(html)?;
//! let worker = TranslationWorker::from_config(&config)?;
//! let orchestrator =
//!     Orchestrator::new(tree, worker, config.site_settings(), "example.org", (&config).into());
//! for node in orchestrator.tree().body_elements() {
//!     orchestrator.notify_subtree(&node);
//! }
//! orchestrator.drain().await;
//! ```

/// 配置管理模块
pub mod config;

/// 核心模块
pub mod core;

/// 错误处理模块
pub mod error;

/// 文本处理管道模块
pub mod pipeline;

/// 译文回写模块
pub mod processor;

/// 存储模块
pub mod storage;

pub use config::{constants, ConfigManager, SiteSettings, TranslationConfig};
pub use core::{
    Orchestrator, OrchestratorOptions, PageEvent, Phase, RetryPolicy, ServiceStats,
    TranslateTextRequest, TranslateTextResponse, TranslatedText, TranslationBackend,
    TranslationClient, TranslationWorker,
};
pub use error::{ErrorCategory, ErrorSeverity, TranslationError, TranslationResult};
pub use pipeline::{
    build_batches, Batch, ContentTree, ContentUnit, DiscoveryQueue, NodeKey, Offer, QueueOrder,
    TextFilter, UnitStatus,
};
pub use processor::{Reinserter, ToggleRecord};
pub use storage::{CacheEntry, CacheStats, TranslationCache};

/// 检查文本是否应该翻译
///
/// ```
/// use live_translate::translation::should_translate;
///
/// assert!(should_translate("Hello World"));
/// assert!(!should_translate("123"));
/// assert!(!should_translate("   "));
/// ```
pub fn should_translate(text: &str) -> bool {
    pipeline::filters::should_translate(text)
}

/// 检查翻译配置文件是否存在
pub fn config_file_exists() -> bool {
    config::config_file_exists()
}
