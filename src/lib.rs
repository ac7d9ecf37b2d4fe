//! # Live Translate Library
//!
//! 在已渲染的 HTML 文档中就地翻译可见文本，并支持在原文与译文之间切换。
//!
//! ## 模块组织
//!
//! - `env` - 类型化的环境变量
//! - `parsers` - HTML 解析、序列化与内容树
//! - `translation` - 发现、批次、缓存、翻译端与回写
//! - `utils` - 日志等工具函数

pub mod env;
pub mod parsers;
pub mod translation;
pub mod utils;

pub use parsers::RcDomTree;
pub use translation::{
    ConfigManager, Orchestrator, OrchestratorOptions, SiteSettings, TranslationConfig,
    TranslationError, TranslationResult, TranslationWorker,
};
pub use utils::init_logging;
