//! 存储模块
//!
//! 提供会话级翻译缓存

pub mod cache;

pub use cache::{CacheEntry, CachePartition, CacheStats, TranslationCache};
