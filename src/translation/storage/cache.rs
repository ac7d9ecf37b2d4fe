//! 翻译缓存模块
//!
//! 以原文为键的会话级缓存。每个键只写入一次，失败的文本以自身作为译文
//! 缓存为永久回退，避免同一会话中重复请求。

use std::collections::{HashMap, HashSet};

/// 缓存条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub translated_text: String,
    /// 为 `true` 时译文即原文
    pub is_fallback: bool,
}

impl CacheEntry {
    pub fn translated(text: impl Into<String>) -> Self {
        Self {
            translated_text: text.into(),
            is_fallback: false,
        }
    }

    /// 以原文作为译文的回退条目
    pub fn fallback(source: impl Into<String>) -> Self {
        Self {
            translated_text: source.into(),
            is_fallback: true,
        }
    }
}

/// 缓存统计信息
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_entries: usize,
    pub fallback_entries: usize,
    /// 因键已存在而被忽略的写入
    pub rejected_writes: u64,
}

impl CacheStats {
    /// 获取命中率
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_requests as f64
        }
    }
}

/// 批次切分结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachePartition {
    /// 与输入一一对应，命中时为缓存条目
    pub resolved: Vec<Option<CacheEntry>>,
    /// 去重后的未命中文本，按首次出现顺序
    pub misses: Vec<String>,
}

impl CachePartition {
    pub fn is_fully_resolved(&self) -> bool {
        self.misses.is_empty()
    }
}

/// 翻译缓存
#[derive(Debug, Default)]
pub struct TranslationCache {
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 只读查询，不计入统计
    pub fn lookup(&self, text: &str) -> Option<&CacheEntry> {
        self.entries.get(text)
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.contains_key(text)
    }

    /// 把一组文本切分为命中与未命中
    pub fn partition(&mut self, texts: &[String]) -> CachePartition {
        let mut partition = CachePartition {
            resolved: Vec::with_capacity(texts.len()),
            misses: Vec::new(),
        };
        let mut seen = HashSet::new();

        for text in texts {
            self.stats.total_requests += 1;
            match self.entries.get(text) {
                Some(entry) => {
                    self.stats.cache_hits += 1;
                    partition.resolved.push(Some(entry.clone()));
                }
                None => {
                    self.stats.cache_misses += 1;
                    partition.resolved.push(None);
                    if seen.insert(text.as_str()) {
                        partition.misses.push(text.clone());
                    }
                }
            }
        }

        partition
    }

    /// 写入译文，键已存在时保持原值并返回 `false`
    pub fn insert(&mut self, text: &str, translated: &str) -> bool {
        self.insert_entry(text, CacheEntry::translated(translated))
    }

    /// 把原文记为自身的永久回退
    pub fn insert_fallback(&mut self, text: &str) -> bool {
        self.insert_entry(text, CacheEntry::fallback(text))
    }

    fn insert_entry(&mut self, text: &str, entry: CacheEntry) -> bool {
        if self.entries.contains_key(text) {
            self.stats.rejected_writes += 1;
            tracing::trace!("缓存键已存在，忽略写入: {}", text);
            return false;
        }
        if entry.is_fallback {
            self.stats.fallback_entries += 1;
        }
        self.entries.insert(text.to_string(), entry);
        self.stats.total_entries = self.entries.len();
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
