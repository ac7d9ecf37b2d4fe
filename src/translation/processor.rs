//! 译文回写模块
//!
//! 把译文写回文本叶子节点，并为每个位置保存原文与译文，用于无需重新请求的切换

use std::collections::HashMap;

use crate::translation::pipeline::collector::{ContentUnit, UnitStatus};
use crate::translation::pipeline::tree::{ContentTree, NodeKey};
use crate::translation::storage::cache::CacheEntry;

/// 单个位置的原文与译文
#[derive(Debug, Clone)]
pub struct ToggleRecord<N> {
    pub node: N,
    pub original: String,
    pub translated: String,
}

/// 回写统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    pub applied: usize,
    pub fallbacks: usize,
    pub deferred: usize,
}

/// 译文回写器
pub struct Reinserter<N> {
    records: HashMap<NodeKey, ToggleRecord<N>>,
    /// 记录首次解析的顺序，切换时按此顺序回写
    order: Vec<NodeKey>,
    showing_translated: bool,
    stats: ProcessorStats,
}

impl<N: Clone> Default for Reinserter<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Clone> Reinserter<N> {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
            showing_translated: true,
            stats: ProcessorStats::default(),
        }
    }

    pub fn is_showing_translated(&self) -> bool {
        self.showing_translated
    }

    pub fn record(&self, key: NodeKey) -> Option<&ToggleRecord<N>> {
        self.records.get(&key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> &ProcessorStats {
        &self.stats
    }

    /// 按批次顺序回写译文
    ///
    /// 首次解析的位置会生成切换记录，之后的写入不改变记录；
    /// 当前显示原文时只记录、不改写节点。回退条目保留原文并把单元标记为失败
    pub fn apply<T>(&mut self, tree: &T, units: &mut [ContentUnit<N>], translations: &[CacheEntry]) -> usize
    where
        T: ContentTree<Node = N>,
    {
        if units.len() != translations.len() {
            tracing::warn!(
                "单元数 {} 与译文数 {} 不一致，仅回写前 {} 条",
                units.len(),
                translations.len(),
                units.len().min(translations.len())
            );
        }

        let mut applied = 0;
        for (unit, entry) in units.iter_mut().zip(translations) {
            let is_fallback = entry.is_fallback;
            let display = if is_fallback {
                unit.raw_text.clone()
            } else {
                preserve_whitespace(&unit.raw_text, &entry.translated_text)
            };

            if !self.records.contains_key(&unit.key) {
                self.order.push(unit.key);
                self.records.insert(
                    unit.key,
                    ToggleRecord {
                        node: unit.node.clone(),
                        original: unit.raw_text.clone(),
                        translated: display.clone(),
                    },
                );
            }

            if self.showing_translated {
                tree.replace_text(&unit.node, &display);
                applied += 1;
            } else {
                self.stats.deferred += 1;
            }

            if is_fallback {
                self.stats.fallbacks += 1;
                unit.status = UnitStatus::Failed;
            } else {
                unit.status = UnitStatus::Translated;
            }
        }

        self.stats.applied += applied;
        applied
    }

    /// 恢复所有记录位置的原文
    pub fn show_original<T>(&mut self, tree: &T) -> usize
    where
        T: ContentTree<Node = N>,
    {
        self.showing_translated = false;
        self.rewrite(tree, |record| &record.original)
    }

    /// 重新显示所有记录位置的译文
    pub fn show_translated<T>(&mut self, tree: &T) -> usize
    where
        T: ContentTree<Node = N>,
    {
        self.showing_translated = true;
        self.rewrite(tree, |record| &record.translated)
    }

    fn rewrite<T, F>(&self, tree: &T, pick: F) -> usize
    where
        T: ContentTree<Node = N>,
        F: Fn(&ToggleRecord<N>) -> &String,
    {
        let mut count = 0;
        for key in &self.order {
            if let Some(record) = self.records.get(key) {
                tree.replace_text(&record.node, pick(record));
                count += 1;
            }
        }
        tracing::debug!("切换了 {} 个位置的显示文本", count);
        count
    }
}

/// 保留原文首尾空白，使相邻内联元素之间的间距不变
pub fn preserve_whitespace(raw: &str, translated: &str) -> String {
    let core = raw.trim();
    if core.is_empty() {
        return translated.to_string();
    }
    let leading_len = raw.len() - raw.trim_start().len();
    let trailing_len = raw.len() - raw.trim_end().len();
    format!(
        "{}{}{}",
        &raw[..leading_len],
        translated.trim(),
        &raw[raw.len() - trailing_len..]
    )
}
