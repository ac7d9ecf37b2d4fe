//! 批次构建模块
//!
//! 按字符预算把有序文本单元贪心地切分为批次，保持单元的相对顺序

use super::collector::{ContentUnit, UnitStatus};

/// 一组一起提交的文本单元
#[derive(Debug, Clone)]
pub struct Batch<N> {
    pub units: Vec<ContentUnit<N>>,
    pub total_chars: usize,
}

impl<N> Batch<N> {
    fn new() -> Self {
        Self {
            units: Vec::new(),
            total_chars: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// 与单元一一对应的文本
    pub fn texts(&self) -> Vec<String> {
        self.units.iter().map(|u| u.source_text.clone()).collect()
    }

    /// 与文本一一对应的节点
    pub fn nodes(&self) -> Vec<&N> {
        self.units.iter().map(|u| &u.node).collect()
    }

    /// 超出预算的单个单元
    pub fn is_oversized(&self, max_chars: usize) -> bool {
        self.units.len() == 1 && self.total_chars > max_chars
    }
}

/// 构建批次
///
/// 当下一个单元会使批次超出 `max_chars` 时关闭当前批次；
/// 单个单元本身超出预算时独占一个批次
pub fn build_batches<N>(units: Vec<ContentUnit<N>>, max_chars: usize) -> Vec<Batch<N>> {
    let mut batches = Vec::new();
    let mut current = Batch::new();

    for mut unit in units {
        let chars = unit.char_count();
        if !current.is_empty() && current.total_chars + chars > max_chars {
            batches.push(std::mem::replace(&mut current, Batch::new()));
        }
        unit.status = UnitStatus::Batched;
        current.total_chars += chars;
        current.units.push(unit);
    }

    if !current.is_empty() {
        batches.push(current);
    }

    tracing::debug!("构建了 {} 个批次", batches.len());
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::pipeline::tree::NodeKey;

    fn unit(id: usize, text: &str) -> ContentUnit<usize> {
        ContentUnit {
            node: id,
            key: NodeKey::from_raw(id),
            source_text: text.to_string(),
            raw_text: text.to_string(),
            status: UnitStatus::Pending,
        }
    }

    fn ids(batches: &[Batch<usize>]) -> Vec<Vec<usize>> {
        batches
            .iter()
            .map(|b| b.nodes().into_iter().copied().collect())
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(build_batches::<usize>(Vec::new(), 100).is_empty());
    }

    #[test]
    fn test_all_fit_in_one_batch() {
        let batches = build_batches(
            vec![unit(0, "Hello"), unit(1, "World"), unit(2, "Hello")],
            100,
        );
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].texts(), vec!["Hello", "World", "Hello"]);
        assert_eq!(batches[0].total_chars, 15);
        assert!(batches[0].units.iter().all(|u| u.status == UnitStatus::Batched));
    }

    #[test]
    fn test_budget_split_preserves_order() {
        let units = (0..7).map(|i| unit(i, "abcd")).collect();
        let batches = build_batches(units, 10);

        assert_eq!(ids(&batches), vec![vec![0, 1], vec![2, 3], vec![4, 5], vec![6]]);
        assert!(batches.iter().all(|b| b.total_chars <= 10));
    }

    #[test]
    fn test_oversized_unit_is_singleton() {
        let long = "x".repeat(50);
        let batches = build_batches(vec![unit(0, &long), unit(1, "ab"), unit(2, &long)], 10);

        assert_eq!(ids(&batches), vec![vec![0], vec![1], vec![2]]);
        assert!(batches[0].is_oversized(10));
        assert!(!batches[1].is_oversized(10));
    }

    #[test]
    fn test_budget_counts_characters_not_bytes() {
        let batches = build_batches(vec![unit(0, "日本語"), unit(1, "中文字")], 6);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].total_chars, 6);
    }
}
