//! 内容发现模块
//!
//! 维护发现队列，保证每个位置只入队一次，并按文档顺序提取文本单元

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::filters::{is_excluded_tag, sanitize, TextFilter};
use super::tree::{ContentTree, NodeKey};
use crate::translation::error::TranslationError;

/// 队列处理顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueOrder {
    /// 最近进入视口的优先
    #[default]
    Lifo,
    /// 最早发现的优先
    Fifo,
}

impl FromStr for QueueOrder {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lifo" => Ok(QueueOrder::Lifo),
            "fifo" => Ok(QueueOrder::Fifo),
            other => Err(TranslationError::ConfigError(format!(
                "未知的队列顺序 '{}'，可选: lifo, fifo",
                other
            ))),
        }
    }
}

impl fmt::Display for QueueOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueOrder::Lifo => write!(f, "lifo"),
            QueueOrder::Fifo => write!(f, "fifo"),
        }
    }
}

/// 文本单元状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitStatus {
    Pending,
    Queued,
    Batched,
    Translated,
    Failed,
}

/// 绑定到树中某个文本位置的待翻译文本
#[derive(Debug, Clone)]
pub struct ContentUnit<N> {
    pub node: N,
    pub key: NodeKey,
    /// 清理后的文本，用于分类、缓存与请求
    pub source_text: String,
    /// 节点原始内容，回写时保留首尾空白
    pub raw_text: String,
    pub status: UnitStatus,
}

impl<N> ContentUnit<N> {
    pub fn char_count(&self) -> usize {
        self.source_text.chars().count()
    }
}

/// 入队结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Queued,
    /// 发现未启用
    Disarmed,
    AlreadyQueued,
    AlreadySeen,
    Ineligible,
}

/// 收集统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionStats {
    pub roots_offered: usize,
    pub roots_queued: usize,
    pub nodes_visited: usize,
    pub units_collected: usize,
    pub texts_rejected: usize,
}

/// 发现队列
///
/// `queued` 只防止同一位置在被取出前重复排队；`processed` 记录已遍历的结构锚点，
/// 整个会话内有效，并持有节点句柄使其标识不会被复用
pub struct DiscoveryQueue<N> {
    order: QueueOrder,
    queue: VecDeque<(NodeKey, N)>,
    queued: HashSet<NodeKey>,
    processed: HashMap<NodeKey, N>,
    extracted: HashMap<NodeKey, N>,
    filter: TextFilter,
    stats: CollectionStats,
}

impl<N: Clone> DiscoveryQueue<N> {
    pub fn new(order: QueueOrder) -> Self {
        Self {
            order,
            queue: VecDeque::new(),
            queued: HashSet::new(),
            processed: HashMap::new(),
            extracted: HashMap::new(),
            filter: TextFilter::new(),
            stats: CollectionStats::default(),
        }
    }

    pub fn order(&self) -> QueueOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_queued(&self, key: NodeKey) -> bool {
        self.queued.contains(&key)
    }

    pub fn is_processed(&self, key: NodeKey) -> bool {
        self.processed.contains_key(&key)
    }

    pub fn stats(&self) -> &CollectionStats {
        &self.stats
    }

    /// 提交一个候选位置，文本节点以其父元素为准
    pub fn offer<T>(&mut self, tree: &T, node: &N) -> Offer
    where
        T: ContentTree<Node = N>,
    {
        self.stats.roots_offered += 1;

        let node = if tree.is_text(node) {
            match tree.parent(node) {
                Some(parent) => parent,
                None => return Offer::Ineligible,
            }
        } else {
            node.clone()
        };

        let key = tree.node_key(&node);
        if self.processed.contains_key(&key) {
            return Offer::AlreadySeen;
        }
        if self.queued.contains(&key) {
            return Offer::AlreadyQueued;
        }
        if !self.filter.is_eligible_container(tree, &node) {
            return Offer::Ineligible;
        }

        self.queued.insert(key);
        match self.order {
            QueueOrder::Lifo => self.queue.push_front((key, node)),
            QueueOrder::Fifo => self.queue.push_back((key, node)),
        }
        self.stats.roots_queued += 1;
        tracing::trace!("节点 {} 已入队，队列长度 {}", key, self.queue.len());
        Offer::Queued
    }

    /// 从 `root` 开始逐层提交区域，返回新入队的数量
    ///
    /// 不合格的容器不会挡住其中合格的子区域；元素入队或已处理后不再向下
    pub fn offer_subtree<T>(&mut self, tree: &T, root: &N) -> usize
    where
        T: ContentTree<Node = N>,
    {
        match self.offer(tree, root) {
            Offer::Queued => 1,
            Offer::Ineligible => {
                let descend = tree
                    .tag_name(root)
                    .is_some_and(|tag| !is_excluded_tag(&tag));
                if !descend {
                    return 0;
                }
                tree.children(root)
                    .iter()
                    .filter(|child| !tree.is_text(child))
                    .map(|child| self.offer_subtree(tree, child))
                    .sum()
            }
            _ => 0,
        }
    }

    /// 取出全部已排队的根节点并提取文本单元
    ///
    /// 每个根按深度优先的文档顺序遍历，根之间按队列顺序排列
    pub fn drain_units<T>(&mut self, tree: &T) -> Vec<ContentUnit<N>>
    where
        T: ContentTree<Node = N>,
    {
        let mut units = Vec::new();

        while let Some((key, root)) = self.queue.pop_front() {
            self.queued.remove(&key);

            if self.processed.contains_key(&key) {
                continue;
            }
            if !self.filter.is_eligible_container(tree, &root) {
                tracing::debug!("节点 {} 出队时已不可用，跳过", key);
                continue;
            }

            self.processed.insert(key, root.clone());
            self.walk(tree, &root, &mut units);
        }

        self.stats.units_collected += units.len();
        units
    }

    fn walk<T>(&mut self, tree: &T, node: &N, units: &mut Vec<ContentUnit<N>>)
    where
        T: ContentTree<Node = N>,
    {
        for child in tree.children(node) {
            self.stats.nodes_visited += 1;
            let key = tree.node_key(&child);

            if tree.is_text(&child) {
                if self.extracted.contains_key(&key) {
                    continue;
                }
                let raw_text = tree.text_of(&child);
                let source_text = sanitize(&raw_text);
                if self.filter.is_meaningful(&source_text) {
                    self.extracted.insert(key, child.clone());
                    units.push(ContentUnit {
                        node: child,
                        key,
                        source_text,
                        raw_text,
                        status: UnitStatus::Pending,
                    });
                } else if !source_text.is_empty() {
                    self.stats.texts_rejected += 1;
                }
            } else if !self.processed.contains_key(&key)
                && self.filter.is_eligible_container(tree, &child)
            {
                self.processed.insert(key, child.clone());
                self.walk(tree, &child, units);
            }
        }
    }
}
