//! 翻译管道模块
//!
//! 提供树能力抽象、文本分类、内容发现和批次构建

pub mod batch;
pub mod collector;
pub mod filters;
pub mod tree;

// 重新导出主要类型
pub use batch::{build_batches, Batch};
pub use collector::{CollectionStats, ContentUnit, DiscoveryQueue, Offer, QueueOrder, UnitStatus};
pub use filters::{Rejection, TextFilter};
pub use tree::{ContentTree, NodeKey};
