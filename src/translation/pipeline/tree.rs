//! 内容树抽象
//!
//! 管道只通过该能力访问文档，实际 DOM、虚拟树或测试夹具都可以替换使用

use std::fmt;

/// 树中位置的身份标识
///
/// 标识的是位置本身而不是文本，两个文本相同的节点拥有不同的标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(usize);

impl NodeKey {
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:x}", self.0)
    }
}

/// 可被翻译管道遍历与改写的树
pub trait ContentTree {
    /// 节点句柄，克隆必须廉价
    type Node: Clone;

    /// 节点身份
    fn node_key(&self, node: &Self::Node) -> NodeKey;

    /// 按文档顺序返回子节点
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// 是否为文本叶子
    fn is_text(&self, node: &Self::Node) -> bool;

    /// 文本节点返回其内容；元素返回可见的后代文本
    fn text_of(&self, node: &Self::Node) -> String;

    /// 改写节点文本
    ///
    /// 文本节点只改写自身内容；元素节点的子节点被替换为单个文本节点
    fn replace_text(&self, node: &Self::Node, value: &str);

    /// 小写标签名，非元素返回 `None`
    fn tag_name(&self, node: &Self::Node) -> Option<String>;

    /// 节点是否会被渲染（未被隐藏）
    fn is_rendered(&self, node: &Self::Node) -> bool;
}
