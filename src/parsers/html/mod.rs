//! HTML解析和处理模块
//!
//! - `dom`: 解析与基础DOM操作
//! - `serializer`: 序列化功能
//! - `tree`: 面向翻译流水线的内容树实现

pub mod dom;
pub mod serializer;
pub mod tree;

// 重新导出主要的公共 API
pub use dom::{
    find_nodes, get_charset, get_child_node_by_name, get_node_attr, get_node_name,
    get_parent_node, html_to_dom,
};
pub use serializer::serialize_document;
pub use tree::RcDomTree;
