//! # 解析器模块
//!
//! - `html` - HTML文档解析、DOM操作与内容树

pub mod html;

pub use html::{get_charset, html_to_dom, serialize_document, RcDomTree};
