//! 基于 rcdom 的内容树实现

use std::cell::RefCell;
use std::rc::Rc;

use html5ever::tendril::StrTendril;
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

use super::dom::{find_nodes, get_node_attr, get_node_name, get_parent_node, html_to_dom};
use super::serializer::serialize_document;
use crate::translation::error::TranslationResult;
use crate::translation::pipeline::tree::{ContentTree, NodeKey};

/// 渲染文本时不计入的元素
const NON_RENDERED_TEXT: &[&str] = &["script", "style", "noscript", "template"];

/// 解析后的 HTML 文档
pub struct RcDomTree {
    dom: RcDom,
    encoding: String,
}

impl RcDomTree {
    pub fn new(dom: RcDom, encoding: &str) -> Self {
        Self {
            dom,
            encoding: encoding.to_string(),
        }
    }

    /// 解析 UTF-8 HTML 文本
    pub fn parse(html: &str) -> TranslationResult<Self> {
        Ok(Self::new(html_to_dom(html.as_bytes(), "utf-8")?, "utf-8"))
    }

    /// 按给定编码解析 HTML 字节
    pub fn from_bytes(data: &[u8], encoding: &str) -> TranslationResult<Self> {
        Ok(Self::new(html_to_dom(data, encoding)?, encoding))
    }

    pub fn document(&self) -> Handle {
        self.dom.document.clone()
    }

    pub fn body(&self) -> Option<Handle> {
        find_nodes(&self.dom.document, &["html", "body"]).into_iter().next()
    }

    /// `<body>` 的元素子节点，用作初始可见区域
    pub fn body_elements(&self) -> Vec<Handle> {
        self.body()
            .map(|body| {
                body.children
                    .borrow()
                    .iter()
                    .filter(|child| matches!(child.data, NodeData::Element { .. }))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 按文档顺序查找标签
    pub fn find_by_tag(&self, tag: &str) -> Vec<Handle> {
        let mut found = Vec::new();
        collect_by_tag(&self.dom.document, tag, &mut found);
        found
    }

    /// 序列化为文档原编码
    pub fn serialize(&self) -> TranslationResult<Vec<u8>> {
        serialize_document(&self.dom.document, &self.encoding)
    }

    pub fn to_html(&self) -> TranslationResult<String> {
        let bytes = serialize_document(&self.dom.document, "")?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn collect_by_tag(node: &Handle, tag: &str, found: &mut Vec<Handle>) {
    if get_node_name(node) == Some(tag) {
        found.push(node.clone());
    }
    for child in node.children.borrow().iter() {
        collect_by_tag(child, tag, found);
    }
}

fn collect_rendered_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { name, .. } if NON_RENDERED_TEXT.contains(&name.local.as_ref()) => {}
        _ => {
            for child in node.children.borrow().iter() {
                collect_rendered_text(child, out);
            }
        }
    }
}

/// 单个元素自身是否把内容隐藏
fn hides_content(node: &Handle) -> bool {
    if get_node_name(node) == Some("head") {
        return true;
    }
    if get_node_attr(node, "hidden").is_some() {
        return true;
    }
    if get_node_attr(node, "aria-hidden").is_some_and(|v| v.trim().eq_ignore_ascii_case("true")) {
        return true;
    }
    match get_node_attr(node, "style") {
        Some(style) => {
            let style: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            style.split(';').any(|decl| decl == "display:none" || decl == "visibility:hidden")
        }
        None => false,
    }
}

impl ContentTree for RcDomTree {
    type Node = Handle;

    fn node_key(&self, node: &Handle) -> NodeKey {
        NodeKey::from_raw(Rc::as_ptr(node) as usize)
    }

    fn children(&self, node: &Handle) -> Vec<Handle> {
        node.children.borrow().iter().cloned().collect()
    }

    fn parent(&self, node: &Handle) -> Option<Handle> {
        get_parent_node(node)
    }

    fn is_text(&self, node: &Handle) -> bool {
        matches!(node.data, NodeData::Text { .. })
    }

    fn text_of(&self, node: &Handle) -> String {
        let mut text = String::new();
        collect_rendered_text(node, &mut text);
        text
    }

    fn replace_text(&self, node: &Handle, value: &str) {
        match &node.data {
            NodeData::Text { contents } => {
                let mut contents = contents.borrow_mut();
                contents.clear();
                contents.push_slice(value);
            }
            NodeData::Element { .. } => {
                let text = Node::new(NodeData::Text {
                    contents: RefCell::new(StrTendril::from_slice(value)),
                });
                text.parent.set(Some(Rc::downgrade(node)));

                let mut children = node.children.borrow_mut();
                for old in children.iter() {
                    old.parent.set(None);
                }
                *children = vec![text];
            }
            _ => {}
        }
    }

    fn tag_name(&self, node: &Handle) -> Option<String> {
        get_node_name(node).map(|name| name.to_ascii_lowercase())
    }

    fn is_rendered(&self, node: &Handle) -> bool {
        let mut current = if self.is_text(node) {
            get_parent_node(node)
        } else {
            Some(node.clone())
        };

        while let Some(element) = current {
            if hides_content(&element) {
                return false;
            }
            current = get_parent_node(&element);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(tree: &RcDomTree, tag: &str) -> Handle {
        tree.find_by_tag(tag).remove(0)
    }

    #[test]
    fn test_rendered_text_skips_scripts() {
        let tree =
            RcDomTree::parse("<div>Hello <b>there</b><script>var x = 1;</script></div>").unwrap();
        let div = first(&tree, "div");
        assert_eq!(tree.text_of(&div), "Hello there");
    }

    #[test]
    fn test_visibility_checks() {
        let tree = RcDomTree::parse(
            r#"<div id="a">shown</div>
               <div hidden><p>gone</p></div>
               <div style="display: none">gone</div>
               <div style="color:red; visibility : hidden">gone</div>
               <span aria-hidden="true">gone</span>"#,
        )
        .unwrap();

        let divs = tree.find_by_tag("div");
        assert!(tree.is_rendered(&divs[0]));
        assert!(!tree.is_rendered(&first(&tree, "p")));
        assert!(!tree.is_rendered(&divs[2]));
        assert!(!tree.is_rendered(&divs[3]));
        assert!(!tree.is_rendered(&first(&tree, "span")));
        assert!(!tree.is_rendered(&first(&tree, "head")));
    }

    #[test]
    fn test_replace_text_node_keeps_siblings() {
        let tree = RcDomTree::parse("<p>Hello <b>bold</b> world</p>").unwrap();
        let p = first(&tree, "p");
        let text = tree.children(&p)[0].clone();

        tree.replace_text(&text, "Bonjour ");
        assert_eq!(tree.text_of(&p), "Bonjour bold world");
        assert_eq!(tree.children(&p).len(), 3);
    }

    #[test]
    fn test_replace_element_text() {
        let tree = RcDomTree::parse("<p>Hello <b>bold</b></p>").unwrap();
        let p = first(&tree, "p");
        tree.replace_text(&p, "Salut");

        let children = tree.children(&p);
        assert_eq!(children.len(), 1);
        assert!(tree.is_text(&children[0]));
        assert!(Rc::ptr_eq(&tree.parent(&children[0]).unwrap(), &p));
        assert!(tree.to_html().unwrap().contains("<p>Salut</p>"));
    }

    #[test]
    fn test_node_keys_are_identity() {
        let tree = RcDomTree::parse("<p>same</p><p>same</p>").unwrap();
        let ps = tree.find_by_tag("p");
        assert_ne!(tree.node_key(&ps[0]), tree.node_key(&ps[1]));
        assert_eq!(tree.node_key(&ps[0]), tree.node_key(&ps[0].clone()));
    }
}
