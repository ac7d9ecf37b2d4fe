use encoding_rs::Encoding;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::translation::error::{TranslationError, TranslationResult};

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> TranslationResult<RcDom> {
    let s = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => encoding.decode(data).0.into_owned(),
        None => String::from_utf8_lossy(data).into_owned(),
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
        .map_err(|e| TranslationError::ParseError(format!("HTML解析失败: {}", e)))
}

/// 查找指定路径的DOM节点
pub fn find_nodes(node: &Handle, node_names: &[&str]) -> Vec<Handle> {
    let mut found_nodes = Vec::new();
    let Some((node_name, rest)) = node_names.split_first() else {
        return found_nodes;
    };

    let matches = get_node_name(node) == Some(*node_name);
    if matches && rest.is_empty() {
        found_nodes.push(node.clone());
    }

    let next = if matches && !rest.is_empty() {
        rest
    } else {
        node_names
    };
    for child_node in node.children.borrow().iter() {
        found_nodes.append(&mut find_nodes(child_node, next));
    }

    found_nodes
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    parent
        .children
        .borrow()
        .iter()
        .find(|child| get_node_name(child) == Some(node_name))
        .cloned()
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取父节点（不会断开父子关系）
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 读取文档声明的字符集
pub fn get_charset(document: &Handle) -> Option<String> {
    for meta_node in find_nodes(document, &["html", "head", "meta"]) {
        if let Some(charset) = get_node_attr(&meta_node, "charset") {
            return Some(charset.trim().to_string());
        }

        let is_content_type = get_node_attr(&meta_node, "http-equiv")
            .unwrap_or_default()
            .eq_ignore_ascii_case("content-type");
        if is_content_type {
            if let Some(content) = get_node_attr(&meta_node, "content") {
                let charset = content
                    .split(';')
                    .map(str::trim)
                    .find_map(|part| {
                        part.get(..8)
                            .filter(|prefix| prefix.eq_ignore_ascii_case("charset="))
                            .map(|_| part[8..].trim_matches('"').to_string())
                    });
                if charset.is_some() {
                    return charset;
                }
            }
        }
    }

    None
}
