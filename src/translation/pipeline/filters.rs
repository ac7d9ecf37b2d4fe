//! 文本过滤器模块
//!
//! 判断文本片段是否值得翻译，以及一个容器节点是否可以作为发现单元。
//! 每条规则都是独立的纯函数，按固定顺序求值，命中即拒绝。

use std::sync::OnceLock;

use regex::Regex;

use super::tree::ContentTree;
use crate::translation::config::constants;

/// 拒绝原因，按求值顺序排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    Empty,
    Telemetry,
    MarkupTag,
    CssRule,
    Measurement,
    Punctuation,
    JsonLike,
    KeyValue,
    Literal,
    NumericOnly,
    ScriptReference,
}

/// 正则表达式缓存
struct RegexCache {
    telemetry: OnceLock<Regex>,
    markup_tag: OnceLock<Regex>,
    css_rule: OnceLock<Regex>,
    measurement: OnceLock<Regex>,
    punctuation: OnceLock<Regex>,
    json_like: OnceLock<Regex>,
    key_value: OnceLock<Regex>,
    literal: OnceLock<Regex>,
    numeric: OnceLock<Regex>,
    script_ref: OnceLock<Regex>,
    console_log: OnceLock<Regex>,
    block_comment: OnceLock<Regex>,
    line_comment: OnceLock<Regex>,
}

impl RegexCache {
    const fn new() -> Self {
        Self {
            telemetry: OnceLock::new(),
            markup_tag: OnceLock::new(),
            css_rule: OnceLock::new(),
            measurement: OnceLock::new(),
            punctuation: OnceLock::new(),
            json_like: OnceLock::new(),
            key_value: OnceLock::new(),
            literal: OnceLock::new(),
            numeric: OnceLock::new(),
            script_ref: OnceLock::new(),
            console_log: OnceLock::new(),
            block_comment: OnceLock::new(),
            line_comment: OnceLock::new(),
        }
    }
}

static REGEX_CACHE: RegexCache = RegexCache::new();

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    // 模式均为编译期常量
    cell.get_or_init(|| Regex::new(pattern).unwrap_or_else(|e| panic!("invalid pattern {pattern}: {e}")))
}

fn telemetry_regex() -> &'static Regex {
    REGEX_CACHE.telemetry.get_or_init(|| {
        let alternation = constants::TELEMETRY_TOKENS
            .iter()
            .map(|token| regex::escape(token))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"\b(?:{})\b", alternation))
            .unwrap_or_else(|e| panic!("invalid telemetry pattern: {e}"))
    })
}

/// 去除首尾空白，并把控制字符与相邻空格合并为一个空格
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut gap = false;
    for c in text.trim().chars() {
        if c == ' ' || c.is_control() {
            gap = true;
            continue;
        }
        if gap && !out.is_empty() {
            out.push(' ');
        }
        gap = false;
        out.push(c);
    }
    out
}

fn is_empty(t: &str) -> bool {
    t.is_empty()
}

fn is_telemetry(t: &str) -> bool {
    telemetry_regex().is_match(t)
}

fn is_markup_tag(t: &str) -> bool {
    cached(&REGEX_CACHE.markup_tag, r"<[^>]*>").is_match(t)
}

fn is_css_rule(t: &str) -> bool {
    cached(&REGEX_CACHE.css_rule, r"\.?\w[\w-]*\s*\{[^}]*\}").is_match(t)
}

/// 温度、百分比等度量值
fn is_measurement(t: &str) -> bool {
    cached(&REGEX_CACHE.measurement, r"^[\d\s.,;:!?()°CF%]+$").is_match(t)
        && t.chars().any(|c| c.is_ascii_digit())
}

fn is_punctuation(t: &str) -> bool {
    cached(&REGEX_CACHE.punctuation, r"^[-.,;:!?(){}\[\]]+$").is_match(t)
}

fn is_json_like(t: &str) -> bool {
    cached(&REGEX_CACHE.json_like, r"(?s)^[\{\[].*[\]\}]$").is_match(t)
}

/// 只匹配单个值的 `key: value`，带冒号的散文不算
fn is_key_value(t: &str) -> bool {
    cached(
        &REGEX_CACHE.key_value,
        r#"^["']?[\w-]+["']?\s*:\s*["'\[]?[\w.-]*["'\]]?,?$"#,
    )
    .is_match(t)
}

fn is_literal(t: &str) -> bool {
    cached(&REGEX_CACHE.literal, r"^(?:true|false|\d+|null|undefined)$").is_match(t)
}

fn is_numeric_only(t: &str) -> bool {
    cached(&REGEX_CACHE.numeric, r"^[\d\s.,;:!?(){}\[\]]+$").is_match(t)
}

fn is_script_reference(t: &str) -> bool {
    cached(&REGEX_CACHE.script_ref, r"window\.(?:performance|console)\.").is_match(t)
}

/// 有序的拒绝规则，入参均为已清理的文本
const PREDICATES: &[(Rejection, fn(&str) -> bool)] = &[
    (Rejection::Empty, is_empty),
    (Rejection::Telemetry, is_telemetry),
    (Rejection::MarkupTag, is_markup_tag),
    (Rejection::CssRule, is_css_rule),
    (Rejection::Measurement, is_measurement),
    (Rejection::Punctuation, is_punctuation),
    (Rejection::JsonLike, is_json_like),
    (Rejection::KeyValue, is_key_value),
    (Rejection::Literal, is_literal),
    (Rejection::NumericOnly, is_numeric_only),
    (Rejection::ScriptReference, is_script_reference),
];

/// 文本分类器
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFilter;

impl TextFilter {
    pub fn new() -> Self {
        Self
    }

    /// 返回第一条命中的拒绝规则
    pub fn rejection(&self, text: &str) -> Option<Rejection> {
        let text = sanitize(text);
        PREDICATES
            .iter()
            .find(|(_, rejects)| rejects(&text))
            .map(|(reason, _)| *reason)
    }

    /// 文本是否值得翻译
    pub fn is_meaningful(&self, text: &str) -> bool {
        self.rejection(text).is_none()
    }

    /// 过滤出值得翻译的文本
    pub fn filter_texts(&self, texts: Vec<String>) -> Vec<String> {
        texts.into_iter().filter(|text| self.is_meaningful(text)).collect()
    }

    /// 容器的渲染文本是否像脚本或样式
    pub fn looks_like_script(&self, text: &str) -> bool {
        let text = text.trim();
        text.contains("--")
            || cached(&REGEX_CACHE.block_comment, r"(?s)/\*.*?\*/").is_match(text)
            || cached(&REGEX_CACHE.console_log, r"console\.log\(.+\)").is_match(text)
            || cached(&REGEX_CACHE.line_comment, r"(?m)^\s*//").is_match(text)
            || is_script_reference(text)
    }

    /// 节点能否作为发现单元的容器
    pub fn is_eligible_container<T: ContentTree>(&self, tree: &T, node: &T::Node) -> bool {
        let Some(tag) = tree.tag_name(node) else {
            return false;
        };
        if is_excluded_tag(&tag) {
            return false;
        }
        if !tree.is_rendered(node) {
            return false;
        }
        let text = tree.text_of(node);
        !text.trim().is_empty() && !self.looks_like_script(&text)
    }
}

/// 是否为结构性或非文本元素
pub fn is_excluded_tag(tag: &str) -> bool {
    constants::SKIP_ELEMENTS.contains(&tag) || constants::NON_TEXT_ELEMENTS.contains(&tag)
}

/// 便捷函数：判断文本是否值得翻译
pub fn should_translate(text: &str) -> bool {
    TextFilter::new().is_meaningful(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::RcDomTree;

    #[test]
    fn test_accepts_prose() {
        let filter = TextFilter::new();
        assert!(filter.is_meaningful("Hello world"));
        assert!(filter.is_meaningful("Note: the museum opens at 9am"));
        assert!(filter.is_meaningful("Version 2 is out"));
        assert!(filter.is_meaningful("  Über uns  "));
    }

    #[test]
    fn test_rejects_noise() {
        let filter = TextFilter::new();
        assert_eq!(filter.rejection("   "), Some(Rejection::Empty));
        assert_eq!(filter.rejection("..."), Some(Rejection::Punctuation));
        assert_eq!(filter.rejection(r#"{"a": 1}"#), Some(Rejection::JsonLike));
        assert_eq!(filter.rejection("[1, 2, 3]"), Some(Rejection::JsonLike));
        assert_eq!(filter.rejection("color: red"), Some(Rejection::KeyValue));
        assert_eq!(filter.rejection("null"), Some(Rejection::Literal));
        assert_eq!(filter.rejection("undefined"), Some(Rejection::Literal));
        assert_eq!(filter.rejection("12.05.2024"), Some(Rejection::Measurement));
        assert_eq!(filter.rejection("(1) 2; 3?"), Some(Rejection::Measurement));
        assert_eq!(filter.rejection("1,234.56"), Some(Rejection::Measurement));
        assert_eq!(filter.rejection("21°C"), Some(Rejection::Measurement));
        assert_eq!(filter.rejection("Click <b>here</b>"), Some(Rejection::MarkupTag));
        assert_eq!(filter.rejection(".btn { color: red }"), Some(Rejection::CssRule));
        assert_eq!(filter.rejection("RLQ.push(fn)"), Some(Rejection::Telemetry));
        assert_eq!(filter.rejection("x = window.performance.now()"), Some(Rejection::ScriptReference));
    }

    #[test]
    fn test_sanitize_collapses_control_chars() {
        assert_eq!(sanitize("  Hello\u{7f}\n"), "Hello");
        assert_eq!(sanitize("Hello\n\tworld"), "Hello world");
        assert_eq!(sanitize("one \r\n  two\u{0}three"), "one two three");
        assert_eq!(sanitize("caf\u{e9}\u{a0}bar"), "caf\u{e9}\u{a0}bar");
        assert!(!TextFilter::new().is_meaningful("\u{1}\u{2}"));
    }

    #[test]
    fn test_script_heuristics() {
        let filter = TextFilter::new();
        assert!(filter.looks_like_script(":root { --main: red }"));
        assert!(filter.looks_like_script("/* banner */ text"));
        assert!(filter.looks_like_script("console.log(x)"));
        assert!(filter.looks_like_script("// tracking\nfoo()"));
        assert!(!filter.looks_like_script("Visit https://example.com today"));
    }

    #[test]
    fn test_container_eligibility() {
        let tree = RcDomTree::parse(
            r#"<p id="ok">Readable text</p>
               <pre>code here</pre>
               <div style="display:none">hidden text</div>
               <section>   </section>
               <i>icon</i>"#,
        )
        .unwrap();
        let filter = TextFilter::new();

        assert!(filter.is_eligible_container(&tree, &tree.find_by_tag("p")[0]));
        assert!(!filter.is_eligible_container(&tree, &tree.find_by_tag("pre")[0]));
        assert!(!filter.is_eligible_container(&tree, &tree.find_by_tag("div")[0]));
        assert!(!filter.is_eligible_container(&tree, &tree.find_by_tag("section")[0]));
        assert!(!filter.is_eligible_container(&tree, &tree.find_by_tag("i")[0]));
    }
}
