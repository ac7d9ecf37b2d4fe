//! # 工具模块
//!
//! - 日志初始化
//! - 页面主机名解析

use tracing::Level;
use tracing_subscriber::fmt;

use crate::env::{core::LogLevel, EnvVar};

/// 解析日志级别字符串，无法识别时返回 `None`
pub fn parse_level(value: &str) -> Option<Level> {
    match value.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// 初始化日志输出到标准错误
///
/// `verbose` 为真时使用 debug 级别，否则读取 `LIVE_TRANSLATE_LOG_LEVEL`（默认 info）。
/// 重复调用不会报错
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        Level::DEBUG
    } else {
        match LogLevel::get() {
            Ok(value) => parse_level(&value).unwrap_or(Level::INFO),
            Err(e) => {
                eprintln!("警告: {}，使用 info 级别", e);
                Level::INFO
            }
        }
    };

    let _ = fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// 提取 URL 的主机名，无法解析时返回空字符串
pub fn page_host(site_url: &str) -> String {
    url::Url::parse(site_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_level(" warn "), Some(Level::WARN));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_page_host() {
        assert_eq!(page_host("https://news.example.org/a/b?q=1"), "news.example.org");
        assert_eq!(page_host("not a url"), "");
    }
}
