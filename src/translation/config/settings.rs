//! 站点级设置
//!
//! 决定当前页面是否应启动内容发现

use url::Url;

/// 翻译设置快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteSettings {
    pub is_enabled: bool,
    pub language_prompt: String,
    /// 逗号分隔的受限主机片段
    pub restricted_sites: String,
}

impl SiteSettings {
    pub fn new(is_enabled: bool, language_prompt: &str, restricted_sites: &str) -> Self {
        Self {
            is_enabled,
            language_prompt: language_prompt.to_string(),
            restricted_sites: restricted_sites.to_string(),
        }
    }

    /// 解析受限站点列表，忽略空白项
    pub fn restricted_hosts(&self) -> Vec<&str> {
        self.restricted_sites
            .split(',')
            .map(str::trim)
            .filter(|site| !site.is_empty())
            .collect()
    }

    /// 主机名是否命中任一受限条目
    pub fn is_restricted(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.restricted_hosts()
            .iter()
            .any(|site| host.contains(&site.to_ascii_lowercase()))
    }

    /// 是否应在该主机上启动发现
    pub fn permits_host(&self, host: &str) -> bool {
        if !self.is_enabled {
            return false;
        }
        if self.language_prompt.trim().is_empty() {
            return false;
        }
        !self.is_restricted(host)
    }

    /// 是否应在该页面上启动发现（无主机的 URL 视为本地文档）
    pub fn permits(&self, url: &Url) -> bool {
        self.permits_host(url.host_str().unwrap_or_default())
    }
}
