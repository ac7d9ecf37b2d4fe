//! 翻译配置管理模块
//!
//! 提供配置文件、环境变量和默认值三层配置，以及站点级设置

pub mod manager;
pub mod settings;

// 重新导出主要类型
pub use manager::{ConfigManager, TranslationConfig};
pub use settings::SiteSettings;

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 批次处理相关
    pub const DEFAULT_MAX_BATCH_CHARS: usize = 3000;
    pub const DEFAULT_BATCH_PACING: Duration = Duration::from_millis(2000);

    // 发现阶段相关
    pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(3000);
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

    // 重试相关
    pub const DEFAULT_MAX_RETRY_ATTEMPTS: usize = 5;
    pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);
    pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

    // 默认API设置
    pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
    pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    // 跳过的结构性元素
    pub const SKIP_ELEMENTS: &[&str] = &[
        "style", "script", "meta", "link", "code", "pre", "noscript", "template", "head",
        "title",
    ];

    // 非文本元素（图标、图片）
    pub const NON_TEXT_ELEMENTS: &[&str] = &["img", "svg", "i", "picture"];

    // 引擎内部诊断标识
    pub const TELEMETRY_TOKENS: &[&str] = &[
        "RLQ",
        "mw.config",
        "limitreport",
        "cputime",
        "walltime",
        "ppvisitednodes",
        "postexpandincludesize",
        "templateargumentsize",
        "expansiondepth",
        "expensivefunctioncount",
        "unstrip-depth",
        "unstrip-size",
        "entityaccesscount",
        "timingprofile",
    ];

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "live-translate.toml",
        ".live-translate.toml",
        "live-translate.json",
        "~/.config/live-translate/config.toml",
        "/etc/live-translate/config.toml",
    ];
}

/// 检查是否存在任一配置文件
pub fn config_file_exists() -> bool {
    constants::CONFIG_PATHS
        .iter()
        .any(|path| std::path::Path::new(shellexpand::tilde(path).as_ref()).exists())
}
