//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问，所有变量使用 `LIVE_TRANSLATE_` 前缀

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => match Self::DEFAULT {
                Some(default) => Ok(default),
                None => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Required environment variable not set".to_string(),
                }),
            },
        }
    }

    /// 仅在变量被显式设置时返回值
    fn get_explicit() -> Option<EnvResult<T>> {
        env::var(Self::NAME).ok().map(|value| Self::parse(&value))
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "LIVE_TRANSLATE_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.trim().to_lowercase().as_str() {
                level @ ("trace" | "debug" | "info" | "warn" | "error") => Ok(level.to_string()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }
}

/// 翻译相关环境变量
pub mod translation {
    use super::*;

    /// 翻译功能启用状态
    pub struct Enabled;
    impl EnvVar<bool> for Enabled {
        const NAME: &'static str = "LIVE_TRANSLATE_ENABLED";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Arm discovery and translation for new pages";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 目标语言提示词
    pub struct LanguagePrompt;
    impl EnvVar<String> for LanguagePrompt {
        const NAME: &'static str = "LIVE_TRANSLATE_LANGUAGE_PROMPT";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str =
            "Instruction describing the target language and style, e.g. 'Translate to French'";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.trim().to_string())
        }
    }

    /// 受限站点列表
    pub struct RestrictedSites;
    impl EnvVar<String> for RestrictedSites {
        const NAME: &'static str = "LIVE_TRANSLATE_RESTRICTED_SITES";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Comma-separated host fragments that are never translated";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(String::new()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.to_string())
        }
    }

    /// API URL
    pub struct ApiUrl;
    impl EnvVar<String> for ApiUrl {
        const NAME: &'static str = "LIVE_TRANSLATE_API_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Base URL of the generateContent endpoint";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim().trim_end_matches('/');
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API URL must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// API 密钥
    pub struct ApiKey;
    impl EnvVar<String> for ApiKey {
        const NAME: &'static str = "LIVE_TRANSLATE_API_KEY";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "API key sent as x-goog-api-key";

        fn parse(value: &str) -> EnvResult<String> {
            let key = value.trim();
            if key.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API key must not be empty".to_string(),
                });
            }
            Ok(key.to_string())
        }
    }

    /// 模型名称
    pub struct Model;
    impl EnvVar<String> for Model {
        const NAME: &'static str = "LIVE_TRANSLATE_MODEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Model name used in the request path";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.trim().to_string())
        }
    }

    /// 单批次最大字符数
    pub struct MaxBatchChars;
    impl EnvVar<usize> for MaxBatchChars {
        const NAME: &'static str = "LIVE_TRANSLATE_MAX_BATCH_CHARS";
        const DEFAULT: Option<usize> = Some(3000);
        const DESCRIPTION: &'static str = "Maximum characters per translation batch";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 100_000)
        }
    }

    /// 批次间隔
    pub struct BatchPacing;
    impl EnvVar<Duration> for BatchPacing {
        const NAME: &'static str = "LIVE_TRANSLATE_BATCH_PACING_MS";
        const DEFAULT: Option<Duration> = Some(Duration::from_millis(2000));
        const DESCRIPTION: &'static str = "Minimum delay between two service requests, in ms";

        fn parse(value: &str) -> EnvResult<Duration> {
            let millis: u64 = value.trim().parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid number of milliseconds".to_string(),
            })?;
            Ok(Duration::from_millis(millis))
        }
    }

    /// 队列处理顺序
    pub struct QueueOrder;
    impl EnvVar<String> for QueueOrder {
        const NAME: &'static str = "LIVE_TRANSLATE_QUEUE_ORDER";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Queue policy: lifo (on-screen first) or fifo";

        fn parse(value: &str) -> EnvResult<String> {
            match value.trim().to_lowercase().as_str() {
                order @ ("lifo" | "fifo") => Ok(order.to_string()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("Invalid queue order '{}'. Use: lifo, fifo", value),
                }),
            }
        }
    }
}

/// 解析布尔值
fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Invalid boolean '{}'. Use: true/false, 1/0, yes/no, on/off", value),
        }),
    }
}

/// 解析带范围的正整数
fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let parsed: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive integer".to_string(),
    })?;

    if parsed < min || parsed > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value must be between {} and {}", min, max),
        });
    }

    Ok(parsed)
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let rows = [
        (core::LogLevel::NAME, core::LogLevel::DESCRIPTION),
        (translation::Enabled::NAME, translation::Enabled::DESCRIPTION),
        (translation::LanguagePrompt::NAME, translation::LanguagePrompt::DESCRIPTION),
        (translation::RestrictedSites::NAME, translation::RestrictedSites::DESCRIPTION),
        (translation::ApiUrl::NAME, translation::ApiUrl::DESCRIPTION),
        (translation::ApiKey::NAME, translation::ApiKey::DESCRIPTION),
        (translation::Model::NAME, translation::Model::DESCRIPTION),
        (translation::MaxBatchChars::NAME, translation::MaxBatchChars::DESCRIPTION),
        (translation::BatchPacing::NAME, translation::BatchPacing::DESCRIPTION),
        (translation::QueueOrder::NAME, translation::QueueOrder::DESCRIPTION),
    ];

    let mut docs = String::from("# Environment Variables\n\n");
    for (name, description) in rows {
        docs.push_str(&format!("- `{}`: {}\n", name, description));
    }
    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_parsing() {
        assert!(translation::Enabled::parse("true").unwrap());
        assert!(translation::Enabled::parse("YES").unwrap());
        assert!(!translation::Enabled::parse("off").unwrap());
        assert!(translation::Enabled::parse("maybe").is_err());
    }

    #[test]
    fn test_url_validation() {
        assert_eq!(
            translation::ApiUrl::parse("https://api.example.com/v1/").unwrap(),
            "https://api.example.com/v1"
        );
        assert!(translation::ApiUrl::parse("ftp://example.com").is_err());
    }

    #[test]
    fn test_numeric_validation() {
        assert_eq!(translation::MaxBatchChars::parse("3000").unwrap(), 3000);
        assert!(translation::MaxBatchChars::parse("0").is_err());
        assert!(translation::MaxBatchChars::parse("lots").is_err());
        assert_eq!(
            translation::BatchPacing::parse("250").unwrap(),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_queue_order_and_log_level() {
        assert_eq!(translation::QueueOrder::parse("FIFO").unwrap(), "fifo");
        assert!(translation::QueueOrder::parse("random").is_err());
        assert_eq!(core::LogLevel::parse("Debug").unwrap(), "debug");
        assert!(core::LogLevel::parse("loud").is_err());
    }

    #[test]
    fn test_env_docs_list_every_variable() {
        let docs = generate_env_docs();
        assert!(docs.contains("LIVE_TRANSLATE_LANGUAGE_PROMPT"));
        assert!(docs.contains("LIVE_TRANSLATE_QUEUE_ORDER"));
    }
}
