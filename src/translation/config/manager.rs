//! 配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use super::settings::SiteSettings;
use crate::env::EnvVar;
use crate::translation::core::retry::RetryPolicy;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::collector::QueueOrder;

/// 翻译配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationConfig {
    // 站点设置
    pub enabled: bool,
    pub language_prompt: String,
    pub restricted_sites: String,

    // 服务端设置
    pub api_url: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,

    // 批次与节奏
    pub max_batch_chars: usize,
    pub batch_pacing_ms: u64,
    pub settle_delay_ms: u64,
    pub debounce_ms: u64,
    pub queue_order: QueueOrder,

    // 重试
    pub max_retry_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language_prompt: String::new(),
            restricted_sites: String::new(),

            api_url: constants::DEFAULT_API_URL.to_string(),
            model: constants::DEFAULT_MODEL.to_string(),
            api_key: None,
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT.as_secs(),

            max_batch_chars: constants::DEFAULT_MAX_BATCH_CHARS,
            batch_pacing_ms: constants::DEFAULT_BATCH_PACING.as_millis() as u64,
            settle_delay_ms: constants::DEFAULT_SETTLE_DELAY.as_millis() as u64,
            debounce_ms: constants::DEFAULT_DEBOUNCE.as_millis() as u64,
            queue_order: QueueOrder::default(),

            max_retry_attempts: constants::DEFAULT_MAX_RETRY_ATTEMPTS,
            retry_base_delay_ms: constants::DEFAULT_RETRY_BASE_DELAY.as_millis() as u64,
            retry_max_delay_ms: constants::DEFAULT_RETRY_MAX_DELAY.as_millis() as u64,
        }
    }
}

impl TranslationConfig {
    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.max_batch_chars == 0 {
            return Err(TranslationError::ConfigError("批次字符上限不能为0".to_string()));
        }

        if self.max_retry_attempts == 0 {
            return Err(TranslationError::ConfigError("最大尝试次数不能为0".to_string()));
        }

        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            return Err(TranslationError::ConfigError(
                "重试基础延迟不能大于最大延迟".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(TranslationError::ConfigError("请求超时不能为0".to_string()));
        }

        url::Url::parse(&self.api_url)
            .map_err(|e| TranslationError::ConfigError(format!("API URL 无效: {}", e)))?;

        if self.model.trim().is_empty() {
            return Err(TranslationError::ConfigError("模型名称不能为空".to_string()));
        }

        Ok(())
    }

    /// 应用环境变量覆盖，无效的值记录警告后忽略
    pub fn apply_env_overrides(&mut self) {
        use crate::env::translation;

        if let Some(enabled) = env_override::<_, translation::Enabled>() {
            self.enabled = enabled;
        }

        if let Some(prompt) = env_override::<_, translation::LanguagePrompt>() {
            self.language_prompt = prompt;
        }

        if let Some(sites) = env_override::<_, translation::RestrictedSites>() {
            self.restricted_sites = sites;
        }

        if let Some(api_url) = env_override::<_, translation::ApiUrl>() {
            self.api_url = api_url;
            tracing::info!("环境变量覆盖 API URL: {}", self.api_url);
        }

        if let Some(model) = env_override::<_, translation::Model>() {
            self.model = model;
        }

        if let Some(api_key) = env_override::<_, translation::ApiKey>() {
            self.api_key = Some(api_key);
        }

        if let Some(max_chars) = env_override::<_, translation::MaxBatchChars>() {
            self.max_batch_chars = max_chars;
        }

        if let Some(pacing) = env_override::<_, translation::BatchPacing>() {
            self.batch_pacing_ms = pacing.as_millis() as u64;
        }

        if let Some(order) = env_override::<_, translation::QueueOrder>() {
            match order.parse() {
                Ok(order) => self.queue_order = order,
                Err(e) => tracing::warn!("忽略环境变量 {}: {}", translation::QueueOrder::NAME, e),
            }
        }
    }

    /// 当前页面的站点设置
    pub fn site_settings(&self) -> SiteSettings {
        SiteSettings {
            is_enabled: self.enabled,
            language_prompt: self.language_prompt.clone(),
            restricted_sites: self.restricted_sites.clone(),
        }
    }

    /// 按配置构建重试策略
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retry_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
        )
    }

    pub fn batch_pacing(&self) -> Duration {
        Duration::from_millis(self.batch_pacing_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 读取显式设置的环境变量，解析失败时记录警告
fn env_override<T, V: EnvVar<T>>() -> Option<T> {
    match V::get_explicit()? {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("忽略无效的环境变量: {}", e);
            None
        }
    }
}

/// 配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: TranslationConfig,
}

impl ConfigManager {
    /// 按搜索路径加载配置
    pub fn new() -> TranslationResult<Self> {
        Self::load(None)
    }

    /// 从指定文件加载配置
    pub fn with_path<P: AsRef<Path>>(path: P) -> TranslationResult<Self> {
        Self::load(Some(path.as_ref()))
    }

    fn load(path: Option<&Path>) -> TranslationResult<Self> {
        Self::load_dotenv();

        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_config()?,
        };
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &TranslationConfig {
        &self.config
    }

    pub fn into_config(self) -> TranslationConfig {
        self.config
    }

    fn load_config() -> TranslationResult<TranslationConfig> {
        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            let candidate = Path::new(expanded_path.as_ref());
            if candidate.exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(candidate);
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(TranslationConfig::default())
    }

    fn load_from_file(path: &Path) -> TranslationResult<TranslationConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TranslationError::ConfigError(format!("读取配置文件失败 {}: {}", path.display(), e))
        })?;

        if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            serde_json::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }

    fn load_dotenv() {
        let env_files = [".env.local", ".env.development", ".env.production", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> TranslationResult<()> {
        let config = TranslationConfig {
            language_prompt: "Translate to French".to_string(),
            ..TranslationConfig::default()
        };
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TranslationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_batch_chars, 3000);
        assert_eq!(config.batch_pacing(), Duration::from_millis(2000));
        assert_eq!(config.settle_delay(), Duration::from_secs(3));
        assert_eq!(config.debounce(), Duration::from_secs(1));
        assert_eq!(config.queue_order, QueueOrder::Lifo);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = TranslationConfig {
            max_batch_chars: 0,
            ..TranslationConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TranslationConfig {
            retry_base_delay_ms: 60_000,
            ..TranslationConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TranslationConfig {
            api_url: "not a url".to_string(),
            ..TranslationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TranslationConfig = toml::from_str(
            r#"
            language_prompt = "Translate to German"
            queue_order = "fifo"
            max_batch_chars = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.language_prompt, "Translate to German");
        assert_eq!(config.queue_order, QueueOrder::Fifo);
        assert_eq!(config.max_batch_chars, 500);
        assert_eq!(config.max_retry_attempts, 5);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = TranslationConfig {
            max_retry_attempts: 3,
            retry_base_delay_ms: 200,
            retry_max_delay_ms: 1000,
            ..TranslationConfig::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(5), Duration::from_millis(1000));
    }

    /// 收集日志输出的写入器
    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_invalid_env_overrides_are_reported() {
        std::env::set_var("LIVE_TRANSLATE_MAX_BATCH_CHARS", "0");
        std::env::set_var("LIVE_TRANSLATE_QUEUE_ORDER", "random");

        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mut config = TranslationConfig::default();
        tracing::subscriber::with_default(subscriber, || config.apply_env_overrides());

        std::env::remove_var("LIVE_TRANSLATE_MAX_BATCH_CHARS");
        std::env::remove_var("LIVE_TRANSLATE_QUEUE_ORDER");

        assert_eq!(config.max_batch_chars, 3000);
        assert_eq!(config.queue_order, QueueOrder::Lifo);

        let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("LIVE_TRANSLATE_MAX_BATCH_CHARS"), "{}", logs);
        assert!(logs.contains("LIVE_TRANSLATE_QUEUE_ORDER"), "{}", logs);
    }

    #[test]
    fn test_example_config_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live-translate.toml");
        ConfigManager::generate_example_config(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let config: TranslationConfig = toml::from_str(&content).unwrap();
        assert_eq!(config.language_prompt, "Translate to French");
        assert!(config.validate().is_ok());
    }
}
