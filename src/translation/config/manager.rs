//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::language::LanguageTag;

/// 观察者配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObserverConfig {
    // 语言配置
    pub default_language: Option<LanguageTag>,
    pub target_language: Option<LanguageTag>,
    pub local_storage_key: String,

    // 调度配置
    pub debounce_ms: u64,
    pub skip_elements: Vec<String>,

    // 存储与服务
    pub preference_path: String,
    pub api_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            default_language: None,
            target_language: None,
            local_storage_key: constants::DEFAULT_LOCAL_STORAGE_KEY.to_string(),

            debounce_ms: constants::DEFAULT_DEBOUNCE_MS,
            skip_elements: constants::SKIP_ELEMENTS.iter().map(|s| s.to_string()).collect(),

            preference_path: constants::DEFAULT_PREFERENCE_PATH.to_string(),
            api_url: constants::DEFAULT_API_URL.to_string(),
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ObserverConfig {
    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.debounce_ms == 0 {
            return Err(TranslationError::ConfigError("防抖窗口不能为0".to_string()));
        }

        if self.local_storage_key.trim().is_empty() {
            return Err(TranslationError::ConfigError("偏好键名不能为空".to_string()));
        }

        if self.request_timeout_secs == 0 {
            return Err(TranslationError::ConfigError("请求超时必须大于0".to_string()));
        }

        let url = url::Url::parse(&self.api_url)
            .map_err(|e| TranslationError::ConfigError(format!("API地址无效: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TranslationError::ConfigError(format!(
                "API地址必须是 http 或 https: {}",
                self.api_url
            )));
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{observer, EnvVar};

        if let Ok(lang) = observer::DefaultLanguage::get() {
            self.default_language = Some(lang);
        }

        if let Ok(lang) = observer::TargetLanguage::get() {
            self.target_language = Some(lang);
        }

        if let Ok(key) = observer::StorageKey::get() {
            self.local_storage_key = key;
        }

        if std::env::var(observer::Debounce::NAME).is_ok() {
            match observer::Debounce::get() {
                Ok(window) => self.debounce_ms = window.as_millis() as u64,
                Err(e) => tracing::warn!("忽略无效的环境变量: {}", e),
            }
        }

        if let Ok(path) = observer::PreferencePath::get() {
            self.preference_path = path;
        }

        if let Ok(api_url) = observer::ApiUrl::get() {
            self.api_url = api_url;
            tracing::info!("环境变量覆盖 API URL: {}", self.api_url);
        }

        if std::env::var(observer::RequestTimeout::NAME).is_ok() {
            match observer::RequestTimeout::get() {
                Ok(timeout) => self.request_timeout_secs = timeout.as_secs(),
                Err(e) => tracing::warn!("忽略无效的环境变量: {}", e),
            }
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 展开 `~` 后的偏好文件路径
    pub fn preference_file(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.preference_path).as_ref())
    }
}

/// 简化的配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    config: ObserverConfig,
}

impl ConfigManager {
    /// 创建新的配置管理器：文件 → 环境变量 → 校验
    pub fn new() -> TranslationResult<Self> {
        Self::load_dotenv();
        let mut config = Self::load_config()?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 从指定文件创建，仍然应用环境变量覆盖
    pub fn from_file<P: AsRef<Path>>(path: P) -> TranslationResult<Self> {
        let mut config = Self::load_from_file(path.as_ref())?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    pub fn into_config(self) -> ObserverConfig {
        self.config
    }

    /// 按搜索路径加载第一个存在的配置文件
    fn load_config() -> TranslationResult<ObserverConfig> {
        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            let path = Path::new(expanded_path.as_ref());
            if path.exists() {
                tracing::info!("加载配置文件: {}", path.display());
                return Self::load_from_file(path);
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(ObserverConfig::default())
    }

    /// 从指定文件加载配置，`.json` 按 JSON 解析，其余按 TOML 解析
    fn load_from_file(path: &Path) -> TranslationResult<ObserverConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> TranslationResult<()> {
        let config = ObserverConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
