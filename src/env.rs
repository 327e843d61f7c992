//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量管理

use std::env;
use std::fmt;
use std::time::Duration;

use crate::translation::language::LanguageTag;

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
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "I18N_OBSERVER_LOG_LEVEL";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
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

/// 观察者相关环境变量
pub mod observer {
    use super::*;

    /// 页面默认语言
    pub struct DefaultLanguage;
    impl EnvVar<LanguageTag> for DefaultLanguage {
        const NAME: &'static str = "I18N_OBSERVER_DEFAULT_LANGUAGE";
        const DEFAULT: Option<LanguageTag> = None;
        const DESCRIPTION: &'static str = "Language the document is authored in (e.g. en-US)";

        fn parse(value: &str) -> EnvResult<LanguageTag> {
            parse_language(value, Self::NAME)
        }
    }

    /// 翻译目标语言
    pub struct TargetLanguage;
    impl EnvVar<LanguageTag> for TargetLanguage {
        const NAME: &'static str = "I18N_OBSERVER_TARGET_LANGUAGE";
        const DEFAULT: Option<LanguageTag> = None;
        const DESCRIPTION: &'static str = "Language to translate into (e.g. zh-CN)";

        fn parse(value: &str) -> EnvResult<LanguageTag> {
            parse_language(value, Self::NAME)
        }
    }

    /// 偏好存储中的键名
    pub struct StorageKey;
    impl EnvVar<String> for StorageKey {
        const NAME: &'static str = "I18N_OBSERVER_STORAGE_KEY";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Key under which the selected target language is persisted";

        fn parse(value: &str) -> EnvResult<String> {
            let key = value.trim();
            if key.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Key cannot be empty".to_string(),
                });
            }
            Ok(key.to_string())
        }
    }

    /// 防抖窗口
    pub struct Debounce;
    impl EnvVar<Duration> for Debounce {
        const NAME: &'static str = "I18N_OBSERVER_DEBOUNCE_MS";
        const DEFAULT: Option<Duration> = Some(Duration::from_millis(400));
        const DESCRIPTION: &'static str = "Quiescence window before a translation batch is sent, in milliseconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let millis = parse_positive_usize(value, Self::NAME, 1, 60_000)?;
            Ok(Duration::from_millis(millis as u64))
        }
    }

    /// 偏好文件路径
    pub struct PreferencePath;
    impl EnvVar<String> for PreferencePath {
        const NAME: &'static str = "I18N_OBSERVER_PREFERENCE_PATH";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "JSON file holding persisted preferences";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.trim().to_string())
        }
    }

    /// 翻译服务地址
    pub struct ApiUrl;
    impl EnvVar<String> for ApiUrl {
        const NAME: &'static str = "I18N_OBSERVER_API_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Translation provider endpoint URL";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
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

    /// HTTP 请求超时
    pub struct RequestTimeout;
    impl EnvVar<Duration> for RequestTimeout {
        const NAME: &'static str = "I18N_OBSERVER_REQUEST_TIMEOUT";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(30));
        const DESCRIPTION: &'static str = "HTTP provider request timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds = parse_positive_usize(value, Self::NAME, 1, 300)?;
            Ok(Duration::from_secs(seconds as u64))
        }
    }
}

/// 宿主语言环境
pub mod locale {
    use super::*;

    /// 按 POSIX 优先级查找的变量
    pub const LOCALE_VARS: &[&str] = &["LC_ALL", "LC_MESSAGES", "LANG"];

    /// 宿主报告的语言，`C`/`POSIX` 以及无法解析的值视为未设置
    pub fn host_language() -> Option<LanguageTag> {
        LOCALE_VARS
            .iter()
            .filter_map(|name| env::var(name).ok())
            .find(|value| !value.trim().is_empty())
            .and_then(|value| LanguageTag::from_posix_locale(&value))
    }
}

fn parse_language(value: &str, var_name: &str) -> EnvResult<LanguageTag> {
    LanguageTag::parse(value).map_err(|e| EnvError {
        variable: var_name.to_string(),
        message: e.to_string(),
    })
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables\n\n");

    let entries = [
        (core::LogLevel::NAME, core::LogLevel::DESCRIPTION),
        (observer::DefaultLanguage::NAME, observer::DefaultLanguage::DESCRIPTION),
        (observer::TargetLanguage::NAME, observer::TargetLanguage::DESCRIPTION),
        (observer::StorageKey::NAME, observer::StorageKey::DESCRIPTION),
        (observer::Debounce::NAME, observer::Debounce::DESCRIPTION),
        (observer::PreferencePath::NAME, observer::PreferencePath::DESCRIPTION),
        (observer::ApiUrl::NAME, observer::ApiUrl::DESCRIPTION),
        (observer::RequestTimeout::NAME, observer::RequestTimeout::DESCRIPTION),
    ];
    for (name, description) in entries {
        docs.push_str(&format!("- `{}`: {}\n", name, description));
    }
    docs.push_str(&format!(
        "\nHost locale is read from {} in that order.\n",
        locale::LOCALE_VARS.join(", ")
    ));

    docs
}
