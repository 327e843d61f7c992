//! 观察者配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, ObserverConfig};

/// 配置常量
pub mod constants {
    /// 防抖窗口
    pub const DEFAULT_DEBOUNCE_MS: u64 = 400;

    /// 偏好存储中保存目标语言的默认键名
    pub const DEFAULT_LOCAL_STORAGE_KEY: &str = "initI18nTargetLanguage";

    // 默认API设置
    pub const DEFAULT_API_URL: &str = "http://localhost:1188/translate";
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

    /// 内容不可见、不参与翻译的元素
    pub const SKIP_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "i18n-observer.toml",
        ".i18n-observer.toml",
        "~/.config/i18n-observer/config.toml",
    ];

    pub const DEFAULT_PREFERENCE_PATH: &str = "~/.config/i18n-observer/preferences.json";
}
