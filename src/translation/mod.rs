//! 翻译模块
//!
//! 采用清晰的模块化架构：
//! - **core**: 观察者与其状态
//! - **pipeline**: 文本收集、批次翻译与防抖调度
//! - **storage**: 翻译字典与语言偏好
//! - **provider**: 外部翻译服务接口
//! - **config**: 配置管理
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use i18n_observer::dom::LiveDocument;
//! use i18n_observer::translation::{DictionaryProvider, I18nObserver, LanguageTag, ObserverOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let document = LiveDocument::from_html(b"<p>Hello</p>", "utf-8");
//! let options = ObserverOptions::new(LanguageTag::parse("en-US")?, DictionaryProvider::default())
//!     .with_target_language(LanguageTag::parse("zh-CN")?);
//! let observer = I18nObserver::new(options)?;
//!
//! // 需要在 tokio LocalSet 内运行
//! observer.observe(&document, None);
//! observer.wait_idle().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// 子模块声明
// ============================================================================

/// 配置管理模块
pub mod config;

/// 观察者核心模块
pub mod core;

/// 错误处理模块
pub mod error;

/// 语言标签
pub mod language;

/// 文本处理管道模块
pub mod pipeline;

/// 外部翻译服务接口
pub mod provider;

/// 存储管理模块
pub mod storage;

// ============================================================================
// 公共API导出
// ============================================================================

pub use config::{ConfigManager, ObserverConfig};
pub use core::{ErrorHook, I18nObserver, ObserverOptions, ObserverState, ObserverStats, ReloadPolicy};
pub use error::{TranslationError, TranslationResult};
pub use language::LanguageTag;
pub use pipeline::{BatchReport, BatchTranslator, Debouncer, TextCollector};
pub use provider::{
    DictionaryProvider, FnProvider, TranslationMap, TranslationProvider, TranslationRequest,
};
#[cfg(feature = "http")]
pub use provider::HttpProvider;
pub use storage::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, TranslationDictionary};
