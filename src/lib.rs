//! # i18n-observer
//!
//! 对持续变化的 HTML 文档做增量、原地翻译：监听文档子树的结构与文本变更，
//! 收集需要翻译的文本节点，以防抖批次调用外部翻译服务，并在译文返回后
//! 写回仍然显示对应原文的节点。
//!
//! ## 模块组织
//!
//! - `dom` - DOM 操作、可观察的活文档与变更记录
//! - `translation` - 观察者、翻译管道、存储与配置
//! - `env` - 环境变量

pub mod dom;
pub mod env;
pub mod translation;

// Re-export commonly used items for convenience
pub use dom::LiveDocument;
pub use translation::{I18nObserver, LanguageTag, ObserverOptions, TranslationError, TranslationResult};
