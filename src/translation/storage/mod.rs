//! 存储模块
//!
//! - `dictionary`: 会话内的翻译字典
//! - `preference`: 目标语言偏好的持久化

pub mod dictionary;
pub mod preference;

pub use dictionary::TranslationDictionary;
pub use preference::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
