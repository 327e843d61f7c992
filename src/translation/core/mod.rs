//! 观察者核心模块
//!
//! ```text
//! I18nObserver (observer.rs)
//!     ├── ObserverState (state.rs)
//!     ├── TextCollector (pipeline/collector.rs)
//!     ├── BatchTranslator (pipeline/batch.rs)
//!     └── Debouncer (pipeline/debounce.rs)
//! ```
//!
//! 数据单向流动：变更 → 发现 → 待翻译集合 → 防抖排空 → 调用翻译服务 →
//! 合并字典 → 写回 DOM。

pub mod observer;
pub mod state;

pub use observer::{ErrorHook, I18nObserver, ObserverOptions, ReloadPolicy};
pub use state::{ObserverState, ObserverStats};
