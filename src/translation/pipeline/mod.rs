//! 翻译管道模块
//!
//! - `collector`: 发现需要翻译的文本节点
//! - `batch`: 排空、请求与写回
//! - `debounce`: 防抖调度

pub mod batch;
pub mod collector;
pub mod debounce;

pub use batch::{apply_results, drain_pending, release_batch, Batch, BatchReport, BatchTranslator};
pub use collector::TextCollector;
pub use debounce::Debouncer;
