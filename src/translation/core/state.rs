//! 观察者状态
//!
//! 所有可变状态都归单个观察者实例所有，只在同一个逻辑线程上修改，
//! 因此用 `RefCell` 而不是锁。

use std::collections::HashSet;

use crate::dom::{NodeSet, WrittenNodes};
use crate::translation::language::LanguageTag;
use crate::translation::storage::TranslationDictionary;

/// 观察者的全部可变状态
#[derive(Debug)]
pub struct ObserverState {
    pub default_language: LanguageTag,
    pub target_language: LanguageTag,
    /// 已发现、尚未请求的文本节点
    pub pending: NodeSet,
    /// 正在等待翻译服务返回的原文
    pub in_flight: HashSet<String>,
    /// 原文已提交、译文尚未写回的节点
    pub awaiting: NodeSet,
    pub dictionary: TranslationDictionary,
    /// 已写入译文的节点及其原文，整体重置时据此还原
    pub written: WrittenNodes,
    /// 目标语言变化的整体重置加一，旧代的翻译结果到达时直接丢弃
    pub generation: u64,
    pub stats: ObserverStats,
}

impl ObserverState {
    pub fn new(default_language: LanguageTag, target_language: LanguageTag) -> Self {
        Self {
            default_language,
            target_language,
            pending: NodeSet::new(),
            in_flight: HashSet::new(),
            awaiting: NodeSet::new(),
            dictionary: TranslationDictionary::new(),
            written: WrittenNodes::new(),
            generation: 0,
            stats: ObserverStats::default(),
        }
    }

    /// 清空全部派生状态并切换目标语言
    ///
    /// 目标语言不变时，尚未返回的请求仍然有效：保留在途标记与代数，
    /// 重新发现的同一原文只会等待那次返回，不会被再次请求。
    pub fn reset(&mut self, target_language: LanguageTag) {
        if target_language != self.target_language {
            self.target_language = target_language;
            self.in_flight.clear();
            self.generation += 1;
        }
        self.pending.clear();
        self.awaiting.clear();
        self.dictionary.clear();
        self.written.clear();
        self.stats.resets += 1;
    }
}

/// 观察者运行统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserverStats {
    /// 加入待翻译集合的节点数
    pub nodes_discovered: usize,
    /// 发现时直接用字典写回的次数
    pub fast_path_writes: usize,
    /// 排空时因文本为空或已是译文而丢弃的节点数
    pub nodes_dropped: usize,
    pub batches_dispatched: usize,
    pub texts_requested: usize,
    pub translations_received: usize,
    /// 批次返回后写回的节点数
    pub translations_applied: usize,
    pub provider_failures: usize,
    /// 因整体重置而作废的批次数
    pub stale_batches: usize,
    pub resets: usize,
}
