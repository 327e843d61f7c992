//! 翻译批次
//!
//! 一次批次执行分三步：
//!
//! 1. **排空**（同步）：清空待翻译集合，过滤出既不在途、也不在字典中的原文，
//!    去重后标记为在途，节点移入待写回集合；
//! 2. **请求**（异步）：把去重后的原文一次性交给翻译服务；
//! 3. **写回**（同步）：合并字典，重新读取待写回节点的当前文本并改写，
//!    清除已有译文的在途标记。
//!
//! 排空与写回之间不持有状态借用，请求挂起期间新发现的节点只会进入下一次批次。

use std::collections::HashSet;
use std::rc::Rc;

use crate::dom::get_node_text;
use crate::translation::core::ObserverState;
use crate::translation::error::TranslationResult;
use crate::translation::provider::{TranslationMap, TranslationProvider, TranslationRequest};

/// 一次排空得到的工作列表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 排空时的状态代数
    pub generation: u64,
    /// 去重后的原文，按发现顺序
    pub texts: Vec<String>,
}

/// 批次执行结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub requested: usize,
    pub received: usize,
    pub applied: usize,
}

impl BatchReport {
    /// 没有发起任何请求
    pub fn is_empty(&self) -> bool {
        self.requested == 0
    }
}

/// 排空待翻译集合，返回需要请求的原文
///
/// 对每个待翻译节点重新读取当前文本：
/// - 空白文本、或已是某条译文的，丢弃；
/// - 字典里已有译文的，直接写回；
/// - 已在途的，不再请求，节点移入待写回集合等待那次返回；
/// - 其余加入工作列表并移入待写回集合。
pub fn drain_pending(state: &mut ObserverState) -> Option<Batch> {
    let mut texts = Vec::new();
    let mut seen = HashSet::new();

    for node in state.pending.drain() {
        let Some(text) = get_node_text(&node) else {
            continue;
        };

        if text.trim().is_empty() || state.dictionary.is_translation(&text) {
            state.stats.nodes_dropped += 1;
            continue;
        }

        if let Some(translated) = state.dictionary.get(&text) {
            state.written.write(&node, &text, translated);
            state.stats.fast_path_writes += 1;
            continue;
        }

        if !state.in_flight.contains(&text) && seen.insert(text.clone()) {
            texts.push(text);
        }
        state.awaiting.insert(node);
    }

    if texts.is_empty() {
        return None;
    }

    state.in_flight.extend(texts.iter().cloned());
    state.stats.batches_dispatched += 1;
    state.stats.texts_requested += texts.len();

    Some(Batch {
        generation: state.generation,
        texts,
    })
}

/// 合并翻译结果并写回
pub fn apply_results(state: &mut ObserverState, batch: &Batch, translations: TranslationMap) -> BatchReport {
    let mut report = BatchReport {
        requested: batch.texts.len(),
        received: translations.len(),
        applied: 0,
    };

    if batch.generation != state.generation {
        tracing::debug!("丢弃过期批次: {} 段文本", batch.texts.len());
        state.stats.stale_batches += 1;
        return report;
    }

    let ObserverState {
        awaiting,
        in_flight,
        dictionary,
        written,
        stats,
        ..
    } = state;

    dictionary.merge(translations);

    awaiting.retain(|node| {
        let Some(text) = get_node_text(node) else {
            return false;
        };
        if text.trim().is_empty() {
            return false;
        }
        if let Some(translated) = dictionary.get(&text) {
            written.write(node, &text, translated);
            report.applied += 1;
            return false;
        }
        // 已被其他写入改成译文的节点不再等待
        !dictionary.is_translation(&text)
    });

    // 翻译服务没有返回的原文保持在途，不会再次请求
    in_flight.retain(|text| !dictionary.contains(text));

    stats.translations_received += report.received;
    stats.translations_applied += report.applied;

    report
}

/// 请求失败时释放本批次的在途标记，使这些原文在下次被发现时可以重新请求
pub fn release_batch(state: &mut ObserverState, batch: &Batch) {
    state.stats.provider_failures += 1;
    if batch.generation != state.generation {
        return;
    }
    for text in &batch.texts {
        state.in_flight.remove(text);
    }
}

/// 批次翻译器
pub struct BatchTranslator {
    provider: Rc<dyn TranslationProvider>,
}

impl BatchTranslator {
    pub fn new(provider: Rc<dyn TranslationProvider>) -> Self {
        Self { provider }
    }

    /// 执行一次完整的批次：排空、请求、写回
    pub async fn run(&self, state: &std::cell::RefCell<ObserverState>) -> TranslationResult<BatchReport> {
        let (batch, request) = {
            let mut state = state.borrow_mut();
            let Some(batch) = drain_pending(&mut state) else {
                return Ok(BatchReport::default());
            };
            let request = TranslationRequest {
                text: batch.texts.clone(),
                default_language: state.default_language.clone(),
                target_language: state.target_language.clone(),
            };
            (batch, request)
        };

        tracing::debug!(
            "发起翻译请求: {} 段文本 ({} → {})",
            request.text.len(),
            request.default_language,
            request.target_language
        );

        let provider = Rc::clone(&self.provider);
        match provider.translate(request).await {
            Ok(translations) => {
                let report = apply_results(&mut state.borrow_mut(), &batch, translations);
                tracing::debug!(
                    "批次完成: 请求 {}，返回 {}，写回 {}",
                    report.requested,
                    report.received,
                    report.applied
                );
                Ok(report)
            }
            Err(e) => {
                release_batch(&mut state.borrow_mut(), &batch);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{create_text_node, set_node_text};
    use crate::translation::language::LanguageTag;
    use markup5ever_rcdom::Handle;

    fn state() -> ObserverState {
        ObserverState::new(
            LanguageTag::parse("en-US").unwrap(),
            LanguageTag::parse("zh-CN").unwrap(),
        )
    }

    fn pend(state: &mut ObserverState, text: &str) -> Handle {
        let node = create_text_node(text);
        state.pending.insert(node.clone());
        node
    }

    #[test]
    fn test_drain_deduplicates_and_marks_in_flight() {
        let mut state = state();
        let a = pend(&mut state, "Hi");
        let b = pend(&mut state, "Hi");
        pend(&mut state, "Bye");

        let batch = drain_pending(&mut state).unwrap();
        assert_eq!(batch.texts, vec!["Hi", "Bye"]);
        assert!(state.pending.is_empty());
        assert_eq!(state.awaiting.len(), 3);
        assert!(state.awaiting.contains(&a) && state.awaiting.contains(&b));
        assert!(state.in_flight.contains("Hi") && state.in_flight.contains("Bye"));
    }

    #[test]
    fn test_drain_skips_in_flight_text_but_keeps_node_waiting() {
        let mut state = state();
        state.in_flight.insert("Hi".into());
        let node = pend(&mut state, "Hi");

        assert_eq!(drain_pending(&mut state), None);
        assert!(state.awaiting.contains(&node));
        assert_eq!(state.stats.batches_dispatched, 0);
    }

    #[test]
    fn test_drain_drops_translations_and_applies_known() {
        let mut state = state();
        state.dictionary.insert("Hello".into(), "你好".into());
        let output = pend(&mut state, "你好");
        let known = pend(&mut state, "Hello");

        assert_eq!(drain_pending(&mut state), None);
        assert_eq!(get_node_text(&known).as_deref(), Some("你好"));
        assert!(!state.awaiting.contains(&output));
        assert_eq!(state.stats.nodes_dropped, 1);
    }

    #[test]
    fn test_apply_rereads_live_text() {
        let mut state = state();
        let a = pend(&mut state, "One");
        let b = pend(&mut state, "Two");
        let batch = drain_pending(&mut state).unwrap();

        // 请求期间 b 被改写成了 One
        set_node_text(&b, "One");

        let report = apply_results(
            &mut state,
            &batch,
            TranslationMap::from([("One".to_string(), "一".to_string())]),
        );

        assert_eq!(report, BatchReport { requested: 2, received: 1, applied: 2 });
        assert_eq!(get_node_text(&a).as_deref(), Some("一"));
        assert_eq!(get_node_text(&b).as_deref(), Some("一"));
        assert!(state.awaiting.is_empty());
        assert_eq!(state.written.len(), 2);
        // Two 没有返回，保持在途
        assert_eq!(state.in_flight.iter().collect::<Vec<_>>(), vec!["Two"]);
    }

    #[test]
    fn test_apply_ignores_stale_generation() {
        let mut state = state();
        let node = pend(&mut state, "Hello");
        let batch = drain_pending(&mut state).unwrap();
        state.reset(LanguageTag::parse("ja").unwrap());

        let report = apply_results(
            &mut state,
            &batch,
            TranslationMap::from([("Hello".to_string(), "你好".to_string())]),
        );
        assert_eq!(report.applied, 0);
        assert!(state.dictionary.is_empty());
        assert_eq!(get_node_text(&node).as_deref(), Some("Hello"));
        assert_eq!(state.stats.stale_batches, 1);
    }

    #[test]
    fn test_release_only_clears_this_batch() {
        let mut state = state();
        state.in_flight.insert("Other".into());
        let node = pend(&mut state, "Hi");
        let batch = drain_pending(&mut state).unwrap();

        release_batch(&mut state, &batch);
        assert!(!state.in_flight.contains("Hi"));
        assert!(state.in_flight.contains("Other"));
        assert!(state.awaiting.contains(&node));
        assert_eq!(state.stats.provider_failures, 1);
    }

    #[test]
    fn test_reset_with_same_language_keeps_batch_valid() {
        let mut state = state();
        let node = pend(&mut state, "Hello");
        let batch = drain_pending(&mut state).unwrap();
        state.reset(LanguageTag::parse("zh-CN").unwrap());

        // 同一语言对的请求仍在途，不会被再次请求
        assert!(state.in_flight.contains("Hello"));
        state.pending.insert(node.clone());
        assert_eq!(drain_pending(&mut state), None);

        let report = apply_results(
            &mut state,
            &batch,
            TranslationMap::from([("Hello".to_string(), "你好".to_string())]),
        );
        assert_eq!(report.applied, 1);
        assert_eq!(get_node_text(&node).as_deref(), Some("你好"));
        assert_eq!(state.stats.stale_batches, 0);
    }
}
