//! 翻译字典
//!
//! 会话内只增不减的「原文 → 译文」映射，是「是否已翻译」的唯一依据。
//! 另外维护一份译文集合，用 O(1) 的反查代替扫描全部值，
//! 保证不会把某段译文再当作原文送去翻译。

use std::collections::{HashMap, HashSet};

/// 翻译字典
#[derive(Debug, Default, Clone)]
pub struct TranslationDictionary {
    entries: HashMap<String, String>,
    /// 译文 → 以此为译文的条目数
    outputs: HashMap<String, usize>,
}

impl TranslationDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: &str) -> Option<&str> {
        self.entries.get(source).map(String::as_str)
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries.contains_key(source)
    }

    /// `text` 是否是某条已记录的译文
    pub fn is_translation(&self, text: &str) -> bool {
        self.outputs.contains_key(text)
    }

    /// 写入一条翻译，同一原文后写覆盖先写，返回被覆盖的旧译文
    pub fn insert(&mut self, source: String, translated: String) -> Option<String> {
        *self.outputs.entry(translated.clone()).or_insert(0) += 1;
        let previous = self.entries.insert(source, translated);
        if let Some(old) = &previous {
            self.release_output(old);
        }
        previous
    }

    /// 合并一批翻译结果，返回写入的条目数
    pub fn merge<I>(&mut self, translations: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        translations
            .into_iter()
            .map(|(source, translated)| self.insert(source, translated))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 仅用于整体重置
    pub fn clear(&mut self) {
        self.entries.clear();
        self.outputs.clear();
    }

    /// 当前所有译文
    pub fn outputs(&self) -> HashSet<&str> {
        self.outputs.keys().map(String::as_str).collect()
    }

    fn release_output(&mut self, translated: &str) {
        if let Some(count) = self.outputs.get_mut(translated) {
            *count -= 1;
            if *count == 0 {
                self.outputs.remove(translated);
            }
        }
    }
}
