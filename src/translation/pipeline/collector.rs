//! 文本收集器模块
//!
//! 递归遍历给定节点及其后代，找出需要翻译的文本节点：
//! 字典里已有译文的直接写回，其余加入待翻译集合。

use std::collections::HashSet;

use markup5ever_rcdom::{Handle, NodeData};

use crate::dom::{get_node_name, get_node_text, get_parent_node};
use crate::translation::config::constants;
use crate::translation::core::ObserverState;

/// 文本收集器
#[derive(Debug, Clone)]
pub struct TextCollector {
    skip_elements: HashSet<String>,
}

impl Default for TextCollector {
    fn default() -> Self {
        Self::new(constants::SKIP_ELEMENTS.iter().copied())
    }
}

impl TextCollector {
    /// `skip_elements` 中的元素连同其后代都不参与翻译
    pub fn new<I, S>(skip_elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            skip_elements: skip_elements
                .into_iter()
                .map(|s| s.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// 遍历 `nodes` 及其后代，收集文本节点
    pub fn add_text_nodes(&self, state: &mut ObserverState, nodes: &[Handle]) {
        for node in nodes {
            // 直接传入的节点可能位于被跳过的元素内部
            if self.has_skipped_ancestor(node) {
                continue;
            }
            self.visit(state, node);
        }
    }

    fn visit(&self, state: &mut ObserverState, node: &Handle) {
        match &node.data {
            NodeData::Text { .. } => {
                if let Some(text) = get_node_text(node) {
                    self.collect_text(state, node, text);
                }
            }
            NodeData::Element { name, .. } if self.should_skip(name.local.as_ref()) => return,
            _ => {}
        }

        // 先取快照，写回不会影响本轮遍历
        let children: Vec<Handle> = node.children.borrow().clone();
        for child in &children {
            self.visit(state, child);
        }
    }

    fn collect_text(&self, state: &mut ObserverState, node: &Handle, text: String) {
        if text.trim().is_empty() {
            return;
        }

        if let Some(translated) = state.dictionary.get(&text) {
            state.written.write(node, &text, translated);
            state.stats.fast_path_writes += 1;
            return;
        }

        if state.dictionary.is_translation(&text) {
            return;
        }

        if state.pending.insert(node.clone()) {
            state.stats.nodes_discovered += 1;
        }
    }

    fn should_skip(&self, tag_name: &str) -> bool {
        self.skip_elements.contains(tag_name)
    }

    fn has_skipped_ancestor(&self, node: &Handle) -> bool {
        let mut current = get_parent_node(node);
        while let Some(parent) = current {
            if get_node_name(&parent).is_some_and(|name| self.should_skip(name)) {
                return true;
            }
            current = get_parent_node(&parent);
        }
        false
    }
}
