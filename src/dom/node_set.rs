use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use markup5ever_rcdom::{Handle, Node};

use super::nodes::{get_node_text, set_node_text};

/// 以节点身份（`Rc` 指针）去重、保持插入顺序的节点集合
#[derive(Default)]
pub struct NodeSet {
    order: Vec<Handle>,
    members: HashSet<*const Node>,
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入节点，已存在时返回 `false`
    pub fn insert(&mut self, node: Handle) -> bool {
        if !self.members.insert(Rc::as_ptr(&node)) {
            return false;
        }
        self.order.push(node);
        true
    }

    pub fn contains(&self, node: &Handle) -> bool {
        self.members.contains(&Rc::as_ptr(node))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Handle> {
        self.order.iter()
    }

    /// 只保留满足条件的节点
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Handle) -> bool,
    {
        let members = &mut self.members;
        self.order.retain(|node| {
            let kept = keep(node);
            if !kept {
                members.remove(&Rc::as_ptr(node));
            }
            kept
        });
    }

    /// 取走全部节点，集合随之清空
    pub fn drain(&mut self) -> Vec<Handle> {
        self.members.clear();
        std::mem::take(&mut self.order)
    }

    pub fn clear(&mut self) {
        self.members.clear();
        self.order.clear();
    }
}

impl std::fmt::Debug for NodeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSet").field("len", &self.len()).finish()
    }
}

struct Written {
    node: Handle,
    source: String,
    translated: String,
}

/// 被观察者改写过文本的节点，记录改写前的原文与写入的译文
///
/// 还原时只认这里的记录，不从字典反查：多条原文可能共用一条译文，
/// 作者写下的文本也可能恰好与某条译文相同。
#[derive(Default)]
pub struct WrittenNodes {
    entries: HashMap<*const Node, Written>,
}

impl WrittenNodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// 把 `node` 的文本从 `source` 改写为 `translated` 并记录，返回文本是否变化
    pub fn write(&mut self, node: &Handle, source: &str, translated: &str) -> bool {
        if !set_node_text(node, translated) {
            return false;
        }
        // 同一节点再次改写时以最近一次的原文为准
        self.entries.insert(
            Rc::as_ptr(node),
            Written {
                node: node.clone(),
                source: source.to_string(),
                translated: translated.to_string(),
            },
        );
        true
    }

    /// 把仍显示所写译文的节点还原为原文，返回还原的节点数，记录随之清空
    pub fn restore(&mut self) -> usize {
        self.entries
            .drain()
            .filter(|(_, written)| get_node_text(&written.node).as_deref() == Some(written.translated.as_str()))
            .map(|(_, written)| usize::from(set_node_text(&written.node, &written.source)))
            .sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl std::fmt::Debug for WrittenNodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrittenNodes").field("len", &self.len()).finish()
    }
}
