//! 可观察的文档
//!
//! `LiveDocument` 持有一棵 `RcDom`，所有结构或文本上的修改都经由它完成，
//! 并以批次的形式通知订阅了相应子树的观察者。语义上对应浏览器的
//! MutationObserver：子节点增删产生 `ChildList` 记录，文本改写产生
//! `CharacterData` 记录，属性改写产生 `Attributes` 记录。

use std::cell::RefCell;
use std::rc::Rc;

use markup5ever_rcdom::{Handle, RcDom};
use tokio::sync::mpsc;

use super::nodes::{
    detach_node, document_body, get_parent_node, html_to_dom, insert_child,
    is_inclusive_descendant, set_node_attr, set_node_text,
};

/// 单条变更记录
#[derive(Clone)]
pub enum MutationRecord {
    /// 子节点列表变化，`target` 为父节点
    ChildList {
        target: Handle,
        added_nodes: Vec<Handle>,
        removed_nodes: Vec<Handle>,
    },
    /// 文本节点内容变化
    CharacterData { target: Handle },
    /// 元素属性变化
    Attributes { target: Handle, name: String },
}

impl MutationRecord {
    pub fn target(&self) -> &Handle {
        match self {
            MutationRecord::ChildList { target, .. }
            | MutationRecord::CharacterData { target }
            | MutationRecord::Attributes { target, .. } => target,
        }
    }

    /// 受影响的节点：结构变化取新插入的节点，内容变化取节点本身
    pub fn affected_nodes(&self) -> Vec<Handle> {
        match self {
            MutationRecord::ChildList { added_nodes, .. } => added_nodes.clone(),
            MutationRecord::CharacterData { target } | MutationRecord::Attributes { target, .. } => {
                vec![target.clone()]
            }
        }
    }
}

impl std::fmt::Debug for MutationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationRecord::ChildList {
                added_nodes,
                removed_nodes,
                ..
            } => f
                .debug_struct("ChildList")
                .field("added", &added_nodes.len())
                .field("removed", &removed_nodes.len())
                .finish(),
            MutationRecord::CharacterData { .. } => f.write_str("CharacterData"),
            MutationRecord::Attributes { name, .. } => {
                f.debug_struct("Attributes").field("name", name).finish()
            }
        }
    }
}

/// 订阅选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserveOptions {
    pub subtree: bool,
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
}

impl ObserveOptions {
    /// 监听子树的结构和文本变化，不监听属性
    pub fn text_changes() -> Self {
        Self {
            subtree: true,
            child_list: true,
            attributes: false,
            character_data: true,
        }
    }

    fn accepts(&self, record: &MutationRecord) -> bool {
        match record {
            MutationRecord::ChildList { .. } => self.child_list,
            MutationRecord::CharacterData { .. } => self.character_data,
            MutationRecord::Attributes { .. } => self.attributes,
        }
    }
}

pub type MutationReceiver = mpsc::UnboundedReceiver<Vec<MutationRecord>>;

struct Subscription {
    target: Handle,
    options: ObserveOptions,
    sender: mpsc::UnboundedSender<Vec<MutationRecord>>,
}

impl Subscription {
    fn observes(&self, record: &MutationRecord) -> bool {
        if !self.options.accepts(record) {
            return false;
        }
        let target = record.target();
        if Rc::ptr_eq(target, &self.target) {
            return true;
        }
        self.options.subtree && is_inclusive_descendant(target, &self.target)
    }
}

/// 可被观察的活文档
pub struct LiveDocument {
    dom: RcDom,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl LiveDocument {
    pub fn new(dom: RcDom) -> Self {
        Self {
            dom,
            subscriptions: RefCell::new(Vec::new()),
        }
    }

    pub fn from_html(data: &[u8], document_encoding: &str) -> Self {
        Self::new(html_to_dom(data, document_encoding))
    }

    pub fn dom(&self) -> &RcDom {
        &self.dom
    }

    pub fn document(&self) -> &Handle {
        &self.dom.document
    }

    pub fn body(&self) -> Handle {
        document_body(&self.dom)
    }

    /// 订阅 `target` 的变更
    pub fn subscribe(&self, target: &Handle, options: ObserveOptions) -> MutationReceiver {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscriptions.borrow_mut().push(Subscription {
            target: target.clone(),
            options,
            sender,
        });
        receiver
    }

    /// 当前仍然存活的订阅数
    pub fn subscriber_count(&self) -> usize {
        let mut subscriptions = self.subscriptions.borrow_mut();
        subscriptions.retain(|s| !s.sender.is_closed());
        subscriptions.len()
    }

    /// 在一个批次内执行多次修改，结束时统一投递
    pub fn batch<F, R>(&self, mutate: F) -> R
    where
        F: FnOnce(&mut MutationBatch) -> R,
    {
        let mut batch = MutationBatch {
            records: Vec::new(),
        };
        let result = mutate(&mut batch);
        self.deliver(batch.records);
        result
    }

    pub fn append_child(&self, parent: &Handle, child: &Handle) {
        self.batch(|tx| tx.append_child(parent, child));
    }

    pub fn insert_before(&self, parent: &Handle, child: &Handle, reference: &Handle) {
        self.batch(|tx| tx.insert_before(parent, child, reference));
    }

    pub fn remove_child(&self, parent: &Handle, child: &Handle) -> bool {
        self.batch(|tx| tx.remove_child(parent, child))
    }

    pub fn set_text(&self, node: &Handle, text: &str) {
        self.batch(|tx| tx.set_text(node, text));
    }

    pub fn set_attribute(&self, node: &Handle, name: &str, value: Option<String>) {
        self.batch(|tx| tx.set_attribute(node, name, value));
    }

    fn deliver(&self, records: Vec<MutationRecord>) {
        if records.is_empty() {
            return;
        }

        let mut subscriptions = self.subscriptions.borrow_mut();
        subscriptions.retain(|s| !s.sender.is_closed());

        for subscription in subscriptions.iter() {
            let observed: Vec<MutationRecord> = records
                .iter()
                .filter(|record| subscription.observes(record))
                .cloned()
                .collect();
            if observed.is_empty() {
                continue;
            }
            if subscription.sender.send(observed).is_err() {
                tracing::debug!("变更订阅已关闭，丢弃本批记录");
            }
        }
    }
}

/// 一个变更批次内可执行的修改
pub struct MutationBatch {
    records: Vec<MutationRecord>,
}

impl MutationBatch {
    pub fn append_child(&mut self, parent: &Handle, child: &Handle) {
        self.insert(parent, child, None);
    }

    pub fn insert_before(&mut self, parent: &Handle, child: &Handle, reference: &Handle) {
        self.insert(parent, child, Some(reference));
    }

    pub fn remove_child(&mut self, parent: &Handle, child: &Handle) -> bool {
        let is_child = get_parent_node(child).is_some_and(|p| Rc::ptr_eq(&p, parent));
        if !is_child {
            return false;
        }
        detach_node(child);
        self.records.push(MutationRecord::ChildList {
            target: parent.clone(),
            added_nodes: Vec::new(),
            removed_nodes: vec![child.clone()],
        });
        true
    }

    /// 改写文本节点，非文本节点不产生记录
    pub fn set_text(&mut self, node: &Handle, text: &str) {
        if super::nodes::is_text_node(node) {
            set_node_text(node, text);
            self.records.push(MutationRecord::CharacterData {
                target: node.clone(),
            });
        }
    }

    pub fn set_attribute(&mut self, node: &Handle, name: &str, value: Option<String>) {
        set_node_attr(node, name, value);
        self.records.push(MutationRecord::Attributes {
            target: node.clone(),
            name: name.to_string(),
        });
    }

    fn insert(&mut self, parent: &Handle, child: &Handle, reference: Option<&Handle>) {
        if let Some(old_parent) = get_parent_node(child) {
            self.remove_child(&old_parent, child);
        }
        insert_child(parent, child, reference);
        self.records.push(MutationRecord::ChildList {
            target: parent.clone(),
            added_nodes: vec![child.clone()],
            removed_nodes: Vec::new(),
        });
    }
}
