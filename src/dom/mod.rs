//! DOM 操作模块
//!
//! - `nodes`: 基础节点读写与树结构操作
//! - `node_set`: 按节点身份去重的有序集合，以及改写记录
//! - `mutation`: 可观察的活文档与变更记录
//! - `serializer`: 序列化功能

pub mod mutation;
pub mod node_set;
pub mod nodes;
pub mod serializer;

pub use mutation::{LiveDocument, MutationBatch, MutationReceiver, MutationRecord, ObserveOptions};
pub use node_set::{NodeSet, WrittenNodes};
pub use nodes::{
    create_element, create_text_node, detach_node, document_body, find_nodes,
    get_child_node_by_name, get_node_attr, get_node_name, get_node_text, get_parent_node,
    html_to_dom, insert_child, is_inclusive_descendant, is_text_node, set_node_attr,
    set_node_text,
};
pub use serializer::serialize_document;
