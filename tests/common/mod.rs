// 集成测试公共模块
//
// 提供测试用的翻译服务、页面构造与 DOM 读取工具

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use futures::future::{FutureExt, LocalBoxFuture};
use markup5ever_rcdom::{Handle, NodeData};
use tokio::sync::oneshot;

use i18n_observer::dom::{create_element, create_text_node, get_node_text, insert_child, LiveDocument};
use i18n_observer::translation::error::helpers;
use i18n_observer::translation::{
    LanguageTag, TranslationMap, TranslationProvider, TranslationRequest, TranslationResult,
};

/// 默认防抖窗口
pub const WINDOW: Duration = Duration::from_millis(400);

pub fn tag(value: &str) -> LanguageTag {
    LanguageTag::parse(value).unwrap()
}

/// 在 `LocalSet` 内运行测试主体
pub async fn run_local<F: Future>(future: F) -> F::Output {
    tokio::task::LocalSet::new().run_until(future).await
}

/// 让监听任务处理已投递的变更
pub async fn flush() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

/// 按词表翻译并记录每次请求的翻译服务
#[derive(Default)]
pub struct RecordingProvider {
    glossary: TranslationMap,
    calls: RefCell<Vec<TranslationRequest>>,
    delay: Cell<Duration>,
    fail: Cell<bool>,
}

impl RecordingProvider {
    pub fn new(pairs: &[(&str, &str)]) -> Rc<Self> {
        Rc::new(Self {
            glossary: pairs
                .iter()
                .map(|(source, translated)| (source.to_string(), translated.to_string()))
                .collect(),
            ..Default::default()
        })
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay.set(delay);
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.set(fail);
    }

    pub fn calls(&self) -> Vec<TranslationRequest> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// 每次请求的原文列表
    pub fn requested_texts(&self) -> Vec<Vec<String>> {
        self.calls.borrow().iter().map(|call| call.text.clone()).collect()
    }
}

impl TranslationProvider for RecordingProvider {
    fn translate(&self, request: TranslationRequest) -> LocalBoxFuture<'_, TranslationResult<TranslationMap>> {
        self.calls.borrow_mut().push(request.clone());
        let delay = self.delay.get();
        let fail = self.fail.get();

        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if fail {
                return Err(helpers::provider_error("503 Service Unavailable"));
            }
            Ok(request
                .text
                .iter()
                .filter_map(|text| Some((text.clone(), self.glossary.get(text)?.clone())))
                .collect())
        }
        .boxed_local()
    }
}

type Responder = oneshot::Sender<TranslationResult<TranslationMap>>;

/// 由测试手动决定何时、以什么结果返回的翻译服务
#[derive(Default)]
pub struct ManualProvider {
    calls: RefCell<Vec<(TranslationRequest, Option<Responder>)>>,
}

impl ManualProvider {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn request(&self, index: usize) -> TranslationRequest {
        self.calls.borrow()[index].0.clone()
    }

    /// 尚未返回的请求数
    pub fn outstanding(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|(_, responder)| responder.is_some())
            .count()
    }

    pub fn respond(&self, index: usize, pairs: &[(&str, &str)]) {
        let map = pairs
            .iter()
            .map(|(source, translated)| (source.to_string(), translated.to_string()))
            .collect();
        self.finish(index, Ok(map));
    }

    pub fn reject(&self, index: usize, message: &str) {
        self.finish(index, Err(helpers::provider_error(message)));
    }

    fn finish(&self, index: usize, result: TranslationResult<TranslationMap>) {
        let responder = self.calls.borrow_mut()[index]
            .1
            .take()
            .expect("request already answered");
        let _ = responder.send(result);
    }
}

impl TranslationProvider for ManualProvider {
    fn translate(&self, request: TranslationRequest) -> LocalBoxFuture<'_, TranslationResult<TranslationMap>> {
        let (sender, receiver) = oneshot::channel();
        self.calls.borrow_mut().push((request, Some(sender)));
        async move {
            receiver
                .await
                .unwrap_or_else(|_| Err(helpers::provider_error("responder dropped")))
        }
        .boxed_local()
    }
}

/// HTML 页面构造工具
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    pub fn page(body: &str) -> String {
        format!(
            "<!DOCTYPE html><html><head><title>Test</title></head><body>{}</body></html>",
            body
        )
    }

    pub fn document(body: &str) -> LiveDocument {
        LiveDocument::from_html(Self::page(body).as_bytes(), "utf-8")
    }

    /// 创建一个尚未挂到文档上的 `<tag>text</tag>`
    pub fn element_with_text(document: &LiveDocument, tag_name: &str, text: &str) -> Handle {
        let element = create_element(document.dom(), tag_name);
        insert_child(&element, &create_text_node(text), None);
        element
    }

    /// 元素的第一个子节点（测试页面里就是它的文本节点）
    pub fn first_text(element: &Handle) -> Handle {
        element.children.borrow()[0].clone()
    }

    /// `node` 下所有非空白文本，按文档顺序
    pub fn texts(node: &Handle) -> Vec<String> {
        let mut texts = Vec::new();
        collect_texts(node, &mut texts);
        texts
    }
}

fn collect_texts(node: &Handle, texts: &mut Vec<String>) {
    if let NodeData::Text { .. } = node.data {
        if let Some(text) = get_node_text(node) {
            if !text.trim().is_empty() {
                texts.push(text);
            }
        }
        return;
    }
    for child in node.children.borrow().iter() {
        collect_texts(child, texts);
    }
}
