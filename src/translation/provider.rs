//! 翻译服务接口
//!
//! 观察者只通过 `TranslationProvider` 与外部翻译服务交互：每个批次调用一次，
//! 传入去重后的原文列表，返回「原文 → 译文」映射。返回结果可以缺少部分原文，
//! 缺少的原文视为暂时无法翻译，而不是错误。

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;

use futures::future::{FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};

use super::error::{TranslationError, TranslationResult};
use super::language::LanguageTag;

/// 翻译结果映射
pub type TranslationMap = HashMap<String, String>;

/// 一次翻译请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    /// 去重后的原文，按发现顺序排列
    pub text: Vec<String>,
    pub default_language: LanguageTag,
    pub target_language: LanguageTag,
}

/// 外部翻译服务
pub trait TranslationProvider {
    fn translate(&self, request: TranslationRequest) -> LocalBoxFuture<'_, TranslationResult<TranslationMap>>;
}

impl<P: TranslationProvider + ?Sized> TranslationProvider for std::rc::Rc<P> {
    fn translate(&self, request: TranslationRequest) -> LocalBoxFuture<'_, TranslationResult<TranslationMap>> {
        (**self).translate(request)
    }
}

/// 用异步闭包实现的翻译服务
pub struct FnProvider<F> {
    translate: F,
}

impl<F, Fut> FnProvider<F>
where
    F: Fn(TranslationRequest) -> Fut,
    Fut: Future<Output = TranslationResult<TranslationMap>> + 'static,
{
    pub fn new(translate: F) -> Self {
        Self { translate }
    }
}

impl<F, Fut> TranslationProvider for FnProvider<F>
where
    F: Fn(TranslationRequest) -> Fut,
    Fut: Future<Output = TranslationResult<TranslationMap>> + 'static,
{
    fn translate(&self, request: TranslationRequest) -> LocalBoxFuture<'_, TranslationResult<TranslationMap>> {
        (self.translate)(request).boxed_local()
    }
}

/// 静态词表，只返回词表中存在的原文
#[derive(Debug, Clone, Default)]
pub struct DictionaryProvider {
    glossary: TranslationMap,
}

impl DictionaryProvider {
    pub fn new(glossary: TranslationMap) -> Self {
        Self { glossary }
    }

    /// 从 JSON 对象文件加载词表
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> TranslationResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::from(e).with_context(path.display()))?;
        let glossary: TranslationMap = serde_json::from_str(&content)
            .map_err(|e| TranslationError::from(e).with_context(path.display()))?;
        tracing::info!("已加载词表 {}: {} 条", path.display(), glossary.len());
        Ok(Self::new(glossary))
    }

    pub fn len(&self) -> usize {
        self.glossary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glossary.is_empty()
    }
}

impl TranslationProvider for DictionaryProvider {
    fn translate(&self, request: TranslationRequest) -> LocalBoxFuture<'_, TranslationResult<TranslationMap>> {
        let found: TranslationMap = request
            .text
            .into_iter()
            .filter_map(|text| {
                let translated = self.glossary.get(&text)?.clone();
                Some((text, translated))
            })
            .collect();
        futures::future::ready(Ok(found)).boxed_local()
    }
}

/// 通过 HTTP 调用的翻译服务
///
/// 以 JSON 形式 POST `TranslationRequest`，期望响应体是
/// `{"原文": "译文", ...}` 形式的 JSON 对象。
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: reqwest::Client,
    url: String,
}

#[cfg(feature = "http")]
impl HttpProvider {
    pub fn new(url: &str, timeout: std::time::Duration) -> TranslationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranslationError::ConfigError(format!("创建HTTP客户端失败: {}", e)))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn from_config(config: &super::config::ObserverConfig) -> TranslationResult<Self> {
        Self::new(&config.api_url, config.request_timeout())
    }
}

#[cfg(feature = "http")]
impl TranslationProvider for HttpProvider {
    fn translate(&self, request: TranslationRequest) -> LocalBoxFuture<'_, TranslationResult<TranslationMap>> {
        async move {
            tracing::debug!("POST {}: {} 段文本", self.url, request.text.len());
            let response = self
                .client
                .post(&self.url)
                .json(&request)
                .send()
                .await?
                .error_for_status()?;
            let translations: TranslationMap = response.json().await?;
            Ok(translations)
        }
        .boxed_local()
    }
}
