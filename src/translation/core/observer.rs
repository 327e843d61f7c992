//! 增量翻译观察者
//!
//! `I18nObserver` 把文本收集、防抖批次翻译与语言切换串联起来：
//!
//! ```text
//! LiveDocument ──变更记录──▶ 监听任务 ──▶ TextCollector ──▶ 待翻译集合
//!                                      └──▶ Debouncer ──▶ BatchTranslator ──▶ 写回
//! ```
//!
//! 所有状态归单个实例所有，所有任务都是 tokio `LocalSet` 上的本地任务，
//! 因此 `observe`、`trigger` 等会派生任务的方法必须在 `LocalSet` 内调用。

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use markup5ever_rcdom::Handle;
use tokio::task::JoinHandle;

use crate::dom::{LiveDocument, MutationRecord, ObserveOptions};
use crate::env::locale;
use crate::translation::config::{constants, ObserverConfig};
use crate::translation::core::state::{ObserverState, ObserverStats};
use crate::translation::error::{helpers, TranslationError, TranslationResult};
use crate::translation::language::LanguageTag;
use crate::translation::pipeline::{BatchReport, BatchTranslator, Debouncer, TextCollector};
use crate::translation::provider::TranslationProvider;
use crate::translation::storage::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};

/// 翻译失败回调
pub type ErrorHook = Box<dyn Fn(&TranslationError)>;

/// 目标语言变化后的处理方式
pub enum ReloadPolicy {
    /// 交给宿主整体重新加载
    Host(Box<dyn Fn(&LanguageTag)>),
    /// 没有宿主重新加载能力时，原地整体重置：还原文本、清空状态、重新发现
    Reset,
}

impl std::fmt::Debug for ReloadPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReloadPolicy::Host(_) => f.write_str("Host(..)"),
            ReloadPolicy::Reset => f.write_str("Reset"),
        }
    }
}

/// 观察者构造参数
pub struct ObserverOptions {
    pub default_language: LanguageTag,
    pub target_language: Option<LanguageTag>,
    pub local_storage_key: String,
    pub provider: Rc<dyn TranslationProvider>,
    pub preference_store: Rc<dyn PreferenceStore>,
    pub reload_policy: ReloadPolicy,
    pub debounce: Duration,
    pub skip_elements: Vec<String>,
    pub on_error: Option<ErrorHook>,
}

impl ObserverOptions {
    pub fn new<P>(default_language: LanguageTag, provider: P) -> Self
    where
        P: TranslationProvider + 'static,
    {
        Self {
            default_language,
            target_language: None,
            local_storage_key: constants::DEFAULT_LOCAL_STORAGE_KEY.to_string(),
            provider: Rc::new(provider),
            preference_store: Rc::new(MemoryPreferenceStore::new()),
            reload_policy: ReloadPolicy::Reset,
            debounce: Duration::from_millis(constants::DEFAULT_DEBOUNCE_MS),
            skip_elements: constants::SKIP_ELEMENTS.iter().map(|s| s.to_string()).collect(),
            on_error: None,
        }
    }

    /// 按配置构造，偏好保存在配置指定的文件中
    pub fn from_config<P>(config: &ObserverConfig, provider: P) -> TranslationResult<Self>
    where
        P: TranslationProvider + 'static,
    {
        let default_language = config
            .default_language
            .clone()
            .ok_or_else(|| helpers::config_error("缺少 default_language"))?;

        let mut options = Self::new(default_language, provider)
            .with_local_storage_key(&config.local_storage_key)
            .with_debounce(config.debounce())
            .with_skip_elements(config.skip_elements.clone())
            .with_preference_store(Rc::new(FilePreferenceStore::new(&config.preference_path)));

        if let Some(target) = &config.target_language {
            options = options.with_target_language(target.clone());
        }
        Ok(options)
    }

    pub fn with_target_language(mut self, language: LanguageTag) -> Self {
        self.target_language = Some(language);
        self
    }

    pub fn with_local_storage_key(mut self, key: &str) -> Self {
        self.local_storage_key = key.to_string();
        self
    }

    pub fn with_preference_store<S>(mut self, store: Rc<S>) -> Self
    where
        S: PreferenceStore + 'static,
    {
        self.preference_store = store as Rc<dyn PreferenceStore>;
        self
    }

    pub fn with_reload_policy(mut self, policy: ReloadPolicy) -> Self {
        self.reload_policy = policy;
        self
    }

    /// 由宿主负责重新加载
    pub fn with_reload<F>(self, reload: F) -> Self
    where
        F: Fn(&LanguageTag) + 'static,
    {
        self.with_reload_policy(ReloadPolicy::Host(Box::new(reload)))
    }

    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    pub fn with_skip_elements<I, S>(mut self, elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_elements = elements.into_iter().map(Into::into).collect();
        self
    }

    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TranslationError) + 'static,
    {
        self.on_error = Some(Box::new(hook));
        self
    }
}

struct Watch {
    target: Handle,
    task: JoinHandle<()>,
}

struct ObserverInner {
    state: RefCell<ObserverState>,
    collector: TextCollector,
    translator: BatchTranslator,
    debouncer: Debouncer,
    preferences: Rc<dyn PreferenceStore>,
    storage_key: String,
    reload_policy: ReloadPolicy,
    on_error: Option<ErrorHook>,
    watch: RefCell<Option<Watch>>,
    /// 正在执行的批次数，包括宿主直接调用的
    running: Cell<usize>,
}

/// 批次执行期间计数加一
struct RunningBatch<'a>(&'a Cell<usize>);

impl<'a> RunningBatch<'a> {
    fn enter(running: &'a Cell<usize>) -> Self {
        running.set(running.get() + 1);
        Self(running)
    }
}

impl Drop for RunningBatch<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

impl Drop for ObserverInner {
    fn drop(&mut self) {
        if let Some(watch) = self.watch.get_mut().take() {
            watch.task.abort();
        }
    }
}

/// 增量翻译观察者
///
/// 克隆得到的是同一个观察者的另一个句柄。
#[derive(Clone)]
pub struct I18nObserver {
    inner: Rc<ObserverInner>,
}

impl I18nObserver {
    pub fn new(options: ObserverOptions) -> TranslationResult<Self> {
        if options.local_storage_key.trim().is_empty() {
            return Err(helpers::config_error("偏好键名不能为空"));
        }
        if options.debounce.is_zero() {
            return Err(helpers::config_error("防抖窗口不能为0"));
        }

        let target_language = Self::resolve_target_language(&options);
        tracing::info!(
            "初始化翻译观察者: {} → {}",
            options.default_language,
            target_language
        );

        let ObserverOptions {
            default_language,
            local_storage_key,
            provider,
            preference_store,
            reload_policy,
            debounce,
            skip_elements,
            on_error,
            ..
        } = options;

        let inner = ObserverInner {
            state: RefCell::new(ObserverState::new(default_language, target_language)),
            collector: TextCollector::new(skip_elements),
            translator: BatchTranslator::new(provider),
            debouncer: Debouncer::new(debounce),
            preferences: preference_store,
            storage_key: local_storage_key,
            reload_policy,
            on_error,
            watch: RefCell::new(None),
            running: Cell::new(0),
        };

        Ok(Self {
            inner: Rc::new(inner),
        })
    }

    /// 显式指定 → 已保存的偏好 → 宿主语言环境 → 默认语言
    fn resolve_target_language(options: &ObserverOptions) -> LanguageTag {
        if let Some(language) = &options.target_language {
            return language.clone();
        }

        match options.preference_store.get(&options.local_storage_key) {
            Ok(Some(stored)) => match LanguageTag::parse(&stored) {
                Ok(language) => return language,
                Err(e) => tracing::warn!("忽略无效的语言偏好: {}", e),
            },
            Ok(None) => {}
            Err(e) => helpers::log_error(&e),
        }

        locale::host_language().unwrap_or_else(|| options.default_language.clone())
    }

    /// 开始监听 `target`（默认为 `<body>`）的结构与文本变更
    ///
    /// 会先对 `target` 做一次发现并触发翻译。重复调用时替换之前的监听。
    pub fn observe(&self, document: &LiveDocument, target: Option<Handle>) {
        let target = target.unwrap_or_else(|| document.body());
        let mut receiver = document.subscribe(&target, ObserveOptions::text_changes());

        let weak: Weak<ObserverInner> = Rc::downgrade(&self.inner);
        let task = tokio::task::spawn_local(async move {
            while let Some(records) = receiver.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                I18nObserver { inner }.handle_records(&records);
            }
        });

        let previous = self.inner.watch.replace(Some(Watch {
            target: target.clone(),
            task,
        }));
        if let Some(previous) = previous {
            tracing::debug!("替换之前的监听");
            previous.task.abort();
        }

        tracing::info!("开始监听文档变更");
        self.add_text_nodes(&[target]);
        self.trigger();
    }

    /// 是否正在监听
    pub fn is_observing(&self) -> bool {
        self.inner.watch.borrow().is_some()
    }

    fn handle_records(&self, records: &[MutationRecord]) {
        tracing::trace!("收到 {} 条变更记录", records.len());
        for record in records {
            self.add_text_nodes(&record.affected_nodes());
        }
        self.trigger();
    }

    /// 遍历节点及其后代，收集需要翻译的文本
    pub fn add_text_nodes(&self, nodes: &[Handle]) {
        let mut state = self.inner.state.borrow_mut();
        self.inner.collector.add_text_nodes(&mut state, nodes);
    }

    /// 防抖触发一次批次翻译
    pub fn trigger(&self) {
        let weak = Rc::downgrade(&self.inner);
        self.inner.debouncer.trigger(move || async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // 失败已在内部记录并回调
            let _ = I18nObserver { inner }.translate_pending().await;
        });
    }

    /// 立即执行一次批次翻译
    pub async fn translate_pending(&self) -> TranslationResult<BatchReport> {
        let _running = RunningBatch::enter(&self.inner.running);
        match self.inner.translator.run(&self.inner.state).await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.report_error(&e);
                Err(e)
            }
        }
    }

    fn report_error(&self, error: &TranslationError) {
        helpers::log_error(error);
        if let Some(hook) = &self.inner.on_error {
            hook(error);
        }
    }

    /// 切换目标语言，返回是否发生了切换
    ///
    /// 与当前目标语言相同时什么都不做；否则保存偏好并按 `ReloadPolicy` 重新加载。
    pub fn set_target_language(&self, language: LanguageTag) -> TranslationResult<bool> {
        let current = self.target_language();
        if current == language {
            tracing::debug!("目标语言未变化: {}", language);
            return Ok(false);
        }

        self.inner
            .preferences
            .set(&self.inner.storage_key, language.as_str())
            .inspect_err(|e| self.report_error(e))?;
        tracing::info!("切换目标语言: {} → {}", current, language);

        match &self.inner.reload_policy {
            ReloadPolicy::Host(reload) => {
                // 旧语言的状态全部作废，等待宿主重新加载
                self.inner.debouncer.cancel();
                self.inner.state.borrow_mut().reset(language.clone());
                reload(&language);
            }
            ReloadPolicy::Reset => self.reset_to(language),
        }

        Ok(true)
    }

    /// 以当前目标语言整体重置
    pub fn reset(&self) {
        let language = self.target_language();
        self.reset_to(language);
    }

    fn reset_to(&self, language: LanguageTag) {
        self.inner.debouncer.cancel();

        let watched = self
            .inner
            .watch
            .borrow()
            .as_ref()
            .map(|watch| watch.target.clone());

        {
            let mut state = self.inner.state.borrow_mut();
            let restored = state.written.restore();
            tracing::debug!("还原 {} 个已翻译的文本节点", restored);
            state.reset(language.clone());
        }
        tracing::info!("翻译状态已重置，目标语言: {}", language);

        if let Some(target) = watched {
            self.add_text_nodes(&[target]);
            self.trigger();
        }
    }

    /// 等待防抖计时器与进行中的翻译全部结束
    ///
    /// 宿主直接调用 `translate_pending` 发起的批次同样计入。
    pub async fn wait_idle(&self) {
        const POLL_INTERVAL: Duration = Duration::from_millis(10);

        loop {
            // 先让监听任务处理已投递的变更
            tokio::task::yield_now().await;
            if self.inner.debouncer.is_idle() && self.inner.running.get() == 0 {
                return;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub fn target_language(&self) -> LanguageTag {
        self.inner.state.borrow().target_language.clone()
    }

    pub fn default_language(&self) -> LanguageTag {
        self.inner.state.borrow().default_language.clone()
    }

    pub fn storage_key(&self) -> &str {
        &self.inner.storage_key
    }

    /// 字典中 `text` 的译文
    pub fn translation(&self, text: &str) -> Option<String> {
        self.inner.state.borrow().dictionary.get(text).map(str::to_string)
    }

    pub fn dictionary_len(&self) -> usize {
        self.inner.state.borrow().dictionary.len()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.state.borrow().pending.len()
    }

    pub fn awaiting_len(&self) -> usize {
        self.inner.state.borrow().awaiting.len()
    }

    /// 在途原文，按字典序
    pub fn in_flight_texts(&self) -> Vec<String> {
        let mut texts: Vec<String> = self.inner.state.borrow().in_flight.iter().cloned().collect();
        texts.sort();
        texts
    }

    pub fn stats(&self) -> ObserverStats {
        self.inner.state.borrow().stats.clone()
    }
}

impl std::fmt::Debug for I18nObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("I18nObserver")
            .field("default_language", &state.default_language)
            .field("target_language", &state.target_language)
            .field("pending", &state.pending.len())
            .field("in_flight", &state.in_flight.len())
            .field("dictionary", &state.dictionary.len())
            .finish()
    }
}
