//! 翻译流水线驱动
//!
//! 本模块把内容发现、批次构建、缓存、翻译端与回写串联起来，并管理启用状态与
//! 原文/译文切换。所有状态都在单个逻辑线程上修改，挂起点只有翻译端调用与批次
//! 之间的节奏等待，任何 `RefCell` 借用都不会跨越 `.await`。
//!
//! ## 状态机
//!
//! - `Disabled`: 发现未启用，新的触发被忽略
//! - `Idle`: 已启用，等待队列中出现内容
//! - `Draining`: 正在处理一轮或多轮批次
//!
//! 处理期间新的发现仍会进入队列；一轮结束后若队列非空，立即开始下一轮。
//!
//! ## 使用示例
//!
//! ```ignore
//! let orchestrator = Orchestrator::new(tree, worker, settings, "example.org", options);
//! for node in orchestrator.tree().body_elements() {
//!     orchestrator.notify_subtree(&node);
//! }
//! orchestrator.drain().await;
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;

use super::messaging::{TranslateTextRequest, TranslateTextResponse, TranslationBackend};
use crate::translation::config::{constants, SiteSettings, TranslationConfig};
use crate::translation::pipeline::batch::{build_batches, Batch};
use crate::translation::pipeline::collector::{CollectionStats, DiscoveryQueue, Offer, QueueOrder};
use crate::translation::pipeline::tree::ContentTree;
use crate::translation::processor::Reinserter;
use crate::translation::storage::cache::{CacheEntry, CacheStats, TranslationCache};

/// 流水线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disabled,
    Idle,
    Draining,
}

/// 页面事件
#[derive(Debug, Clone)]
pub enum PageEvent<N> {
    /// 节点进入视口
    Visible(N),
    /// 页面加载后新插入的节点
    Inserted(N),
    /// 设置中的启用开关变化
    EnabledChanged(bool),
}

/// 流水线参数
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorOptions {
    pub max_batch_chars: usize,
    pub batch_pacing: Duration,
    pub settle_delay: Duration,
    pub debounce: Duration,
    pub queue_order: QueueOrder,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            max_batch_chars: constants::DEFAULT_MAX_BATCH_CHARS,
            batch_pacing: constants::DEFAULT_BATCH_PACING,
            settle_delay: constants::DEFAULT_SETTLE_DELAY,
            debounce: constants::DEFAULT_DEBOUNCE,
            queue_order: QueueOrder::default(),
        }
    }
}

impl From<&TranslationConfig> for OrchestratorOptions {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            max_batch_chars: config.max_batch_chars,
            batch_pacing: config.batch_pacing(),
            settle_delay: config.settle_delay(),
            debounce: config.debounce(),
            queue_order: config.queue_order,
        }
    }
}

/// 运行统计快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceStats {
    pub drain_cycles: usize,
    pub units_collected: usize,
    pub units_resolved: usize,
    pub batches_built: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub service_requests: usize,
    pub fallbacks: usize,
    pub chars_submitted: usize,
}

struct State<N> {
    enabled: bool,
    draining: bool,
    queue: DiscoveryQueue<N>,
    cache: TranslationCache,
    reinserter: Reinserter<N>,
    last_dispatch: Option<Instant>,
    stats: ServiceStats,
}

struct Inner<T: ContentTree, B> {
    tree: T,
    backend: B,
    prompt: String,
    /// 提示词非空且站点未受限
    armable: bool,
    options: OrchestratorOptions,
    state: RefCell<State<T::Node>>,
}

/// 结束处理时复位处理标记
struct DrainGuard<'a, N> {
    state: &'a RefCell<State<N>>,
}

impl<N> Drop for DrainGuard<'_, N> {
    fn drop(&mut self) {
        self.state.borrow_mut().draining = false;
    }
}

/// 翻译流水线
///
/// 每个文档视图一个实例；克隆只复制句柄
pub struct Orchestrator<T: ContentTree, B> {
    inner: Rc<Inner<T, B>>,
}

impl<T: ContentTree, B> Clone for Orchestrator<T, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, B> Orchestrator<T, B>
where
    T: ContentTree,
    B: TranslationBackend,
{
    /// 创建流水线，`page_host` 用于受限站点判断
    pub fn new(
        tree: T,
        backend: B,
        settings: SiteSettings,
        page_host: &str,
        options: OrchestratorOptions,
    ) -> Self {
        let has_prompt = !settings.language_prompt.trim().is_empty();
        let restricted = settings.is_restricted(page_host);
        if !has_prompt {
            tracing::info!("未设置目标语言提示词，不启动内容发现");
        } else if restricted {
            tracing::info!("站点 {} 在受限列表中，不启动内容发现", page_host);
        }

        let state = State {
            enabled: settings.is_enabled,
            draining: false,
            queue: DiscoveryQueue::new(options.queue_order),
            cache: TranslationCache::new(),
            reinserter: Reinserter::new(),
            last_dispatch: None,
            stats: ServiceStats::default(),
        };

        Self {
            inner: Rc::new(Inner {
                tree,
                backend,
                prompt: settings.language_prompt,
                armable: has_prompt && !restricted,
                options,
                state: RefCell::new(state),
            }),
        }
    }

    pub fn tree(&self) -> &T {
        &self.inner.tree
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.inner.options
    }

    /// 发现是否处于启用状态
    pub fn is_armed(&self) -> bool {
        self.inner.armable && self.inner.state.borrow().enabled
    }

    pub fn phase(&self) -> Phase {
        let state = self.inner.state.borrow();
        if state.draining {
            Phase::Draining
        } else if self.inner.armable && state.enabled {
            Phase::Idle
        } else {
            Phase::Disabled
        }
    }

    pub fn queue_len(&self) -> usize {
        self.inner.state.borrow().queue.len()
    }

    pub fn is_showing_translated(&self) -> bool {
        self.inner.state.borrow().reinserter.is_showing_translated()
    }

    pub fn toggle_record_count(&self) -> usize {
        self.inner.state.borrow().reinserter.len()
    }

    pub fn stats(&self) -> ServiceStats {
        self.inner.state.borrow().stats.clone()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.state.borrow().cache.stats().clone()
    }

    pub fn collection_stats(&self) -> CollectionStats {
        self.inner.state.borrow().queue.stats().clone()
    }

    /// 可见性触发
    pub fn notify_visible(&self, node: &T::Node) -> Offer {
        self.offer(node)
    }

    /// 插入触发
    pub fn notify_inserted(&self, node: &T::Node) -> Offer {
        self.offer(node)
    }

    /// 把整棵子树视为可见，返回新入队的区域数
    pub fn notify_subtree(&self, root: &T::Node) -> usize {
        let mut state = self.inner.state.borrow_mut();
        if !(self.inner.armable && state.enabled) {
            return 0;
        }
        state.queue.offer_subtree(&self.inner.tree, root)
    }

    fn offer(&self, node: &T::Node) -> Offer {
        let mut state = self.inner.state.borrow_mut();
        if !(self.inner.armable && state.enabled) {
            return Offer::Disarmed;
        }
        state.queue.offer(&self.inner.tree, node)
    }

    /// 只切换发现开关，不改变已显示的文本
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.inner.state.borrow_mut();
        if state.enabled != enabled {
            tracing::info!("翻译已{}", if enabled { "启用" } else { "停用" });
        }
        state.enabled = enabled;
    }

    /// 设置变化处理：切换开关并显示对应文本
    pub fn apply_enabled_change(&self, enabled: bool) -> usize {
        self.set_enabled(enabled);
        if enabled {
            self.show_translated()
        } else {
            self.show_original()
        }
    }

    /// 恢复所有已记录位置的原文
    pub fn show_original(&self) -> usize {
        let mut state = self.inner.state.borrow_mut();
        state.reinserter.show_original(&self.inner.tree)
    }

    /// 重新显示所有已记录位置的译文
    pub fn show_translated(&self) -> usize {
        let mut state = self.inner.state.borrow_mut();
        state.reinserter.show_translated(&self.inner.tree)
    }

    /// 处理队列直到为空
    ///
    /// 已在处理时立即返回 0；停用后当前一轮的批次仍会完成。返回解析的单元数
    pub async fn drain(&self) -> usize {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.draining {
                tracing::debug!("已有处理在进行，跳过");
                return 0;
            }
            if !(self.inner.armable && state.enabled) {
                return 0;
            }
            state.draining = true;
        }
        let _guard = DrainGuard {
            state: &self.inner.state,
        };

        let mut resolved = 0;
        loop {
            let (cycle, units) = {
                let mut state = self.inner.state.borrow_mut();
                if !state.enabled || state.queue.is_empty() {
                    break;
                }
                state.stats.drain_cycles += 1;
                let units = state.queue.drain_units(&self.inner.tree);
                state.stats.units_collected += units.len();
                (state.stats.drain_cycles, units)
            };

            let unit_count = units.len();
            let batches = build_batches(units, self.inner.options.max_batch_chars);
            self.inner.state.borrow_mut().stats.batches_built += batches.len();
            tracing::info!(
                "第 {} 轮: {} 个文本单元，{} 个批次",
                cycle,
                unit_count,
                batches.len()
            );

            for batch in batches {
                resolved += self.resolve_batch(batch).await;
            }
        }

        resolved
    }

    async fn resolve_batch(&self, mut batch: Batch<T::Node>) -> usize {
        let texts = batch.texts();
        let partition = {
            let mut state = self.inner.state.borrow_mut();
            let partition = state.cache.partition(&texts);
            let hits = partition.resolved.iter().filter(|r| r.is_some()).count();
            state.stats.cache_hits += hits;
            state.stats.cache_misses += partition.misses.len();
            partition
        };

        tracing::debug!(
            "批次 {} 个单元 / {} 字符，未命中 {}",
            batch.len(),
            batch.total_chars,
            partition.misses.len()
        );

        if !partition.misses.is_empty() {
            self.dispatch(&partition.misses).await;
        }

        let mut state = self.inner.state.borrow_mut();
        let translations: Vec<CacheEntry> = texts
            .iter()
            .zip(partition.resolved)
            .map(|(text, hit)| {
                hit.or_else(|| state.cache.lookup(text).cloned())
                    .unwrap_or_else(|| CacheEntry::fallback(text.as_str()))
            })
            .collect();

        state
            .reinserter
            .apply(&self.inner.tree, &mut batch.units, &translations);
        state.stats.units_resolved += batch.len();
        batch.len()
    }

    /// 发送一次翻译请求并把结果写入缓存
    async fn dispatch(&self, misses: &[String]) {
        self.pace().await;

        {
            let mut state = self.inner.state.borrow_mut();
            state.stats.service_requests += 1;
            state.stats.chars_submitted += misses.iter().map(|t| t.chars().count()).sum::<usize>();
        }

        let request = TranslateTextRequest::new(misses.to_vec(), &self.inner.prompt);
        let response = self.inner.backend.translate_texts(request).await;

        let mut state = self.inner.state.borrow_mut();
        let state = &mut *state;
        match response {
            TranslateTextResponse::Translated { translated_texts } => {
                if translated_texts.len() != misses.len() {
                    tracing::warn!(
                        "翻译端返回 {} 条，期望 {} 条",
                        translated_texts.len(),
                        misses.len()
                    );
                }
                for (index, text) in misses.iter().enumerate() {
                    match translated_texts.get(index) {
                        Some(item) if !item.fallback && !item.translated_text.trim().is_empty() => {
                            state.cache.insert(text, &item.translated_text);
                        }
                        _ => {
                            state.cache.insert_fallback(text);
                            state.stats.fallbacks += 1;
                        }
                    }
                }
            }
            TranslateTextResponse::Error { error } => {
                tracing::warn!("翻译端返回错误: {}，{} 条文本使用原文", error, misses.len());
                for text in misses {
                    state.cache.insert_fallback(text);
                }
                state.stats.fallbacks += misses.len();
            }
        }
    }

    /// 保证相邻两次请求之间至少间隔 `batch_pacing`
    async fn pace(&self) {
        let wait = {
            let state = self.inner.state.borrow();
            state.last_dispatch.map(|last| {
                (last + self.inner.options.batch_pacing).saturating_duration_since(Instant::now())
            })
        };
        if let Some(wait) = wait.filter(|w| !w.is_zero()) {
            tracing::debug!("等待 {:?} 后发送下一批次", wait);
            tokio::time::sleep(wait).await;
        }
        self.inner.state.borrow_mut().last_dispatch = Some(Instant::now());
    }

    /// 处理单个事件，返回是否需要安排处理
    pub fn handle_event(&self, event: PageEvent<T::Node>) -> bool {
        match event {
            PageEvent::Visible(node) => self.notify_visible(&node) == Offer::Queued,
            PageEvent::Inserted(node) => self.notify_inserted(&node) == Offer::Queued,
            PageEvent::EnabledChanged(enabled) => {
                self.apply_enabled_change(enabled);
                enabled
            }
        }
    }

    /// 事件循环
    ///
    /// 首次处理前等待 `settle_delay`，之后每批事件在 `debounce` 静默后触发一次处理；
    /// 处理期间继续接收事件。通道关闭且队列处理完后返回解析的单元总数
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<PageEvent<T::Node>>) -> usize {
        let notify = Notify::new();
        let closed = Cell::new(false);
        let total = Cell::new(0usize);

        let receive = async {
            while let Some(event) = events.recv().await {
                if self.handle_event(event) {
                    notify.notify_one();
                }
            }
            closed.set(true);
            notify.notify_one();
        };

        let process = async {
            tokio::time::sleep(self.inner.options.settle_delay).await;
            tracing::debug!("页面已稳定，开始处理");
            loop {
                notify.notified().await;
                loop {
                    tokio::select! {
                        _ = notify.notified() => {}
                        _ = tokio::time::sleep(self.inner.options.debounce) => break,
                    }
                }
                total.set(total.get() + self.drain().await);
                if closed.get() && (self.queue_len() == 0 || !self.is_armed()) {
                    break;
                }
            }
        };

        tokio::join!(receive, process);
        tracing::info!("事件循环结束，共解析 {} 个文本单元", total.get());
        total.get()
    }
}
