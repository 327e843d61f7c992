//! 防抖调度
//!
//! 每次 `trigger` 都会重新计时，窗口内没有新的触发才执行一次任务。
//! 计时结束后任务在独立的本地任务中运行，之后的重新计时只会取消尚在
//! 等待的计时器，不会打断已经开始的任务。

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::JoinHandle;

/// 正在运行的任务计数，任务结束或被取消时自动减一
struct RunningGuard(Rc<Cell<usize>>);

impl RunningGuard {
    fn new(running: Rc<Cell<usize>>) -> Self {
        running.set(running.get() + 1);
        Self(running)
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// 单次延迟任务，每次触发重新计时
///
/// 必须在 tokio `LocalSet` 内使用。
pub struct Debouncer {
    window: Duration,
    timer: RefCell<Option<JoinHandle<()>>>,
    running: Rc<Cell<usize>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            timer: RefCell::new(None),
            running: Rc::new(Cell::new(0)),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 重新计时，窗口结束后执行 `task`
    pub fn trigger<F, Fut>(&self, task: F)
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.cancel();

        let window = self.window;
        let running = Rc::clone(&self.running);
        let timer = tokio::task::spawn_local(async move {
            tokio::time::sleep(window).await;
            let guard = RunningGuard::new(running);
            tokio::task::spawn_local(async move {
                let _guard = guard;
                task().await;
            });
        });

        *self.timer.borrow_mut() = Some(timer);
    }

    /// 取消尚未到期的计时器
    pub fn cancel(&self) {
        if let Some(timer) = self.timer.borrow_mut().take() {
            timer.abort();
        }
    }

    /// 是否有计时器在等待
    pub fn is_armed(&self) -> bool {
        self.timer
            .borrow()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    /// 正在执行的任务数
    pub fn running(&self) -> usize {
        self.running.get()
    }

    /// 没有等待中的计时器，也没有正在执行的任务
    pub fn is_idle(&self) -> bool {
        !self.is_armed() && self.running() == 0
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("window", &self.window)
            .field("armed", &self.is_armed())
            .field("running", &self.running())
            .finish()
    }
}
