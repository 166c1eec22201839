//! 同一代码的并发未命中合并
//!
//! 首个调用方发起抓取，其余调用方共享同一个 future 的结果（成功或失败）。
//! 表中只存弱引用；抓取完成或所有调用方放弃后条目即被移除。

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::error::QuoteError;
use crate::models::Quote;

type FetchFuture = BoxFuture<'static, Result<Quote, QuoteError>>;

/// 可被多个调用方同时等待的抓取
pub type SharedFetch = Shared<FetchFuture>;

type InflightMap = Arc<Mutex<HashMap<String, (u64, WeakShared<FetchFuture>)>>>;

#[derive(Default)]
pub struct FetchCoalescer {
    inflight: InflightMap,
    next_id: AtomicU64,
}

impl FetchCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入进行中的抓取，没有则用 `start` 发起一个
    ///
    /// 返回的布尔值表示本次调用是否发起了抓取
    pub fn join<F>(&self, symbol: &str, start: impl FnOnce() -> F) -> (SharedFetch, bool)
    where
        F: Future<Output = Result<Quote, QuoteError>> + Send + 'static,
    {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(shared) = inflight.get(symbol).and_then(|(_, weak)| weak.upgrade()) {
            return (shared, false);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = InflightSlot {
            inflight: Arc::clone(&self.inflight),
            symbol: symbol.to_string(),
            id,
        };
        let fetch = start();
        let shared = async move {
            // future 完成或被丢弃时释放条目
            let _slot = slot;
            fetch.await
        }
        .boxed()
        .shared();

        if let Some(weak) = shared.downgrade() {
            inflight.insert(symbol.to_string(), (id, weak));
        }

        (shared, true)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inflight.lock().unwrap().len()
    }
}

/// 抓取 future 持有的表项，析构时移除自身
struct InflightSlot {
    inflight: InflightMap,
    symbol: String,
    id: u64,
}

impl Drop for InflightSlot {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        // 同名条目可能已被更新的抓取替换
        if inflight.get(&self.symbol).is_some_and(|(id, _)| *id == self.id) {
            inflight.remove(&self.symbol);
        }
    }
}
