//! 行情内存缓存
//!
//! 以规范化股票代码为键，按抓取时间判断新鲜度。
//! 过期条目不会主动清理，只在下一次成功抓取时被覆盖；
//! 设置 `max_entries` 后插入新代码会淘汰最早抓取的条目。

use dashmap::DashMap;
use std::time::Duration;

use crate::models::Quote;

/// 默认缓存时效（毫秒）
pub const DEFAULT_TTL_MS: i64 = 10_000;

/// 缓存条目
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub quote: Quote,
    /// 抓取时间（Unix 毫秒）
    pub fetched_at_millis: i64,
}

impl CacheEntry {
    /// `now - fetched_at < ttl` 即为新鲜
    pub fn is_fresh(&self, now_millis: i64, ttl_ms: i64) -> bool {
        now_millis - self.fetched_at_millis < ttl_ms
    }
}

/// 进程内共享的行情缓存
#[derive(Debug)]
pub struct QuoteCache {
    entries: DashMap<String, CacheEntry>,
    ttl_ms: i64,
    /// 0 表示不限制
    max_entries: usize,
}

impl QuoteCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            max_entries,
        }
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    /// 读取新鲜条目，不产生任何副作用
    pub fn get_fresh(&self, symbol: &str, now_millis: i64) -> Option<Quote> {
        self.entries
            .get(symbol)
            .filter(|entry| entry.is_fresh(now_millis, self.ttl_ms))
            .map(|entry| entry.quote.clone())
    }

    /// 写入（覆盖）条目，后写者胜
    pub fn insert(&self, symbol: String, quote: Quote, fetched_at_millis: i64) {
        if self.max_entries > 0 && !self.entries.contains_key(&symbol) {
            while self.entries.len() >= self.max_entries {
                if !self.evict_oldest() {
                    break;
                }
            }
        }

        self.entries.insert(
            symbol,
            CacheEntry {
                quote,
                fetched_at_millis,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.contains_key(symbol)
    }

    fn evict_oldest(&self) -> bool {
        // 先收集键再删除，迭代期间持有分片读锁
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.fetched_at_millis)
            .map(|entry| entry.key().clone());

        match oldest {
            Some(symbol) => {
                log::debug!("缓存已满，淘汰 {}", symbol);
                self.entries.remove(&symbol).is_some()
            }
            None => false,
        }
    }
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TTL_MS as u64), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quote(symbol: &str, price: f64) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            price,
            change: 0.0,
            change_percent: 0.0,
            high: 0.0,
            low: 0.0,
            open: 0.0,
            previous_close: 0.0,
            as_of: Utc::now(),
        }
    }

    #[test]
    fn test_fresh_within_ttl() {
        let cache = QuoteCache::default();
        cache.insert("AAPL".into(), quote("AAPL", 150.0), 1_000);

        assert!(cache.get_fresh("AAPL", 1_000).is_some());
        assert!(cache.get_fresh("AAPL", 10_999).is_some());
        // age == ttl 视为过期
        assert!(cache.get_fresh("AAPL", 11_000).is_none());
        // 过期条目仍保留，等待覆盖
        assert!(cache.contains("AAPL"));
    }

    #[test]
    fn test_missing_symbol() {
        let cache = QuoteCache::default();
        assert!(cache.get_fresh("MSFT", 0).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_overwrites() {
        let cache = QuoteCache::default();
        cache.insert("AAPL".into(), quote("AAPL", 150.0), 0);
        cache.insert("AAPL".into(), quote("AAPL", 151.0), 20_000);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_fresh("AAPL", 20_001).unwrap().price, 151.0);
    }

    #[test]
    fn test_custom_ttl() {
        let cache = QuoteCache::new(Duration::from_millis(500), 0);
        assert_eq!(cache.ttl_ms(), 500);
        cache.insert("TSLA".into(), quote("TSLA", 200.0), 0);
        assert!(cache.get_fresh("TSLA", 499).is_some());
        assert!(cache.get_fresh("TSLA", 500).is_none());
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let cache = QuoteCache::new(Duration::from_secs(u64::MAX), 0);
        assert_eq!(cache.ttl_ms(), i64::MAX);
        cache.insert("AAPL".into(), quote("AAPL", 150.0), 0);
        assert!(cache.get_fresh("AAPL", 1_000_000_000_000).is_some());
    }

    #[test]
    fn test_bounded_evicts_oldest() {
        let cache = QuoteCache::new(Duration::from_secs(10), 2);
        cache.insert("AAPL".into(), quote("AAPL", 1.0), 100);
        cache.insert("MSFT".into(), quote("MSFT", 2.0), 50);
        cache.insert("NVDA".into(), quote("NVDA", 3.0), 200);

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("MSFT"));
        assert!(cache.contains("AAPL"));
        assert!(cache.contains("NVDA"));
    }

    #[test]
    fn test_bounded_update_does_not_evict() {
        let cache = QuoteCache::new(Duration::from_secs(10), 2);
        cache.insert("AAPL".into(), quote("AAPL", 1.0), 100);
        cache.insert("MSFT".into(), quote("MSFT", 2.0), 50);
        cache.insert("AAPL".into(), quote("AAPL", 1.5), 300);

        assert_eq!(cache.len(), 2);
        assert!(cache.contains("MSFT"));
    }
}
