//! 行情网关
//!
//! 查询流程：规范化代码 → 查缓存 → 未命中则请求上游 → 校验 → 规范化 → 写缓存。
//! 每次调用最多请求上游一次，失败不重试、不写缓存。

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::cache::QuoteCache;
use super::clock::{Clock, SystemClock};
use super::coalesce::FetchCoalescer;
use super::error::{QuoteError, UpstreamFault};
use super::finnhub::{
    QuoteProvider, FIELD_CHANGE, FIELD_CHANGE_PERCENT, FIELD_HIGH, FIELD_LOW, FIELD_OPEN,
    FIELD_PREVIOUS_CLOSE, FIELD_PRICE,
};
use crate::models::Quote;

/// 默认上游超时
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(8);

/// 价格有效性：有限且大于 0。
/// 上游以 0 或缺失表示“无此代码数据”
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// 去空白并转大写，空串视为无效代码
pub fn normalize_symbol(raw: &str) -> Result<String, QuoteError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(QuoteError::InvalidSymbol);
    }
    Ok(symbol)
}

/// 校验上游响应体并转换为 `Quote`
///
/// 主价格缺失、非数字或 ≤ 0 返回 `NoData`；次要字段缺失填 0
pub fn parse_upstream_quote(
    symbol: &str,
    body: &str,
    as_of: DateTime<Utc>,
) -> Result<Quote, QuoteError> {
    let raw: Value = serde_json::from_str(body)
        .map_err(|e| QuoteError::Upstream(UpstreamFault::Malformed(e.to_string())))?;

    let price = raw.get(FIELD_PRICE).and_then(Value::as_f64);
    let price = match price {
        Some(p) if is_valid_price(p) => p,
        _ => {
            return Err(QuoteError::NoData {
                symbol: symbol.to_string(),
            })
        }
    };

    let field = |name: &str| {
        raw.get(name)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    };

    Ok(Quote {
        symbol: symbol.to_string(),
        price,
        change: field(FIELD_CHANGE),
        change_percent: field(FIELD_CHANGE_PERCENT),
        high: field(FIELD_HIGH),
        low: field(FIELD_LOW),
        open: field(FIELD_OPEN),
        previous_close: field(FIELD_PREVIOUS_CLOSE),
        as_of,
    })
}

/// 上游抓取所需的共享资源，可克隆进 `'static` future
#[derive(Clone)]
struct QuoteFetcher {
    cache: Arc<QuoteCache>,
    provider: Arc<dyn QuoteProvider>,
    clock: Arc<dyn Clock>,
}

impl QuoteFetcher {
    fn cached(&self, symbol: &str) -> Option<Quote> {
        self.cache.get_fresh(symbol, self.clock.now_millis())
    }

    async fn fetch_and_store(
        self,
        symbol: String,
        api_key: String,
        deadline: Instant,
    ) -> Result<Quote, QuoteError> {
        // 合并前刚好有请求写入缓存
        if let Some(quote) = self.cached(&symbol) {
            return Ok(quote);
        }

        let fetch = self.provider.fetch_quote(&symbol, &api_key);
        let response = match tokio::time::timeout_at(deadline, fetch).await {
            Ok(Ok(response)) => response,
            Ok(Err(fault)) => {
                log::warn!("上游请求失败 {}: {}", symbol, fault);
                return Err(QuoteError::Upstream(fault));
            }
            Err(_) => {
                log::warn!("上游请求超时 {}", symbol);
                return Err(QuoteError::Upstream(UpstreamFault::Timeout));
            }
        };

        if !response.is_success() {
            log::warn!("上游返回异常状态 {}: {}", symbol, response.status);
            return Err(QuoteError::Upstream(UpstreamFault::Status(response.status)));
        }

        let now = self.clock.now();
        let quote = match parse_upstream_quote(&symbol, &response.body, now) {
            Ok(quote) => quote,
            Err(err @ QuoteError::NoData { .. }) => {
                log::debug!("上游无数据: {}", symbol);
                return Err(err);
            }
            Err(err) => {
                log::warn!("上游响应无法解析 {}: {}", symbol, err);
                return Err(err);
            }
        };

        self.cache
            .insert(symbol.clone(), quote.clone(), now.timestamp_millis());
        log::info!(
            "已缓存 {} 行情: {} (缓存条目 {})",
            symbol,
            quote.price,
            self.cache.len()
        );

        Ok(quote)
    }
}

/// 行情网关
///
/// 进程内构造一次，通过 `web::Data` 共享
pub struct QuoteGateway {
    fetcher: QuoteFetcher,
    /// 上游凭证，空白视为未配置
    api_key: Option<String>,
    /// 单次调用的总时限（含等待合并请求）
    timeout: Duration,
    /// 为 None 时不合并并发请求
    coalescer: Option<FetchCoalescer>,
}

impl QuoteGateway {
    pub fn new(
        cache: Arc<QuoteCache>,
        provider: Arc<dyn QuoteProvider>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            fetcher: QuoteFetcher {
                cache,
                provider,
                clock: Arc::new(SystemClock),
            },
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
            coalescer: Some(FetchCoalescer::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.fetcher.clock = clock;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.coalescer = enabled.then(FetchCoalescer::new);
        self
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.fetcher.cache
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// 获取单只股票行情
    pub async fn get_quote(&self, symbol_raw: &str) -> Result<Quote, QuoteError> {
        let deadline = Instant::now() + self.timeout;
        let symbol = normalize_symbol(symbol_raw)?;

        if let Some(quote) = self.fetcher.cached(&symbol) {
            log::debug!("缓存命中: {}", symbol);
            return Ok(quote);
        }

        // 必须在发起网络请求前检查凭证
        let api_key = match self.api_key.as_deref() {
            Some(key) => key,
            None => {
                log::error!("未配置 FINNHUB_API_KEY，无法获取 {} 的行情", symbol);
                return Err(QuoteError::MissingCredential);
            }
        };

        let fetch = || {
            self.fetcher
                .clone()
                .fetch_and_store(symbol.clone(), api_key.to_string(), deadline)
        };

        let outcome = match &self.coalescer {
            Some(coalescer) => {
                let (shared, leader) = coalescer.join(&symbol, fetch);
                if leader {
                    log::debug!("缓存未命中，请求上游: {}", symbol);
                } else {
                    log::debug!("合并到进行中的请求: {}", symbol);
                }
                tokio::time::timeout_at(deadline, shared).await
            }
            None => {
                log::debug!("缓存未命中，请求上游: {}", symbol);
                tokio::time::timeout_at(deadline, fetch()).await
            }
        };

        outcome.unwrap_or(Err(QuoteError::Upstream(UpstreamFault::Timeout)))
    }
}

// ==================== 测试模块 ====================
