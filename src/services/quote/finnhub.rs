//! Finnhub 行情接口实现
//!
//! 对接 https://finnhub.io/api/v1/quote?symbol=<symbol>&token=<key>
//! 只负责发请求和取回原始响应，校验与规范化在网关中完成

use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use url::Url;

use super::error::UpstreamFault;
use crate::config::UpstreamConfig;

// ==================== Finnhub 响应字段 ====================

/// 最新价
pub const FIELD_PRICE: &str = "c";
/// 涨跌额
pub const FIELD_CHANGE: &str = "d";
/// 涨跌幅
pub const FIELD_CHANGE_PERCENT: &str = "dp";
/// 最高价
pub const FIELD_HIGH: &str = "h";
/// 最低价
pub const FIELD_LOW: &str = "l";
/// 开盘价
pub const FIELD_OPEN: &str = "o";
/// 昨收价
pub const FIELD_PREVIOUS_CLOSE: &str = "pc";

/// 上游原始响应
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 行情数据源
///
/// 每次调用必须真正到达上游，不得在传输层缓存
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str, api_key: &str)
        -> Result<UpstreamResponse, UpstreamFault>;
}

/// Finnhub HTTP 数据源
pub struct FinnhubProvider {
    /// HTTP 客户端
    client: Client,
    /// 行情接口地址（不含查询参数）
    endpoint: Url,
}

impl FinnhubProvider {
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        let endpoint = Url::parse(&format!("{}/quote", config.base_url.trim_end_matches('/')))?;

        Ok(Self { client, endpoint })
    }

    /// 拼接带代码和凭证的请求地址
    fn quote_url(&self, symbol: &str, api_key: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("symbol", symbol)
            .append_pair("token", api_key);
        url
    }
}

#[async_trait]
impl QuoteProvider for FinnhubProvider {
    async fn fetch_quote(
        &self,
        symbol: &str,
        api_key: &str,
    ) -> Result<UpstreamResponse, UpstreamFault> {
        // 不记录完整 URL，其中带有 token
        log::debug!("📡 请求 Finnhub 行情: {}", symbol);

        let response = self
            .client
            .get(self.quote_url(symbol, api_key))
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::PRAGMA, "no-cache")
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_fault)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_fault)?;

        Ok(UpstreamResponse { status, body })
    }
}

/// reqwest 错误转换，去掉其中可能带 token 的 URL
fn transport_fault(err: reqwest::Error) -> UpstreamFault {
    if err.is_timeout() {
        UpstreamFault::Timeout
    } else {
        UpstreamFault::Transport(err.without_url().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> UpstreamConfig {
        UpstreamConfig {
            base_url: base_url.to_string(),
            ..UpstreamConfig::default()
        }
    }

    #[test]
    fn test_quote_url() {
        let provider = FinnhubProvider::new(&config("https://finnhub.io/api/v1")).unwrap();
        let url = provider.quote_url("AAPL", "secret");
        println!("  请求地址: {}", url.path());
        assert_eq!(url.as_str(), "https://finnhub.io/api/v1/quote?symbol=AAPL&token=secret");
    }

    #[test]
    fn test_quote_url_trailing_slash_and_encoding() {
        let provider = FinnhubProvider::new(&config("http://127.0.0.1:9000/api/v1/")).unwrap();
        let url = provider.quote_url("BRK.B", "a&b");
        assert_eq!(url.path(), "/api/v1/quote");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("symbol".to_string(), "BRK.B".to_string()),
                ("token".to_string(), "a&b".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(FinnhubProvider::new(&config("not a url")).is_err());
    }

    #[test]
    fn test_response_success_range() {
        let ok = UpstreamResponse { status: 200, body: String::new() };
        let err = UpstreamResponse { status: 429, body: String::new() };
        assert!(ok.is_success());
        assert!(!err.is_success());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_fault() {
        // 端口 9 (discard) 通常无人监听
        let provider = FinnhubProvider::new(&config("http://127.0.0.1:9/api/v1")).unwrap();
        let result = provider.fetch_quote("AAPL", "secret").await;
        match result {
            Err(UpstreamFault::Transport(msg)) => assert!(!msg.contains("secret")),
            Err(UpstreamFault::Timeout) => {}
            other => panic!("期望传输错误，实际: {:?}", other),
        }
    }
}
