//! 行情网关错误类型
//!
//! 四类错误各自独立，调用方据此区分“换个代码试试”与“服务不可用”

use thiserror::Error;

/// 上游故障细分
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamFault {
    /// 上游返回非 2xx 状态码
    #[error("upstream returned HTTP {0}")]
    Status(u16),

    /// 超过配置的请求超时
    #[error("upstream request timed out")]
    Timeout,

    /// 连接层失败（DNS、拒绝连接等）
    #[error("upstream transport failure: {0}")]
    Transport(String),

    /// 响应体不是合法 JSON
    #[error("upstream returned malformed body: {0}")]
    Malformed(String),
}

/// 行情查询错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// 代码去空白后为空
    #[error("Missing symbol query parameter ?symbol=XYZ")]
    InvalidSymbol,

    /// 未配置上游 API 凭证
    #[error("FINNHUB_API_KEY is not configured on the server")]
    MissingCredential,

    #[error("Upstream quote request failed: {0}")]
    Upstream(UpstreamFault),

    /// 上游无该代码数据（退市、无效代码）
    #[error("No quote data for symbol {symbol}")]
    NoData { symbol: String },
}

impl QuoteError {
    /// 稳定的错误类别标识，供前端分支判断
    pub fn kind(&self) -> &'static str {
        match self {
            QuoteError::InvalidSymbol => "invalid_symbol",
            QuoteError::MissingCredential => "missing_credential",
            QuoteError::Upstream(_) => "upstream_error",
            QuoteError::NoData { .. } => "no_data",
        }
    }

    /// 上游状态码（仅 `Upstream(Status)` 有值）
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            QuoteError::Upstream(UpstreamFault::Status(status)) => Some(*status),
            _ => None,
        }
    }
}
