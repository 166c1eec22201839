//! 通用 API 响应模型
//! 
//! 定义统一的 API 响应格式

use serde::{Deserialize, Serialize};
use chrono::Utc;

use crate::services::quote::QuoteError;

/// 统一 API 响应结构
/// 
/// 所有接口返回统一格式，包含：
/// - success: 请求是否成功
/// - data: 响应数据（成功时有值）
/// - message: 响应消息
/// - timestamp: 响应时间戳（UTC）
/// - error: 失败时的错误详情
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// 请求是否成功
    pub success: bool,
    /// 响应数据
    pub data: Option<T>,
    /// 响应消息
    pub message: String,
    /// 响应时间戳（ISO 8601 格式）
    pub timestamp: String,
    /// 错误详情（仅失败时存在）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

/// 错误详情
///
/// 前端据此区分“换个代码”与“服务不可用”
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorDetail {
    /// 错误类别：invalid_symbol / missing_credential / upstream_error / no_data
    pub error_kind: String,
    /// 上游 HTTP 状态码
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    /// 无数据的股票代码
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl From<&QuoteError> for ErrorDetail {
    fn from(err: &QuoteError) -> Self {
        let symbol = match err {
            QuoteError::NoData { symbol } => Some(symbol.clone()),
            _ => None,
        };
        Self {
            error_kind: err.kind().to_string(),
            upstream_status: err.upstream_status(),
            symbol,
        }
    }
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    /// 
    /// # 参数
    /// - data: 响应数据
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            error: None,
        }
    }

    /// 创建错误响应
    /// 
    /// # 参数
    /// - message: 错误信息
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
            timestamp: Utc::now().to_rfc3339(),
            error: None,
        }
    }

    /// 由行情错误创建错误响应，附带错误类别
    pub fn quote_error(err: &QuoteError) -> Self {
        Self {
            error: Some(ErrorDetail::from(err)),
            ..Self::error(err.to_string())
        }
    }
}
