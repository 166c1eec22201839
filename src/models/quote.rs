//! 行情数据模型
//!
//! 网关对外返回的统一行情结构

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单只股票的实时行情
///
/// 所有次要数值字段缺失时填 0，调用方只需判断 `price`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// 规范化后的股票代码（大写、去空白），也是缓存键
    pub symbol: String,
    /// 最新成交价（恒为正数）
    pub price: f64,
    /// 涨跌额
    pub change: f64,
    /// 涨跌幅（百分比）
    pub change_percent: f64,
    /// 最高价
    pub high: f64,
    /// 最低价
    pub low: f64,
    /// 开盘价
    pub open: f64,
    /// 昨收价
    pub previous_close: f64,
    /// 网关抓取时间（非上游时间戳）
    pub as_of: DateTime<Utc>,
}

/// 行情查询参数
#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    /// 股票代码
    pub symbol: Option<String>,
}
