//! 行情服务模块
//!
//! 缓存 + 上游数据源 + 网关，对外只暴露网关和错误类型

pub mod cache;
pub mod clock;
mod coalesce;
pub mod error;
pub mod finnhub;
pub mod gateway;

// 重新导出常用类型，保持对外接口一致
pub use cache::QuoteCache;
pub use error::{QuoteError, UpstreamFault};
pub use finnhub::{FinnhubProvider, QuoteProvider};
pub use gateway::QuoteGateway;
