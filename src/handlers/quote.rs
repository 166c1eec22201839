//! 行情接口处理器
//!
//! ## API 列表
//! - GET /quote?symbol=XYZ - 获取单只股票实时行情
//! - GET /quote/{symbol} - 同上，代码取自路径
//!
//! 所有行情响应带 no-store 头，禁止任何中间层缓存

use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpResponse, Result};

use crate::models::{ApiResponse, Quote, QuoteQuery};
use crate::services::quote::{QuoteError, QuoteGateway, UpstreamFault};

pub async fn get_quote(
    gateway: web::Data<QuoteGateway>,
    query: web::Query<QuoteQuery>,
) -> Result<HttpResponse> {
    // 缺少参数与空白代码同等处理
    let symbol = query.into_inner().symbol.unwrap_or_default();
    Ok(quote_response(gateway.get_quote(&symbol).await))
}

pub async fn get_quote_by_path(
    gateway: web::Data<QuoteGateway>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let symbol = path.into_inner();
    Ok(quote_response(gateway.get_quote(&symbol).await))
}

/// 错误对应的 HTTP 状态码
pub fn error_status(err: &QuoteError) -> StatusCode {
    match err {
        QuoteError::InvalidSymbol => StatusCode::BAD_REQUEST,
        QuoteError::MissingCredential => StatusCode::INTERNAL_SERVER_ERROR,
        QuoteError::NoData { .. } => StatusCode::NOT_FOUND,
        QuoteError::Upstream(UpstreamFault::Status(status)) => StatusCode::from_u16(*status)
            .ok()
            .filter(|s| s.is_client_error() || s.is_server_error())
            .unwrap_or(StatusCode::BAD_GATEWAY),
        QuoteError::Upstream(UpstreamFault::Timeout) => StatusCode::GATEWAY_TIMEOUT,
        QuoteError::Upstream(_) => StatusCode::BAD_GATEWAY,
    }
}

fn quote_response(result: std::result::Result<Quote, QuoteError>) -> HttpResponse {
    match result {
        Ok(quote) => no_store(StatusCode::OK).json(ApiResponse::success(quote)),
        Err(err) => no_store(error_status(&err)).json(ApiResponse::<Quote>::quote_error(&err)),
    }
}

fn no_store(status: StatusCode) -> actix_web::HttpResponseBuilder {
    let mut builder = HttpResponse::build(status);
    builder
        .insert_header((header::CACHE_CONTROL, "no-store, max-age=0"))
        .insert_header((header::PRAGMA, "no-cache"))
        .insert_header(("CDN-Cache-Control", "no-store"));
    builder
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/quote")
            .route("", web::get().to(get_quote))
            .route("/{symbol}", web::get().to(get_quote_by_path))
    );
}
