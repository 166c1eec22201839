//! 行情网关服务
//!
//! 为投研看板提供近实时股票行情的 RESTful API 服务
//! 数据来源：Finnhub，进程内按代码缓存 10 秒

mod config;     // 配置加载
mod handlers;   // HTTP 请求处理器
mod models;     // 数据模型定义
mod services;   // 业务逻辑服务

use actix_web::{web, App, HttpServer, middleware::Logger};
use env_logger::Env;
use std::sync::Arc;

use crate::config::{AppConfig, API_KEY_ENV};
use crate::services::quote::{FinnhubProvider, QuoteCache, QuoteGateway};

/// 应用程序入口
///
/// 加载配置，构造共享缓存与网关，启动 HTTP 服务器
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let (config, source) = AppConfig::load()?;

    // 初始化日志系统，默认日志级别取自配置
    env_logger::init_from_env(Env::default().default_filter_or(config.log.level.as_str()));

    match source {
        Some(path) => log::info!("从 {} 加载配置成功", path),
        None => log::info!("未找到配置文件，使用默认配置"),
    }

    let provider = Arc::new(FinnhubProvider::new(&config.upstream)?);
    let cache = Arc::new(QuoteCache::new(config.cache.ttl(), config.cache.max_entries));
    let gateway = web::Data::new(
        QuoteGateway::new(cache, provider, config.upstream.credential())
            .with_timeout(config.upstream.timeout())
            .with_single_flight(config.cache.single_flight),
    );

    if !gateway.has_credential() {
        log::warn!("未设置 {}，行情请求将返回配置错误", API_KEY_ENV);
    }

    let bind_addr = config.bind_addr();
    log::info!(
        "启动行情网关服务 {} (缓存 {}ms, 合并请求: {})",
        bind_addr,
        gateway.cache().ttl_ms(),
        config.cache.single_flight
    );

    // 创建并启动 HTTP 服务器
    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(gateway.clone())
            .wrap(Logger::default())  // 添加请求日志中间件
            .configure(handlers::config)  // 配置路由
    });
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server.bind(bind_addr)?.run().await?;
    Ok(())
}
