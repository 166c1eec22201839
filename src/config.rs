//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置，上游凭证可由环境变量覆盖

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 上游凭证环境变量
pub const API_KEY_ENV: &str = "FINNHUB_API_KEY";

/// 配置文件查找顺序
const CONFIG_PATHS: [&str; 2] = ["config.json", "config/config.json"];

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// 上游行情接口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Finnhub API 根地址
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API Key（为空则行情请求返回 MissingCredential）
    #[serde(default)]
    pub api_key: String,
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// 行情缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 缓存时效（毫秒）
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
    /// 最大条目数（0 表示不限制）
    #[serde(default)]
    pub max_entries: usize,
    /// 是否合并同一代码的并发请求
    #[serde(default = "default_single_flight")]
    pub single_flight: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 上游配置
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// 缓存配置
    #[serde(default)]
    pub cache: CacheConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_base_url() -> String { "https://finnhub.io/api/v1".to_string() }
fn default_timeout() -> u64 { 8 }
fn default_connect_timeout() -> u64 { 3 }
fn default_ttl_ms() -> u64 { 10_000 }
fn default_single_flight() -> bool { true }
fn default_log_level() -> String { "info".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            max_entries: 0,
            single_flight: default_single_flight(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl UpstreamConfig {
    /// 有效凭证，空白视为未配置
    pub fn credential(&self) -> Option<String> {
        let key = self.api_key.trim();
        (!key.is_empty()).then(|| key.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl AppConfig {
    /// 从 JSON 字符串解析配置
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: AppConfig = serde_json::from_str(content)?;
        Ok(config)
    }

    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// 加载配置，优先从文件，未找到则使用默认值，最后应用环境变量
    ///
    /// 返回配置及其来源文件；此时日志尚未初始化，由调用方记录来源
    pub fn load() -> anyhow::Result<(Self, Option<&'static str>)> {
        let source = CONFIG_PATHS.into_iter().find(|path| Path::new(path).exists());

        let mut config = match source {
            Some(path) => Self::from_file(path)
                .map_err(|e| anyhow::anyhow!("加载配置文件 {} 失败: {}", path, e))?,
            None => Self::default(),
        };
        config.apply_api_key_override(std::env::var(API_KEY_ENV).ok());
        config.validate()?;

        Ok((config, source))
    }

    /// 校验配置取值，超时为 0 会让所有上游请求立即失败
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.upstream.timeout_secs == 0 {
            anyhow::bail!("upstream.timeout_secs 必须大于 0");
        }
        if self.upstream.connect_timeout_secs == 0 {
            anyhow::bail!("upstream.connect_timeout_secs 必须大于 0");
        }
        Ok(())
    }

    /// 环境变量中的非空凭证覆盖配置文件
    pub fn apply_api_key_override(&mut self, value: Option<String>) {
        if let Some(key) = value.filter(|k| !k.trim().is_empty()) {
            self.upstream.api_key = key;
        }
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
