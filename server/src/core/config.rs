use crate::auth::JwtConfig;

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | WEBHOOK_SECRET | (dev fallback) | 支付回调签名密钥 |
/// | ROUTE_PROVIDER_URL | http://localhost:8090 | 地理路由服务地址 |
/// | PAYMENT_GATEWAY_URL | (未配置) | 支付网关地址 |
/// | PAYMENT_GATEWAY_API_KEY | (未配置) | 支付网关密钥 |
/// | REQUEST_TIMEOUT_MS | 10000 | 上游请求超时(毫秒) |
/// | UPLOAD_DIR | uploads | 截图上传目录 |
/// | RATE_LIMIT_SWEEP_MS | 60000 | 限流窗口清理间隔(毫秒) |
///
/// # 示例
///
/// ```ignore
/// HTTP_PORT=8080 PAYMENT_GATEWAY_URL=https://gw.example.com cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 支付回调签名密钥 (与网关一致)
    pub webhook_secret: String,
    /// 地理编码/路由服务地址
    pub route_provider_url: String,
    /// 支付网关地址；未配置时下单接口返回 503
    pub payment_gateway_url: Option<String>,
    /// 支付网关 API 密钥
    pub payment_gateway_api_key: Option<String>,
    /// 上游 HTTP 请求超时 (毫秒)
    pub request_timeout_ms: u64,
    /// 截图上传目录
    pub upload_dir: String,
    /// 限流窗口后台清理间隔 (毫秒)
    pub rate_limit_sweep_ms: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            jwt: JwtConfig::from_env(),
            webhook_secret: std::env::var("WEBHOOK_SECRET")
                .unwrap_or_else(|_| "dev-only-webhook-secret".into()),
            route_provider_url: std::env::var("ROUTE_PROVIDER_URL")
                .unwrap_or_else(|_| "http://localhost:8090".into()),
            payment_gateway_url: std::env::var("PAYMENT_GATEWAY_URL").ok(),
            payment_gateway_api_key: std::env::var("PAYMENT_GATEWAY_API_KEY").ok(),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10_000),
            upload_dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into()),
            rate_limit_sweep_ms: std::env::var("RATE_LIMIT_SWEEP_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(60_000),
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
