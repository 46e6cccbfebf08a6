use std::sync::Arc;
use std::time::Duration;

use shared::{AppError, AppResult};

use crate::audit::{AuditSink, TracingAuditSink};
use crate::auth::JwtService;
use crate::bulk::BulkMutationProcessor;
use crate::core::Config;
use crate::db::{MemoryStore, StoreHandle};
use crate::fulfillment::FulfillmentService;
use crate::notify::NotificationFanout;
use crate::payments::{HttpPaymentGateway, PaymentGateway, WebhookProcessor};
use crate::pricing::{FeeEstimator, HttpRouteProvider, RouteProvider};
use crate::ratelimit::RateLimiterService;

/// 服务器状态 - 持有所有服务的共享引用
///
/// ServerState 是核心数据结构，持有所有服务的共享引用。
/// 使用 Arc 实现浅拷贝，克隆成本极低。
///
/// # 服务组件
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | store | 文档存储 |
/// | jwt_service | JWT 认证服务 |
/// | rate_limiter | 请求限流服务 |
/// | fulfillment | 订单/配送状态机 |
/// | estimator | 配送费估算 |
/// | fanout | 司机通知广播 |
/// | webhook | 支付回调处理 |
/// | bulk | 批量菜单变更 |
/// | gateway | 支付网关 (未配置时为 None) |
/// | audit | 审计日志 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub store: StoreHandle,
    pub jwt_service: Arc<JwtService>,
    pub rate_limiter: RateLimiterService,
    pub fulfillment: FulfillmentService,
    pub estimator: FeeEstimator,
    pub fanout: NotificationFanout,
    pub webhook: WebhookProcessor,
    pub bulk: BulkMutationProcessor,
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub audit: Arc<dyn AuditSink>,
}

impl ServerState {
    /// 手动构造服务器状态
    ///
    /// 集成测试用本方法注入假的路由/网关实现；
    /// 生产路径使用 [`ServerState::initialize`]。
    pub fn new(
        config: Config,
        store: StoreHandle,
        route_provider: Arc<dyn RouteProvider>,
        gateway: Option<Arc<dyn PaymentGateway>>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));
        let fulfillment = FulfillmentService::new(store.clone(), audit.clone());
        let fanout = NotificationFanout::new(store.clone(), audit.clone());
        let webhook = WebhookProcessor::new(
            config.webhook_secret.clone(),
            store.clone(),
            fulfillment.clone(),
            fanout.clone(),
            audit.clone(),
        );
        let bulk = BulkMutationProcessor::new(store.clone(), audit.clone());

        Self {
            config,
            store,
            jwt_service,
            rate_limiter: RateLimiterService::in_memory(),
            fulfillment,
            estimator: FeeEstimator::new(route_provider),
            fanout,
            webhook,
            bulk,
            gateway,
            audit,
        }
    }

    /// 初始化生产状态：内存文档存储 + HTTP 上游客户端
    pub async fn initialize(config: &Config) -> AppResult<Self> {
        let store: StoreHandle = Arc::new(MemoryStore::new());
        let timeout = Duration::from_millis(config.request_timeout_ms);

        let route_provider: Arc<dyn RouteProvider> = Arc::new(HttpRouteProvider::new(
            config.route_provider_url.clone(),
            timeout,
        )?);

        let gateway: Option<Arc<dyn PaymentGateway>> =
            match (&config.payment_gateway_url, &config.payment_gateway_api_key) {
                (Some(url), Some(key)) => Some(Arc::new(HttpPaymentGateway::new(
                    url.clone(),
                    key.clone(),
                    timeout,
                )?)),
                (Some(_), None) | (None, Some(_)) => {
                    return Err(AppError::internal(
                        "PAYMENT_GATEWAY_URL and PAYMENT_GATEWAY_API_KEY must be set together",
                    ));
                }
                (None, None) => {
                    tracing::warn!("payment gateway not configured; checkout will return 503");
                    None
                }
            };

        let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);
        Ok(Self::new(
            config.clone(),
            store,
            route_provider,
            gateway,
            audit,
        ))
    }
}
