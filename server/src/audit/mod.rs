//! 审计日志
//!
//! The core only depends on the narrow [`AuditSink`] trait; a durable
//! backend can be substituted without touching call sites. The default
//! sink writes structured tracing events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 审计操作类型（枚举，非自由文本）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // ═══ 支付事件 ═══
    /// Webhook 事件已处理
    WebhookProcessed,
    /// Webhook 事件缺少路由元数据，需人工对账
    WebhookAmbiguous,
    /// Webhook 签名验证失败
    WebhookSignatureRejected,

    // ═══ 履约 ═══
    /// 状态流转
    StatusTransition,
    /// 管理员强制流转
    ForcedTransition,
    /// 司机通知广播
    DriversNotified,

    // ═══ 管理操作 ═══
    /// 批量菜单变更
    BulkMutation,
    /// 截图订单状态更新
    ScreenshotOrderUpdated,
}

/// One audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: String,
    pub operator_id: Option<String>,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        action: AuditAction,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            action,
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            operator_id: None,
            details: serde_json::Value::Null,
            timestamp: Utc::now(),
        }
    }

    pub fn with_operator(mut self, operator_id: impl Into<String>) -> Self {
        self.operator_id = Some(operator_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Narrow audit interface consumed by the core
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record one audit event; failures are the sink's problem, never the
    /// caller's control flow
    async fn record(&self, entry: AuditEntry);
}

/// Default sink: structured tracing events under the `audit` target
#[derive(Debug, Default, Clone)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: AuditEntry) {
        tracing::info!(
            target: "audit",
            action = ?entry.action,
            resource_type = %entry.resource_type,
            resource_id = %entry.resource_id,
            operator_id = entry.operator_id.as_deref().unwrap_or("-"),
            details = %entry.details,
            "audit event"
        );
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Test sink capturing entries in memory
    #[derive(Debug, Default)]
    pub struct RecordingAuditSink {
        pub entries: Mutex<Vec<AuditEntry>>,
    }

    #[async_trait]
    impl AuditSink for RecordingAuditSink {
        async fn record(&self, entry: AuditEntry) {
            self.entries.lock().unwrap().push(entry);
        }
    }
}
