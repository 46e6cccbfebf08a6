//! Waypoint Server - "顺路带" 履约核心服务
//!
//! # 架构概述
//!
//! 本模块是履约核心的主入口，提供以下核心功能：
//!
//! - **费率估算** (`pricing`): 地理路由 + 距离计价
//! - **状态机** (`fulfillment`): 订单/配送/截图订单的唯一流转入口
//! - **支付回调** (`payments`): 签名验证与幂等事件处理
//! - **司机广播** (`notify`): 可用司机的原子批量通知
//! - **请求限流** (`ratelimit`): 注入时钟的固定窗口限流
//! - **批量变更** (`bulk`): 分块菜单批量更新/删除
//!
//! # 模块结构
//!
//! ```text
//! server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # JWT 验证、角色
//! ├── api/           # HTTP 路由和处理器
//! ├── routes/        # 路由组装与中间件
//! ├── db/            # 文档存储边界与仓储层
//! ├── pricing/       # 费率估算
//! ├── fulfillment/   # 状态机
//! ├── payments/      # 网关客户端与回调处理
//! ├── notify/        # 司机通知广播
//! ├── ratelimit/     # 请求限流
//! ├── bulk/          # 批量变更
//! ├── audit/         # 审计日志
//! └── utils/         # 日志、校验工具
//! ```

pub mod api;
pub mod audit;
pub mod auth;
pub mod bulk;
pub mod core;
pub mod db;
pub mod fulfillment;
pub mod notify;
pub mod payments;
pub mod pricing;
pub mod ratelimit;
pub mod routes;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService, Role};
pub use core::{Config, Server, ServerState};
pub use utils::{AppError, AppResponse, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
