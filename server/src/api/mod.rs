//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`checkout`] - 购物车下单接口
//! - [`webhooks`] - 支付网关回调接口
//! - [`screenshot_orders`] - 截图订单接口
//! - [`deliveries`] - 配送请求接口
//! - [`menu`] - 菜单批量管理接口

pub mod checkout;
pub mod deliveries;
pub mod health;
pub mod menu;
pub mod screenshot_orders;
pub mod webhooks;
