//! 工具模块
//!
//! - [`logger`] - 日志初始化
//! - [`validation`] - 输入验证辅助函数

pub mod logger;
pub mod validation;

pub use shared::{AppError, AppResponse, AppResult, ok, ok_with_message};
