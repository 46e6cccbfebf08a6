//! Waypoint Shared - 核心领域模型与统一错误体系
//!
//! This crate holds everything both the server and its clients agree on:
//!
//! - **Models** (`models`): orders, delivery requests, screenshot orders,
//!   drivers, menu items, notification records
//! - **Statuses** (`models::status`): the fulfillment state machine's
//!   tagged status types and transition tables
//! - **Errors** (`error`): [`AppError`] and the [`AppResponse`] envelope
//! - **Types** (`types`): addresses, priority tiers, money rounding

pub mod error;
pub mod models;
pub mod types;

pub use error::{AppError, AppResponse, AppResult, ok, ok_with_message};
pub use types::{Address, PriorityTier, round_money};
