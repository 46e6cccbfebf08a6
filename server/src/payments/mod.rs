//! Payment integration
//!
//! - [`gateway`] - checkout-session creation boundary (external gateway)
//! - [`events`] - webhook event payload types
//! - [`webhook`] - signature verification + idempotent event processing

pub mod events;
pub mod gateway;
pub mod webhook;

pub use events::{CHARGE_REFUNDED, CHECKOUT_COMPLETED, KIND_DELIVERY, PAYMENT_FAILED};
pub use gateway::{CheckoutSession, CheckoutSessionRequest, HttpPaymentGateway, PaymentGateway};
pub use webhook::{ProcessOutcome, WebhookProcessor, sign_payload};
