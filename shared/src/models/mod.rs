//! Domain Models
//!
//! Serializable record types shared between the server, its clients and
//! the document-store boundary.

pub mod delivery;
pub mod driver;
pub mod menu_item;
pub mod notification;
pub mod order;
pub mod screenshot;
pub mod status;
pub mod user;

pub use delivery::{DeliveryRequest, FeeEstimate};
pub use driver::Driver;
pub use menu_item::{MenuItem, MenuItemPatch};
pub use notification::NotificationRecord;
pub use order::{LineItem, Order};
pub use screenshot::{ScreenshotOrder, WorkflowFlags};
pub use status::{FulfillmentStatus, ScreenshotStatus};
pub use user::UserProfile;
