//! User Profile Model

use serde::{Deserialize, Serialize};

/// Minimal user projection owned by the fulfillment core
///
/// Identity itself lives with the external identity provider; the core
/// only keeps the loyalty spin counter, merged increment-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    /// Loyalty spins earned, one per completed checkout session
    #[serde(default)]
    pub spins: u64,
}
