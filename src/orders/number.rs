//! Order number generation
//!
//! Millisecond timestamp plus a random six-digit suffix. Collisions are
//! negligible but not impossible; the manager re-derives on a unique-key
//! conflict from the store.

use chrono::Utc;
use rand::Rng;

/// Generate a candidate order number, e.g. `W1722470400123042917`
pub fn generate() -> String {
    let now_ms = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("W{}{:06}", now_ms, suffix)
}
