//! Offline threading ids: millisecond timestamp in the high bits, 22 random
//! bits in the low bits.
//!
//! Ids issued within the same millisecond are ordered only by chance. They
//! are a de-duplication key for the upstream service, not a sequence number.

use std::time::{SystemTime, UNIX_EPOCH};

/// Number of low bits filled from the random source.
pub const RANDOM_BITS: u32 = 22;
const RANDOM_MASK: u64 = (1 << RANDOM_BITS) - 1;

/// Packs a millisecond timestamp and a random value into an offline threading id.
///
/// The shift is performed in 128-bit space and truncated to 64 bits, so
/// timestamp bits shifted past bit 63 are discarded.
#[must_use]
pub fn pack_offline_id(timestamp_ms: u64, random: u64) -> u64 {
    let shifted = (u128::from(timestamp_ms) << RANDOM_BITS) | u128::from(random & RANDOM_MASK);
    (shifted & u128::from(u64::MAX)) as u64
}

/// Generates a fresh offline threading id as a decimal string.
#[must_use]
pub fn generate_offline_threading_id() -> String {
    pack_offline_id(current_timestamp_ms(), rand::random::<u64>()).to_string()
}

fn current_timestamp_ms() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    u64::try_from(now.as_millis()).unwrap_or(u64::MAX)
}
