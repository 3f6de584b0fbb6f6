//! crates/tutor_core/src/quota.rs
//!
//! Guest-quota derivation. The allowance is always re-derived from the live
//! message count, never cached, so every consumer agrees with the rows that
//! are actually persisted.

/// Default maximum number of messages an unauthenticated guest may send.
pub const MAX_GUEST_MESSAGES: u32 = 5;

/// Derives the remaining allowance from the number of messages a guest has
/// already sent. Never goes below zero.
pub fn remaining_messages(used: i64, max: u32) -> u32 {
    let used = u32::try_from(used.max(0)).unwrap_or(u32::MAX);
    max.saturating_sub(used)
}
