//! services/api/src/auth/mod.rs
//!
//! The credential store: password hashing/verification and signed-token
//! issuance/verification. Both halves are pure functions over their inputs so
//! they can be tested without any running server.

pub mod password;
pub mod token;

pub use token::Claims;
