//! Tollgate Types - Shared domain types
//!
//! Wire-level types shared between the auth core and whatever transport
//! exposes it:
//! - Session identifiers and token kinds
//! - Token pairs and login/identity responses

pub mod session;
pub mod user;

pub use session::*;
pub use user::*;
