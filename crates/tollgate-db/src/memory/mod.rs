//! In-memory repository implementations
//!
//! Process-local backends for single-node deployments and tests. State is
//! lost on restart.

mod session;
mod user;

pub use session::MemorySessionRepository;
pub use user::MemoryUserRepository;
