//! Tollgate DB - Storage abstractions
//!
//! Repository traits for session records and user credential rows, with an
//! in-memory backend and a SQLx/PostgreSQL backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use tollgate_db::{create_pool, pg::{ensure_schema, Repositories}};
//!
//! let pool = create_pool("postgres://localhost/tollgate").await?;
//! ensure_schema(&pool).await?;
//! let repos = Repositories::new(pool);
//!
//! let user = repos.users.find_by_username("alice").await?;
//! ```

pub mod error;
pub mod memory;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
pub use memory::{MemorySessionRepository, MemoryUserRepository};
pub use models::*;
pub use pool::{create_pool, DbPool};
pub use repo::*;
