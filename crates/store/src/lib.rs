//! `lectern-store` — storage implementations.
//!
//! Two backends implement the auth crate's [`TokenStore`] port plus the wider
//! [`AppStore`] CRUD surface: [`MemoryStore`] (tests/dev) and [`PgStore`]
//! (production, PostgreSQL via sqlx).

pub mod app_store;
pub mod memory;
pub mod postgres;

pub use app_store::AppStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;

pub use lectern_auth::{StoreError, TokenStore};
