//! Job and task persistence: the store contracts plus Postgres and
//! in-memory backends.

pub mod db;
pub mod error;
pub mod memory;
pub mod pg;
pub mod store;

pub use db::init_pg_pool;
pub use error::StoreError;
pub use memory::{MemoryStore, MemoryTx};
pub use pg::PgStore;
pub use store::{JobStore, Store, TaskStore, Transactional};
