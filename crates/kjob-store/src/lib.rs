//! Metadata and secret store implementations.
//!
//! - [`MemoryStore`]: process-local maps, used in tests and local runs.
//! - [`RedisStore`]: JSON values in Redis (feature `redis`).
mod memory;
pub use memory::MemoryStore;

#[cfg(feature = "redis")]
mod redis_store;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
