pub mod in_memory_lock;
pub mod redis_lock;

pub use in_memory_lock::InMemoryLockService;
pub use redis_lock::RedisLockService;
