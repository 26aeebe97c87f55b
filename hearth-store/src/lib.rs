pub mod app_config;
pub mod database;
pub mod gateway;
pub mod memory;
pub mod pg;
pub mod redis_repo;

pub use database::DbClient;
pub use gateway::HttpCardGateway;
pub use memory::MemoryStore;
pub use pg::PgStore;
pub use redis_repo::RedisClient;
