pub mod repository;

pub mod event_bus;

pub mod id_generator;
pub use id_generator::SnowflakeIdGenerator;

pub mod fixture;
pub use fixture::Fixture;

pub mod config;
pub use config::AppConfigImpl;
