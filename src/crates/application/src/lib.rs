pub mod command;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod deep_link;
pub mod error;
pub mod event;
pub mod notice;
pub mod playback;
pub mod query;
pub mod shared;
pub mod store;
