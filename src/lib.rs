pub mod client;
pub mod config;
pub mod error;
pub mod manager;
pub mod server;
pub mod shutdown;
