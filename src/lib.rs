pub mod client;
pub mod config;
pub mod errors;
pub mod generation;
pub mod schema;
pub mod story;

pub mod database;
pub mod server;
pub mod services;
