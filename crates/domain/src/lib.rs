pub mod config;
pub mod sanitize;
pub mod trace;
pub mod types;
