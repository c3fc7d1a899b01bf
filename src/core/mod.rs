pub mod catalog;
pub mod config;
pub mod error;
pub mod request;
pub mod stats;
pub mod types;
