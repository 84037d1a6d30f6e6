pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod fixtures;
pub mod metrics;
pub mod stats;
