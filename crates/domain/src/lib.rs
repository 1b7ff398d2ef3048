pub mod agent;
pub mod config;
pub mod error;
pub mod finance;
pub mod stream;
pub mod tool;
