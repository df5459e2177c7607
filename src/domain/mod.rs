// Domain module - Error model and config data model
pub mod config;
pub mod error;
