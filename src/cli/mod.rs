// CLI module - Built-in commands
pub mod config;
pub mod help;

pub use config::{config_registration, ConfigCommand};
pub use help::{help_registration, HelpCommand};
