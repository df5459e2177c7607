// Core module - Argument specs, commands and dispatch
pub mod argspec;
pub mod command;
pub mod context;
pub mod dispatcher;

pub use argspec::ArgSpec;
pub use command::{details_of, summary_of, Command, Registration};
pub use context::{Context, ParsedArgs};
pub use dispatcher::{expand_aliases, format_alias_epilog, Dispatcher, DispatcherOptions};
