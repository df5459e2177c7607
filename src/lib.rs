//! clikit Library
//!
//! Small command-line framework: register commands with their own
//! argument definitions, let users define aliases for them, and keep
//! simple key/value configuration in a file.
//!
//! ```no_run
//! use clikit::{ArgSpec, CliResult, Context, Dispatcher, Registration};
//! use std::io::Write;
//!
//! fn greet(ctx: &mut Context<'_>) -> CliResult<()> {
//!     let name = ctx.args.get_str("name").unwrap_or("world").to_string();
//!     writeln!(ctx.out(), "hello {}", name)?;
//!     Ok(())
//! }
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher
//!     .add_command(
//!         Registration::new("greet", "Say hello.", "", || greet)
//!             .arg(ArgSpec::pair(["name"], [("nargs", "?")])),
//!     )
//!     .unwrap();
//! if let Err(e) = dispatcher.dispatch() {
//!     e.exit();
//! }
//! ```

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use cli::{ConfigCommand, HelpCommand};
pub use self::core::{ArgSpec, Command, Context, Dispatcher, DispatcherOptions, ParsedArgs, Registration};
pub use domain::error::{CliError, CliResult};
pub use infrastructure::config::{
    AllowedSections, AnySection, ConfigCache, ConfigStore, SectionValidator, SharedConfig,
};
pub use infrastructure::logging;
