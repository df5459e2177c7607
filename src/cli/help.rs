use crate::core::argspec::ArgSpec;
use crate::core::command::{Command, Registration};
use crate::core::context::Context;
use crate::domain::error::CliResult;
use clap::error::ErrorKind;
use std::io::Write;

/// Built-in `help` command
#[derive(Debug, Default)]
pub struct HelpCommand;

/// Registration of the built-in `help` command
pub fn help_registration() -> Registration {
    Registration::new("help", "Show help.", "", HelpCommand::default).arg(ArgSpec::pair(
        ["subcommand"],
        [
            ("metavar", "SUBCOMMAND"),
            ("nargs", "?"),
            ("help", "show help for subcommand"),
        ],
    ))
}

impl Command for HelpCommand {
    fn invoke(&mut self, ctx: &mut Context<'_>) -> CliResult<()> {
        let args = ctx.args;
        let aliases = ctx.aliases;

        let Some(subcommand) = args.get_str("subcommand") else {
            return render_help(ctx, None);
        };

        if let Some(expansion) = aliases.get(subcommand) {
            writeln!(ctx.out(), "'{}': alias for {}", subcommand, expansion)?;
        } else if !ctx.commands.contains_key(subcommand) {
            writeln!(ctx.out(), "unknown subcommand: '{}'", subcommand)?;
        } else {
            render_help(ctx, Some(subcommand))?;
        }
        Ok(())
    }
}

/// Let the full parser render its `--help` output, for the whole program or
/// one subcommand, into the command output.
fn render_help(ctx: &mut Context<'_>, subcommand: Option<&str>) -> CliResult<()> {
    let parser = ctx.parser.clone();
    let argv = std::iter::once(parser.get_name().to_string())
        .chain(subcommand.map(String::from))
        .chain(std::iter::once("--help".to_string()));

    match parser.try_get_matches_from(argv) {
        Err(e) if e.kind() == ErrorKind::DisplayHelp => {
            write!(ctx.out(), "{}", e.render())?;
            Ok(())
        }
        Err(e) => Err(e.into()),
        Ok(_) => Ok(()),
    }
}
