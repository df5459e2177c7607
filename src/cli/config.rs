use crate::core::argspec::ArgSpec;
use crate::core::command::{Command, Registration};
use crate::core::context::Context;
use crate::domain::error::{CliError, CliResult};
use std::io::Write;

/// Built-in `config` command
#[derive(Debug, Default)]
pub struct ConfigCommand;

/// Registration of the built-in `config` command
pub fn config_registration() -> Registration {
    Registration::new(
        "config",
        "Show or update configuration.",
        "Options are named SECTION.OPTION. Give a VALUE to set an option, \
         --remove to delete it, or neither to show it.",
        ConfigCommand::default,
    )
    .args([
        ArgSpec::pair(
            ["--list", "-l"],
            [("action", "store_true"), ("help", "list all configuration options")],
        ),
        ArgSpec::pair(
            ["name"],
            [("nargs", "?"), ("help", "name of option to show, set or remove")],
        ),
        ArgSpec::pair(
            ["--remove"],
            [("action", "store_true"), ("help", "remove the specified option")],
        ),
        ArgSpec::pair(
            ["value"],
            [("nargs", "?"), ("help", "set value of given option")],
        ),
        // values such as "--radix 2 add" are data, not flags
        ArgSpec::mutator(|cmd| cmd.mut_arg("value", |arg| arg.allow_hyphen_values(true))),
    ])
}

/// Split `section.option` at the last dot
fn split_name(name: &str) -> CliResult<(&str, &str)> {
    match name.rsplit_once('.') {
        Some((section, option)) if !section.is_empty() && !option.is_empty() => {
            Ok((section, option))
        }
        _ => Err(CliError::warning("Invalid configuration option.")),
    }
}

impl Command for ConfigCommand {
    fn invoke(&mut self, ctx: &mut Context<'_>) -> CliResult<()> {
        let config = ctx
            .config
            .ok_or_else(|| CliError::warning("Configuration not available."))?;
        let args = ctx.args;
        let mut store = config.lock();

        if args.get_flag("list") {
            for section in store.sections() {
                for (option, value) in store.items(section).into_iter().flatten() {
                    writeln!(ctx.out(), "{}.{}={}", section, option, value)?;
                }
            }
            return Ok(());
        }

        let name = args
            .get_str("name")
            .ok_or_else(|| CliError::warning("No configuration option given."))?;
        let (section, option) = split_name(name)?;

        if args.get_flag("remove") {
            if store.remove_option(section, option).is_none() {
                return Err(CliError::warning(format!(
                    "No such configuration option: {}",
                    name
                )));
            }
            if store.items(section).map_or(false, |options| options.is_empty()) {
                store.remove_section(section);
            }
            store.write()?;
            tracing::debug!(option = %name, "configuration option removed");
        } else if let Some(value) = args.get_str("value").filter(|v| !v.is_empty()) {
            if !store.has_section(section) {
                store.add_section(section)?;
            }
            let old = store.set(section, option, value)?;
            store.write()?;
            writeln!(
                ctx.out(),
                "{}: {} => {}",
                name,
                old.as_deref().unwrap_or("(none)"),
                value
            )?;
        } else {
            let current = store.get(section, option).ok_or_else(|| {
                CliError::warning(format!("No such configuration option: {}", name))
            })?;
            writeln!(ctx.out(), "{}: {}", name, current)?;
        }
        Ok(())
    }
}
