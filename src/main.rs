// calculator - clikit demo program
use anyhow::anyhow;
use clikit::{
    logging, AllowedSections, ArgSpec, CliError, CliResult, Command, ConfigCache, Context,
    Dispatcher, DispatcherOptions, Registration,
};
use std::io::Write;
use std::path::PathBuf;

const DEFAULT_CONFIG_PATH: &str = "~/.calculator.ini";
const CONFIG_ENV: &str = "CALCULATOR_CONFIG";

#[derive(Debug, Clone, Copy)]
enum Operation {
    Add,
    Sub,
}

impl Operation {
    fn apply(self, a: i64, b: i64) -> Option<i64> {
        match self {
            Operation::Add => a.checked_add(b),
            Operation::Sub => a.checked_sub(b),
        }
    }
}

/// Folds its inputs with one arithmetic operation
struct Calculate {
    op: Operation,
}

impl Command for Calculate {
    fn invoke(&mut self, ctx: &mut Context<'_>) -> CliResult<()> {
        let radix = radix(ctx)?;
        let inputs = ctx.args.get_many::<String>("inputs").unwrap_or_default();

        let mut values = inputs.iter().map(|input| {
            i64::from_str_radix(input, radix).map_err(|e| {
                CliError::warning(format!("Invalid number '{}' in radix {}: {}", input, radix, e))
            })
        });
        let first = values
            .next()
            .ok_or_else(|| CliError::warning("No inputs given."))??;
        let op = self.op;
        let result = values.try_fold(first, |acc, value| {
            op.apply(acc, value?)
                .ok_or_else(|| CliError::from(anyhow!("{:?} overflowed", op)))
        })?;

        writeln!(ctx.out(), "{}", result)?;
        Ok(())
    }
}

/// `--radix`, else `calculator.radix` from the config, else 10
fn radix(ctx: &Context<'_>) -> CliResult<u32> {
    let radix = match ctx.args.get_one::<i64>("radix") {
        Some(radix) => *radix,
        None => match ctx.config.and_then(|c| c.lock().get("calculator", "radix").map(String::from)) {
            Some(value) => value.parse::<i64>().map_err(|_| {
                CliError::warning(format!("Invalid calculator.radix in configuration: {}", value))
            })?,
            None => 10,
        },
    };

    match u32::try_from(radix) {
        Ok(radix @ 2..=36) => Ok(radix),
        _ => Err(CliError::warning(format!("Radix must be between 2 and 36, got {}", radix))),
    }
}

fn calculation(name: &str, summary: &str, op: Operation) -> Registration {
    Registration::new(
        name,
        summary,
        "Inputs are read in the radix given by --radix, or calculator.radix \
         from the configuration, or 10. The result is printed in decimal.",
        move || Calculate { op },
    )
    .arg(ArgSpec::pair(
        ["inputs"],
        [("nargs", "+"), ("metavar", "INPUT"), ("help", "values to combine")],
    ))
    .arg(ArgSpec::mutator(|cmd| {
        cmd.mut_arg("inputs", |arg| arg.allow_negative_numbers(true))
    }))
}

fn main() {
    if let Err(e) = logging::init_logging(false) {
        eprintln!("Warning: {}", e);
    }

    let path = std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let cache = ConfigCache::new(AllowedSections::new(["alias", "calculator"]));
    let config = match cache.get_config(&path) {
        Ok(config) => config,
        Err(e) => e.exit(),
    };

    let mut dispatcher = Dispatcher::with_options(DispatcherOptions {
        name: Some("calculator".to_string()),
        about: Some("Add and subtract integers in any radix.".to_string()),
        config: Some(config),
        global_args: vec![ArgSpec::pair(
            ["--radix", "-r"],
            [
                ("type", "int"),
                ("metavar", "RADIX"),
                ("help", "radix of the inputs (2-36)"),
            ],
        )],
        with_help: true,
        with_config: true,
    });

    for registration in [
        calculation("add", "Add values.", Operation::Add),
        calculation("sub", "Subtract values.", Operation::Sub),
    ] {
        if let Err(e) = dispatcher.add_command(registration) {
            e.exit();
        }
    }

    if let Err(e) = dispatcher.dispatch() {
        e.exit();
    }
}
