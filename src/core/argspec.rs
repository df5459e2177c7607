//! Argument specifications and their adaptation onto a `clap::Command`.
//!
//! A spec is either a mutator closure that receives the parser builder
//! and returns it changed, or an argparse-style pair of names
//! (`["--radix"]`, `["inputs"]`) and keyword options
//! (`type = "int"`, `nargs = "+"`).

use crate::domain::error::{CliError, CliResult};
use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

type Mutator = Arc<dyn Fn(clap::Command) -> clap::Command + Send + Sync>;

/// One declared command-line argument
#[derive(Clone)]
pub enum ArgSpec {
    /// Arbitrary change to the parser builder
    Mutator(Mutator),
    /// Names plus keyword options, turned into one `clap::Arg`
    Pair {
        names: Vec<String>,
        options: BTreeMap<String, String>,
    },
}

impl fmt::Debug for ArgSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgSpec::Mutator(_) => f.write_str("ArgSpec::Mutator(..)"),
            ArgSpec::Pair { names, options } => f
                .debug_struct("ArgSpec::Pair")
                .field("names", names)
                .field("options", options)
                .finish(),
        }
    }
}

impl From<Arg> for ArgSpec {
    fn from(arg: Arg) -> Self {
        ArgSpec::mutator(move |cmd| cmd.arg(arg.clone()))
    }
}

impl ArgSpec {
    pub fn mutator<F>(f: F) -> Self
    where
        F: Fn(clap::Command) -> clap::Command + Send + Sync + 'static,
    {
        ArgSpec::Mutator(Arc::new(f))
    }

    pub fn pair<N, S, O, K, V>(names: N, options: O) -> Self
    where
        N: IntoIterator<Item = S>,
        S: Into<String>,
        O: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        ArgSpec::Pair {
            names: names.into_iter().map(Into::into).collect(),
            options: options
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Apply this spec to a parser builder
    pub fn apply(&self, cmd: clap::Command) -> CliResult<clap::Command> {
        match self {
            ArgSpec::Mutator(f) => Ok(f(cmd)),
            ArgSpec::Pair { names, options } => Ok(cmd.arg(build_arg(names, options)?)),
        }
    }
}

/// Apply every spec in order
pub fn apply_all(specs: &[ArgSpec], cmd: clap::Command) -> CliResult<clap::Command> {
    specs.iter().try_fold(cmd, |cmd, spec| spec.apply(cmd))
}

enum Names {
    Positional(String),
    Flags { longs: Vec<String>, shorts: Vec<char> },
}

fn classify_names(names: &[String]) -> CliResult<Names> {
    if names.is_empty() {
        return Err(CliError::ArgSpec("no argument names given".to_string()));
    }

    if names.iter().all(|n| !n.starts_with('-')) {
        return match names {
            [name] if !name.trim().is_empty() => Ok(Names::Positional(name.clone())),
            _ => Err(CliError::ArgSpec(format!(
                "a positional argument takes exactly one name: {:?}",
                names
            ))),
        };
    }

    let mut longs = Vec::new();
    let mut shorts = Vec::new();
    for name in names {
        if let Some(long) = name.strip_prefix("--") {
            if long.is_empty() || long.starts_with('-') {
                return Err(CliError::ArgSpec(format!("invalid option name '{}'", name)));
            }
            longs.push(long.to_string());
        } else if let Some(short) = name.strip_prefix('-') {
            let mut chars = short.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c != '-' => shorts.push(c),
                _ => return Err(CliError::ArgSpec(format!("invalid option name '{}'", name))),
            }
        } else {
            return Err(CliError::ArgSpec(format!(
                "cannot mix positional and option names: {:?}",
                names
            )));
        }
    }

    Ok(Names::Flags { longs, shorts })
}

fn build_arg(names: &[String], options: &BTreeMap<String, String>) -> CliResult<Arg> {
    let names = classify_names(names)?;
    let positional = matches!(names, Names::Positional(_));

    let id = match (&names, options.get("dest")) {
        (_, Some(dest)) => dest.clone(),
        (Names::Positional(name), None) => name.clone(),
        (Names::Flags { longs, shorts }, None) => match (longs.first(), shorts.first()) {
            (Some(long), _) => long.replace('-', "_"),
            (None, Some(short)) => short.to_string(),
            (None, None) => unreachable!("flag names are never empty"),
        },
    };

    let mut arg = Arg::new(id);
    if let Names::Flags { longs, shorts } = &names {
        let mut longs = longs.iter();
        if let Some(long) = longs.next() {
            arg = arg.long(long.clone());
        }
        for alias in longs {
            arg = arg.visible_alias(alias.clone());
        }
        let mut shorts = shorts.iter();
        if let Some(short) = shorts.next() {
            arg = arg.short(*short);
        }
        for alias in shorts {
            arg = arg.visible_short_alias(*alias);
        }
    }

    let action = match options.get("action").map(String::as_str) {
        None | Some("store") => ArgAction::Set,
        Some("append") => ArgAction::Append,
        Some("store_true") => ArgAction::SetTrue,
        Some("store_false") => ArgAction::SetFalse,
        Some("count") => ArgAction::Count,
        Some(other) => return Err(CliError::ArgSpec(format!("unknown action '{}'", other))),
    };
    let takes_values = action.takes_values();
    if positional && !takes_values {
        return Err(CliError::ArgSpec(
            "positional arguments must take a value".to_string(),
        ));
    }
    arg = arg.action(action);

    let mut required = positional && !options.contains_key("default");

    for (key, value) in options {
        match key.as_str() {
            "action" | "dest" => {}
            "help" => arg = arg.help(value.clone()),
            "metavar" => arg = arg.value_name(value.clone()),
            "default" => arg = arg.default_value(value.clone()),
            "required" => {
                required = value.parse::<bool>().map_err(|_| {
                    CliError::ArgSpec(format!("required must be true or false, got '{}'", value))
                })?
            }
            "nargs" | "type" | "choices" if !takes_values => {
                return Err(CliError::ArgSpec(format!(
                    "'{}' is not allowed for flag arguments",
                    key
                )))
            }
            "nargs" => match value.as_str() {
                "?" => {
                    if positional {
                        required = false;
                    } else {
                        arg = arg.num_args(0..=1);
                    }
                }
                "*" => {
                    required = false;
                    arg = arg.num_args(0..);
                }
                "+" => arg = arg.num_args(1..),
                n => {
                    let count = n.parse::<usize>().map_err(|_| {
                        CliError::ArgSpec(format!("invalid nargs '{}'", n))
                    })?;
                    if count == 0 {
                        return Err(CliError::ArgSpec("nargs must be at least 1".to_string()));
                    }
                    arg = arg.num_args(count);
                }
            },
            "type" => {
                if options.contains_key("choices") {
                    return Err(CliError::ArgSpec(
                        "choices cannot be combined with type".to_string(),
                    ));
                }
                arg = match value.as_str() {
                    "str" => arg,
                    "int" => arg
                        .value_parser(clap::value_parser!(i64))
                        .allow_negative_numbers(true),
                    "float" => arg
                        .value_parser(clap::value_parser!(f64))
                        .allow_negative_numbers(true),
                    other => {
                        return Err(CliError::ArgSpec(format!("unknown type '{}'", other)))
                    }
                };
            }
            "choices" => {
                let choices: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect();
                arg = arg.value_parser(PossibleValuesParser::new(choices));
            }
            other => {
                return Err(CliError::ArgSpec(format!("unknown option '{}'", other)));
            }
        }
    }

    Ok(arg.required(required))
}
