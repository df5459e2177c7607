//! Command dispatcher.
//!
//! One `dispatch` call runs one invocation of the program:
//!
//! 1. global options are pre-parsed leniently, leaving a residual token list;
//! 2. the full parser is built (global args, alias epilog, one subcommand per
//!    registered command);
//! 3. the first alias in the residual tokens is expanded, unless a command
//!    name comes first;
//! 4. the residual tokens are parsed against the full parser;
//! 5. the selected command is built and invoked with a [`Context`].

use crate::cli::{config_registration, help_registration};
use crate::core::argspec::{apply_all, ArgSpec};
use crate::core::command::Registration;
use crate::core::context::{Context, ParsedArgs};
use crate::domain::config::ALIAS_SECTION;
use crate::domain::error::{CliError, CliResult};
use crate::infrastructure::config::SharedConfig;
use clap::error::ErrorKind;
use clap::ArgMatches;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::Path;

/// Construction options for a [`Dispatcher`]
#[derive(Debug, Clone)]
pub struct DispatcherOptions {
    /// Program name used in usage lines; defaults to argv[0]'s file name
    pub name: Option<String>,
    /// Description shown at the top of the program help
    pub about: Option<String>,
    /// Config store; its `alias` section provides aliases
    pub config: Option<SharedConfig>,
    /// Arguments accepted by every command
    pub global_args: Vec<ArgSpec>,
    /// Register the built-in `help` command
    pub with_help: bool,
    /// Register the built-in `config` command
    pub with_config: bool,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            name: None,
            about: None,
            config: None,
            global_args: Vec::new(),
            with_help: true,
            with_config: false,
        }
    }
}

/// Registry of commands plus the parse-and-invoke pipeline
#[derive(Debug)]
pub struct Dispatcher {
    commands: BTreeMap<String, Registration>,
    global_args: Vec<ArgSpec>,
    config: Option<SharedConfig>,
    name: Option<String>,
    about: Option<String>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Dispatcher with the built-in `help` command and no config store
    pub fn new() -> Self {
        Self::with_options(DispatcherOptions::default())
    }

    pub fn with_options(options: DispatcherOptions) -> Self {
        let mut dispatcher = Self {
            commands: BTreeMap::new(),
            global_args: options.global_args,
            config: options.config,
            name: options.name,
            about: options.about,
        };

        if options.with_help {
            dispatcher.insert(help_registration());
        }
        if options.with_config {
            dispatcher.insert(config_registration());
        }
        dispatcher
    }

    /// Register a command. Registering a name twice keeps the first.
    pub fn add_command(&mut self, registration: Registration) -> CliResult<()> {
        registration.validate()?;
        self.insert(registration);
        Ok(())
    }

    fn insert(&mut self, registration: Registration) {
        let name = registration.name().to_string();
        if self.commands.contains_key(&name) {
            tracing::warn!(command = %name, "command already registered; keeping the first");
            return;
        }
        tracing::debug!(command = %name, "command registered");
        self.commands.insert(name, registration);
    }

    /// Registered command names in order
    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn config(&self) -> Option<&SharedConfig> {
        self.config.as_ref()
    }

    /// Aliases from the config store's `alias` section
    pub fn aliases(&self) -> BTreeMap<String, String> {
        self.config
            .as_ref()
            .and_then(|config| config.lock().items(ALIAS_SECTION).cloned())
            .unwrap_or_default()
    }

    /// Help epilog listing user-defined aliases, if there are any
    pub fn epilog(&self) -> Option<String> {
        format_alias_epilog(&self.aliases())
    }

    /// Dispatch the process's own command line, writing to stdout
    pub fn dispatch(&self) -> CliResult<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.dispatch_from(std::env::args_os(), &mut out)
    }

    /// Dispatch `argv` (program name first), writing output to `out`
    pub fn dispatch_from<I, T>(&self, argv: I, out: &mut dyn Write) -> CliResult<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut argv = argv.into_iter().map(|arg| -> OsString { arg.into() });
        let program = argv.next().unwrap_or_default();
        let tokens = argv
            .map(|arg| {
                arg.into_string().map_err(|arg| {
                    CliError::warning(format!(
                        "Argument is not valid UTF-8: {}",
                        arg.to_string_lossy()
                    ))
                })
            })
            .collect::<CliResult<Vec<String>>>()?;

        let name = self.program_name(&program);

        // global pre-parse
        let (global_matches, residual) = self.parse_globals(&name, tokens)?;
        tracing::debug!(residual = ?residual, "global arguments parsed");

        // full parser
        let aliases = self.aliases();
        let parser = self.full_parser(&name, &aliases)?;

        // aliases
        let residual = expand_aliases(residual, &aliases, |token| self.has_command(token));

        // full parse
        let matches = match parser
            .clone()
            .try_get_matches_from(std::iter::once(name.clone()).chain(residual))
        {
            Ok(matches) => matches,
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                write!(out, "{}", e.render())?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let (command, sub_matches) = match matches.subcommand() {
            Some((command, sub_matches)) => (command.to_string(), sub_matches.clone()),
            None => return Err(CliError::warning("No command given.")),
        };
        let registration = self
            .commands
            .get(&command)
            .ok_or_else(|| CliError::warning(format!("unknown subcommand: '{}'", command)))?;

        // invoke
        tracing::debug!(command = %command, "dispatching");
        let args = ParsedArgs::new(command, vec![sub_matches, global_matches, matches]);
        let mut ctx = Context::new(
            &args,
            &parser,
            &self.commands,
            &aliases,
            self.config.as_ref(),
            out,
        );
        registration.instantiate().invoke(&mut ctx)
    }

    fn program_name(&self, argv0: &OsString) -> String {
        self.name.clone().unwrap_or_else(|| {
            Path::new(argv0)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
        })
    }

    fn global_parser(&self, name: &str) -> CliResult<clap::Command> {
        let cmd = clap::Command::new(name.to_string())
            .disable_help_flag(true)
            .disable_version_flag(true);
        apply_all(&self.global_args, cmd)
    }

    /// Parse the global options found anywhere in `tokens`, returning their
    /// matches and every other token in order.
    fn parse_globals(&self, name: &str, tokens: Vec<String>) -> CliResult<(ArgMatches, Vec<String>)> {
        let mut parser = self.global_parser(name)?;
        parser.build();

        let mut consumed = Vec::new();
        let mut residual = Vec::new();
        let mut tokens = tokens.into_iter();

        while let Some(token) = tokens.next() {
            if token == "--" {
                residual.push(token);
                residual.extend(tokens.by_ref());
                break;
            }
            match global_option(&parser, &token) {
                Some(GlobalOption { needs_value }) => {
                    consumed.push(token);
                    if needs_value {
                        if let Some(value) = tokens.next() {
                            consumed.push(value);
                        }
                    }
                }
                None => residual.push(token),
            }
        }

        let matches = parser.try_get_matches_from(std::iter::once(name.to_string()).chain(consumed))?;
        Ok((matches, residual))
    }

    fn full_parser(&self, name: &str, aliases: &BTreeMap<String, String>) -> CliResult<clap::Command> {
        let mut parser = clap::Command::new(name.to_string())
            .subcommand_required(true)
            .arg_required_else_help(true)
            .disable_help_subcommand(true)
            .subcommand_help_heading("Subcommands");
        if let Some(about) = &self.about {
            parser = parser.about(about.clone());
        }
        if let Some(epilog) = format_alias_epilog(aliases) {
            parser = parser.after_help(epilog);
        }

        let parser = apply_all(&self.global_args, parser)?;
        self.commands
            .values()
            .try_fold(parser, |parser, registration| registration.add_parser(parser))
    }
}

struct GlobalOption {
    /// The option's value is the next token
    needs_value: bool,
}

/// Match `token` against the options of the global parser
fn global_option(parser: &clap::Command, token: &str) -> Option<GlobalOption> {
    if let Some(long) = token.strip_prefix("--") {
        let (long, inline_value) = match long.split_once('=') {
            Some((long, _)) => (long, true),
            None => (long, false),
        };
        let arg = parser.get_arguments().find(|arg| {
            arg.get_long_and_visible_aliases()
                .map_or(false, |names| names.contains(&long))
        })?;
        let takes_values = arg.get_action().takes_values();
        if inline_value && !takes_values {
            return None;
        }
        return Some(GlobalOption {
            needs_value: takes_values && !inline_value,
        });
    }

    let mut chars = token.strip_prefix('-')?.chars();
    let short = chars.next()?;
    let attached = !chars.as_str().is_empty();
    let arg = parser.get_arguments().find(|arg| {
        arg.get_short_and_visible_aliases()
            .map_or(false, |names| names.contains(&short))
    })?;
    let takes_values = arg.get_action().takes_values();
    if attached && !takes_values {
        // clustered flags are left for the full parser
        return None;
    }
    Some(GlobalOption {
        needs_value: takes_values && !attached,
    })
}

/// Expand the first alias in `tokens`.
///
/// Scanning stops at the first token that is an alias (which is replaced
/// by its shell-word-split expansion) or a command name (left as is).
/// Expansions are not expanded again.
pub fn expand_aliases<F>(
    mut tokens: Vec<String>,
    aliases: &BTreeMap<String, String>,
    is_command: F,
) -> Vec<String>
where
    F: Fn(&str) -> bool,
{
    for i in 0..tokens.len() {
        if let Some(expansion) = aliases.get(&tokens[i]) {
            let words = split_expansion(expansion);
            tracing::debug!(alias = %tokens[i], expansion = ?words, "alias expanded");
            tokens.splice(i..=i, words);
            break;
        }
        if is_command(&tokens[i]) {
            break;
        }
    }
    tokens
}

fn split_expansion(expansion: &str) -> Vec<String> {
    match shlex::split(expansion) {
        Some(words) => words,
        // unbalanced quotes
        None => expansion.split_whitespace().map(String::from).collect(),
    }
}

/// Format the alias listing shown after the program help
pub fn format_alias_epilog(aliases: &BTreeMap<String, String>) -> Option<String> {
    if aliases.is_empty() {
        return None;
    }
    let lines: Vec<String> = aliases
        .iter()
        .map(|(alias, target)| format!("    {:20}{}", alias, target))
        .collect();
    Some(format!("user-defined aliases:\n{}", lines.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, ArgAction};

    fn noop(_: &mut Context<'_>) -> CliResult<()> {
        Ok(())
    }

    fn aliases(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(a, e)| (a.to_string(), e.to_string()))
            .collect()
    }

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_init_default_command() {
        let disp = Dispatcher::new();
        assert_eq!(disp.command_names().collect::<Vec<_>>(), ["help"]);
    }

    #[test]
    fn test_init_with_and_without_builtins() {
        let disp = Dispatcher::with_options(DispatcherOptions {
            with_help: false,
            with_config: true,
            ..Default::default()
        });
        assert!(!disp.has_command("help"));
        assert!(disp.has_command("config"));

        let disp = Dispatcher::with_options(DispatcherOptions {
            with_help: false,
            with_config: false,
            ..Default::default()
        });
        assert_eq!(disp.command_names().count(), 0);
    }

    #[test]
    fn test_add_command_idempotent() {
        let mut disp = Dispatcher::with_options(DispatcherOptions {
            with_help: false,
            ..Default::default()
        });

        disp.add_command(Registration::new("command1", "", "", || noop)).unwrap();
        disp.add_command(Registration::new("command1", "", "", || noop)).unwrap();
        assert_eq!(disp.command_names().collect::<Vec<_>>(), ["command1"]);

        disp.add_command(Registration::new("command2", "", "", || noop)).unwrap();
        assert_eq!(disp.command_names().collect::<Vec<_>>(), ["command1", "command2"]);

        let err = disp
            .add_command(Registration::new("not a command", "", "", || noop))
            .unwrap_err();
        assert!(matches!(err, CliError::InvalidCommand(_)));
        assert_eq!(disp.command_names().count(), 2);
    }

    #[test]
    fn test_epilog_no_aliases() {
        assert!(Dispatcher::new().epilog().is_none());
        assert!(format_alias_epilog(&BTreeMap::new()).is_none());
    }

    #[test]
    fn test_epilog_two_aliases() {
        let epilog = format_alias_epilog(&aliases(&[
            ("reop", "update --status REOPENED"),
            ("close", "update --status CLOSED"),
        ]))
        .unwrap();

        assert_eq!(
            epilog,
            "user-defined aliases:\n    close               update --status CLOSED\n    reop                update --status REOPENED"
        );
    }

    #[test]
    fn test_expand_alias() {
        let table = aliases(&[("reop", "update --status REOPENED")]);
        let expanded = expand_aliases(tokens(&["reop", "123"]), &table, |t| t == "update");
        assert_eq!(expanded, ["update", "--status", "REOPENED", "123"]);
    }

    #[test]
    fn test_expand_alias_after_flags() {
        let table = aliases(&[("reop", "update --status REOPENED")]);
        let expanded = expand_aliases(tokens(&["--dry", "reop"]), &table, |_| false);
        assert_eq!(expanded, ["--dry", "update", "--status", "REOPENED"]);
    }

    #[test]
    fn test_command_name_stops_scan() {
        let table = aliases(&[("reop", "update --status REOPENED")]);
        let expanded = expand_aliases(tokens(&["status", "reop"]), &table, |t| t == "status");
        assert_eq!(expanded, ["status", "reop"]);
    }

    #[test]
    fn test_expansion_not_recursive() {
        let table = aliases(&[("a", "b x"), ("b", "c y")]);
        let expanded = expand_aliases(tokens(&["a", "b"]), &table, |_| false);
        assert_eq!(expanded, ["b", "x", "b"]);
    }

    #[test]
    fn test_expansion_shell_words() {
        let table = aliases(&[("say", "echo 'hello world'"), ("odd", "echo 'oops")]);
        assert_eq!(
            expand_aliases(tokens(&["say"]), &table, |_| false),
            ["echo", "hello world"]
        );
        assert_eq!(
            expand_aliases(tokens(&["odd"]), &table, |_| false),
            ["echo", "'oops"]
        );
    }

    #[test]
    fn test_parse_globals_keeps_residual() {
        let disp = Dispatcher::with_options(DispatcherOptions {
            global_args: vec![
                Arg::new("radix").long("radix").short('r').into(),
                Arg::new("verbose").long("verbose").short('v').action(ArgAction::SetTrue).into(),
            ],
            ..Default::default()
        });

        let (matches, residual) = disp
            .parse_globals(
                "prog",
                tokens(&["-v", "add", "-r8", "10", "--other", "--", "--radix", "3"]),
            )
            .unwrap();

        assert!(matches.get_flag("verbose"));
        assert_eq!(matches.get_one::<String>("radix").unwrap(), "8");
        assert_eq!(residual, ["add", "10", "--other", "--", "--radix", "3"]);
    }

    #[test]
    fn test_parse_globals_inline_value() {
        let disp = Dispatcher::with_options(DispatcherOptions {
            global_args: vec![ArgSpec::pair(["--radix"], [("type", "int")])],
            ..Default::default()
        });
        let (matches, residual) = disp.parse_globals("prog", tokens(&["--radix=16", "add"])).unwrap();
        assert_eq!(*matches.get_one::<i64>("radix").unwrap(), 16);
        assert_eq!(residual, ["add"]);
    }

    #[test]
    fn test_parse_globals_separate_value() {
        let disp = Dispatcher::with_options(DispatcherOptions {
            global_args: vec![ArgSpec::pair(["--radix", "-r"], [("type", "int")])],
            ..Default::default()
        });
        let (matches, residual) = disp
            .parse_globals("prog", tokens(&["add", "--radix", "2", "10", "11"]))
            .unwrap();
        assert_eq!(*matches.get_one::<i64>("radix").unwrap(), 2);
        assert_eq!(residual, ["add", "10", "11"]);
    }

    #[test]
    fn test_parse_globals_leaves_help_flag() {
        let disp = Dispatcher::new();
        let (_, residual) = disp.parse_globals("prog", tokens(&["--help"])).unwrap();
        assert_eq!(residual, ["--help"]);
    }

    #[test]
    fn test_full_parser_lists_sorted_subcommands() {
        let mut disp = Dispatcher::new();
        disp.add_command(Registration::new("sub", "Subtract values.", "", || noop)).unwrap();
        disp.add_command(Registration::new("add", "Add values.", "", || noop)).unwrap();

        let parser = disp.full_parser("prog", &BTreeMap::new()).unwrap();
        let names: Vec<&str> = parser.get_subcommands().map(|s| s.get_name()).collect();
        assert_eq!(names, ["add", "help", "sub"]);
        assert!(parser.get_after_help().is_none());
    }

    #[test]
    fn test_program_name() {
        let disp = Dispatcher::new();
        assert_eq!(disp.program_name(&OsString::from("/usr/bin/calc")), "calc");

        let disp = Dispatcher::with_options(DispatcherOptions {
            name: Some("fixed".to_string()),
            ..Default::default()
        });
        assert_eq!(disp.program_name(&OsString::from("/usr/bin/calc")), "fixed");
    }
}
