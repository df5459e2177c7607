use crate::core::command::Registration;
use crate::infrastructure::config::SharedConfig;
use clap::parser::ValueSource;
use clap::ArgMatches;
use std::any::Any;
use std::collections::BTreeMap;
use std::io::Write;

/// Merged view of every parse stage of one dispatch.
///
/// Lookups search the selected subcommand's matches, then the global
/// pre-parse, then the top-level full parse. A value typed on the command
/// line beats a default from any layer.
#[derive(Debug, Clone)]
pub struct ParsedArgs {
    command: String,
    layers: Vec<ArgMatches>,
}

impl ParsedArgs {
    pub fn new(command: impl Into<String>, layers: Vec<ArgMatches>) -> Self {
        Self {
            command: command.into(),
            layers,
        }
    }

    /// Name of the selected command
    pub fn command(&self) -> &str {
        &self.command
    }

    fn layer_for(&self, id: &str) -> Option<&ArgMatches> {
        let present: Vec<&ArgMatches> = self
            .layers
            .iter()
            .filter(|m| matches!(m.try_contains_id(id), Ok(true)))
            .collect();

        present
            .iter()
            .find(|m| m.value_source(id) == Some(ValueSource::CommandLine))
            .or_else(|| present.first())
            .copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.layer_for(id).is_some()
    }

    /// Value explicitly given, or the default
    pub fn get_one<T: Any + Clone + Send + Sync + 'static>(&self, id: &str) -> Option<&T> {
        self.layer_for(id)
            .and_then(|m| m.try_get_one::<T>(id).ok().flatten())
    }

    pub fn get_many<T: Any + Clone + Send + Sync + 'static>(&self, id: &str) -> Option<Vec<&T>> {
        self.layer_for(id)
            .and_then(|m| m.try_get_many::<T>(id).ok().flatten())
            .map(|values| values.collect())
    }

    pub fn get_str(&self, id: &str) -> Option<&str> {
        self.get_one::<String>(id).map(String::as_str)
    }

    /// True if a boolean flag was set in any layer
    pub fn get_flag(&self, id: &str) -> bool {
        self.layers
            .iter()
            .any(|m| matches!(m.try_get_one::<bool>(id), Ok(Some(true))))
    }
}

/// What a command sees when it runs
pub struct Context<'a> {
    /// Parsed arguments of this invocation
    pub args: &'a ParsedArgs,
    /// The full parser, with every subcommand attached
    pub parser: &'a clap::Command,
    /// All registered commands by name
    pub commands: &'a BTreeMap<String, Registration>,
    /// User-defined aliases
    pub aliases: &'a BTreeMap<String, String>,
    /// Config store, when the dispatcher has one
    pub config: Option<&'a SharedConfig>,
    out: &'a mut dyn Write,
}

impl<'a> Context<'a> {
    pub fn new(
        args: &'a ParsedArgs,
        parser: &'a clap::Command,
        commands: &'a BTreeMap<String, Registration>,
        aliases: &'a BTreeMap<String, String>,
        config: Option<&'a SharedConfig>,
        out: &'a mut dyn Write,
    ) -> Self {
        Self {
            args,
            parser,
            commands,
            aliases,
            config,
            out,
        }
    }

    /// Where command output goes
    pub fn out(&mut self) -> &mut dyn Write {
        &mut *self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, ArgAction};

    fn layers() -> Vec<ArgMatches> {
        let sub = clap::Command::new("add")
            .arg(Arg::new("radix").long("radix").default_value("10"))
            .arg(Arg::new("inputs").num_args(1..))
            .try_get_matches_from(["add", "1", "2"])
            .unwrap();
        let global = clap::Command::new("prog")
            .arg(Arg::new("radix").long("radix"))
            .arg(Arg::new("verbose").long("verbose").action(ArgAction::SetTrue))
            .try_get_matches_from(["prog", "--radix", "16", "--verbose"])
            .unwrap();
        vec![sub, global]
    }

    #[test]
    fn test_command_line_value_beats_default() {
        let args = ParsedArgs::new("add", layers());
        assert_eq!(args.command(), "add");
        assert_eq!(args.get_str("radix"), Some("16"));
    }

    #[test]
    fn test_flags_and_many() {
        let args = ParsedArgs::new("add", layers());
        assert!(args.get_flag("verbose"));
        assert!(!args.get_flag("quiet"));
        let inputs = args.get_many::<String>("inputs").unwrap();
        assert_eq!(inputs, ["1", "2"]);
    }

    #[test]
    fn test_unknown_ids() {
        let args = ParsedArgs::new("add", layers());
        assert!(!args.contains("nope"));
        assert_eq!(args.get_str("nope"), None);
        assert_eq!(args.get_one::<i64>("radix"), None);
    }
}
