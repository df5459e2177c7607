//! Command capability and command registrations.

use crate::core::argspec::{apply_all, ArgSpec};
use crate::core::context::Context;
use crate::domain::error::{CliError, CliResult};
use std::fmt;
use std::sync::Arc;

/// A unit of CLI functionality, built fresh for each dispatch
pub trait Command {
    /// Perform the command's effect.
    ///
    /// `CliError::Warning` reports an operator mistake; anything else is
    /// a fault.
    fn invoke(&mut self, ctx: &mut Context<'_>) -> CliResult<()>;
}

impl<F> Command for F
where
    F: FnMut(&mut Context<'_>) -> CliResult<()>,
{
    fn invoke(&mut self, ctx: &mut Context<'_>) -> CliResult<()> {
        self(ctx)
    }
}

type Factory = Arc<dyn Fn() -> Box<dyn Command> + Send + Sync>;

/// Everything the dispatcher knows about one command
#[derive(Clone)]
pub struct Registration {
    name: String,
    summary: String,
    details: String,
    args: Vec<ArgSpec>,
    factory: Factory,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("summary", &self.summary)
            .field("details", &self.details)
            .field("args", &self.args)
            .finish()
    }
}

impl Registration {
    /// Register `name` with a one-paragraph summary and free-form details.
    pub fn new<C, F>(
        name: impl Into<String>,
        summary: impl Into<String>,
        details: impl Into<String>,
        factory: F,
    ) -> Self
    where
        C: Command + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            summary: summary.into(),
            details: details.into(),
            args: Vec::new(),
            factory: Arc::new(move || Box::new(factory()) as Box<dyn Command>),
        }
    }

    /// Register `name`, taking the summary from the first paragraph of
    /// `doc` and the details from the rest.
    pub fn from_doc<C, F>(name: impl Into<String>, doc: &str, factory: F) -> Self
    where
        C: Command + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        Self::new(name, summary_of(doc), details_of(doc), factory)
    }

    /// Append one argument spec
    pub fn arg(mut self, spec: impl Into<ArgSpec>) -> Self {
        self.args.push(spec.into());
        self
    }

    /// Append several argument specs in order
    pub fn args<I>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = ArgSpec>,
    {
        self.args.extend(specs);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arg_specs(&self) -> &[ArgSpec] {
        &self.args
    }

    /// Short help shown in the subcommand list
    pub fn help(&self) -> String {
        summary_of(&self.summary)
    }

    /// Long text shown after the subcommand's own help
    pub fn epilog(&self) -> String {
        paragraphs(&self.details).join("\n\n")
    }

    pub(crate) fn validate(&self) -> CliResult<()> {
        let name = &self.name;
        if name.is_empty() || name.starts_with('-') || name.chars().any(char::is_whitespace) {
            return Err(CliError::InvalidCommand(format!("'{}' is not a valid command name", name)));
        }
        Ok(())
    }

    /// Build a new instance of the command
    pub fn instantiate(&self) -> Box<dyn Command> {
        (self.factory)()
    }

    /// Add this command's sub-parser to `parent`
    pub fn add_parser(&self, parent: clap::Command) -> CliResult<clap::Command> {
        let mut sub = clap::Command::new(self.name.clone()).about(self.help());
        let epilog = self.epilog();
        if !epilog.is_empty() {
            sub = sub.after_help(epilog);
        }
        let sub = apply_all(&self.args, sub)?;
        Ok(parent.subcommand(sub))
    }
}

/// Paragraphs of `text`: blank-line separated, dedented, trimmed.
///
/// The first line is trimmed on its own so text that starts on the same
/// line as its opening delimiter still dedents.
fn paragraphs(text: &str) -> Vec<String> {
    let text = text.trim_start_matches(|c: char| c == '\n' || c == '\r');
    let (first, rest) = match text.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (text, ""),
    };
    let body = if first.trim().is_empty() {
        textwrap::dedent(rest)
    } else {
        format!("{}\n{}", first.trim(), textwrap::dedent(rest))
    };

    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in body.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n").trim().to_string());
    }
    paragraphs
}

/// First paragraph of documentation text
pub fn summary_of(doc: &str) -> String {
    paragraphs(doc).into_iter().next().unwrap_or_default()
}

/// Every paragraph after the first, separated by one blank line
pub fn details_of(doc: &str) -> String {
    paragraphs(doc).into_iter().skip(1).collect::<Vec<_>>().join("\n\n")
}
