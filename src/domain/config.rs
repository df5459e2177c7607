use crate::domain::error::{CliError, CliResult};
use ini::{EscapePolicy, Ini, ParseOption, WriteOption};
use std::collections::BTreeMap;

/// Section holding user-defined command aliases
pub const ALIAS_SECTION: &str = "alias";

/// Options of one section, keyed by option name
pub type Section = BTreeMap<String, String>;

/// In-memory image of a config file: sections of string options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    pub sections: BTreeMap<String, Section>,
}

impl ConfigDocument {
    /// Parse INI text: `[section]` headers followed by `option = value` lines.
    ///
    /// Values are taken verbatim; quotes and backslashes are not interpreted.
    /// Options outside any section are rejected. Repeated sections merge and
    /// a repeated option keeps its last value.
    pub fn parse(content: &str) -> CliResult<Self> {
        let opt = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(content, opt)
            .map_err(|e| CliError::config(format!("Failed to parse config: {}", e)))?;

        let mut sections: BTreeMap<String, Section> = BTreeMap::new();
        for (name, properties) in ini.iter() {
            let Some(name) = name else {
                if let Some((option, _)) = properties.iter().next() {
                    return Err(CliError::config(format!(
                        "Failed to parse config: option '{}' is outside of any section",
                        option
                    )));
                }
                continue;
            };

            let section = sections.entry(name.to_string()).or_default();
            for (option, value) in properties.iter() {
                section.insert(option.to_string(), value.to_string());
            }
        }

        Ok(Self { sections })
    }

    /// Render the whole document as INI text
    pub fn render(&self) -> CliResult<String> {
        let mut ini = Ini::new();
        for (name, options) in &self.sections {
            let mut section = ini.with_section(Some(name.as_str()));
            for (option, value) in options {
                section.set(option.as_str(), value.as_str());
            }
        }

        let opt = WriteOption {
            escape_policy: EscapePolicy::Nothing,
            kv_separator: " = ",
            ..WriteOption::default()
        };
        let mut buf = Vec::new();
        ini.write_to_opt(&mut buf, opt)
            .map_err(|e| CliError::config(format!("Failed to serialize config: {}", e)))?;
        String::from_utf8(buf)
            .map_err(|e| CliError::config(format!("Failed to serialize config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections() {
        let doc = ConfigDocument::parse(
            "
; user settings
[alias]
reop = update --status REOPENED

[calculator]
radix = 16
",
        )
        .unwrap();

        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.sections["alias"]["reop"], "update --status REOPENED");
        assert_eq!(doc.sections["calculator"]["radix"], "16");
    }

    #[test]
    fn test_parse_keeps_quotes_verbatim() {
        let doc = ConfigDocument::parse("[alias]\nclose = update --status \"CLOSED\"\n").unwrap();
        assert_eq!(doc.sections["alias"]["close"], "update --status \"CLOSED\"");
    }

    #[test]
    fn test_parse_dotted_section() {
        let doc = ConfigDocument::parse("[remote.origin]\nurl = x\n").unwrap();
        assert_eq!(doc.sections["remote.origin"]["url"], "x");
    }

    #[test]
    fn test_parse_empty() {
        let doc = ConfigDocument::parse("").unwrap();
        assert!(doc.sections.is_empty());
    }

    #[test]
    fn test_parse_rejects_option_outside_section() {
        let err = ConfigDocument::parse("radix = 16\n").unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
    }

    #[test]
    fn test_parse_rejects_unclosed_header() {
        let err = ConfigDocument::parse("[alias\nreop = x\n").unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
    }

    #[test]
    fn test_render_then_parse() {
        let mut doc = ConfigDocument::default();
        doc.sections
            .entry("alias".to_string())
            .or_default()
            .insert("close".to_string(), "update --status \"CLOSED\"".to_string());
        doc.sections
            .entry("remote.origin".to_string())
            .or_default()
            .insert("url".to_string(), "C:\\repo".to_string());

        let text = doc.render().unwrap();
        assert!(text.contains("[alias]"));
        assert!(text.contains("close = update --status \"CLOSED\""));
        assert!(text.contains("[remote.origin]"));
        assert_eq!(ConfigDocument::parse(&text).unwrap(), doc);
    }
}
