use crate::domain::config::{ConfigDocument, Section};
use crate::domain::error::{CliError, CliResult};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle to a live config store shared between cache users
pub type SharedConfig = Arc<Mutex<ConfigStore>>;

/// Decides which section names a store accepts.
///
/// Returns the accepted name, or `CliError::InvalidSection`.
pub trait SectionValidator: Send + Sync {
    fn check_section(&self, name: &str) -> CliResult<String>;
}

/// Accepts any name that can round-trip through a `[section]` header
#[derive(Debug, Clone, Copy, Default)]
pub struct AnySection;

impl SectionValidator for AnySection {
    fn check_section(&self, name: &str) -> CliResult<String> {
        let bad = name.trim().is_empty()
            || name
                .chars()
                .any(|c| matches!(c, '[' | ']' | '\n' | '\r'));
        if bad {
            return Err(CliError::InvalidSection(name.to_string()));
        }
        Ok(name.to_string())
    }
}

/// Accepts only a fixed set of section names
#[derive(Debug, Clone, Default)]
pub struct AllowedSections {
    names: BTreeSet<String>,
}

impl AllowedSections {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl SectionValidator for AllowedSections {
    fn check_section(&self, name: &str) -> CliResult<String> {
        if self.names.contains(name) {
            Ok(name.to_string())
        } else {
            Err(CliError::InvalidSection(name.to_string()))
        }
    }
}

/// File-backed store of sections and string options
pub struct ConfigStore {
    path: PathBuf,
    document: ConfigDocument,
    validator: Arc<dyn SectionValidator>,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("path", &self.path)
            .field("document", &self.document)
            .finish()
    }
}

impl ConfigStore {
    /// Load the store bound to `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>, validator: Arc<dyn SectionValidator>) -> CliResult<Self> {
        let path = expand_user(path.as_ref());

        let document = match fs::read_to_string(&path) {
            Ok(content) => ConfigDocument::parse(&content).map_err(|e| match e {
                CliError::Config { message } => {
                    CliError::config(format!("{} in {}", message, path.display()))
                }
                other => other,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, starting empty");
                ConfigDocument::default()
            }
            Err(e) => {
                return Err(CliError::config(format!(
                    "Failed to read config file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        tracing::debug!(
            path = %path.display(),
            sections = document.sections.len(),
            "config loaded"
        );

        Ok(Self {
            path,
            document,
            validator,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.document.sections.is_empty()
    }

    /// Section names in order
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.document.sections.keys().map(String::as_str)
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.document.sections.contains_key(section)
    }

    pub fn has_option(&self, section: &str, option: &str) -> bool {
        self.get(section, option).is_some()
    }

    pub fn get(&self, section: &str, option: &str) -> Option<&str> {
        self.document
            .sections
            .get(section)
            .and_then(|s| s.get(option))
            .map(String::as_str)
    }

    /// Options of a section, or `None` if the section does not exist
    pub fn items(&self, section: &str) -> Option<&Section> {
        self.document.sections.get(section)
    }

    /// Validate and create a section
    pub fn add_section(&mut self, name: &str) -> CliResult<()> {
        let name = self.validator.check_section(name)?;
        if self.has_section(&name) {
            return Err(CliError::config(format!("Section '{}' already exists", name)));
        }
        self.document.sections.insert(name, Section::new());
        Ok(())
    }

    /// Set an option in an existing section, returning the previous value
    pub fn set(&mut self, section: &str, option: &str, value: &str) -> CliResult<Option<String>> {
        let bad_option = option.trim().is_empty()
            || option
                .chars()
                .any(|c| matches!(c, '=' | ':' | '\n' | '\r'))
            || option.starts_with(['[', ';', '#']);
        if bad_option {
            return Err(CliError::config(format!("Invalid option name '{}'", option)));
        }
        if value.contains(['\n', '\r']) {
            return Err(CliError::config(format!(
                "Value of '{}.{}' must be a single line",
                section, option
            )));
        }

        let options = self
            .document
            .sections
            .get_mut(section)
            .ok_or_else(|| CliError::config(format!("No section '{}'", section)))?;
        Ok(options.insert(option.to_string(), value.to_string()))
    }

    /// Remove an option, returning its value if it existed
    pub fn remove_option(&mut self, section: &str, option: &str) -> Option<String> {
        self.document
            .sections
            .get_mut(section)
            .and_then(|s| s.remove(option))
    }

    /// Remove a whole section; true if it existed
    pub fn remove_section(&mut self, section: &str) -> bool {
        self.document.sections.remove(section).is_some()
    }

    /// Rewrite the backing file with the full in-memory content.
    ///
    /// The content goes to a sibling temporary file that is then renamed
    /// over the target.
    pub fn write(&self) -> CliResult<()> {
        let content = self.document.render()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                CliError::config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        fs::write(&tmp_path, content).map_err(|e| {
            CliError::config(format!("Failed to write config file {}: {}", tmp_path.display(), e))
        })?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(CliError::config(format!(
                "Failed to replace config file {}: {}",
                self.path.display(),
                e
            )));
        }

        tracing::debug!(path = %self.path.display(), "config written");
        Ok(())
    }
}

/// Process-lifetime cache of config stores keyed by expanded path
pub struct ConfigCache {
    validator: Arc<dyn SectionValidator>,
    instances: Mutex<HashMap<PathBuf, SharedConfig>>,
}

impl ConfigCache {
    pub fn new(validator: impl SectionValidator + 'static) -> Self {
        Self {
            validator: Arc::new(validator),
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Return the live store for `path`, loading it on first use
    pub fn get_config(&self, path: impl AsRef<Path>) -> CliResult<SharedConfig> {
        let path = expand_user(path.as_ref());
        let mut instances = self.instances.lock();

        if let Some(config) = instances.get(&path) {
            return Ok(Arc::clone(config));
        }

        let store = ConfigStore::open(&path, Arc::clone(&self.validator))?;
        let config = Arc::new(Mutex::new(store));
        instances.insert(path, Arc::clone(&config));
        Ok(config)
    }

    /// Number of cached stores
    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Expand a leading `~` to the user's home directory
pub fn expand_user(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(std::path::Component::Normal(first)) if first == "~" => match dirs::home_dir() {
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}
