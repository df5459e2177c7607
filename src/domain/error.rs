use thiserror::Error;

/// clikit unified error type
#[derive(Error, Debug)]
pub enum CliError {
    /// Operator mistake; shown as a plain message, no trace.
    #[error("{0}")]
    Warning(String),

    #[error("Invalid command registration: {0}")]
    InvalidCommand(String),

    #[error("Invalid argument specification: {0}")]
    ArgSpec(String),

    #[error("Invalid configuration section: {0}")]
    InvalidSection(String),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] clap::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True for recoverable operator errors.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Parse(e) => e.exit_code(),
            _ => 1,
        }
    }

    /// Report the error the way a hosting program should and terminate.
    ///
    /// Parse errors follow clap's convention (usage on stderr, help on
    /// stdout). Warnings print only their message.
    pub fn exit(self) -> ! {
        match self {
            Self::Parse(e) => e.exit(),
            Self::Warning(message) => {
                eprintln!("{}", message);
                std::process::exit(1);
            }
            other => {
                tracing::debug!(error = ?other, "command failed");
                eprintln!("Error: {}", other);
                std::process::exit(1);
            }
        }
    }
}
