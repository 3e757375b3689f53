//! Errors returned by the registry, configuration and file writers

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Unrecognized log level token
    #[error("unable to parse log level: {token}")]
    ParseLevel { token: String },

    /// No package was ever registered for the repository
    #[error("no packages registered for repo: {repo}")]
    RepoNotFound { repo: String },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Channel writer no longer accepts writes
    #[error("writer stopped")]
    WriterStopped,

    /// Resource was already closed by an earlier call
    #[error("{resource} already closed")]
    AlreadyClosed { resource: String },

    /// Queue full with buffer details
    #[error("Log queue full: {current}/{max} buffers queued")]
    QueueFull { current: usize, max: usize },

    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A log file could not be opened or written
    #[error("Log file error for '{path}': {message}")]
    FileAppenderError { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },
}

impl LoggerError {
    /// Create a level parse error naming the offending token
    pub fn parse_level(token: impl Into<String>) -> Self {
        LoggerError::ParseLevel {
            token: token.into(),
        }
    }

    /// Create a repository lookup error
    pub fn repo_not_found(repo: impl Into<String>) -> Self {
        LoggerError::RepoNotFound { repo: repo.into() }
    }

    /// Create an already-closed error for the given resource
    pub fn already_closed(resource: impl Into<String>) -> Self {
        LoggerError::AlreadyClosed {
            resource: resource.into(),
        }
    }

    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a queue full error with buffer details
    pub fn queue_full(current: usize, max: usize) -> Self {
        LoggerError::QueueFull { current, max }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file appender error
    pub fn file_appender(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileAppenderError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<LoggerError> for std::io::Error {
    fn from(err: LoggerError) -> Self {
        match err {
            LoggerError::IoError(e) => e,
            LoggerError::IoOperation { source, .. } => source,
            stopped @ LoggerError::WriterStopped => {
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, stopped)
            }
            full @ LoggerError::QueueFull { .. } => {
                std::io::Error::new(std::io::ErrorKind::WouldBlock, full)
            }
            other => std::io::Error::other(other),
        }
    }
}
