use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmdError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Cmdset '{0}' not found")]
    CmdSetNotFound(String),

    #[error("Cmdset '{0}' is the default set; use remove_default to drop it")]
    DefaultSetProtected(String),

    #[error("Malformed argument: {0}")]
    MalformedArgument(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Object '{0}' not found")]
    ObjectNotFound(String),

    #[error("Channel '{0}' not found")]
    ChannelNotFound(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Persistence error: {0}")]
    PersistError(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

pub type Result<T> = std::result::Result<T, CmdError>;

impl From<std::io::Error> for CmdError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for CmdError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
