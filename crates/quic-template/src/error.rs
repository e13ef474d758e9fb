//! Error type for template setup.

/// Canonical error-kind tokens, matching the branch engine's surface so
/// callers can match on a stable string regardless of which component
/// raised the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidName,
    AlreadyExists,
    PortExhausted,
    ZfsFailure,
    SystemdFailure,
    BackupToolFailure,
    StartupTimeout,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidName => "INVALID_NAME",
            ErrorKind::AlreadyExists => "ALREADY_EXISTS",
            ErrorKind::PortExhausted => "PORT_EXHAUSTED",
            ErrorKind::ZfsFailure => "ZFS_FAILURE",
            ErrorKind::SystemdFailure => "SYSTEMD_FAILURE",
            ErrorKind::BackupToolFailure => "BACKUP_TOOL_FAILURE",
            ErrorKind::StartupTimeout => "STARTUP_TIMEOUT",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid template name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("template mountpoint already exists at {path}")]
    AlreadyExists { path: String },

    #[error("no free port in the configured range")]
    PortExhausted,

    #[error("postgresql on {service} did not become ready within the deadline")]
    StartupTimeout { service: String },

    #[error(transparent)]
    Os(#[from] quic_os::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::Serde(_) => ErrorKind::Internal,
            Error::InvalidName { .. } => ErrorKind::InvalidName,
            Error::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Error::PortExhausted => ErrorKind::PortExhausted,
            Error::StartupTimeout { .. } => ErrorKind::StartupTimeout,
            Error::Os(quic_os::Error::Zfs { .. }) => ErrorKind::ZfsFailure,
            Error::Os(quic_os::Error::Systemd { .. }) => ErrorKind::SystemdFailure,
            Error::Os(quic_os::Error::BackupTool { .. }) => ErrorKind::BackupToolFailure,
            Error::Os(_) => ErrorKind::ZfsFailure,
        }
    }
}
