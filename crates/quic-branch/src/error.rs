//! Errors surfaced by the branch lifecycle engine (spec §7).

/// Canonical error kind, stable across error variants so RPC callers (and
/// tests) can match on it regardless of the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidName,
    TemplateNotFound,
    PortExhausted,
    ZfsFailure,
    SystemdFailure,
    FirewallFailure,
    BackupToolFailure,
    StartupTimeout,
    AdminProvisionFailed,
    /// Not one of spec §7's named kinds: local I/O or metadata corruption
    /// that the spec does not assign a canonical token to.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidName => "INVALID_NAME",
            ErrorKind::TemplateNotFound => "TEMPLATE_NOT_FOUND",
            ErrorKind::PortExhausted => "PORT_EXHAUSTED",
            ErrorKind::ZfsFailure => "ZFS_FAILURE",
            ErrorKind::SystemdFailure => "SYSTEMD_FAILURE",
            ErrorKind::FirewallFailure => "FIREWALL_FAILURE",
            ErrorKind::BackupToolFailure => "BACKUP_TOOL_FAILURE",
            ErrorKind::StartupTimeout => "STARTUP_TIMEOUT",
            ErrorKind::AdminProvisionFailed => "ADMIN_PROVISION_FAILED",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid branch name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("template '{template}' not found")]
    TemplateNotFound { template: String },

    #[error("no free port in configured range")]
    PortExhausted,

    #[error("postgresql did not become ready within the startup deadline (service {service})")]
    StartupTimeout { service: String },

    #[error("admin role provisioning failed: {message}")]
    AdminProvisionFailed { message: String },

    #[error(transparent)]
    Os(#[from] quic_os::Error),
}

impl Error {
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Canonical error kind, stable regardless of the underlying message.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidName { .. } => ErrorKind::InvalidName,
            Error::TemplateNotFound { .. } => ErrorKind::TemplateNotFound,
            Error::PortExhausted => ErrorKind::PortExhausted,
            Error::StartupTimeout { .. } => ErrorKind::StartupTimeout,
            Error::AdminProvisionFailed { .. } => ErrorKind::AdminProvisionFailed,
            Error::Os(quic_os::Error::Zfs { .. }) => ErrorKind::ZfsFailure,
            Error::Os(quic_os::Error::Systemd { .. }) => ErrorKind::SystemdFailure,
            Error::Os(quic_os::Error::Firewall { .. }) => ErrorKind::FirewallFailure,
            Error::Os(quic_os::Error::BackupTool { .. }) => ErrorKind::BackupToolFailure,
            Error::Os(_) => ErrorKind::ZfsFailure,
            Error::Io(_) | Error::Serde(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
