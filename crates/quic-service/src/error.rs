//! Error type for the service facade — the final surface an RPC layer sees.

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
    ShutdownInProgress,
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
            ErrorKind::ShutdownInProgress => "SHUTDOWN_IN_PROGRESS",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Retryable: a shutdown was already in progress when the call tried
    /// to take the lock.
    #[error("shutdown in progress; retry later")]
    ShutdownInProgress,

    #[error("shutdown timed out with a mutation still in progress")]
    ShutdownTimedOut,

    #[error(transparent)]
    Branch(#[from] quic_branch::Error),

    #[error(transparent)]
    Template(#[from] quic_template::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ShutdownInProgress => ErrorKind::ShutdownInProgress,
            Error::ShutdownTimedOut => ErrorKind::Internal,
            Error::Branch(e) => match e.kind() {
                quic_branch::ErrorKind::InvalidName => ErrorKind::InvalidName,
                quic_branch::ErrorKind::TemplateNotFound => ErrorKind::TemplateNotFound,
                quic_branch::ErrorKind::PortExhausted => ErrorKind::PortExhausted,
                quic_branch::ErrorKind::ZfsFailure => ErrorKind::ZfsFailure,
                quic_branch::ErrorKind::SystemdFailure => ErrorKind::SystemdFailure,
                quic_branch::ErrorKind::FirewallFailure => ErrorKind::FirewallFailure,
                quic_branch::ErrorKind::BackupToolFailure => ErrorKind::BackupToolFailure,
                quic_branch::ErrorKind::StartupTimeout => ErrorKind::StartupTimeout,
                quic_branch::ErrorKind::AdminProvisionFailed => ErrorKind::AdminProvisionFailed,
                quic_branch::ErrorKind::Internal => ErrorKind::Internal,
            },
            Error::Template(e) => match e.kind() {
                quic_template::ErrorKind::InvalidName => ErrorKind::InvalidName,
                quic_template::ErrorKind::AlreadyExists => ErrorKind::Internal,
                quic_template::ErrorKind::PortExhausted => ErrorKind::PortExhausted,
                quic_template::ErrorKind::ZfsFailure => ErrorKind::ZfsFailure,
                quic_template::ErrorKind::SystemdFailure => ErrorKind::SystemdFailure,
                quic_template::ErrorKind::BackupToolFailure => ErrorKind::BackupToolFailure,
                quic_template::ErrorKind::StartupTimeout => ErrorKind::StartupTimeout,
                quic_template::ErrorKind::Internal => ErrorKind::Internal,
            },
        }
    }
}
