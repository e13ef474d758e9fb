//! Error types for OS adapter operations.

/// Error type for OS adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zfs {command} failed (status {status}): {stderr}")]
    Zfs {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("systemd {command} failed (status {status}): {stderr}")]
    Systemd {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("firewall {command} failed (status {status}): {stderr}")]
    Firewall {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("postgres {command} failed (status {status}): {stderr}")]
    Postgres {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("backup tool failed (status {status}): {stderr}")]
    BackupTool { status: String, stderr: String },

    #[error("mountpoint for dataset {dataset} is unset")]
    MountpointUnset { dataset: String },
}

/// Result type for OS adapter operations.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn format_status(status: std::process::ExitStatus) -> String {
    match status.code() {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

/// Build a [`Error::Zfs`] from a failed process output.
pub(crate) fn zfs_failure(command: impl Into<String>, output: &std::process::Output) -> Error {
    Error::Zfs {
        command: command.into(),
        status: format_status(output.status),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

pub(crate) fn systemd_failure(command: impl Into<String>, output: &std::process::Output) -> Error {
    Error::Systemd {
        command: command.into(),
        status: format_status(output.status),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

pub(crate) fn firewall_failure(command: impl Into<String>, output: &std::process::Output) -> Error {
    Error::Firewall {
        command: command.into(),
        status: format_status(output.status),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

pub(crate) fn postgres_failure(command: impl Into<String>, output: &std::process::Output) -> Error {
    Error::Postgres {
        command: command.into(),
        status: format_status(output.status),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}
