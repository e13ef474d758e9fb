//! OS adapter traits and shell-out implementations.
//!
//! Each adapter is a narrow capability interface over a single external
//! tool (`zfs`, `systemctl`, `ufw`, the PostgreSQL control binaries, the
//! audit log file). Production wiring supplies the real shell-out
//! implementations in this crate; tests stub the traits to simulate every
//! scenario without touching the host.

pub mod audit;
pub mod backup;
pub mod error;
pub mod firewall;
pub mod journal;
pub mod pgconf;
pub mod postgres;
pub mod systemd;
pub mod zfs;

pub use audit::{AuditRecord, AuditSink, FileAuditSink};
pub use backup::{BackupToolAdapter, PgBackRestAdapter, RestoreProcess};
pub use error::{Error, Result};
pub use firewall::{FirewallAdapter, UfwAdapter};
pub use journal::{JournalAdapter, JournalctlAdapter, JournalFollow};
pub use postgres::{PostgresAdapter, ShellPostgresAdapter};
pub use systemd::{ShellSystemdAdapter, SystemdAdapter};
pub use zfs::{ShellZfsAdapter, ZfsAdapter};
