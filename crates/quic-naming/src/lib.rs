//! Pure name and path derivation for templates and branches.
//!
//! Every function here is total over already-validated names: branch-name
//! normalization and rejection of reserved names happens one layer up, in
//! the service facade (see `quic-service`).

use std::path::PathBuf;

/// ZFS dataset name for a template: `<pool>/<template>`.
pub fn template_dataset(pool: &str, template: &str) -> String {
    format!("{pool}/{template}")
}

/// ZFS dataset name for a branch: `<pool>/<template>/<branch>`.
pub fn branch_dataset(pool: &str, template: &str, branch: &str) -> String {
    format!("{pool}/{template}/{branch}")
}

/// ZFS snapshot name for a branch: `<pool>/<template>@<branch>`.
pub fn snapshot_name(pool: &str, template: &str, branch: &str) -> String {
    format!("{pool}/{template}@{branch}")
}

/// Mountpoint of a branch's clone: `/opt/quic/<template>/<branch>`.
pub fn branch_mountpoint(root: &str, template: &str, branch: &str) -> PathBuf {
    PathBuf::from(root).join(template).join(branch)
}

/// Mountpoint of a template dataset: `/opt/quic/<template>/_restore`.
pub fn template_mountpoint(root: &str, template: &str) -> PathBuf {
    PathBuf::from(root).join(template).join("_restore")
}

/// systemd unit name for a template: `quic-<template>`.
pub fn template_service(template: &str) -> String {
    format!("quic-{template}")
}

/// systemd unit name for a branch: `quic-<template>-<branch>`.
pub fn branch_service(template: &str, branch: &str) -> String {
    format!("quic-{template}-{branch}")
}

/// Absolute path to a systemd unit file for a given unit name.
pub fn service_file(service_name: &str) -> PathBuf {
    PathBuf::from("/etc/systemd/system").join(format!("{service_name}.service"))
}

/// Reserved branch name: the template's own restore dataset uses this leaf.
pub const RESTORE_RESERVED_NAME: &str = "_restore";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_dataset_names() {
        assert_eq!(template_dataset("tank", "proj1"), "tank/proj1");
        assert_eq!(branch_dataset("tank", "proj1", "dev1"), "tank/proj1/dev1");
        assert_eq!(snapshot_name("tank", "proj1", "dev1"), "tank/proj1@dev1");
    }

    #[test]
    fn derives_mountpoints() {
        assert_eq!(
            branch_mountpoint("/opt/quic", "proj1", "dev1"),
            PathBuf::from("/opt/quic/proj1/dev1")
        );
        assert_eq!(
            template_mountpoint("/opt/quic", "proj1"),
            PathBuf::from("/opt/quic/proj1/_restore")
        );
    }

    #[test]
    fn derives_service_names_and_files() {
        assert_eq!(template_service("proj1"), "quic-proj1");
        assert_eq!(branch_service("proj1", "dev1"), "quic-proj1-dev1");
        assert_eq!(
            service_file("quic-proj1-dev1"),
            PathBuf::from("/etc/systemd/system/quic-proj1-dev1.service")
        );
    }
}
