//! The template setup engine (spec §4.C).

use crate::conf::conf_overrides;
use crate::config::TemplateEngineConfig;
use crate::error::{Error, Result};
use crate::model::{LogLevel, TemplateMetadata, TemplateSetupRequest, TemplateSetupResult};
use crate::port::allocate_port;
use crate::progress::ProgressSink;
use chrono::Utc;
use quic_os::systemd::render_pg_ctl_unit;
use quic_os::{BackupToolAdapter, FirewallAdapter, JournalAdapter, PostgresAdapter, SystemdAdapter, ZfsAdapter};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const RESTORE_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const READINESS_POLL_INTERVAL: Duration = Duration::from_secs(2);
const READINESS_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct TemplateEngine {
    config: TemplateEngineConfig,
    zfs: Arc<dyn ZfsAdapter>,
    systemd: Arc<dyn SystemdAdapter>,
    firewall: Arc<dyn FirewallAdapter>,
    postgres: Arc<dyn PostgresAdapter>,
    backup: Arc<dyn BackupToolAdapter>,
    journal: Arc<dyn JournalAdapter>,
}

impl TemplateEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: TemplateEngineConfig,
        zfs: Arc<dyn ZfsAdapter>,
        systemd: Arc<dyn SystemdAdapter>,
        firewall: Arc<dyn FirewallAdapter>,
        postgres: Arc<dyn PostgresAdapter>,
        backup: Arc<dyn BackupToolAdapter>,
        journal: Arc<dyn JournalAdapter>,
    ) -> Self {
        Self {
            config,
            zfs,
            systemd,
            firewall,
            postgres,
            backup,
            journal,
        }
    }

    pub fn config(&self) -> &TemplateEngineConfig {
        &self.config
    }

    /// Run the full template setup algorithm, streaming progress to
    /// `sink`. Not idempotent: a second call against an already-restored
    /// mountpoint fails at step 2.
    pub async fn run(
        &self,
        request: TemplateSetupRequest,
        sink: &mut dyn ProgressSink,
    ) -> Result<TemplateSetupResult> {
        match self.run_inner(&request, sink).await {
            Ok(result) => {
                sink.result(result.clone()).await;
                Ok(result)
            }
            Err(e) => {
                sink.error("template_setup", &e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        request: &TemplateSetupRequest,
        sink: &mut dyn ProgressSink,
    ) -> Result<TemplateSetupResult> {
        let template = &request.template_name;
        let stanza = template.clone();
        let dataset = quic_naming::template_dataset(&self.config.pool, template);
        let mount_path = quic_naming::template_mountpoint(&self.config.mount_root, template);
        let service_name = quic_naming::template_service(template);

        // Step 1: persist backup-tool config.
        sink.log("persisting backup tool configuration", LogLevel::Info).await;
        self.backup
            .write_config(Path::new(&self.config.pgbackrest_config_path), &request.pgbackrest_config)
            .await?;

        // Step 2: refuse to clobber an existing template.
        if tokio::fs::metadata(&mount_path).await.is_ok() {
            return Err(Error::AlreadyExists {
                path: mount_path.display().to_string(),
            });
        }

        // Step 3: create the dataset.
        sink.log(&format!("creating dataset {dataset}"), LogLevel::Info).await;
        self.zfs.create_dataset(&dataset, &mount_path).await?;

        // Step 4: streaming restore, with a heartbeat every 30s.
        self.run_restore(&stanza, &mount_path, &request.backup_token, sink).await?;

        // Step 5: hand the restored directory to the PostgreSQL system user.
        sink.log(&format!("setting ownership of {}", mount_path.display()), LogLevel::Info).await;
        self.postgres.chown_recursive(&mount_path).await?;

        // Step 6: rewrite postgresql.conf.
        sink.log("rewriting postgresql.conf", LogLevel::Info).await;
        self.rewrite_conf(&mount_path).await?;

        // Step 7: allocate a port.
        let port =
            allocate_port(self.firewall.as_ref(), self.config.port_range.0, self.config.port_range.1).await?;
        sink.log(&format!("allocated port {port}"), LogLevel::Info).await;

        // Step 8: install the unit.
        let unit = render_pg_ctl_unit(
            &format!("Quic template {template}"),
            &self.config.pg_user,
            &mount_path,
            port,
            "on-failure",
            5,
        );
        self.systemd.write_unit(&service_name, &unit).await?;

        // Step 9: start, stream journal, poll readiness.
        self.systemd.start(&service_name).await?;
        self.wait_until_ready(&service_name, &mount_path, sink).await?;

        // Step 10: persist metadata.
        let metadata = TemplateMetadata {
            template: template.clone(),
            stanza,
            database: request.database.clone(),
            mount_path: mount_path.clone(),
            port,
            service_name: service_name.clone(),
            created_at: Utc::now(),
        };
        write_template_metadata(&mount_path, &metadata).await?;

        Ok(TemplateSetupResult::from_metadata(&metadata))
    }

    async fn run_restore(
        &self,
        stanza: &str,
        mount_path: &Path,
        backup_token: &str,
        sink: &mut dyn ProgressSink,
    ) -> Result<()> {
        let mut restore = self.backup.spawn_restore(stanza, mount_path, backup_token).await?;
        let mut heartbeat = tokio::time::interval(RESTORE_HEARTBEAT_INTERVAL);
        heartbeat.tick().await; // first tick fires immediately; discard it

        let mut stdout_open = true;
        let mut stderr_open = true;
        let mut stderr_tail = Vec::new();

        while stdout_open || stderr_open {
            tokio::select! {
                line = restore.stdout.recv(), if stdout_open => {
                    match line {
                        Some(l) => sink.log(&l, LogLevel::Info).await,
                        None => stdout_open = false,
                    }
                }
                line = restore.stderr.recv(), if stderr_open => {
                    match line {
                        Some(l) => {
                            sink.log(&l, LogLevel::Warn).await;
                            stderr_tail.push(l);
                        }
                        None => stderr_open = false,
                    }
                }
                _ = heartbeat.tick() => {
                    sink.log("restore still in progress", LogLevel::Info).await;
                }
            }
        }

        restore.finish(&stderr_tail).await?;
        Ok(())
    }

    async fn rewrite_conf(&self, mount_path: &Path) -> Result<()> {
        let path = mount_path.join("postgresql.conf");
        let current = tokio::fs::read_to_string(&path).await.unwrap_or_default();
        let overrides = conf_overrides(&self.config.ssl_cert_file, &self.config.ssl_key_file);
        let overrides_ref: Vec<(&str, &str)> =
            overrides.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let commented = quic_os::pgconf::comment_out_include_dir(&current);
        let updated = quic_os::pgconf::apply_overrides(&commented, &overrides_ref);
        tokio::fs::write(&path, updated).await?;
        Ok(())
    }

    async fn wait_until_ready(
        &self,
        service_name: &str,
        mount_path: &Path,
        sink: &mut dyn ProgressSink,
    ) -> Result<()> {
        let mut follow = self.journal.follow(service_name).await.ok();
        let deadline = tokio::time::Instant::now() + READINESS_TIMEOUT;

        let result = loop {
            if let Some(f) = follow.as_mut() {
                while let Ok(line) = f.lines.try_recv() {
                    sink.log(&line, LogLevel::Info).await;
                }
            }

            if self.postgres.pg_ctl_status(mount_path).await.unwrap_or(false) {
                break Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                break Err(Error::StartupTimeout {
                    service: service_name.to_string(),
                });
            }
            tokio::time::sleep(READINESS_POLL_INTERVAL).await;
        };

        if let Some(f) = follow {
            f.stop().await;
        }

        result
    }
}

async fn write_template_metadata(mount_path: &Path, metadata: &TemplateMetadata) -> Result<()> {
    let path = mount_path.join(".quic-init-meta.json");
    let json = serde_json::to_string_pretty(metadata)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, &path).await?;
    Ok(())
}

pub async fn read_template_metadata(mount_path: &Path) -> Result<TemplateMetadata> {
    let path = mount_path.join(".quic-init-meta.json");
    let content = tokio::fs::read_to_string(&path).await?;
    Ok(serde_json::from_str(&content)?)
}
