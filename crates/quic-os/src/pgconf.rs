//! PostgreSQL data-directory and config-file manipulation shared by the
//! template initializer and the branch lifecycle engine.

use std::path::Path;

/// Apply `(key, value)` overrides to a `postgresql.conf`-style file's
/// contents: replace the first non-commented `key = ...` line if present,
/// else append `key = value` at the end. Order of `overrides` is
/// preserved for appended keys.
pub fn apply_overrides(content: &str, overrides: &[(&str, &str)]) -> String {
    let mut lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();
    let mut applied = vec![false; overrides.len()];

    for line in lines.iter_mut() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            continue;
        }
        for (idx, (key, value)) in overrides.iter().enumerate() {
            if applied[idx] {
                continue;
            }
            if trimmed.starts_with(key.as_ref() as &str)
                && trimmed[key.len()..].trim_start().starts_with('=')
            {
                *line = format!("{key} = {value}");
                applied[idx] = true;
            }
        }
    }

    for (idx, (key, value)) in overrides.iter().enumerate() {
        if !applied[idx] {
            lines.push(format!("{key} = {value}"));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Comment out any `include_dir` directive lines.
pub fn comment_out_include_dir(content: &str) -> String {
    content
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with("include_dir") {
                format!("#{line}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}

/// Remove standby/recovery sentinel files and any stale `postmaster.pid`
/// from a data directory. Missing files are not errors (spec §4.D.1 step 9).
pub async fn remove_recovery_markers(data_dir: &Path) -> std::io::Result<()> {
    for name in ["standby.signal", "recovery.signal", "recovery.conf", "postmaster.pid"] {
        let path = data_dir.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Read the port PostgreSQL is listening on from `postmaster.pid` (the
/// fourth line of the file), if the file exists and is well-formed.
pub async fn read_postmaster_port(data_dir: &Path) -> Option<u16> {
    let content = tokio::fs::read_to_string(data_dir.join("postmaster.pid"))
        .await
        .ok()?;
    content.lines().nth(3)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_existing_key() {
        let content = "shared_buffers = 32MB\n#ssl = off\n";
        let out = apply_overrides(content, &[("shared_buffers", "128MB")]);
        assert!(out.contains("shared_buffers = 128MB"));
        assert!(!out.contains("32MB"));
    }

    #[test]
    fn appends_missing_key() {
        let content = "shared_buffers = 32MB\n";
        let out = apply_overrides(content, &[("max_connections", "5")]);
        assert!(out.contains("max_connections = 5"));
    }

    #[test]
    fn does_not_touch_commented_lines() {
        let content = "#shared_buffers = 32MB\n";
        let out = apply_overrides(content, &[("shared_buffers", "128MB")]);
        assert!(out.contains("#shared_buffers = 32MB"));
        assert!(out.contains("shared_buffers = 128MB"));
    }

    #[test]
    fn comments_out_include_dir() {
        let content = "include_dir = 'conf.d'\nother = 1\n";
        let out = comment_out_include_dir(content);
        assert!(out.contains("#include_dir = 'conf.d'"));
        assert!(out.contains("other = 1"));
    }
}
