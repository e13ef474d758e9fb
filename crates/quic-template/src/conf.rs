//! Template `postgresql.conf` overrides (spec §4.C).

/// Applied by in-place replacement if the non-commented key exists, else
/// appended.
pub fn conf_overrides(ssl_cert_file: &str, ssl_key_file: &str) -> Vec<(String, String)> {
    vec![
        ("shared_preload_libraries".to_string(), "''".to_string()),
        ("listen_addresses".to_string(), "'127.0.0.1'".to_string()),
        ("ssl".to_string(), "on".to_string()),
        ("ssl_cert_file".to_string(), format!("'{ssl_cert_file}'")),
        ("ssl_key_file".to_string(), format!("'{ssl_key_file}'")),
        ("ssl_ca_file".to_string(), "''".to_string()),
    ]
}
