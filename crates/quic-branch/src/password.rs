//! Admin password generation (spec §4.D.1 step 6).

use rand::distributions::Alphanumeric;
use rand::Rng;

const PASSWORD_LEN: usize = 32;

/// A 32-character admin password drawn uniformly from `[a-zA-Z0-9]` using
/// a cryptographic RNG (`rand::thread_rng`, OS-entropy seeded).
pub fn generate_admin_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_32_char_alphanumeric_password() {
        let password = generate_admin_password();
        assert_eq!(password.len(), PASSWORD_LEN);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generates_distinct_passwords() {
        assert_ne!(generate_admin_password(), generate_admin_password());
    }
}
