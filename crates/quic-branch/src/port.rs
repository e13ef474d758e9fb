//! Port allocation (spec §4.D.1 step 5).

use crate::error::{Error, Result};
use quic_os::FirewallAdapter;
use tokio::net::TcpListener;

/// Iterate `start..=end`, returning the first port that accepts a local
/// bind attempt and has no pre-existing UFW rule. Fails with
/// [`Error::PortExhausted`] if none qualify.
pub async fn allocate_port(
    firewall: &dyn FirewallAdapter,
    start: u16,
    end: u16,
) -> Result<u16> {
    for port in start..=end {
        if !port_is_bindable(port).await {
            continue;
        }
        match firewall.has_rule(port).await {
            Ok(true) => continue,
            Ok(false) => return Ok(port),
            Err(_) => continue,
        }
    }
    Err(Error::PortExhausted)
}

async fn port_is_bindable(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quic_os::Result as OsResult;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeFirewall {
        rules: Mutex<HashSet<u16>>,
    }

    #[async_trait]
    impl FirewallAdapter for FakeFirewall {
        async fn open(&self, port: u16) -> OsResult<()> {
            self.rules.lock().unwrap().insert(port);
            Ok(())
        }
        async fn close(&self, port: u16) -> OsResult<()> {
            self.rules.lock().unwrap().remove(&port);
            Ok(())
        }
        async fn has_rule(&self, port: u16) -> OsResult<bool> {
            Ok(self.rules.lock().unwrap().contains(&port))
        }
    }

    #[tokio::test]
    async fn allocates_first_free_port() {
        let firewall = FakeFirewall::default();
        let port = allocate_port(&firewall, 18000, 18010).await.unwrap();
        assert!((18000..=18010).contains(&port));
    }

    #[tokio::test]
    async fn skips_ports_with_existing_firewall_rule() {
        let firewall = FakeFirewall::default();
        firewall.open(18020).await.unwrap();
        let port = allocate_port(&firewall, 18020, 18020).await;
        assert!(matches!(port, Err(Error::PortExhausted)));
    }
}
