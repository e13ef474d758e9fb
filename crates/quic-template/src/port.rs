//! Port allocation, identical rule to the branch engine (spec §4.D.1 step
//! 5): first port in range that both binds locally and carries no UFW
//! rule. Duplicated rather than shared across crates so the two engines
//! stay independently testable.

use crate::error::{Error, Result};
use quic_os::FirewallAdapter;
use tokio::net::TcpListener;

pub async fn allocate_port(firewall: &dyn FirewallAdapter, start: u16, end: u16) -> Result<u16> {
    for port in start..=end {
        if !port_is_bindable(port).await {
            continue;
        }
        if firewall.has_rule(port).await? {
            continue;
        }
        return Ok(port);
    }
    Err(Error::PortExhausted)
}

async fn port_is_bindable(port: u16) -> bool {
    TcpListener::bind(("0.0.0.0", port)).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeFirewall {
        rules: Mutex<HashSet<u16>>,
    }

    #[async_trait]
    impl FirewallAdapter for FakeFirewall {
        async fn open(&self, port: u16) -> quic_os::Result<()> {
            self.rules.lock().unwrap().insert(port);
            Ok(())
        }
        async fn close(&self, port: u16) -> quic_os::Result<()> {
            self.rules.lock().unwrap().remove(&port);
            Ok(())
        }
        async fn has_rule(&self, port: u16) -> quic_os::Result<bool> {
            Ok(self.rules.lock().unwrap().contains(&port))
        }
    }

    #[tokio::test]
    async fn skips_ports_with_existing_firewall_rule() {
        let firewall = FakeFirewall::default();
        firewall.rules.lock().unwrap().insert(19500);
        let port = allocate_port(&firewall, 19500, 19502).await.unwrap();
        assert_ne!(port, 19500);
    }

    #[tokio::test]
    async fn exhausted_range_is_an_error() {
        let firewall = FakeFirewall::default();
        let _held = TcpListener::bind(("0.0.0.0", 19600)).await.unwrap();
        firewall.rules.lock().unwrap().insert(19601);
        let err = allocate_port(&firewall, 19600, 19601).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::PortExhausted);
    }
}
