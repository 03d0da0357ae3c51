use std::collections::BTreeSet;
use std::sync::Arc;

use super::deadline::Deadline;
use super::models::PortSet;
use crate::plugins::types::DiscoveryEngine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub ports: PortSet,
    /// The second pass failed and `ports` is the unverified discovery result.
    pub degraded: bool,
}

/// Re-confirms discovered ports with an independent pass at half the
/// discovery rate. Never adds ports.
pub struct Verifier {
    engine: Arc<dyn DiscoveryEngine>,
}

impl Verifier {
    pub fn new(engine: Arc<dyn DiscoveryEngine>) -> Self {
        Self { engine }
    }

    /// One batched pass over every discovered host and the union of their
    /// ports. Pairs the engine reports that discovery never claimed are
    /// dropped by the intersection.
    pub async fn verify(&self, discovered: &PortSet, rate: u32, deadline: Deadline) -> Verification {
        let rate = (rate / 2).max(1);
        let hosts: Vec<String> = discovered.iter().map(|(host, _)| host.clone()).collect();
        let ports: Vec<u16> = discovered
            .iter()
            .flat_map(|(_, open)| open.iter().copied())
            .collect::<BTreeSet<u16>>()
            .into_iter()
            .collect();

        let confirmed = match self.engine.scan(&hosts, &ports, rate, deadline).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(
                    engine = self.engine.name(),
                    error = %e,
                    "verification failed, continuing with unverified discovery results"
                );
                return Verification {
                    ports: discovered.clone(),
                    degraded: true,
                };
            }
        };

        let ports = discovered.intersect(&confirmed);
        debug_assert!(ports.is_subset_of(discovered));
        let dropped = discovered.total_ports() - ports.total_ports();
        if dropped > 0 {
            tracing::info!("Verification dropped {} unconfirmed ports", dropped);
        }
        Verification { ports, degraded: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::discovery::fakes::FakeEngine;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::time::Duration;

    fn set(pairs: &[(&str, u16)]) -> PortSet {
        pairs.iter().map(|(h, p)| (h.to_string(), *p)).collect()
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn failing_engine_falls_back_to_discovery() {
        let discovered = set(&[("198.51.100.7", 80), ("198.51.100.7", 554), ("203.0.113.5", 8080)]);
        let verifier = Verifier::new(FakeEngine::failing("verify"));
        let outcome = verifier.verify(&discovered, 1000, deadline()).await;
        assert!(outcome.degraded);
        assert_eq!(outcome.ports, discovered);
    }

    #[tokio::test]
    async fn result_is_intersection_at_half_rate() {
        let discovered = set(&[("198.51.100.7", 80), ("198.51.100.7", 554)]);
        let engine = FakeEngine::ok("verify", set(&[("198.51.100.7", 80), ("198.51.100.7", 443)]));
        let outcome = Verifier::new(engine.clone()).verify(&discovered, 1000, deadline()).await;
        assert!(!outcome.degraded);
        assert_eq!(outcome.ports, set(&[("198.51.100.7", 80)]));
        assert!(engine.calls.lock().unwrap().iter().all(|(_, _, rate)| *rate == 500));
    }

    #[tokio::test]
    async fn all_hosts_share_one_pass_over_the_port_union() {
        let discovered = set(&[("198.51.100.7", 80), ("198.51.100.7", 554), ("203.0.113.5", 8080), ("203.0.113.9", 80)]);
        let engine = FakeEngine::ok(
            "verify",
            set(&[("198.51.100.7", 80), ("198.51.100.7", 8080), ("203.0.113.5", 8080)]),
        );
        let outcome = Verifier::new(engine.clone()).verify(&discovered, 1000, deadline()).await;

        let calls = engine.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        let (hosts, ports, _) = &calls[0];
        assert_eq!(hosts.len(), 3);
        assert_eq!(ports, &vec![80, 554, 8080]);
        assert_eq!(outcome.ports, set(&[("198.51.100.7", 80), ("203.0.113.5", 8080)]));
    }

    #[tokio::test]
    async fn unconfirmed_host_disappears() {
        let discovered = set(&[("198.51.100.7", 80)]);
        let outcome = Verifier::new(FakeEngine::ok("verify", PortSet::new()))
            .verify(&discovered, 1, deadline())
            .await;
        assert!(outcome.ports.is_empty());
    }

    fn port_sets() -> impl Strategy<Value = PortSet> {
        prop::collection::vec((0u8..4, 1u16..40), 0..30).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(h, p)| (format!("10.0.0.{}", h), p))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn verified_ports_are_subset_of_discovered(discovered in port_sets(), engine_view in port_sets()) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let outcome = rt.block_on(async {
                Verifier::new(FakeEngine::ok("verify", engine_view))
                    .verify(&discovered, 100, deadline())
                    .await
            });
            prop_assert!(outcome.ports.is_subset_of(&discovered));
        }
    }
}
