use std::fmt;
use std::sync::Arc;

use super::classifier::TargetClassifier;
use super::deadline::Deadline;
use super::errors::ScanError;
use super::models::PortSet;
use super::ports::PortSpec;
use crate::plugins::types::DiscoveryEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// External high-rate SYN scan.
    Syn,
    /// In-process connect scan; needed whenever loopback targets are present.
    Connect,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Syn => write!(f, "syn"),
            Strategy::Connect => write!(f, "connect"),
        }
    }
}

pub struct DiscoverySelector {
    classifier: Arc<TargetClassifier>,
    syn: Arc<dyn DiscoveryEngine>,
    connect: Arc<dyn DiscoveryEngine>,
}

impl DiscoverySelector {
    pub fn new(
        classifier: Arc<TargetClassifier>,
        syn: Arc<dyn DiscoveryEngine>,
        connect: Arc<dyn DiscoveryEngine>,
    ) -> Self {
        Self { classifier, syn, connect }
    }

    /// Whole-batch decision: one local target sends the entire batch to the
    /// connect engine so the two engines never run against one batch.
    pub fn choose(&self, targets: &[String]) -> Strategy {
        if self.classifier.any_local(targets) {
            Strategy::Connect
        } else {
            Strategy::Syn
        }
    }

    pub async fn discover(
        &self,
        targets: &[String],
        spec: &PortSpec,
        rate: u32,
        deadline: Deadline,
    ) -> Result<(PortSet, Strategy), ScanError> {
        let strategy = self.choose(targets);
        if targets.is_empty() {
            return Ok((PortSet::new(), strategy));
        }

        let ports = spec.resolve();
        let engine = match strategy {
            Strategy::Syn => &self.syn,
            Strategy::Connect => &self.connect,
        };

        tracing::info!(
            "Discovery: {} targets x {} ports via {} ({})",
            targets.len(),
            ports.len(),
            engine.name(),
            strategy
        );

        let found = engine.scan(targets, &ports, rate, deadline).await?;
        tracing::info!(
            "Discovery found {} open ports on {} hosts",
            found.total_ports(),
            found.len()
        );
        Ok((found, strategy))
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every call and answers with a canned result.
    pub struct FakeEngine {
        pub name: &'static str,
        pub answer: Result<PortSet, String>,
        pub calls: Mutex<Vec<(Vec<String>, Vec<u16>, u32)>>,
    }

    impl FakeEngine {
        pub fn ok(name: &'static str, answer: PortSet) -> Arc<Self> {
            Arc::new(Self { name, answer: Ok(answer), calls: Mutex::new(Vec::new()) })
        }

        pub fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                answer: Err("engine unavailable".into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DiscoveryEngine for FakeEngine {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn scan(
            &self,
            targets: &[String],
            ports: &[u16],
            rate: u32,
            _deadline: Deadline,
        ) -> Result<PortSet, ScanError> {
            self.calls.lock().unwrap().push((targets.to_vec(), ports.to_vec(), rate));
            match &self.answer {
                Ok(set) => Ok(set
                    .iter()
                    .filter(|(host, _)| targets.contains(host))
                    .flat_map(|(host, found)| {
                        found
                            .iter()
                            .filter(|p| ports.contains(p))
                            .map(move |p| (host.clone(), *p))
                    })
                    .collect()),
                Err(msg) => Err(ScanError::Discovery(msg.clone())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::FakeEngine;
    use super::*;
    use crate::core::ports::camera_ports;
    use std::time::Duration;

    fn targets(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn mixed_batch_with_local_target_uses_connect_scan() {
        let syn = FakeEngine::ok("syn", PortSet::new());
        let connect = FakeEngine::ok(
            "connect",
            [("127.0.0.1".to_string(), 80)].into_iter().collect(),
        );
        let selector = DiscoverySelector::new(Arc::new(TargetClassifier::new()), syn.clone(), connect.clone());

        let batch = targets(&["127.0.0.1", "203.0.113.5"]);
        let (found, strategy) = selector
            .discover(&batch, &PortSpec::All, 1000, Deadline::after(Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(strategy, Strategy::Connect);
        assert_eq!(syn.call_count(), 0);
        assert_eq!(connect.call_count(), 1);
        let calls = connect.calls.lock().unwrap();
        assert_eq!(calls[0].0, batch);
        assert_eq!(found.ports("127.0.0.1").map(|p| p.len()), Some(1));
    }

    #[tokio::test]
    async fn external_batch_uses_syn_scan_with_camera_ports() {
        let syn = FakeEngine::ok("syn", PortSet::new());
        let connect = FakeEngine::ok("connect", PortSet::new());
        let selector = DiscoverySelector::new(Arc::new(TargetClassifier::new()), syn.clone(), connect.clone());

        let (found, strategy) = selector
            .discover(
                &targets(&["198.51.100.7", "203.0.113.5"]),
                &PortSpec::All,
                1000,
                Deadline::after(Duration::from_secs(5)),
            )
            .await
            .unwrap();

        assert_eq!(strategy, Strategy::Syn);
        assert!(found.is_empty());
        assert_eq!(connect.call_count(), 0);
        assert_eq!(syn.calls.lock().unwrap()[0].1, camera_ports());
    }

    #[tokio::test]
    async fn syn_setup_failure_is_fatal() {
        struct Missing;
        #[async_trait::async_trait]
        impl DiscoveryEngine for Missing {
            fn name(&self) -> &'static str {
                "missing"
            }
            async fn scan(&self, _: &[String], _: &[u16], _: u32, _: Deadline) -> Result<PortSet, ScanError> {
                Err(ScanError::Setup("masscan not found".into()))
            }
        }

        let selector = DiscoverySelector::new(
            Arc::new(TargetClassifier::new()),
            Arc::new(Missing),
            FakeEngine::ok("connect", PortSet::new()),
        );
        let err = selector
            .discover(&targets(&["203.0.113.5"]), &PortSpec::All, 1000, Deadline::after(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(err.is_setup());
    }
}
