use super::models::{Reachability, Target};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::RwLock;

/// Memoized local/external classification of target addresses.
#[derive(Debug, Default)]
pub struct TargetClassifier {
    memo: RwLock<HashMap<String, Reachability>>,
}

impl TargetClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&self, address: &str) -> Reachability {
        if let Some(hit) = self.memo.read().ok().and_then(|m| m.get(address).copied()) {
            return hit;
        }

        let class = if is_local(address) {
            Reachability::Local
        } else {
            Reachability::External
        };

        if let Ok(mut memo) = self.memo.write() {
            memo.insert(address.to_string(), class);
        }
        class
    }

    pub fn target(&self, address: &str) -> Target {
        Target {
            address: address.to_string(),
            reachability: self.classify(address),
        }
    }

    pub fn any_local<S: AsRef<str>>(&self, addresses: &[S]) -> bool {
        addresses
            .iter()
            .any(|a| self.classify(a.as_ref()) == Reachability::Local)
    }

    #[cfg(test)]
    pub fn cached(&self) -> usize {
        self.memo.read().map(|m| m.len()).unwrap_or(0)
    }
}

fn is_local(address: &str) -> bool {
    let address = address.trim();
    if address.eq_ignore_ascii_case("localhost") || address.starts_with("127.") {
        return true;
    }
    address
        .parse::<IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}
