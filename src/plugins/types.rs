use async_trait::async_trait;
use crate::core::{deadline::Deadline, errors::ScanError, models::PortSet};

/// A port discovery backend. Implementations report open ports only; hosts
/// with nothing open are absent from the returned set.
#[async_trait]
pub trait DiscoveryEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn scan(
        &self,
        targets: &[String],
        ports: &[u16],
        rate: u32,
        deadline: Deadline,
    ) -> Result<PortSet, ScanError>;
}
