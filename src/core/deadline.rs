use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout, Instant};

const MAX_BUDGET: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Run-scoped deadline. Every network operation is bounded by the smaller of
/// its own timeout and whatever is left of the run.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Budgets too large to represent are capped at roughly a century.
    pub fn after(budget: Duration) -> Self {
        let now = Instant::now();
        let at = now
            .checked_add(budget)
            .or_else(|| now.checked_add(MAX_BUDGET))
            .unwrap_or(now);
        Self { at }
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_elapsed(&self) -> bool {
        self.remaining().is_zero()
    }

    pub fn clamp(&self, op_timeout: Duration) -> Duration {
        op_timeout.min(self.remaining())
    }

    /// Runs `fut` under `clamp(op_timeout)`; `None` means it timed out.
    pub async fn within<F: Future>(&self, op_timeout: Duration, fut: F) -> Option<F::Output> {
        let budget = self.clamp(op_timeout);
        if budget.is_zero() {
            return None;
        }
        timeout(budget, fut).await.ok()
    }
}
