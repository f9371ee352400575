//! Outbound notification port.

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[async_trait]
pub trait NotifyPort: Send + Sync {
    /// Deliver a notification. Implementations absorb delivery failures;
    /// notifications are best-effort and never fail the caller.
    async fn send(&self, title: &str, description: &str, severity: Severity);
}
