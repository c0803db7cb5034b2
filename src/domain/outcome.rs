use serde::Deserialize;
use std::time::Duration;

/// Name of the per-iteration status check.
pub const STATUS_CHECK: &str = "status was 200";
pub const EXPECTED_STATUS: u16 = 200;

/// What came back from one transaction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseOutcome {
    pub status: u16,
    pub body: String,
    pub latency: Duration,
}

impl ResponseOutcome {
    pub fn new(status: u16, body: impl Into<String>, latency: Duration) -> Self {
        Self {
            status,
            body: body.into(),
            latency,
        }
    }

    pub fn status_ok(&self) -> bool {
        self.status == EXPECTED_STATUS
    }

    /// Diagnostic line for an unexpected status, `None` when the check passes.
    pub fn diagnostic(&self) -> Option<String> {
        if self.status_ok() {
            None
        } else {
            Some(format!("unexpected status {}: {}", self.status, self.body))
        }
    }

    /// Best-effort parse of the middleware's reply body.
    pub fn reply(&self) -> Option<TransactionReply> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Reply body returned by the middleware on success.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReply {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub internal_reference_id: Option<String>,
}
