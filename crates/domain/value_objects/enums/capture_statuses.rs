use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Outcome of a payment as reported by the gateway, collapsed to what the ledger acts on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStatus {
    Succeeded,
    Failed,
    /// Anything the gateway has not settled yet (created, approved, pending review).
    Processing,
}

impl CaptureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureStatus::Succeeded => "succeeded",
            CaptureStatus::Failed => "failed",
            CaptureStatus::Processing => "processing",
        }
    }

    /// Maps provider vocabulary (PayPal order/capture states and our own webhook values).
    pub fn from_provider(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" | "SUCCESS" | "SUCCEEDED" => CaptureStatus::Succeeded,
            "DECLINED" | "FAILED" | "FAILURE" | "VOIDED" | "DENIED" => CaptureStatus::Failed,
            _ => CaptureStatus::Processing,
        }
    }
}

impl Display for CaptureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
