use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::enums::capture_statuses::CaptureStatus;

/// What the reconciler keeps about a gateway payment. The order itself only stores
/// `provider_ref`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentIntent {
    pub order_id: Uuid,
    pub provider_ref: String,
    pub approval_url: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
}

/// Normalised capture report; both the redirect and the webhook end up here.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureCallback {
    pub provider_ref: String,
    pub reported_amount_minor: Option<i64>,
    pub reported_status: CaptureStatus,
}

/// Body of the signed gateway webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureWebhookPayload {
    pub provider_ref: String,
    /// Decimal string as sent by the gateway, e.g. `"250.00"`.
    pub reported_amount: Option<String>,
    pub reported_status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureRedirectQuery {
    pub token: String,
    #[serde(rename = "PayerID")]
    pub payer_id: Option<String>,
}
