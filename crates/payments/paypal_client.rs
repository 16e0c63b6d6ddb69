use std::time::{Duration, Instant};

use reqwest::{StatusCode, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::domain::value_objects::money::{format_minor, parse_decimal_to_minor};

const IDEMPOTENCY_HEADER: &str = "PayPal-Request-Id";
const ALREADY_CAPTURED: &str = "ORDER_ALREADY_CAPTURED";

#[derive(Debug, Clone)]
pub struct PaypalSettings {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub return_url: String,
    pub cancel_url: String,
    pub brand_name: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway unreachable during {context}: {message}")]
    Transport {
        context: &'static str,
        message: String,
    },
    #[error("gateway rejected {context} with status {status}")]
    Rejected {
        context: &'static str,
        status: u16,
        issue: Option<String>,
    },
    #[error("unexpected gateway response during {context}: {message}")]
    Malformed {
        context: &'static str,
        message: String,
    },
}

impl GatewayError {
    /// Timeouts, connection failures, 429 and 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport { .. } => true,
            GatewayError::Rejected { status, .. } => *status == 429 || *status >= 500,
            GatewayError::Malformed { .. } => false,
        }
    }

    fn transport(context: &'static str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            "connection failed".to_string()
        } else {
            err.to_string()
        };
        GatewayError::Transport { context, message }
    }

    fn malformed(context: &'static str, message: impl ToString) -> Self {
        GatewayError::Malformed {
            context,
            message: message.to_string(),
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Gateway view of a payment order.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayOrder {
    pub provider_ref: String,
    pub status: String,
    pub approval_url: Option<String>,
    pub amount_minor: Option<i64>,
    /// Sum of completed captures, if any were reported.
    pub captured_amount_minor: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayCapture {
    pub provider_ref: String,
    pub status: String,
    pub captured_amount_minor: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PaypalErrorEnvelope {
    name: Option<String>,
    message: Option<String>,
    debug_id: Option<String>,
    #[serde(default)]
    details: Vec<PaypalErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct PaypalErrorDetail {
    issue: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaypalAmount {
    currency_code: Option<String>,
    value: String,
}

#[derive(Debug, Deserialize)]
struct PaypalLink {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct PaypalCaptureRecord {
    status: Option<String>,
    amount: Option<PaypalAmount>,
}

#[derive(Debug, Deserialize, Default)]
struct PaypalPayments {
    #[serde(default)]
    captures: Vec<PaypalCaptureRecord>,
}

#[derive(Debug, Deserialize)]
struct PaypalPurchaseUnit {
    amount: Option<PaypalAmount>,
    payments: Option<PaypalPayments>,
}

#[derive(Debug, Deserialize)]
struct PaypalOrderResponse {
    id: String,
    status: String,
    #[serde(default)]
    links: Vec<PaypalLink>,
    #[serde(default)]
    purchase_units: Vec<PaypalPurchaseUnit>,
}

impl PaypalOrderResponse {
    fn approval_url(&self) -> Option<String> {
        self.links
            .iter()
            .find(|link| link.rel == "approve" || link.rel == "payer-action")
            .map(|link| link.href.clone())
    }

    fn amount_minor(&self) -> Option<i64> {
        self.purchase_units
            .first()
            .and_then(|unit| unit.amount.as_ref())
            .and_then(|amount| parse_decimal_to_minor(&amount.value))
    }

    fn captured_amount_minor(&self) -> Option<i64> {
        let completed: Vec<i64> = self
            .purchase_units
            .iter()
            .filter_map(|unit| unit.payments.as_ref())
            .flat_map(|payments| payments.captures.iter())
            .filter(|capture| capture.status.as_deref() == Some("COMPLETED"))
            .filter_map(|capture| capture.amount.as_ref())
            .filter_map(|amount| parse_decimal_to_minor(&amount.value))
            .collect();

        if completed.is_empty() {
            None
        } else {
            Some(completed.iter().sum())
        }
    }

    fn into_order(self) -> GatewayOrder {
        GatewayOrder {
            approval_url: self.approval_url(),
            amount_minor: self.amount_minor(),
            captured_amount_minor: self.captured_amount_minor(),
            provider_ref: self.id,
            status: self.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateGatewayOrder {
    /// Our order id; doubles as the idempotency key.
    pub reference_id: String,
    pub amount_minor: i64,
    pub currency: String,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Minimal PayPal Orders v2 client built on reqwest.
pub struct PaypalClient {
    http: reqwest::Client,
    settings: PaypalSettings,
    token: Mutex<Option<CachedToken>>,
}

impl PaypalClient {
    pub fn new(settings: PaypalSettings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            http,
            settings,
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &'static str,
    ) -> GatewayResult<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let debug_id = resp
            .headers()
            .get("paypal-debug-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let envelope = serde_json::from_str::<PaypalErrorEnvelope>(&body).ok();
        let (error_name, error_message, issue, issue_description) = match &envelope {
            Some(envelope) => {
                let detail = envelope.details.first();
                (
                    envelope.name.clone(),
                    envelope.message.clone(),
                    detail.and_then(|d| d.issue.clone()),
                    detail.and_then(|d| d.description.clone()),
                )
            }
            None => (None, None, None, None),
        };
        let debug_id = debug_id.or_else(|| envelope.and_then(|e| e.debug_id));

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            warn!(
                status = %status,
                paypal_debug_id = ?debug_id,
                paypal_error_name = ?error_name,
                context = %context,
                "paypal: transient api failure"
            );
        } else {
            error!(
                status = %status,
                paypal_debug_id = ?debug_id,
                paypal_error_name = ?error_name,
                paypal_error_message = ?error_message,
                paypal_issue = ?issue,
                paypal_issue_description = ?issue_description,
                response_body = %body,
                context = %context,
                "paypal: api request failed"
            );
        }

        Err(GatewayError::Rejected {
            context,
            status: status.as_u16(),
            issue,
        })
    }

    /// OAuth client-credentials token, reused until shortly before it expires.
    async fn access_token(&self) -> GatewayResult<String> {
        const CONTEXT: &str = "fetch access token";

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.access_token.clone());
            }
        }

        let resp = self
            .http
            .post(self.url("/v1/oauth2/token"))
            .basic_auth(&self.settings.client_id, Some(&self.settings.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|err| GatewayError::transport(CONTEXT, err))?;
        let resp = Self::ensure_success(resp, CONTEXT).await?;

        #[derive(Deserialize)]
        struct TokenResp {
            access_token: String,
            expires_in: u64,
        }

        let parsed: TokenResp = resp
            .json()
            .await
            .map_err(|err| GatewayError::malformed(CONTEXT, err))?;

        let lifetime = Duration::from_secs(parsed.expires_in.saturating_sub(60));
        *cached = Some(CachedToken {
            access_token: parsed.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        debug!(expires_in = parsed.expires_in, "paypal: access token refreshed");

        Ok(parsed.access_token)
    }

    /// Creates a CAPTURE-intent order. Repeating the call with the same reference id returns
    /// the order created the first time.
    pub async fn create_order(&self, request: &CreateGatewayOrder) -> GatewayResult<GatewayOrder> {
        const CONTEXT: &str = "create order";
        let token = self.access_token().await?;

        let mut experience = json!({
            "return_url": self.settings.return_url,
            "cancel_url": self.settings.cancel_url,
            "user_action": "PAY_NOW",
            "shipping_preference": "NO_SHIPPING",
        });
        if let Some(brand_name) = &self.settings.brand_name {
            experience["brand_name"] = json!(brand_name);
        }

        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": request.reference_id,
                "custom_id": request.reference_id,
                "amount": {
                    "currency_code": request.currency,
                    "value": format_minor(request.amount_minor),
                },
            }],
            "application_context": experience,
        });

        let resp = self
            .http
            .post(self.url("/v2/checkout/orders"))
            .bearer_auth(token)
            .header(IDEMPOTENCY_HEADER, &request.reference_id)
            .json(&body)
            .send()
            .await
            .map_err(|err| GatewayError::transport(CONTEXT, err))?;
        let resp = Self::ensure_success(resp, CONTEXT).await?;

        let parsed: PaypalOrderResponse = resp
            .json()
            .await
            .map_err(|err| GatewayError::malformed(CONTEXT, err))?;
        let order = parsed.into_order();

        if order.approval_url.is_none() {
            warn!(
                provider_ref = %order.provider_ref,
                status = %order.status,
                "paypal: created order has no approval link"
            );
        }

        Ok(order)
    }

    /// Captures an approved order. An order that was already captured is looked up instead,
    /// so a replayed redirect still reports the final state.
    pub async fn capture_order(&self, provider_ref: &str) -> GatewayResult<GatewayCapture> {
        const CONTEXT: &str = "capture order";
        let token = self.access_token().await?;

        let resp = self
            .http
            .post(self.url(&format!("/v2/checkout/orders/{provider_ref}/capture")))
            .bearer_auth(token)
            .header(IDEMPOTENCY_HEADER, format!("capture-{provider_ref}"))
            .header(CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await
            .map_err(|err| GatewayError::transport(CONTEXT, err))?;

        let resp = match Self::ensure_success(resp, CONTEXT).await {
            Ok(resp) => resp,
            Err(GatewayError::Rejected { issue: Some(issue), .. }) if issue == ALREADY_CAPTURED => {
                debug!(%provider_ref, "paypal: order already captured, reading current state");
                let order = self.get_order(provider_ref).await?;
                return Ok(GatewayCapture {
                    provider_ref: order.provider_ref,
                    status: order.status,
                    captured_amount_minor: order.captured_amount_minor,
                });
            }
            Err(err) => return Err(err),
        };

        let parsed: PaypalOrderResponse = resp
            .json()
            .await
            .map_err(|err| GatewayError::malformed(CONTEXT, err))?;

        Ok(GatewayCapture {
            captured_amount_minor: parsed.captured_amount_minor(),
            provider_ref: parsed.id,
            status: parsed.status,
        })
    }

    pub async fn get_order(&self, provider_ref: &str) -> GatewayResult<GatewayOrder> {
        const CONTEXT: &str = "get order";
        let token = self.access_token().await?;

        let resp = self
            .http
            .get(self.url(&format!("/v2/checkout/orders/{provider_ref}")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| GatewayError::transport(CONTEXT, err))?;
        let resp = Self::ensure_success(resp, CONTEXT).await?;

        let parsed: PaypalOrderResponse = resp
            .json()
            .await
            .map_err(|err| GatewayError::malformed(CONTEXT, err))?;

        Ok(parsed.into_order())
    }
}
