use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use crates::{
    domain::{
        entities::orders::OrderEntity,
        errors::{CommerceError, CommerceResult},
        repositories::commerce_store::CommerceStore,
        value_objects::{
            enums::{capture_statuses::CaptureStatus, order_statuses::OrderStatus},
            money,
            orders::OrderStatusDto,
            payments::{CaptureCallback, CaptureWebhookPayload, PaymentIntent},
        },
    },
    payments::{
        callback_signature,
        paypal_client::{CreateGatewayOrder, GatewayCapture, GatewayOrder, PaypalClient},
    },
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{
    order_ledger,
    retry::{RetryPolicy, retry_with_backoff},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: CreateGatewayOrder) -> AnyResult<GatewayOrder>;

    async fn capture_order(&self, provider_ref: &str) -> AnyResult<GatewayCapture>;

    async fn get_order(&self, provider_ref: &str) -> AnyResult<GatewayOrder>;
}

#[async_trait]
impl PaymentGateway for PaypalClient {
    async fn create_order(&self, request: CreateGatewayOrder) -> AnyResult<GatewayOrder> {
        Ok(PaypalClient::create_order(self, &request).await?)
    }

    async fn capture_order(&self, provider_ref: &str) -> AnyResult<GatewayCapture> {
        Ok(PaypalClient::capture_order(self, provider_ref).await?)
    }

    async fn get_order(&self, provider_ref: &str) -> AnyResult<GatewayOrder> {
        Ok(PaypalClient::get_order(self, provider_ref).await?)
    }
}

#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub tolerance_minor: i64,
    pub retry: RetryPolicy,
    pub webhook_secret: String,
    pub webhook_tolerance_secs: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    IntentCreated,
    Confirmed,
    Canceled,
    StillPending,
}

pub struct PaymentReconciler<S, G>
where
    S: CommerceStore + 'static,
    G: PaymentGateway + 'static,
{
    store: Arc<S>,
    gateway: Arc<G>,
    settings: ReconcilerSettings,
}

impl<S, G> PaymentReconciler<S, G>
where
    S: CommerceStore + 'static,
    G: PaymentGateway + 'static,
{
    pub fn new(store: Arc<S>, gateway: Arc<G>, settings: ReconcilerSettings) -> Self {
        Self {
            store,
            gateway,
            settings,
        }
    }

    /// Asks the gateway for a payment order and attaches its reference to `order`.
    ///
    /// The order id is the idempotency key, so calling this again for the same order gets
    /// the same reference back. When the gateway stays unavailable the order is left
    /// PENDING untouched.
    pub async fn create_intent(&self, order: &OrderEntity) -> CommerceResult<PaymentIntent> {
        let status = order.current_status()?;
        if status != OrderStatus::Pending {
            return Err(CommerceError::invalid_transition(
                "payment intent",
                status,
                "created",
            ));
        }
        if !order.payment_method()?.requires_gateway() {
            return Err(CommerceError::InvalidInput(format!(
                "order {} is not paid through the gateway",
                order.id
            )));
        }

        info!(
            order_id = %order.id,
            amount_minor = order.total_price_minor,
            currency = %order.currency,
            "payments: creating payment intent"
        );

        let gateway_order = retry_with_backoff(self.settings.retry, "create payment order", || {
            self.gateway.create_order(CreateGatewayOrder {
                reference_id: order.id.to_string(),
                amount_minor: order.total_price_minor,
                currency: order.currency.clone(),
            })
        })
        .await
        .map_err(|err| {
            error!(
                order_id = %order.id,
                error = %err,
                operator_alert = true,
                "payments: gateway unavailable, order left pending"
            );
            CommerceError::GatewayUnavailable(err.to_string())
        })?;

        if let Some(amount) = gateway_order.amount_minor {
            if amount != order.total_price_minor {
                warn!(
                    order_id = %order.id,
                    provider_ref = %gateway_order.provider_ref,
                    expected_minor = order.total_price_minor,
                    reported_minor = amount,
                    "payments: gateway echoed a different amount"
                );
            }
        }

        let provider_ref = gateway_order.provider_ref.clone();
        self.store
            .transaction(|tx| order_ledger::attach_provider_ref(tx, order.id, &provider_ref))
            .inspect_err(|err| {
                error!(
                    order_id = %order.id,
                    %provider_ref,
                    error = %err,
                    "payments: failed to attach provider reference"
                );
            })?;

        info!(
            order_id = %order.id,
            %provider_ref,
            "payments: payment intent attached"
        );

        Ok(PaymentIntent {
            order_id: order.id,
            provider_ref,
            approval_url: gateway_order.approval_url,
            amount_minor: order.total_price_minor,
            currency: order.currency.clone(),
            status: gateway_order.status,
        })
    }

    /// Client-initiated retry of intent creation for one of the caller's own orders.
    pub async fn retry_intent(&self, user_id: Uuid, order_id: Uuid) -> CommerceResult<PaymentIntent> {
        let order = self
            .store
            .transaction(|tx| tx.find_order(order_id))?
            .ok_or(CommerceError::NotFound("order"))?;
        if order.user_id != user_id {
            return Err(CommerceError::Forbidden);
        }

        self.create_intent(&order).await
    }

    /// Applies a capture report to the order holding `provider_ref`.
    ///
    /// Safe to call repeatedly with the same report: success on a CONFIRMED order and
    /// failure on a CANCELED order change nothing. A success is only applied when the
    /// reported amount is within tolerance of the stored total.
    pub fn handle_capture_callback(&self, callback: &CaptureCallback) -> CommerceResult<OrderEntity> {
        let tolerance = self.settings.tolerance_minor;

        let result = self.store.transaction(|tx| {
            let order = tx
                .find_order_by_provider_ref(&callback.provider_ref)?
                .ok_or(CommerceError::NotFound("order"))?;
            let status = order.current_status()?;

            match (callback.reported_status, status) {
                (CaptureStatus::Processing, _) => Ok(order),
                (CaptureStatus::Succeeded, OrderStatus::Confirmed)
                | (CaptureStatus::Failed, OrderStatus::Canceled) => {
                    debug!(
                        order_id = %order.id,
                        status = %status,
                        "payments: duplicate capture report ignored"
                    );
                    Ok(order)
                }
                (CaptureStatus::Succeeded, OrderStatus::Canceled) => Err(
                    CommerceError::invalid_transition("order", status, OrderStatus::Confirmed),
                ),
                (CaptureStatus::Succeeded, OrderStatus::Pending) => {
                    let reported = callback.reported_amount_minor.ok_or_else(|| {
                        CommerceError::InvalidInput(
                            "successful capture without an amount".to_string(),
                        )
                    })?;
                    money::ensure_within_tolerance(order.total_price_minor, reported, tolerance)?;
                    order_ledger::finalize_order(tx, order.id, Some(&callback.provider_ref))
                }
                (CaptureStatus::Failed, _) => {
                    let canceled = order_ledger::cancel_order(tx, order.id, order.user_id)?;
                    order_ledger::restore_cart_items(tx, &canceled)?;
                    Ok(canceled)
                }
            }
        });

        match &result {
            Ok(order) => info!(
                provider_ref = %callback.provider_ref,
                order_id = %order.id,
                reported_status = %callback.reported_status,
                status = %order.status,
                "payments: capture report applied"
            ),
            Err(CommerceError::AmountMismatch {
                expected_minor,
                reported_minor,
            }) => error!(
                provider_ref = %callback.provider_ref,
                expected_minor,
                reported_minor,
                operator_alert = true,
                "payments: captured amount does not match order total, order left pending"
            ),
            Err(err @ CommerceError::InvalidState { .. }) => error!(
                provider_ref = %callback.provider_ref,
                reported_status = %callback.reported_status,
                error = %err,
                operator_alert = true,
                "payments: capture report contradicts final order state"
            ),
            Err(err) => warn!(
                provider_ref = %callback.provider_ref,
                reported_status = %callback.reported_status,
                error = %err,
                "payments: capture report not applied"
            ),
        }

        result
    }

    /// Redirect path: the payer came back from the gateway with `token`.
    pub async fn capture_by_token(&self, provider_ref: &str) -> CommerceResult<OrderStatusDto> {
        let order = self
            .store
            .transaction(|tx| tx.find_order_by_provider_ref(provider_ref))?
            .ok_or(CommerceError::NotFound("order"))?;

        if order.current_status()?.is_terminal() {
            debug!(
                order_id = %order.id,
                status = %order.status,
                "payments: capture redirect replayed on settled order"
            );
            return Ok(OrderStatusDto {
                order_id: order.id,
                status: order.status,
            });
        }

        let capture = retry_with_backoff(self.settings.retry, "capture payment order", || {
            self.gateway.capture_order(provider_ref)
        })
        .await
        .map_err(|err| {
            error!(
                order_id = %order.id,
                %provider_ref,
                error = %err,
                operator_alert = true,
                "payments: capture failed, order left pending"
            );
            CommerceError::GatewayUnavailable(err.to_string())
        })?;

        let order = self.handle_capture_callback(&CaptureCallback {
            provider_ref: capture.provider_ref,
            reported_amount_minor: capture.captured_amount_minor,
            reported_status: CaptureStatus::from_provider(&capture.status),
        })?;

        Ok(OrderStatusDto {
            order_id: order.id,
            status: order.status,
        })
    }

    /// Signed webhook path. `now_unix` is the receive time used for the replay window.
    pub fn handle_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
        now_unix: i64,
    ) -> CommerceResult<OrderStatusDto> {
        callback_signature::verify(
            &self.settings.webhook_secret,
            payload,
            signature_header,
            now_unix,
            self.settings.webhook_tolerance_secs,
        )
        .map_err(|err| {
            warn!(error = %err, "payments: webhook signature rejected");
            CommerceError::InvalidInput("invalid webhook signature".to_string())
        })?;

        let body: CaptureWebhookPayload = serde_json::from_slice(payload)
            .map_err(|err| CommerceError::InvalidInput(format!("invalid webhook body: {err}")))?;

        let reported_amount_minor = match body.reported_amount.as_deref() {
            Some(raw) => Some(money::parse_decimal_to_minor(raw).ok_or_else(|| {
                CommerceError::InvalidInput(format!("invalid reported_amount: {raw}"))
            })?),
            None => None,
        };

        let order = self.handle_capture_callback(&CaptureCallback {
            provider_ref: body.provider_ref,
            reported_amount_minor,
            reported_status: CaptureStatus::from_provider(&body.reported_status),
        })?;

        Ok(OrderStatusDto {
            order_id: order.id,
            status: order.status,
        })
    }

    /// One sweep step for a PENDING gateway order: create the missing intent, or ask the
    /// gateway what became of the existing one. Never cancels on ambiguity.
    pub async fn reconcile_pending(&self, order: &OrderEntity) -> CommerceResult<ReconcileOutcome> {
        let Some(provider_ref) = order.provider_ref.as_deref() else {
            self.create_intent(order).await?;
            return Ok(ReconcileOutcome::IntentCreated);
        };

        let gateway_order = retry_with_backoff(self.settings.retry, "get payment order", || {
            self.gateway.get_order(provider_ref)
        })
        .await
        .map_err(|err| CommerceError::GatewayUnavailable(err.to_string()))?;

        let reported_status = CaptureStatus::from_provider(&gateway_order.status);
        if reported_status == CaptureStatus::Processing {
            debug!(
                order_id = %order.id,
                %provider_ref,
                gateway_status = %gateway_order.status,
                "payments: gateway order still open"
            );
            return Ok(ReconcileOutcome::StillPending);
        }

        let updated = self.handle_capture_callback(&CaptureCallback {
            provider_ref: provider_ref.to_string(),
            reported_amount_minor: gateway_order.captured_amount_minor,
            reported_status,
        })?;

        Ok(match updated.current_status()? {
            OrderStatus::Confirmed => ReconcileOutcome::Confirmed,
            OrderStatus::Canceled => ReconcileOutcome::Canceled,
            OrderStatus::Pending => ReconcileOutcome::StillPending,
        })
    }
}
