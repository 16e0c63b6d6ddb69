use std::{sync::Arc, time::Duration};

use anyhow::Result;
use backend::usecases::payment_reconciler::{PaymentGateway, PaymentReconciler, ReconcileOutcome};
use chrono::{DateTime, Utc};
use crates::domain::{
    repositories::{commerce_store::CommerceStore, orders::OrderQueryRepository},
    value_objects::enums::payment_methods::PaymentMethod,
};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct SweepSettings {
    pub interval: Duration,
    pub grace_period: chrono::Duration,
    pub batch_size: i64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub intents_created: usize,
    pub confirmed: usize,
    pub canceled: usize,
    pub still_pending: usize,
    pub failed: usize,
}

impl SweepReport {
    fn record(&mut self, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::IntentCreated => self.intents_created += 1,
            ReconcileOutcome::Confirmed => self.confirmed += 1,
            ReconcileOutcome::Canceled => self.canceled += 1,
            ReconcileOutcome::StillPending => self.still_pending += 1,
        }
    }
}

/// Periodically revisits gateway-paid orders stuck in PENDING: creates the intents that
/// checkout could not, and pulls capture results whose webhook never arrived.
pub struct ReconciliationSweep<S, Q, G>
where
    S: CommerceStore + 'static,
    Q: OrderQueryRepository + Send + Sync + 'static,
    G: PaymentGateway + 'static,
{
    query: Arc<Q>,
    reconciler: Arc<PaymentReconciler<S, G>>,
    settings: SweepSettings,
}

impl<S, Q, G> ReconciliationSweep<S, Q, G>
where
    S: CommerceStore + 'static,
    Q: OrderQueryRepository + Send + Sync + 'static,
    G: PaymentGateway + 'static,
{
    pub fn new(
        query: Arc<Q>,
        reconciler: Arc<PaymentReconciler<S, G>>,
        settings: SweepSettings,
    ) -> Self {
        Self {
            query,
            reconciler,
            settings,
        }
    }

    pub async fn run(&self) -> Result<()> {
        info!(
            interval_secs = self.settings.interval.as_secs(),
            grace_period_secs = self.settings.grace_period.num_seconds(),
            batch_size = self.settings.batch_size,
            "reconcile: sweep loop started"
        );

        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(err) = self.sweep_once(Utc::now()).await {
                error!(error = ?err, "reconcile: sweep failed");
            }
        }
    }

    /// One pass over the stale PENDING orders swept least recently. A failing order is logged
    /// and skipped. Every visited order is stamped so the next pass moves on to others.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let created_before = now - self.settings.grace_period;
        let orders = self
            .query
            .list_stale_pending_orders(
                PaymentMethod::Paypal.to_string(),
                created_before,
                self.settings.batch_size,
            )
            .await?;

        let mut report = SweepReport {
            scanned: orders.len(),
            ..SweepReport::default()
        };
        if orders.is_empty() {
            debug!("reconcile: no stale pending orders");
            return Ok(report);
        }

        for order in &orders {
            match self.reconciler.reconcile_pending(order).await {
                Ok(outcome) => {
                    debug!(order_id = %order.id, ?outcome, "reconcile: order visited");
                    report.record(outcome);
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        order_id = %order.id,
                        provider_ref = order.provider_ref.as_deref().unwrap_or("-"),
                        error = %err,
                        "reconcile: order left for the next sweep"
                    );
                }
            }
        }

        let visited = orders.iter().map(|order| order.id).collect();
        if let Err(err) = self.query.mark_reconciled(visited, now).await {
            warn!(error = ?err, "reconcile: could not stamp visited orders");
        }

        info!(
            scanned = report.scanned,
            intents_created = report.intents_created,
            confirmed = report.confirmed,
            canceled = report.canceled,
            still_pending = report.still_pending,
            failed = report.failed,
            "reconcile: sweep finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    };

    use super::*;
    use async_trait::async_trait;
    use backend::usecases::{payment_reconciler::ReconcilerSettings, retry::RetryPolicy};
    use crates::{
        domain::{
            entities::{order_line_items::OrderLineItemEntity, orders::OrderEntity},
            errors::CommerceResult,
            repositories::{
                commerce_store::{CommerceTx, MockCommerceTx},
                orders::MockOrderQueryRepository,
            },
        },
        payments::paypal_client::{
            CreateGatewayOrder, GatewayCapture, GatewayError, GatewayOrder,
        },
    };
    use mockall::{mock, predicate::eq};
    use uuid::Uuid;

    mock! {
        pub Gateway {}

        #[async_trait]
        impl PaymentGateway for Gateway {
            async fn create_order(&self, request: CreateGatewayOrder) -> anyhow::Result<GatewayOrder>;
            async fn capture_order(&self, provider_ref: &str) -> anyhow::Result<GatewayCapture>;
            async fn get_order(&self, provider_ref: &str) -> anyhow::Result<GatewayOrder>;
        }
    }

    /// Hands every transaction the same mocked handle.
    struct MockStore {
        tx: Mutex<MockCommerceTx>,
    }

    impl CommerceStore for MockStore {
        fn transaction<T, F>(&self, work: F) -> CommerceResult<T>
        where
            F: FnOnce(&mut dyn CommerceTx) -> CommerceResult<T>,
        {
            let mut tx = self.tx.lock().unwrap();
            work(&mut *tx)
        }
    }

    fn pending_order(provider_ref: Option<&str>) -> OrderEntity {
        let created_at = Utc::now() - chrono::Duration::hours(1);
        OrderEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            total_price_minor: 250,
            currency: "USD".to_string(),
            payment_method: "paypal".to_string(),
            shipping_method: "standard".to_string(),
            recipient_name: "Katherine Johnson".to_string(),
            phone: "555-0111".to_string(),
            address_line: "9 Langley Road".to_string(),
            city: "Hampton".to_string(),
            postal_code: None,
            country: "US".to_string(),
            status: "pending".to_string(),
            provider_ref: provider_ref.map(str::to_string),
            created_at,
            updated_at: created_at,
            last_reconciled_at: None,
        }
    }

    fn sweep(
        query: MockOrderQueryRepository,
        tx: MockCommerceTx,
        gateway: MockGateway,
    ) -> ReconciliationSweep<MockStore, MockOrderQueryRepository, MockGateway> {
        sweep_over(Arc::new(query), tx, gateway, 50)
    }

    fn sweep_over<Q>(
        query: Arc<Q>,
        tx: MockCommerceTx,
        gateway: MockGateway,
        batch_size: i64,
    ) -> ReconciliationSweep<MockStore, Q, MockGateway>
    where
        Q: OrderQueryRepository + Send + Sync + 'static,
    {
        let store = Arc::new(MockStore { tx: Mutex::new(tx) });
        let reconciler = PaymentReconciler::new(
            store,
            Arc::new(gateway),
            ReconcilerSettings {
                tolerance_minor: 0,
                retry: RetryPolicy::none(),
                webhook_secret: "whsec_test".to_string(),
                webhook_tolerance_secs: 300,
            },
        );
        ReconciliationSweep::new(
            query,
            Arc::new(reconciler),
            SweepSettings {
                interval: Duration::from_secs(60),
                grace_period: chrono::Duration::minutes(15),
                batch_size,
            },
        )
    }

    /// Pending orders kept in memory, listed the way the database lists them for the sweep.
    #[derive(Default)]
    struct SweepQueue {
        orders: Mutex<Vec<OrderEntity>>,
    }

    #[async_trait]
    impl OrderQueryRepository for SweepQueue {
        async fn find_order(&self, order_id: Uuid) -> Result<Option<OrderEntity>> {
            let orders = self.orders.lock().unwrap();
            Ok(orders.iter().find(|o| o.id == order_id).cloned())
        }

        async fn find_line_items(&self, _order_id: Uuid) -> Result<Vec<OrderLineItemEntity>> {
            Ok(Vec::new())
        }

        async fn list_orders_for_user(&self, _user_id: Uuid) -> Result<Vec<OrderEntity>> {
            Ok(Vec::new())
        }

        async fn list_line_items_for_orders(
            &self,
            _order_ids: Vec<Uuid>,
        ) -> Result<Vec<OrderLineItemEntity>> {
            Ok(Vec::new())
        }

        async fn list_stale_pending_orders(
            &self,
            payment_method: String,
            created_before: DateTime<Utc>,
            limit: i64,
        ) -> Result<Vec<OrderEntity>> {
            let mut listed: Vec<OrderEntity> = self
                .orders
                .lock()
                .unwrap()
                .iter()
                .filter(|o| {
                    o.status == "pending"
                        && o.payment_method == payment_method
                        && o.created_at < created_before
                })
                .cloned()
                .collect();
            listed.sort_by_key(|o| (o.last_reconciled_at, o.created_at));
            listed.truncate(limit as usize);
            Ok(listed)
        }

        async fn mark_reconciled(&self, order_ids: Vec<Uuid>, at: DateTime<Utc>) -> Result<usize> {
            let mut orders = self.orders.lock().unwrap();
            let mut updated = 0;
            for order in orders.iter_mut().filter(|o| order_ids.contains(&o.id)) {
                order.last_reconciled_at = Some(at);
                updated += 1;
            }
            Ok(updated)
        }
    }

    #[tokio::test]
    async fn queries_only_stale_gateway_orders() {
        let now = Utc::now();
        let mut query = MockOrderQueryRepository::new();
        query
            .expect_list_stale_pending_orders()
            .withf(move |method, created_before, limit| {
                method == "paypal"
                    && *created_before == now - chrono::Duration::minutes(15)
                    && *limit == 50
            })
            .times(1)
            .returning(|_, _, _| Ok(Vec::new()));

        let report = sweep(query, MockCommerceTx::new(), MockGateway::new())
            .sweep_once(now)
            .await
            .unwrap();

        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn creates_missing_intent() {
        let order = pending_order(None);
        let order_id = order.id;

        let mut query = MockOrderQueryRepository::new();
        let listed = order.clone();
        query
            .expect_list_stale_pending_orders()
            .returning(move |_, _, _| Ok(vec![listed.clone()]));
        query
            .expect_mark_reconciled()
            .withf(move |ids, _| ids == &vec![order_id])
            .times(1)
            .returning(|ids, _| Ok(ids.len()));

        let mut gateway = MockGateway::new();
        gateway
            .expect_create_order()
            .withf(move |request| request.reference_id == order_id.to_string())
            .times(1)
            .returning(|_| {
                Ok(GatewayOrder {
                    provider_ref: "PP-9".to_string(),
                    status: "CREATED".to_string(),
                    approval_url: None,
                    amount_minor: Some(250),
                    captured_amount_minor: None,
                })
            });

        let mut tx = MockCommerceTx::new();
        let stored = order.clone();
        tx.expect_find_order()
            .with(eq(order_id))
            .returning(move |_| Ok(Some(stored.clone())));
        tx.expect_set_order_provider_ref()
            .withf(move |id, reference| *id == order_id && reference == "PP-9")
            .times(1)
            .returning(|_, _| Ok(1));

        let report = sweep(query, tx, gateway)
            .sweep_once(Utc::now())
            .await
            .unwrap();

        assert_eq!(report.scanned, 1);
        assert_eq!(report.intents_created, 1);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn one_failing_order_does_not_stop_the_sweep() {
        let without_ref = pending_order(None);
        let with_ref = pending_order(Some("PP-open"));

        let mut query = MockOrderQueryRepository::new();
        let listed = vec![without_ref, with_ref];
        query
            .expect_list_stale_pending_orders()
            .returning(move |_, _, _| Ok(listed.clone()));
        query
            .expect_mark_reconciled()
            .withf(|ids, _| ids.len() == 2)
            .times(1)
            .returning(|ids, _| Ok(ids.len()));

        let mut gateway = MockGateway::new();
        gateway.expect_create_order().times(1).returning(|_| {
            Err(GatewayError::Transport {
                context: "create order",
                message: "connection reset".to_string(),
            }
            .into())
        });
        gateway
            .expect_get_order()
            .with(eq("PP-open"))
            .times(1)
            .returning(|reference| {
                Ok(GatewayOrder {
                    provider_ref: reference.to_string(),
                    status: "APPROVED".to_string(),
                    approval_url: None,
                    amount_minor: Some(250),
                    captured_amount_minor: None,
                })
            });

        let report = sweep(query, MockCommerceTx::new(), gateway)
            .sweep_once(Utc::now())
            .await
            .unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.still_pending, 1);
        assert_eq!(report.confirmed + report.canceled, 0);
    }

    #[tokio::test]
    async fn declined_gateway_order_is_canceled() {
        let order = pending_order(Some("PP-void"));
        let order_id = order.id;
        let canceled = OrderEntity {
            status: "canceled".to_string(),
            ..order.clone()
        };

        let mut query = MockOrderQueryRepository::new();
        let listed = order.clone();
        query
            .expect_list_stale_pending_orders()
            .returning(move |_, _, _| Ok(vec![listed.clone()]));
        query
            .expect_mark_reconciled()
            .times(1)
            .returning(|ids, _| Ok(ids.len()));

        let mut gateway = MockGateway::new();
        gateway.expect_get_order().returning(|reference| {
            Ok(GatewayOrder {
                provider_ref: reference.to_string(),
                status: "VOIDED".to_string(),
                approval_url: None,
                amount_minor: Some(250),
                captured_amount_minor: None,
            })
        });

        let mut tx = MockCommerceTx::new();
        let by_ref = order.clone();
        tx.expect_find_order_by_provider_ref()
            .with(eq("PP-void"))
            .returning(move |_| Ok(Some(by_ref.clone())));
        let mut seq = mockall::Sequence::new();
        let before = order.clone();
        tx.expect_find_order()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(before.clone())));
        tx.expect_update_order_status()
            .withf(move |id, _, _| *id == order_id)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(1));
        tx.expect_find_order()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(canceled.clone())));
        tx.expect_find_cart_line_items().returning(|_, _| Ok(Vec::new()));

        let report = sweep(query, tx, gateway)
            .sweep_once(Utc::now())
            .await
            .unwrap();

        assert_eq!(report.canceled, 1);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn open_orders_do_not_starve_a_completed_one() {
        let now = Utc::now();
        let mut open_a = pending_order(Some("PP-open-a"));
        open_a.created_at = now - chrono::Duration::hours(3);
        let mut open_b = pending_order(Some("PP-open-b"));
        open_b.created_at = now - chrono::Duration::hours(2);
        let completed = pending_order(Some("PP-done"));
        let completed_id = completed.id;

        let queue = Arc::new(SweepQueue {
            orders: Mutex::new(vec![open_a, open_b, completed.clone()]),
        });

        let mut gateway = MockGateway::new();
        gateway.expect_get_order().returning(|reference| {
            let done = reference == "PP-done";
            Ok(GatewayOrder {
                provider_ref: reference.to_string(),
                status: if done { "COMPLETED" } else { "APPROVED" }.to_string(),
                approval_url: None,
                amount_minor: Some(250),
                captured_amount_minor: done.then_some(250),
            })
        });

        let confirmed = Arc::new(AtomicBool::new(false));
        let mut tx = MockCommerceTx::new();
        let by_ref = completed.clone();
        tx.expect_find_order_by_provider_ref()
            .with(eq("PP-done"))
            .times(1)
            .returning(move |_| Ok(Some(by_ref.clone())));
        let seen = Arc::clone(&confirmed);
        let stored = completed.clone();
        tx.expect_find_order()
            .with(eq(completed_id))
            .returning(move |_| {
                let status = if seen.load(Ordering::SeqCst) { "confirmed" } else { "pending" };
                Ok(Some(OrderEntity {
                    status: status.to_string(),
                    ..stored.clone()
                }))
            });
        let flag = Arc::clone(&confirmed);
        tx.expect_update_order_status()
            .withf(move |id, _, _| *id == completed_id)
            .times(1)
            .returning(move |_, _, _| {
                flag.store(true, Ordering::SeqCst);
                Ok(1)
            });

        let sweep = sweep_over(Arc::clone(&queue), tx, gateway, 2);

        let first = sweep.sweep_once(now).await.unwrap();
        assert_eq!(first.scanned, 2);
        assert_eq!(first.still_pending, 2);
        assert_eq!(first.confirmed, 0);

        let second = sweep
            .sweep_once(now + chrono::Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(second.scanned, 2);
        assert_eq!(second.confirmed, 1);
        assert_eq!(second.still_pending, 1);
        assert!(confirmed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn listing_failure_is_reported() {
        let mut query = MockOrderQueryRepository::new();
        query
            .expect_list_stale_pending_orders()
            .returning(|_, _, _| Err(anyhow::anyhow!("connection pool timed out")));

        let result = sweep(query, MockCommerceTx::new(), MockGateway::new())
            .sweep_once(Utc::now())
            .await;

        assert!(result.is_err());
    }
}
