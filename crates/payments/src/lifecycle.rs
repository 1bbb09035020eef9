//! Payment lifecycle manager.
//!
//! State machine per (user, product):
//! `∅ -> Created -> {Paid, Canceled}`, with
//! `Created -> CapturePending -> Paid` for authorize-then-capture
//! providers (the capture step never mutates local state; the follow-up
//! `succeeded` webhook does).

use std::sync::Arc;

use uuid::Uuid;

use examly_core::error::CoreError;
use examly_core::types::DbId;
use examly_db::models::purchase::{CreatePurchase, PurchaseStatus};

use crate::events;
use crate::gateway::{PaymentGateway, PaymentRequest};
use crate::store::{ProductCatalog, PurchaseStore};

/// A successfully created payment intent.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    /// Correlation id of the local record (and provider idempotency key).
    pub payment_id: String,
    /// Provider checkout URL for the buyer.
    pub confirmation_url: String,
}

/// Outcome of reconciling one webhook notification.
///
/// Every outcome maps to a success response at the transport: answering a
/// webhook with an error only makes the provider redeliver it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A status transition was applied (or re-applied idempotently).
    Applied(PurchaseStatus),
    /// A capture call was issued; local status is untouched until the
    /// follow-up `succeeded` event arrives.
    Capturing,
    /// Nothing to do: unknown event type, unknown payment id, or a
    /// transition the record's current state forbids.
    Ignored,
}

/// Creates payment intents and reconciles provider webhooks.
pub struct PaymentService {
    purchases: Arc<dyn PurchaseStore>,
    products: Arc<dyn ProductCatalog>,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentService {
    pub fn new(
        purchases: Arc<dyn PurchaseStore>,
        products: Arc<dyn ProductCatalog>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            purchases,
            products,
            gateway,
        }
    }

    /// Create a payment intent for a (user, product) pair.
    ///
    /// The `Created` row is committed BEFORE the provider call, so a crash
    /// or provider failure cannot leave a payment the system does not know
    /// about; the row then waits for webhook reconciliation (or
    /// housekeeping). The pre-check against an existing active purchase is
    /// a fast path; the storage uniqueness guard is authoritative under
    /// concurrency.
    pub async fn create_intent(
        &self,
        user_id: DbId,
        product_slug: &str,
        buyer_email: &str,
    ) -> Result<PaymentIntent, CoreError> {
        let product = self
            .products
            .find_by_slug(product_slug)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_slug.to_string()))?;

        if let Some(existing) = self.purchases.find_active(user_id, product.id).await? {
            return Err(CoreError::PaymentAlreadyActive(existing.status.clone()));
        }

        let payment_id = Uuid::new_v4().to_string();
        self.purchases
            .create(CreatePurchase {
                user_id,
                product_id: product.id,
                email: buyer_email.to_string(),
                payment_id: payment_id.clone(),
            })
            .await?;

        let created = self
            .gateway
            .create_payment(&PaymentRequest {
                amount_kopecks: product.price_kopecks,
                description: product.name.clone(),
                idempotency_key: payment_id.clone(),
            })
            .await
            .map_err(|e| {
                tracing::error!(
                    payment_id = %payment_id,
                    error = %e,
                    "Provider call failed; Created record kept for reconciliation"
                );
                CoreError::ProviderError(e.to_string())
            })?;

        tracing::info!(
            payment_id = %payment_id,
            user_id,
            product = product_slug,
            "Payment intent created"
        );
        Ok(PaymentIntent {
            payment_id,
            confirmation_url: created.confirmation_url,
        })
    }

    /// Reconcile one provider webhook into the local record.
    ///
    /// Transitions are idempotent: redelivered events land the record in
    /// the same terminal state without error. Unknown payment ids and
    /// unknown event types are logged and reported as
    /// [`WebhookOutcome::Ignored`].
    pub async fn reconcile_webhook(
        &self,
        payload: &serde_json::Value,
    ) -> Result<WebhookOutcome, CoreError> {
        let event = events::parse_webhook(payload)?;

        let Some(purchase) = self.purchases.find_by_payment_id(&event.invoice_id).await? else {
            tracing::warn!(
                payment_id = %event.invoice_id,
                event = %event.event,
                "Webhook for unknown payment id ignored"
            );
            return Ok(WebhookOutcome::Ignored);
        };
        tracing::debug!(
            payment_id = %event.invoice_id,
            status = %purchase.status,
            event = %event.event,
            "Reconciling webhook"
        );

        match event.event.as_str() {
            "payment.succeeded" => {
                self.purchases
                    .mark_paid(
                        &event.invoice_id,
                        event.paid_at,
                        event.receipt_url.as_deref(),
                        payload,
                    )
                    .await?;
                tracing::info!(payment_id = %event.invoice_id, "Purchase marked paid");
                Ok(WebhookOutcome::Applied(PurchaseStatus::Paid))
            }
            "payment.canceled" => match self
                .purchases
                .mark_canceled(&event.invoice_id, payload)
                .await?
            {
                Some(_) => {
                    tracing::info!(payment_id = %event.invoice_id, "Purchase marked canceled");
                    Ok(WebhookOutcome::Applied(PurchaseStatus::Canceled))
                }
                None => {
                    tracing::warn!(
                        payment_id = %event.invoice_id,
                        "Cancel event for a paid purchase ignored"
                    );
                    Ok(WebhookOutcome::Ignored)
                }
            },
            "payment.waiting_for_capture" => {
                let provider_id = event.provider_id.as_deref().ok_or_else(|| {
                    CoreError::MalformedWebhook("missing object.id for capture".into())
                })?;
                self.gateway
                    .capture(provider_id)
                    .await
                    .map_err(|e| CoreError::ProviderError(e.to_string()))?;
                tracing::info!(payment_id = %event.invoice_id, "Capture requested");
                Ok(WebhookOutcome::Capturing)
            }
            other => {
                tracing::info!(
                    payment_id = %event.invoice_id,
                    event = other,
                    "Webhook event ignored"
                );
                Ok(WebhookOutcome::Ignored)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;
    use tokio::sync::Mutex;

    use examly_core::types::Timestamp;
    use examly_db::models::product::Product;
    use examly_db::models::purchase::Purchase;

    use crate::gateway::{CreatedPayment, GatewayError};

    use super::*;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// In-memory [`PurchaseStore`] with the same uniqueness and transition
    /// semantics as the database layer.
    #[derive(Default)]
    struct MemPurchaseStore {
        rows: Mutex<Vec<Purchase>>,
    }

    #[async_trait::async_trait]
    impl PurchaseStore for MemPurchaseStore {
        async fn find_active(
            &self,
            user_id: i64,
            product_id: i64,
        ) -> Result<Option<Purchase>, CoreError> {
            let rows = self.rows.lock().await;
            Ok(rows
                .iter()
                .find(|p| {
                    p.user_id == user_id
                        && p.product_id == product_id
                        && (p.status == "Created" || p.status == "Paid")
                })
                .cloned())
        }

        async fn find_by_payment_id(
            &self,
            payment_id: &str,
        ) -> Result<Option<Purchase>, CoreError> {
            let rows = self.rows.lock().await;
            Ok(rows.iter().find(|p| p.payment_id == payment_id).cloned())
        }

        async fn create(&self, input: CreatePurchase) -> Result<Purchase, CoreError> {
            let mut rows = self.rows.lock().await;
            let active_exists = rows.iter().any(|p| {
                p.user_id == input.user_id
                    && p.product_id == input.product_id
                    && (p.status == "Created" || p.status == "Paid")
            });
            if active_exists {
                return Err(CoreError::PaymentAlreadyActive("active".to_string()));
            }
            let row = Purchase {
                id: rows.len() as i64 + 1,
                user_id: input.user_id,
                product_id: input.product_id,
                email: input.email,
                payment_id: input.payment_id,
                status: "Created".to_string(),
                paid_at: None,
                receipt_url: None,
                raw_payload: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            rows.push(row.clone());
            Ok(row)
        }

        async fn mark_paid(
            &self,
            payment_id: &str,
            paid_at: Option<Timestamp>,
            receipt_url: Option<&str>,
            raw_payload: &serde_json::Value,
        ) -> Result<Option<Purchase>, CoreError> {
            let mut rows = self.rows.lock().await;
            let Some(row) = rows.iter_mut().find(|p| p.payment_id == payment_id) else {
                return Ok(None);
            };
            row.status = "Paid".to_string();
            row.paid_at = paid_at.or(row.paid_at).or_else(|| Some(Utc::now()));
            row.receipt_url = receipt_url.map(str::to_string).or(row.receipt_url.take());
            row.raw_payload = Some(raw_payload.clone());
            Ok(Some(row.clone()))
        }

        async fn mark_canceled(
            &self,
            payment_id: &str,
            raw_payload: &serde_json::Value,
        ) -> Result<Option<Purchase>, CoreError> {
            let mut rows = self.rows.lock().await;
            let Some(row) = rows
                .iter_mut()
                .find(|p| p.payment_id == payment_id && p.status != "Paid")
            else {
                return Ok(None);
            };
            row.status = "Canceled".to_string();
            row.raw_payload = Some(raw_payload.clone());
            Ok(Some(row.clone()))
        }
    }

    struct MemCatalog {
        products: Vec<Product>,
    }

    #[async_trait::async_trait]
    impl ProductCatalog for MemCatalog {
        async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, CoreError> {
            Ok(self.products.iter().find(|p| p.slug == slug).cloned())
        }
    }

    /// Gateway that records calls; optionally fails payment creation.
    #[derive(Default)]
    struct MockGateway {
        fail_create: bool,
        created: Mutex<Vec<PaymentRequest>>,
        captured: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl PaymentGateway for MockGateway {
        async fn create_payment(
            &self,
            request: &PaymentRequest,
        ) -> Result<CreatedPayment, GatewayError> {
            if self.fail_create {
                return Err(GatewayError::HttpStatus {
                    status: 502,
                    body: "bad gateway".to_string(),
                });
            }
            self.created.lock().await.push(request.clone());
            Ok(CreatedPayment {
                provider_id: format!("prov-{}", request.idempotency_key),
                confirmation_url: "https://provider.example/checkout/1".to_string(),
            })
        }

        async fn capture(&self, provider_id: &str) -> Result<(), GatewayError> {
            self.captured.lock().await.push(provider_id.to_string());
            Ok(())
        }
    }

    struct Harness {
        service: PaymentService,
        purchases: Arc<MemPurchaseStore>,
        gateway: Arc<MockGateway>,
    }

    fn harness_with_gateway(gateway: MockGateway) -> Harness {
        let purchases = Arc::new(MemPurchaseStore::default());
        let gateway = Arc::new(gateway);
        let catalog = Arc::new(MemCatalog {
            products: vec![Product {
                id: 1,
                slug: "ege".to_string(),
                name: "EGE preparation".to_string(),
                price_kopecks: 490_000,
                created_at: Utc::now(),
            }],
        });
        Harness {
            service: PaymentService::new(purchases.clone(), catalog, gateway.clone()),
            purchases,
            gateway,
        }
    }

    fn harness() -> Harness {
        harness_with_gateway(MockGateway::default())
    }

    fn webhook(event: &str, invoice_id: &str) -> serde_json::Value {
        serde_json::json!({
            "event": event,
            "object": {
                "id": format!("prov-{invoice_id}"),
                "paid_at": "2026-03-01T12:00:00.000Z",
                "receipt_url": "https://provider.example/receipts/1",
                "metadata": { "invoice_id": invoice_id },
            },
        })
    }

    // -----------------------------------------------------------------------
    // Intent creation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn create_intent_persists_before_calling_the_provider() {
        let h = harness();

        let intent = h
            .service
            .create_intent(7, "ege", "student@example.com")
            .await
            .expect("intent creation should succeed");
        assert_eq!(intent.confirmation_url, "https://provider.example/checkout/1");

        let row = h
            .purchases
            .find_by_payment_id(&intent.payment_id)
            .await
            .expect("lookup should succeed")
            .expect("a Created row must exist");
        assert_eq!(row.status, "Created");
        assert_eq!(row.email, "student@example.com");

        let created = h.gateway.created.lock().await;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].amount_kopecks, 490_000);
        assert_eq!(created[0].idempotency_key, intent.payment_id);
    }

    #[tokio::test]
    async fn create_intent_rejects_unknown_product() {
        let h = harness();
        assert_matches!(
            h.service.create_intent(7, "oge", "student@example.com").await,
            Err(CoreError::ProductNotFound(slug)) if slug == "oge"
        );
    }

    #[tokio::test]
    async fn second_intent_is_rejected_while_one_is_active() {
        let h = harness();
        h.service
            .create_intent(7, "ege", "student@example.com")
            .await
            .expect("first intent should succeed");

        assert_matches!(
            h.service.create_intent(7, "ege", "student@example.com").await,
            Err(CoreError::PaymentAlreadyActive(status)) if status == "Created"
        );
    }

    #[tokio::test]
    async fn provider_failure_keeps_the_created_record() {
        let h = harness_with_gateway(MockGateway {
            fail_create: true,
            ..MockGateway::default()
        });

        let err = h
            .service
            .create_intent(7, "ege", "student@example.com")
            .await
            .expect_err("provider failure must surface");
        assert_matches!(err, CoreError::ProviderError(_));

        // The local record survived for later reconciliation.
        let active = h
            .purchases
            .find_active(7, 1)
            .await
            .expect("lookup should succeed")
            .expect("the Created row must remain");
        assert_eq!(active.status, "Created");
    }

    // -----------------------------------------------------------------------
    // Webhook reconciliation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn succeeded_webhook_marks_paid_and_is_idempotent() {
        let h = harness();
        let intent = h
            .service
            .create_intent(7, "ege", "student@example.com")
            .await
            .expect("intent should succeed");
        let payload = webhook("payment.succeeded", &intent.payment_id);

        let first = h
            .service
            .reconcile_webhook(&payload)
            .await
            .expect("reconciliation should succeed");
        assert_eq!(first, WebhookOutcome::Applied(PurchaseStatus::Paid));

        let after_first = h
            .purchases
            .find_by_payment_id(&intent.payment_id)
            .await
            .expect("lookup should succeed")
            .expect("row should exist");

        // Redelivery: same outcome, same final state.
        let second = h
            .service
            .reconcile_webhook(&payload)
            .await
            .expect("redelivered webhook must not error");
        assert_eq!(second, WebhookOutcome::Applied(PurchaseStatus::Paid));

        let after_second = h
            .purchases
            .find_by_payment_id(&intent.payment_id)
            .await
            .expect("lookup should succeed")
            .expect("row should exist");
        assert_eq!(after_first.status, after_second.status);
        assert_eq!(after_first.paid_at, after_second.paid_at);
        assert_eq!(after_first.receipt_url, after_second.receipt_url);
        assert!(after_second.paid_at.is_some());
        assert_eq!(
            after_second.receipt_url.as_deref(),
            Some("https://provider.example/receipts/1")
        );
    }

    #[tokio::test]
    async fn paid_purchase_still_blocks_new_intents() {
        let h = harness();
        let intent = h
            .service
            .create_intent(7, "ege", "student@example.com")
            .await
            .expect("intent should succeed");
        h.service
            .reconcile_webhook(&webhook("payment.succeeded", &intent.payment_id))
            .await
            .expect("reconciliation should succeed");

        assert_matches!(
            h.service.create_intent(7, "ege", "student@example.com").await,
            Err(CoreError::PaymentAlreadyActive(status)) if status == "Paid"
        );
    }

    #[tokio::test]
    async fn canceled_webhook_frees_the_pair() {
        let h = harness();
        let intent = h
            .service
            .create_intent(7, "ege", "student@example.com")
            .await
            .expect("intent should succeed");

        let outcome = h
            .service
            .reconcile_webhook(&webhook("payment.canceled", &intent.payment_id))
            .await
            .expect("reconciliation should succeed");
        assert_eq!(outcome, WebhookOutcome::Applied(PurchaseStatus::Canceled));

        // The buyer can start over.
        h.service
            .create_intent(7, "ege", "student@example.com")
            .await
            .expect("a new intent should be allowed after cancel");
    }

    #[tokio::test]
    async fn cancel_after_paid_is_ignored() {
        let h = harness();
        let intent = h
            .service
            .create_intent(7, "ege", "student@example.com")
            .await
            .expect("intent should succeed");
        h.service
            .reconcile_webhook(&webhook("payment.succeeded", &intent.payment_id))
            .await
            .expect("reconciliation should succeed");

        let outcome = h
            .service
            .reconcile_webhook(&webhook("payment.canceled", &intent.payment_id))
            .await
            .expect("out-of-order cancel must not error");
        assert_eq!(outcome, WebhookOutcome::Ignored);

        let row = h
            .purchases
            .find_by_payment_id(&intent.payment_id)
            .await
            .expect("lookup should succeed")
            .expect("row should exist");
        assert_eq!(row.status, "Paid");
    }

    #[tokio::test]
    async fn waiting_for_capture_calls_the_provider_and_leaves_status_alone() {
        let h = harness();
        let intent = h
            .service
            .create_intent(7, "ege", "student@example.com")
            .await
            .expect("intent should succeed");

        let outcome = h
            .service
            .reconcile_webhook(&webhook("payment.waiting_for_capture", &intent.payment_id))
            .await
            .expect("reconciliation should succeed");
        assert_eq!(outcome, WebhookOutcome::Capturing);

        let captured = h.gateway.captured.lock().await;
        assert_eq!(captured.as_slice(), [format!("prov-{}", intent.payment_id)]);

        let row = h
            .purchases
            .find_by_payment_id(&intent.payment_id)
            .await
            .expect("lookup should succeed")
            .expect("row should exist");
        assert_eq!(row.status, "Created", "capture must not touch local status");
    }

    #[tokio::test]
    async fn unknown_event_type_is_ignored() {
        let h = harness();
        let intent = h
            .service
            .create_intent(7, "ege", "student@example.com")
            .await
            .expect("intent should succeed");

        let outcome = h
            .service
            .reconcile_webhook(&webhook("payment.refund.pending", &intent.payment_id))
            .await
            .expect("unknown events must not error");
        assert_eq!(outcome, WebhookOutcome::Ignored);
    }

    #[tokio::test]
    async fn unknown_payment_id_is_ignored_not_an_error() {
        let h = harness();
        let outcome = h
            .service
            .reconcile_webhook(&webhook("payment.succeeded", "no-such-payment"))
            .await
            .expect("unknown ids must not error");
        assert_eq!(outcome, WebhookOutcome::Ignored);
    }

    #[tokio::test]
    async fn payload_without_correlation_id_is_malformed() {
        let h = harness();
        let payload = serde_json::json!({
            "event": "payment.succeeded",
            "object": { "id": "prov-1", "metadata": {} },
        });
        assert_matches!(
            h.service.reconcile_webhook(&payload).await,
            Err(CoreError::MalformedWebhook(_))
        );
    }
}
