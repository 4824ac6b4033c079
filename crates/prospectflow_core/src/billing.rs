//! crates/prospectflow_core/src/billing.rs
//!
//! Plan selection and payment application, written against the store and payment
//! ports. Every write to the subscription row is followed by a fresh read and a
//! fresh resolution, so callers never render limits older than their last write.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::{
    find_plan, AvailablePlan, CreatedOrder, InvoiceRecord, PaymentConfirmation, PaymentOrder,
    PendingOrder, SubscriptionRecord, SubscriptionStatus, SubscriptionTier, User,
};
use crate::ports::{CheckoutStore, InvoiceStore, PaymentGateway, PortError, SubscriptionStore};
use crate::subscription::{renewal_window, resolve, PrivilegeList, ResolvedSubscription};

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Unknown plan: {0}")]
    UnknownPlan(String),
    #[error("You are already on the {0}")]
    AlreadyActive(String),
    #[error("Premium is still active. The free plan can be chosen once it lapses")]
    PremiumActive,
    #[error("Plan {0} is not paid for through checkout")]
    NotPurchasable(String),
    #[error("Payments are not configured")]
    PaymentsUnavailable,
    #[error("Payment signature did not verify")]
    InvalidSignature,
    #[error("No checkout order {0} for this account")]
    UnknownOrder(String),
    #[error("Order {order_id} was opened for plan {plan_id}")]
    PlanMismatch { order_id: String, plan_id: String },
    #[error("Order {0} has already been applied")]
    AlreadyApplied(String),
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),
}

/// A subscription row together with its resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionView {
    pub record: Option<SubscriptionRecord>,
    pub resolved: ResolvedSubscription,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanSelection {
    /// The plan needed no payment and is now active.
    Activated(SubscriptionView),
    /// The checkout widget must collect payment for this order.
    PaymentRequired {
        plan: &'static AvailablePlan,
        order: CreatedOrder,
        key_id: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedPurchase {
    pub view: SubscriptionView,
    /// `None` when the invoice could not be recorded. The subscription still stands.
    pub invoice: Option<InvoiceRecord>,
}

#[derive(Clone)]
pub struct BillingService {
    subscriptions: Arc<dyn SubscriptionStore>,
    invoices: Arc<dyn InvoiceStore>,
    checkout: Arc<dyn CheckoutStore>,
    gateway: Option<Arc<dyn PaymentGateway>>,
    privileged: PrivilegeList,
    currency: String,
}

impl BillingService {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        invoices: Arc<dyn InvoiceStore>,
        checkout: Arc<dyn CheckoutStore>,
        gateway: Option<Arc<dyn PaymentGateway>>,
        privileged: PrivilegeList,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            subscriptions,
            invoices,
            checkout,
            gateway,
            privileged,
            currency: currency.into(),
        }
    }

    pub fn is_privileged(&self, user: &User) -> bool {
        self.privileged.is_privileged(user.email.as_deref())
    }

    /// Fetches and resolves the user's subscription.
    ///
    /// A failed fetch is logged and resolved as "no subscription".
    pub async fn current(&self, user: &User, now: DateTime<Utc>) -> SubscriptionView {
        let record = match self.subscriptions.get_subscription(user.user_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "Subscription for user {} unavailable, resolving as free: {}",
                    user.user_id, e
                );
                None
            }
        };
        self.view_of(user, record, now)
    }

    /// Chooses a plan. Free plans are written right away; premium plans open a
    /// payment order that `apply_confirmation` completes.
    pub async fn select_plan(
        &self,
        user: &User,
        plan_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PlanSelection, BillingError> {
        let plan = find_plan(plan_id).ok_or_else(|| BillingError::UnknownPlan(plan_id.to_string()))?;
        let view = self.current(user, now).await;

        if plan.is_free() {
            if view.resolved.effective_tier_for_limits == SubscriptionTier::Premium {
                return Err(BillingError::PremiumActive);
            }
            if view.resolved.actual_tier == SubscriptionTier::Free {
                return Err(BillingError::AlreadyActive(plan.name.to_string()));
            }
            info!("Activating free plan for user {}", user.user_id);
            let window = renewal_window(plan, view.record.as_ref(), &view.resolved, now);
            let record = SubscriptionRecord {
                user_id: user.user_id,
                tier: SubscriptionTier::Free,
                status: SubscriptionStatus::Active,
                plan_start_date: Some(window.start),
                plan_expiry_date: Some(window.expiry),
                payment_order_id: None,
                payment_id: None,
            };
            let stored = self.subscriptions.upsert_subscription(&record).await?;
            return Ok(PlanSelection::Activated(self.refresh(user, stored, now).await));
        }

        let gateway = self.gateway.as_ref().ok_or(BillingError::PaymentsUnavailable)?;
        let order = self.order_for(user, plan, now);
        let created = gateway.create_order(&order).await?;
        self.checkout
            .record_order(&PendingOrder {
                order_id: created.order_id.clone(),
                user_id: user.user_id,
                plan_id: plan.id.to_string(),
                amount_minor: created.amount_minor,
                applied_payment_id: None,
            })
            .await?;
        info!(
            "Payment order {} created for user {} and plan {}",
            created.order_id, user.user_id, plan.id
        );

        Ok(PlanSelection::PaymentRequired {
            plan,
            order: created,
            key_id: gateway.public_key_id().to_string(),
        })
    }

    /// Applies a signed checkout confirmation: writes the premium row, records an
    /// invoice, and returns the freshly resolved subscription.
    ///
    /// The order must have been opened by `select_plan` for this user and `plan_id`,
    /// and each order is applied once.
    pub async fn apply_confirmation(
        &self,
        user: &User,
        plan_id: &str,
        confirmation: &PaymentConfirmation,
        now: DateTime<Utc>,
    ) -> Result<ConfirmedPurchase, BillingError> {
        let plan = find_plan(plan_id).ok_or_else(|| BillingError::UnknownPlan(plan_id.to_string()))?;
        if plan.is_free() {
            return Err(BillingError::NotPurchasable(plan.id.to_string()));
        }

        let gateway = self.gateway.as_ref().ok_or(BillingError::PaymentsUnavailable)?;
        if !gateway.verify_confirmation(confirmation)? {
            warn!(
                "Rejected payment confirmation for order {} (user {})",
                confirmation.order_id, user.user_id
            );
            return Err(BillingError::InvalidSignature);
        }

        let order_id = confirmation.order_id.as_str();
        let pending = match self.checkout.find_order(order_id).await? {
            Some(pending) if pending.user_id == user.user_id => pending,
            _ => return Err(BillingError::UnknownOrder(order_id.to_string())),
        };
        if pending.is_applied() {
            return Err(BillingError::AlreadyApplied(order_id.to_string()));
        }
        if pending.plan_id != plan.id {
            warn!(
                "Order {} for plan {} confirmed as {} by user {}",
                order_id, pending.plan_id, plan.id, user.user_id
            );
            return Err(BillingError::PlanMismatch {
                order_id: order_id.to_string(),
                plan_id: pending.plan_id,
            });
        }

        let view = self.current(user, now).await;
        if view
            .record
            .as_ref()
            .and_then(|r| r.payment_order_id.as_deref())
            == Some(order_id)
        {
            return Err(BillingError::AlreadyApplied(order_id.to_string()));
        }
        if !self
            .checkout
            .mark_applied(order_id, &confirmation.payment_id)
            .await?
        {
            return Err(BillingError::AlreadyApplied(order_id.to_string()));
        }

        let window = renewal_window(plan, view.record.as_ref(), &view.resolved, now);
        let record = SubscriptionRecord {
            user_id: user.user_id,
            tier: SubscriptionTier::Premium,
            status: SubscriptionStatus::Active,
            plan_start_date: Some(window.start),
            plan_expiry_date: Some(window.expiry),
            payment_order_id: Some(confirmation.order_id.clone()),
            payment_id: Some(confirmation.payment_id.clone()),
        };
        let stored = match self.subscriptions.upsert_subscription(&record).await {
            Ok(stored) => stored,
            Err(e) => {
                if let Err(release) = self.checkout.release_order(order_id).await {
                    error!("Failed to release order {}: {}", order_id, release);
                }
                return Err(e.into());
            }
        };
        info!(
            "Premium active for user {} until {}",
            user.user_id, window.expiry
        );

        let invoice = InvoiceRecord {
            user_id: user.user_id,
            invoice_number: InvoiceRecord::number_for(now.date_naive(), &confirmation.order_id),
            plan_id: plan.id.to_string(),
            plan_name: plan.name.to_string(),
            amount_paid: plan.pricing().final_total,
            currency: self.currency.clone(),
            payment_id: confirmation.payment_id.clone(),
            order_id: confirmation.order_id.clone(),
            invoice_date: now.date_naive(),
        };
        let invoice = match self.invoices.save_invoice(&invoice).await {
            Ok(()) => Some(invoice),
            Err(e) => {
                error!(
                    "Failed to save invoice {} for user {}: {}",
                    invoice.invoice_number, user.user_id, e
                );
                None
            }
        };

        let view = self.refresh(user, stored, now).await;
        Ok(ConfirmedPurchase { view, invoice })
    }

    pub async fn invoices(&self, user: &User) -> Result<Vec<InvoiceRecord>, BillingError> {
        Ok(self.invoices.list_invoices(user.user_id).await?)
    }

    fn order_for(&self, user: &User, plan: &AvailablePlan, now: DateTime<Utc>) -> PaymentOrder {
        let mut notes = BTreeMap::new();
        notes.insert("purchaseOptionId".to_string(), plan.id.to_string());
        notes.insert("mapsToDbTier".to_string(), plan.tier.as_str().to_string());
        notes.insert("userId".to_string(), user.user_id.to_string());
        notes.insert(
            "userEmail".to_string(),
            user.email.clone().unwrap_or_else(|| "N/A".to_string()),
        );
        notes.insert("durationMonths".to_string(), plan.duration_months.to_string());

        PaymentOrder {
            amount_minor: u64::from(plan.pricing().final_total) * 100,
            currency: self.currency.clone(),
            receipt: format!("pf_{}_{}", plan.id, now.timestamp_millis()),
            notes,
        }
    }

    /// Re-reads the row after a write. Falls back to what the write returned if the
    /// read fails, since that is the newest acknowledged state.
    async fn refresh(
        &self,
        user: &User,
        written: SubscriptionRecord,
        now: DateTime<Utc>,
    ) -> SubscriptionView {
        let record = match self.subscriptions.get_subscription(user.user_id).await {
            Ok(Some(record)) => record,
            Ok(None) => written,
            Err(e) => {
                warn!("Re-reading subscription after write failed: {}", e);
                written
            }
        };
        self.view_of(user, Some(record), now)
    }

    fn view_of(
        &self,
        user: &User,
        record: Option<SubscriptionRecord>,
        now: DateTime<Utc>,
    ) -> SubscriptionView {
        let resolved = resolve(record.as_ref(), now, self.is_privileged(user));
        SubscriptionView { record, resolved }
    }
}
