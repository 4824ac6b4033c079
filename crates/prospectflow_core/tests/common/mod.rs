//! In-memory implementations of the core ports for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use prospectflow_core::domain::{
    CreatedOrder, InvoiceRecord, PaymentConfirmation, PaymentOrder, PendingOrder,
    SubscriptionRecord, User, UserSettings,
};
use prospectflow_core::ports::{
    CheckoutStore, InvoiceStore, PaymentGateway, PortError, PortResult, SettingsStore,
    SubscriptionStore,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

pub fn user(email: &str) -> User {
    User {
        user_id: Uuid::new_v4(),
        email: Some(email.to_string()),
    }
}

#[derive(Default)]
pub struct InMemorySubscriptions {
    rows: Mutex<HashMap<Uuid, SubscriptionRecord>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub writes: AtomicUsize,
}

impl InMemorySubscriptions {
    pub fn with(record: SubscriptionRecord) -> Self {
        let store = Self::default();
        store.rows.lock().unwrap().insert(record.user_id, record);
        store
    }

    pub fn row(&self, user_id: Uuid) -> Option<SubscriptionRecord> {
        self.rows.lock().unwrap().get(&user_id).cloned()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptions {
    async fn get_subscription(&self, user_id: Uuid) -> PortResult<Option<SubscriptionRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("store offline".to_string()));
        }
        Ok(self.row(user_id))
    }

    async fn upsert_subscription(
        &self,
        record: &SubscriptionRecord,
    ) -> PortResult<SubscriptionRecord> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("connection reset".to_string()));
        }
        self.rows
            .lock()
            .unwrap()
            .insert(record.user_id, record.clone());
        Ok(record.clone())
    }
}

#[derive(Default)]
pub struct InMemoryInvoices {
    rows: Mutex<Vec<InvoiceRecord>>,
    pub fail_writes: AtomicBool,
}

#[async_trait]
impl InvoiceStore for InMemoryInvoices {
    async fn save_invoice(&self, invoice: &InvoiceRecord) -> PortResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("invoices table locked".to_string()));
        }
        self.rows.lock().unwrap().push(invoice.clone());
        Ok(())
    }

    async fn list_invoices(&self, user_id: Uuid) -> PortResult<Vec<InvoiceRecord>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryCheckout {
    orders: Mutex<HashMap<String, PendingOrder>>,
}

impl InMemoryCheckout {
    pub fn order(&self, order_id: &str) -> Option<PendingOrder> {
        self.orders.lock().unwrap().get(order_id).cloned()
    }
}

#[async_trait]
impl CheckoutStore for InMemoryCheckout {
    async fn record_order(&self, order: &PendingOrder) -> PortResult<()> {
        self.orders
            .lock()
            .unwrap()
            .insert(order.order_id.clone(), order.clone());
        Ok(())
    }

    async fn find_order(&self, order_id: &str) -> PortResult<Option<PendingOrder>> {
        Ok(self.order(order_id))
    }

    async fn mark_applied(&self, order_id: &str, payment_id: &str) -> PortResult<bool> {
        let mut orders = self.orders.lock().unwrap();
        match orders.get_mut(order_id) {
            Some(order) if order.applied_payment_id.is_none() => {
                order.applied_payment_id = Some(payment_id.to_string());
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(PortError::NotFound(order_id.to_string())),
        }
    }

    async fn release_order(&self, order_id: &str) -> PortResult<()> {
        if let Some(order) = self.orders.lock().unwrap().get_mut(order_id) {
            order.applied_payment_id = None;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySettings {
    rows: Mutex<HashMap<Uuid, UserSettings>>,
    pub fail_writes: AtomicBool,
    pub writes: AtomicUsize,
}

impl InMemorySettings {
    pub fn with(settings: UserSettings) -> Self {
        let store = Self::default();
        store.rows.lock().unwrap().insert(settings.user_id, settings);
        store
    }
}

#[async_trait]
impl SettingsStore for InMemorySettings {
    async fn get_settings(&self, user_id: Uuid) -> PortResult<Option<UserSettings>> {
        Ok(self.rows.lock().unwrap().get(&user_id).cloned())
    }

    async fn mark_onboarding_complete(&self, user_id: Uuid) -> PortResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("settings write timed out".to_string()));
        }
        self.rows.lock().unwrap().insert(
            user_id,
            UserSettings {
                user_id,
                onboarding_complete: true,
            },
        );
        Ok(())
    }
}

/// Accepts confirmations signed as `signed:<order>|<payment>`.
#[derive(Default)]
pub struct FakeGateway {
    pub orders: Mutex<Vec<PaymentOrder>>,
}

impl FakeGateway {
    pub fn sign(order_id: &str, payment_id: &str) -> String {
        format!("signed:{}|{}", order_id, payment_id)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, order: &PaymentOrder) -> PortResult<CreatedOrder> {
        let mut orders = self.orders.lock().unwrap();
        orders.push(order.clone());
        Ok(CreatedOrder {
            order_id: format!("order_{:06}", orders.len()),
            amount_minor: order.amount_minor,
            currency: order.currency.clone(),
        })
    }

    fn verify_confirmation(&self, confirmation: &PaymentConfirmation) -> PortResult<bool> {
        Ok(confirmation.signature
            == Self::sign(&confirmation.order_id, &confirmation.payment_id))
    }

    fn public_key_id(&self) -> &str {
        "rzp_test_key"
    }
}
