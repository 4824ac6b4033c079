//! crates/prospectflow_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the hosted data store and the payment provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    CreatedOrder, InvoiceRecord, PaymentConfirmation, PaymentOrder, PendingOrder,
    SubscriptionRecord, User, UserCredentials, UserSettings,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Data Store Ports
//=========================================================================================

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user_with_email(&self, email: &str, hashed_password: &str)
        -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owner of a live (unexpired) session.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Fetches the subscription row for a user. `Ok(None)` means the user never had one.
    async fn get_subscription(&self, user_id: Uuid) -> PortResult<Option<SubscriptionRecord>>;

    /// Inserts or replaces the row keyed by `record.user_id` and returns what was stored.
    async fn upsert_subscription(&self, record: &SubscriptionRecord)
        -> PortResult<SubscriptionRecord>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_settings(&self, user_id: Uuid) -> PortResult<Option<UserSettings>>;

    /// Upserts `onboarding_complete = true` for the user.
    async fn mark_onboarding_complete(&self, user_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn save_invoice(&self, invoice: &InvoiceRecord) -> PortResult<()>;

    async fn list_invoices(&self, user_id: Uuid) -> PortResult<Vec<InvoiceRecord>>;
}

/// Remembers the orders plan selection opened, so each confirmation is bound to the
/// plan it was paid for and applied only once.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn record_order(&self, order: &PendingOrder) -> PortResult<()>;

    async fn find_order(&self, order_id: &str) -> PortResult<Option<PendingOrder>>;

    /// Marks an unapplied order as settled by `payment_id`. Returns `false` when the
    /// order was already applied, so concurrent confirmations cannot both win.
    async fn mark_applied(&self, order_id: &str, payment_id: &str) -> PortResult<bool>;

    /// Undoes `mark_applied` when the subscription write that followed it failed.
    async fn release_order(&self, order_id: &str) -> PortResult<()>;
}

//=========================================================================================
// Payment Port
//=========================================================================================

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Registers an order with the provider so the checkout widget can collect payment.
    async fn create_order(&self, order: &PaymentOrder) -> PortResult<CreatedOrder>;

    /// Checks the provider's signature over a checkout confirmation.
    fn verify_confirmation(&self, confirmation: &PaymentConfirmation) -> PortResult<bool>;

    /// The public key the checkout widget must be opened with.
    fn public_key_id(&self) -> &str;
}
