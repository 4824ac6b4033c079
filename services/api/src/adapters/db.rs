//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the store ports from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use prospectflow_core::domain::{
    InvoiceRecord, PendingOrder, SubscriptionRecord, SubscriptionStatus, SubscriptionTier, User,
    UserCredentials, UserSettings,
};
use prospectflow_core::ports::{
    CheckoutStore, InvoiceStore, PortError, PortResult, SettingsStore, SubscriptionStore,
    UserStore,
};
use prospectflow_core::subscription::parse_plan_date;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements every store port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

/// Dates come back as text so a malformed value degrades to "absent" instead of
/// failing the whole row.
#[derive(FromRow)]
struct SubscriptionRow {
    user_id: Uuid,
    tier: String,
    status: String,
    plan_start_date: Option<String>,
    plan_expiry_date: Option<String>,
    razorpay_order_id: Option<String>,
    razorpay_payment_id: Option<String>,
}
impl SubscriptionRow {
    fn to_domain(self) -> SubscriptionRecord {
        SubscriptionRecord {
            user_id: self.user_id,
            tier: SubscriptionTier::parse(&self.tier),
            status: SubscriptionStatus::parse(&self.status),
            plan_start_date: self.plan_start_date.as_deref().and_then(parse_plan_date),
            plan_expiry_date: self.plan_expiry_date.as_deref().and_then(parse_plan_date),
            payment_order_id: self.razorpay_order_id,
            payment_id: self.razorpay_payment_id,
        }
    }
}

#[derive(FromRow)]
struct SettingsRow {
    user_id: Uuid,
    onboarding_complete: bool,
}
impl SettingsRow {
    fn to_domain(self) -> UserSettings {
        UserSettings {
            user_id: self.user_id,
            onboarding_complete: self.onboarding_complete,
        }
    }
}

#[derive(FromRow)]
struct InvoiceRow {
    user_id: Uuid,
    invoice_number: String,
    plan_id: String,
    plan_name: String,
    amount_paid: i32,
    currency: String,
    razorpay_payment_id: String,
    razorpay_order_id: String,
    invoice_date: NaiveDate,
}
impl InvoiceRow {
    fn to_domain(self) -> InvoiceRecord {
        InvoiceRecord {
            user_id: self.user_id,
            invoice_number: self.invoice_number,
            plan_id: self.plan_id,
            plan_name: self.plan_name,
            amount_paid: u32::try_from(self.amount_paid).unwrap_or(0),
            currency: self.currency,
            payment_id: self.razorpay_payment_id,
            order_id: self.razorpay_order_id,
            invoice_date: self.invoice_date,
        }
    }
}

#[derive(FromRow)]
struct CheckoutOrderRow {
    order_id: String,
    user_id: Uuid,
    plan_id: String,
    amount_minor: i64,
    payment_id: Option<String>,
}
impl CheckoutOrderRow {
    fn to_domain(self) -> PendingOrder {
        PendingOrder {
            order_id: self.order_id,
            user_id: self.user_id,
            plan_id: self.plan_id,
            amount_minor: u64::try_from(self.amount_minor).unwrap_or(0),
            applied_payment_id: self.payment_id,
        }
    }
}

const SUBSCRIPTION_COLUMNS: &str = "user_id, tier, status, \
     plan_start_date::text AS plan_start_date, plan_expiry_date::text AS plan_expiry_date, \
     razorpay_order_id, razorpay_payment_id";

//=========================================================================================
// `UserStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserStore for DbAdapter {
    /// Creates the user together with a settings row, so the onboarding tour starts
    /// on first sign-in.
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) RETURNING user_id, email",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Unexpected(format!("Email {} is already registered", email))
            }
            other => unexpected(other),
        })?;

        sqlx::query("INSERT INTO user_settings (user_id, onboarding_complete) VALUES ($1, FALSE)")
            .bind(record.user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1 AND hashed_password IS NOT NULL",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Uuid = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            _ => unexpected(e),
        })?;
        Ok(user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `SubscriptionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SubscriptionStore for DbAdapter {
    async fn get_subscription(&self, user_id: Uuid) -> PortResult<Option<SubscriptionRecord>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {} FROM user_subscriptions WHERE user_id = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(row.map(SubscriptionRow::to_domain))
    }

    async fn upsert_subscription(
        &self,
        record: &SubscriptionRecord,
    ) -> PortResult<SubscriptionRecord> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "INSERT INTO user_subscriptions \
                 (user_id, tier, status, plan_start_date, plan_expiry_date, razorpay_order_id, razorpay_payment_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 tier = EXCLUDED.tier, status = EXCLUDED.status, \
                 plan_start_date = EXCLUDED.plan_start_date, plan_expiry_date = EXCLUDED.plan_expiry_date, \
                 razorpay_order_id = EXCLUDED.razorpay_order_id, razorpay_payment_id = EXCLUDED.razorpay_payment_id, \
                 updated_at = NOW() \
             RETURNING {}",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(record.user_id)
        .bind(record.tier.as_str())
        .bind(record.status.as_str())
        .bind(record.plan_start_date)
        .bind(record.plan_expiry_date)
        .bind(record.payment_order_id.as_deref())
        .bind(record.payment_id.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(row.to_domain())
    }
}

//=========================================================================================
// `SettingsStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SettingsStore for DbAdapter {
    async fn get_settings(&self, user_id: Uuid) -> PortResult<Option<UserSettings>> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT user_id, onboarding_complete FROM user_settings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(row.map(SettingsRow::to_domain))
    }

    async fn mark_onboarding_complete(&self, user_id: Uuid) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO user_settings (user_id, onboarding_complete) VALUES ($1, TRUE) \
             ON CONFLICT (user_id) DO UPDATE SET onboarding_complete = TRUE, updated_at = NOW()",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `InvoiceStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl InvoiceStore for DbAdapter {
    async fn save_invoice(&self, invoice: &InvoiceRecord) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO invoices \
                 (id, user_id, invoice_number, plan_id, plan_name, amount_paid, currency, \
                  razorpay_payment_id, razorpay_order_id, invoice_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(Uuid::new_v4())
        .bind(invoice.user_id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.plan_id)
        .bind(&invoice.plan_name)
        .bind(i32::try_from(invoice.amount_paid).unwrap_or(i32::MAX))
        .bind(&invoice.currency)
        .bind(&invoice.payment_id)
        .bind(&invoice.order_id)
        .bind(invoice.invoice_date)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_invoices(&self, user_id: Uuid) -> PortResult<Vec<InvoiceRecord>> {
        let rows = sqlx::query_as::<_, InvoiceRow>(
            "SELECT user_id, invoice_number, plan_id, plan_name, amount_paid, currency, \
                    razorpay_payment_id, razorpay_order_id, invoice_date \
             FROM invoices WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(InvoiceRow::to_domain).collect())
    }
}

//=========================================================================================
// `CheckoutStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CheckoutStore for DbAdapter {
    async fn record_order(&self, order: &PendingOrder) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO checkout_orders (order_id, user_id, plan_id, amount_minor) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&order.order_id)
        .bind(order.user_id)
        .bind(&order.plan_id)
        .bind(i64::try_from(order.amount_minor).unwrap_or(i64::MAX))
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn find_order(&self, order_id: &str) -> PortResult<Option<PendingOrder>> {
        let row = sqlx::query_as::<_, CheckoutOrderRow>(
            "SELECT order_id, user_id, plan_id, amount_minor, payment_id \
             FROM checkout_orders WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(row.map(CheckoutOrderRow::to_domain))
    }

    async fn mark_applied(&self, order_id: &str, payment_id: &str) -> PortResult<bool> {
        // The `applied_at IS NULL` guard makes the claim atomic across connections.
        let result = sqlx::query(
            "UPDATE checkout_orders SET payment_id = $2, applied_at = NOW() \
             WHERE order_id = $1 AND applied_at IS NULL",
        )
        .bind(order_id)
        .bind(payment_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() == 1)
    }

    async fn release_order(&self, order_id: &str) -> PortResult<()> {
        sqlx::query(
            "UPDATE checkout_orders SET payment_id = NULL, applied_at = NULL WHERE order_id = $1",
        )
        .bind(order_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}
