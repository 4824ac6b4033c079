//! crates/prospectflow_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// Users and Auth
//=========================================================================================

/// Represents a user - used throughout app.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Subscriptions
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubscriptionTier {
    Free,
    Premium,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
        }
    }

    /// Parses a stored tier. Anything unrecognised is read as `Free`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "premium" => Self::Premium,
            "free" => Self::Free,
            other => {
                warn!("Unknown subscription tier '{}', reading it as free", other);
                Self::Free
            }
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// Parses a stored status. Anything unrecognised is read as `Expired`,
    /// so an unreadable row never grants premium limits.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "cancelled" | "canceled" => Self::Cancelled,
            "expired" => Self::Expired,
            other => {
                warn!("Unknown subscription status '{}', reading it as expired", other);
                Self::Expired
            }
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stored subscription row for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionRecord {
    pub user_id: Uuid,
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
    pub plan_start_date: Option<DateTime<Utc>>,
    pub plan_expiry_date: Option<DateTime<Utc>>,
    pub payment_order_id: Option<String>,
    pub payment_id: Option<String>,
}

//=========================================================================================
// Settings
//=========================================================================================

/// Per-user settings. Only the onboarding flag is consumed by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSettings {
    pub user_id: Uuid,
    pub onboarding_complete: bool,
}

//=========================================================================================
// Plans and Pricing
//=========================================================================================

/// A purchasable plan. Several plans may map onto the same stored tier.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailablePlan {
    pub id: &'static str,
    pub tier: SubscriptionTier,
    pub name: &'static str,
    pub description: &'static str,
    pub price_monthly: u32,
    pub duration_months: u32,
    pub discount_percentage: Option<u32>,
    pub is_popular: bool,
}

/// The price breakdown shown for a plan, in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanPricing {
    pub original_total: u32,
    pub final_total: u32,
    pub discounted_per_month: Option<u32>,
    pub discount_percentage: Option<u32>,
}

impl AvailablePlan {
    pub fn is_free(&self) -> bool {
        self.tier == SubscriptionTier::Free
    }

    pub fn pricing(&self) -> PlanPricing {
        if self.is_free() {
            return PlanPricing {
                original_total: 0,
                final_total: 0,
                discounted_per_month: None,
                discount_percentage: None,
            };
        }

        let original_total = f64::from(self.price_monthly) * f64::from(self.duration_months);
        match self.discount_percentage.filter(|pct| *pct > 0) {
            Some(pct) => {
                let final_total = original_total - original_total * (f64::from(pct) / 100.0);
                PlanPricing {
                    original_total: original_total.round() as u32,
                    final_total: final_total.round() as u32,
                    discounted_per_month: Some(
                        (final_total / f64::from(self.duration_months)).round() as u32,
                    ),
                    discount_percentage: Some(pct),
                }
            }
            None => PlanPricing {
                original_total: original_total.round() as u32,
                final_total: original_total.round() as u32,
                discounted_per_month: None,
                discount_percentage: None,
            },
        }
    }
}

pub const ALL_AVAILABLE_PLANS: &[AvailablePlan] = &[
    AvailablePlan {
        id: "free",
        tier: SubscriptionTier::Free,
        name: "Free Tier",
        description: "No credit card, no catch. Just job hunting.",
        price_monthly: 0,
        duration_months: 12 * 99,
        discount_percentage: None,
        is_popular: false,
    },
    AvailablePlan {
        id: "premium-1m",
        tier: SubscriptionTier::Premium,
        name: "Premium - 1 Month",
        description: "Full access with total flexibility.",
        price_monthly: 59,
        duration_months: 1,
        discount_percentage: None,
        is_popular: false,
    },
    AvailablePlan {
        id: "premium-6m",
        tier: SubscriptionTier::Premium,
        name: "Premium - 6 Months",
        description: "For the long job-hunt haul.",
        price_monthly: 58,
        duration_months: 6,
        discount_percentage: Some(15),
        is_popular: true,
    },
    AvailablePlan {
        id: "premium-12m",
        tier: SubscriptionTier::Premium,
        name: "Premium - 12 Months",
        description: "One commitment, a full year of progress.",
        price_monthly: 59,
        duration_months: 12,
        discount_percentage: Some(25),
        is_popular: false,
    },
];

/// Looks up a plan in the static catalog by its id.
pub fn find_plan(plan_id: &str) -> Option<&'static AvailablePlan> {
    ALL_AVAILABLE_PLANS.iter().find(|p| p.id == plan_id)
}

//=========================================================================================
// Payments and Invoices
//=========================================================================================

/// The order descriptor handed to the payment collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOrder {
    /// Amount in the currency's minor unit (paise for INR).
    pub amount_minor: u64,
    pub currency: String,
    pub receipt: String,
    pub notes: BTreeMap<String, String>,
}

/// The payment collaborator's answer to a `PaymentOrder`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedOrder {
    pub order_id: String,
    pub amount_minor: u64,
    pub currency: String,
}

/// An order opened by plan selection. It binds the provider's order id to the user
/// and plan it was created for, and is applied at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOrder {
    pub order_id: String,
    pub user_id: Uuid,
    pub plan_id: String,
    pub amount_minor: u64,
    /// The payment that settled the order. `None` until a confirmation is applied.
    pub applied_payment_id: Option<String>,
}

impl PendingOrder {
    pub fn is_applied(&self) -> bool {
        self.applied_payment_id.is_some()
    }
}

/// The signed confirmation returned by the checkout widget after payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRecord {
    pub user_id: Uuid,
    pub invoice_number: String,
    pub plan_id: String,
    pub plan_name: String,
    pub amount_paid: u32,
    pub currency: String,
    pub payment_id: String,
    pub order_id: String,
    pub invoice_date: NaiveDate,
}

impl InvoiceRecord {
    /// `INV-<yyyyMMdd>-<last six characters of the order id>`.
    pub fn number_for(date: NaiveDate, order_id: &str) -> String {
        let tail_start = order_id
            .char_indices()
            .rev()
            .nth(5)
            .map(|(i, _)| i)
            .unwrap_or(0);
        format!("INV-{}-{}", date.format("%Y%m%d"), &order_id[tail_start..])
    }
}
