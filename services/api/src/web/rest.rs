//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the plan catalog and subscription endpoints, the
//! response payloads shared by the REST surface, and the master definition for the
//! OpenAPI specification.

use crate::web::{auth, billing, settings, state::AppState};
use axum::{
    extract::State,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use prospectflow_core::billing::SubscriptionView;
use prospectflow_core::domain::{AvailablePlan, User, ALL_AVAILABLE_PLANS};
use prospectflow_core::subscription::PlanLimits;
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        list_plans_handler,
        get_subscription_handler,
        billing::select_plan_handler,
        billing::confirm_payment_handler,
        billing::list_invoices_handler,
        settings::get_onboarding_handler,
        settings::complete_onboarding_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            PlanResponse,
            LimitsResponse,
            SubscriptionResponse,
            billing::SelectPlanRequest,
            billing::SelectPlanResponse,
            billing::CheckoutOrder,
            billing::ConfirmPaymentRequest,
            billing::ConfirmPaymentResponse,
            billing::InvoiceResponse,
            settings::OnboardingResponse,
            settings::CompletionResponse,
        )
    ),
    tags(
        (name = "ProspectFlow API", description = "Subscription, billing and onboarding endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

/// A plan from the catalog, with its computed pricing.
#[derive(Serialize, ToSchema)]
pub struct PlanResponse {
    pub id: String,
    pub tier: String,
    pub name: String,
    pub description: String,
    pub price_monthly: u32,
    pub duration_months: u32,
    pub is_popular: bool,
    pub original_total: u32,
    pub final_total: u32,
    pub discounted_per_month: Option<u32>,
    pub discount_percentage: Option<u32>,
}

impl From<&AvailablePlan> for PlanResponse {
    fn from(plan: &AvailablePlan) -> Self {
        let pricing = plan.pricing();
        Self {
            id: plan.id.to_string(),
            tier: plan.tier.as_str().to_string(),
            name: plan.name.to_string(),
            description: plan.description.to_string(),
            price_monthly: plan.price_monthly,
            duration_months: plan.duration_months,
            is_popular: plan.is_popular,
            original_total: pricing.original_total,
            final_total: pricing.final_total,
            discounted_per_month: pricing.discounted_per_month,
            discount_percentage: pricing.discount_percentage,
        }
    }
}

/// Per-resource caps. `null` means unbounded.
#[derive(Serialize, ToSchema)]
pub struct LimitsResponse {
    pub companies: Option<u32>,
    pub contacts: Option<u32>,
    pub job_openings: Option<u32>,
}

impl From<PlanLimits> for LimitsResponse {
    fn from(limits: PlanLimits) -> Self {
        Self {
            companies: limits.companies,
            contacts: limits.contacts,
            job_openings: limits.job_openings,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SubscriptionResponse {
    pub actual_tier: String,
    pub effective_tier_for_limits: String,
    pub limits: LimitsResponse,
    pub in_grace_period: bool,
    pub days_left_in_grace_period: Option<i64>,
    pub is_privileged: bool,
    /// Stored status, absent when the user has no subscription row.
    pub status: Option<String>,
    pub plan_start_date: Option<DateTime<Utc>>,
    pub plan_expiry_date: Option<DateTime<Utc>>,
}

impl From<SubscriptionView> for SubscriptionResponse {
    fn from(view: SubscriptionView) -> Self {
        let resolved = view.resolved;
        let record = view.record;
        Self {
            actual_tier: resolved.actual_tier.as_str().to_string(),
            effective_tier_for_limits: resolved.effective_tier_for_limits.as_str().to_string(),
            limits: resolved.limits.into(),
            in_grace_period: resolved.in_grace_period,
            days_left_in_grace_period: resolved.days_left_in_grace_period,
            is_privileged: resolved.is_privileged,
            status: record.as_ref().map(|r| r.status.as_str().to_string()),
            plan_start_date: record.as_ref().and_then(|r| r.plan_start_date),
            plan_expiry_date: record.as_ref().and_then(|r| r.plan_expiry_date),
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the purchasable plans.
#[utoipa::path(
    get,
    path = "/plans",
    responses(
        (status = 200, description = "The plan catalog", body = [PlanResponse])
    )
)]
pub async fn list_plans_handler() -> impl IntoResponse {
    let plans: Vec<PlanResponse> = ALL_AVAILABLE_PLANS.iter().map(PlanResponse::from).collect();
    Json(plans)
}

/// Resolve the signed-in user's subscription into tier, limits and grace status.
///
/// Never fails: an unreadable subscription resolves as free.
#[utoipa::path(
    get,
    path = "/subscription",
    responses(
        (status = 200, description = "The resolved subscription", body = SubscriptionResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_subscription_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> impl IntoResponse {
    let view = app_state.billing.current(&user, Utc::now()).await;
    Json(SubscriptionResponse::from(view))
}
