//! services/api/src/web/billing.rs
//!
//! Handlers for choosing a plan, confirming a checkout payment, and listing invoices.

use crate::error::billing_status;
use crate::web::{rest::SubscriptionResponse, state::AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{NaiveDate, Utc};
use prospectflow_core::billing::PlanSelection;
use prospectflow_core::domain::{InvoiceRecord, PaymentConfirmation, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SelectPlanRequest {
    pub plan_id: String,
}

/// Everything the checkout widget needs to collect payment.
#[derive(Serialize, ToSchema)]
pub struct CheckoutOrder {
    pub key_id: String,
    pub order_id: String,
    /// In the currency's minor unit.
    pub amount: u64,
    pub currency: String,
    pub plan_id: String,
    pub plan_name: String,
}

/// Either the new subscription (free plans) or an order to pay for (premium plans).
#[derive(Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SelectPlanResponse {
    Activated { subscription: SubscriptionResponse },
    PaymentRequired { checkout: CheckoutOrder },
}

impl From<PlanSelection> for SelectPlanResponse {
    fn from(selection: PlanSelection) -> Self {
        match selection {
            PlanSelection::Activated(view) => Self::Activated {
                subscription: view.into(),
            },
            PlanSelection::PaymentRequired { plan, order, key_id } => Self::PaymentRequired {
                checkout: CheckoutOrder {
                    key_id,
                    order_id: order.order_id,
                    amount: order.amount_minor,
                    currency: order.currency,
                    plan_id: plan.id.to_string(),
                    plan_name: plan.name.to_string(),
                },
            },
        }
    }
}

/// The checkout widget's success payload, plus the plan it was opened for.
#[derive(Deserialize, ToSchema)]
pub struct ConfirmPaymentRequest {
    pub plan_id: String,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

#[derive(Serialize, ToSchema)]
pub struct InvoiceResponse {
    pub invoice_number: String,
    pub plan_id: String,
    pub plan_name: String,
    pub amount_paid: u32,
    pub currency: String,
    pub payment_id: String,
    pub order_id: String,
    pub invoice_date: NaiveDate,
}

impl From<InvoiceRecord> for InvoiceResponse {
    fn from(invoice: InvoiceRecord) -> Self {
        Self {
            invoice_number: invoice.invoice_number,
            plan_id: invoice.plan_id,
            plan_name: invoice.plan_name,
            amount_paid: invoice.amount_paid,
            currency: invoice.currency,
            payment_id: invoice.payment_id,
            order_id: invoice.order_id,
            invoice_date: invoice.invoice_date,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ConfirmPaymentResponse {
    pub subscription: SubscriptionResponse,
    /// Absent when the payment was applied but the invoice could not be recorded.
    pub invoice: Option<InvoiceResponse>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /billing/select - Choose a plan
///
/// Free plans take effect immediately. Premium plans answer with an order for the
/// checkout widget, and take effect once `/billing/confirm` accepts the payment.
#[utoipa::path(
    post,
    path = "/billing/select",
    request_body = SelectPlanRequest,
    responses(
        (status = 200, description = "Plan activated or payment order created", body = SelectPlanResponse),
        (status = 400, description = "Unknown plan"),
        (status = 409, description = "Already on the free plan, or premium is still active"),
        (status = 503, description = "Payments are not configured")
    )
)]
pub async fn select_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(req): Json<SelectPlanRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let selection = state
        .billing
        .select_plan(&user, &req.plan_id, Utc::now())
        .await
        .map_err(|e| {
            error!("Plan selection failed for user {}: {}", user.user_id, e);
            billing_status(&e)
        })?;

    Ok(Json(SelectPlanResponse::from(selection)))
}

/// POST /billing/confirm - Apply a signed checkout confirmation
#[utoipa::path(
    post,
    path = "/billing/confirm",
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Payment applied", body = ConfirmPaymentResponse),
        (status = 400, description = "Unknown or free plan, or the order was opened for another plan"),
        (status = 404, description = "No such checkout order for this account"),
        (status = 409, description = "Order already applied"),
        (status = 422, description = "Signature did not verify"),
        (status = 503, description = "Payments are not configured")
    )
)]
pub async fn confirm_payment_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(req): Json<ConfirmPaymentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let confirmation = PaymentConfirmation {
        order_id: req.razorpay_order_id,
        payment_id: req.razorpay_payment_id,
        signature: req.razorpay_signature,
    };

    let purchase = state
        .billing
        .apply_confirmation(&user, &req.plan_id, &confirmation, Utc::now())
        .await
        .map_err(|e| {
            error!(
                "Payment confirmation for order {} failed: {}",
                confirmation.order_id, e
            );
            billing_status(&e)
        })?;
    info!(
        "Applied payment {} for user {}",
        confirmation.payment_id, user.user_id
    );

    Ok(Json(ConfirmPaymentResponse {
        subscription: purchase.view.into(),
        invoice: purchase.invoice.map(InvoiceResponse::from),
    }))
}

/// GET /billing/invoices - List the user's invoices
#[utoipa::path(
    get,
    path = "/billing/invoices",
    responses(
        (status = 200, description = "Invoices, newest first", body = [InvoiceResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_invoices_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let invoices = state.billing.invoices(&user).await.map_err(|e| {
        error!("Failed to list invoices for user {}: {}", user.user_id, e);
        billing_status(&e)
    })?;

    let body: Vec<InvoiceResponse> = invoices.into_iter().map(InvoiceResponse::from).collect();
    Ok(Json(body))
}
