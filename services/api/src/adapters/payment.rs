//! services/api/src/adapters/payment.rs
//!
//! This module contains the adapter for the Razorpay payment gateway.
//! It implements the `PaymentGateway` port from the `core` crate: orders are
//! created over the REST API, and checkout confirmations are checked against the
//! HMAC-SHA256 signature Razorpay computes over `"<order_id>|<payment_id>"`.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use prospectflow_core::domain::{CreatedOrder, PaymentConfirmation, PaymentOrder};
use prospectflow_core::ports::{PaymentGateway, PortError, PortResult};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `PaymentGateway` against the Razorpay Orders API.
#[derive(Clone)]
pub struct RazorpayAdapter {
    client: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayAdapter {
    /// Creates a new `RazorpayAdapter`.
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        }
    }

    fn expected_signature(&self, order_id: &str, payment_id: &str) -> PortResult<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct OrderRequest<'a> {
    amount: u64,
    currency: &'a str,
    receipt: &'a str,
    notes: &'a BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
    amount: u64,
    currency: String,
}

//=========================================================================================
// `PaymentGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl PaymentGateway for RazorpayAdapter {
    async fn create_order(&self, order: &PaymentOrder) -> PortResult<CreatedOrder> {
        let body = OrderRequest {
            amount: order.amount_minor,
            currency: &order.currency,
            receipt: &order.receipt,
            notes: &order.notes,
        };

        let response = self
            .client
            .post(format!("{}/orders", self.api_base))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(PortError::Unauthorized);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Order creation failed with {}: {}",
                status, detail
            )));
        }

        let created: OrderResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(CreatedOrder {
            order_id: created.id,
            amount_minor: created.amount,
            currency: created.currency,
        })
    }

    fn verify_confirmation(&self, confirmation: &PaymentConfirmation) -> PortResult<bool> {
        let provided = match hex::decode(confirmation.signature.trim()) {
            Ok(bytes) => bytes,
            Err(_) => {
                debug!("Payment signature is not valid hex");
                return Ok(false);
            }
        };
        let expected = self.expected_signature(&confirmation.order_id, &confirmation.payment_id)?;
        if provided.len() != expected.len() {
            return Ok(false);
        }
        Ok(expected.as_slice().ct_eq(provided.as_slice()).into())
    }

    fn public_key_id(&self) -> &str {
        &self.key_id
    }
}
