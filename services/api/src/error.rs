//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service.

use crate::config::ConfigError;
use axum::http::StatusCode;
use prospectflow_core::billing::BillingError;
use prospectflow_core::ports::PortError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while running the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Maps a billing failure onto the status and message a handler returns.
pub fn billing_status(err: &BillingError) -> (StatusCode, String) {
    let status = match err {
        BillingError::UnknownPlan(_) | BillingError::NotPurchasable(_) => StatusCode::BAD_REQUEST,
        BillingError::PlanMismatch { .. } => StatusCode::BAD_REQUEST,
        BillingError::UnknownOrder(_) => StatusCode::NOT_FOUND,
        BillingError::AlreadyActive(_)
        | BillingError::PremiumActive
        | BillingError::AlreadyApplied(_) => StatusCode::CONFLICT,
        BillingError::InvalidSignature => StatusCode::UNPROCESSABLE_ENTITY,
        BillingError::PaymentsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        BillingError::Port(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
        BillingError::Port(PortError::Unauthorized) => StatusCode::UNAUTHORIZED,
        BillingError::Port(PortError::Unexpected(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        "Billing request failed".to_string()
    } else {
        err.to_string()
    };
    (status, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billing_errors_map_to_client_statuses() {
        assert_eq!(
            billing_status(&BillingError::AlreadyActive("Free Tier".into())).0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            billing_status(&BillingError::InvalidSignature).0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn checkout_order_misuse_is_a_client_error() {
        assert_eq!(
            billing_status(&BillingError::AlreadyApplied("order_1".into())).0,
            StatusCode::CONFLICT
        );
        assert_eq!(billing_status(&BillingError::PremiumActive).0, StatusCode::CONFLICT);
        let (status, message) = billing_status(&BillingError::PlanMismatch {
            order_id: "order_1".into(),
            plan_id: "premium-1m".into(),
        });
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.contains("premium-1m"));
        assert_eq!(
            billing_status(&BillingError::UnknownOrder("order_9".into())).0,
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn internal_failures_hide_details() {
        let (status, message) =
            billing_status(&BillingError::Port(PortError::Unexpected("pool timed out".into())));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("pool"));
    }
}
