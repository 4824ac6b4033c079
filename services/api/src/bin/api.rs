//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db::DbAdapter, payment::RazorpayAdapter},
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, signup_handler},
        billing::{confirm_payment_handler, list_invoices_handler, select_plan_handler},
        get_subscription_handler, list_plans_handler,
        middleware::require_auth,
        rest::ApiDoc,
        settings::{complete_onboarding_handler, get_onboarding_handler},
        state::AppState,
        ws_handler,
    },
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use prospectflow_core::billing::BillingService;
use prospectflow_core::onboarding::OnboardingService;
use prospectflow_core::ports::PaymentGateway;
use prospectflow_core::subscription::PrivilegeList;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let gateway: Option<Arc<dyn PaymentGateway>> = match &config.payment_keys {
        Some(keys) => {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .map_err(|e| ApiError::Internal(format!("HTTP client: {}", e)))?;
            let adapter: Arc<dyn PaymentGateway> = Arc::new(RazorpayAdapter::new(
                client,
                config.payment_api_base.clone(),
                keys.key_id.clone(),
                keys.key_secret.clone(),
            ));
            Some(adapter)
        }
        None => {
            warn!("Razorpay keys not set. Premium checkout is disabled.");
            None
        }
    };

    let privileged = PrivilegeList::new(&config.privileged_emails);
    info!("{} privileged account(s) exempt from usage limits", privileged.len());

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        users: db_adapter.clone(),
        billing: BillingService::new(
            db_adapter.clone(),
            db_adapter.clone(),
            db_adapter.clone(),
            gateway,
            privileged,
            config.payment_currency.clone(),
        ),
        onboarding: OnboardingService::new(db_adapter.clone()),
    });

    // --- 5. Configure CORS ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/plans", get(list_plans_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/subscription", get(get_subscription_handler))
        .route("/billing/select", post(select_plan_handler))
        .route("/billing/confirm", post(confirm_payment_handler))
        .route("/billing/invoices", get(list_invoices_handler))
        .route("/settings/onboarding", get(get_onboarding_handler))
        .route(
            "/settings/onboarding/complete",
            post(complete_onboarding_handler),
        )
        .route("/tutorial/ws", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
