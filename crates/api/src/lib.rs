//! HTTP API server with observability for the marketplace core.
//!
//! Thin boundary over the commerce engines: request parsing, identity
//! extraction, and error-to-status mapping live here; every domain rule
//! lives below. Structured logging via tracing and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use domain::{AgencyDirectory, CommissionRate};
use ledger::Ledger;
use metrics_exporter_prometheus::PrometheusHandle;
use notify::{LogEmailSender, NotificationDispatcher};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use commerce::{CheckoutService, InMemoryPaymentGateway, OfferService};

/// Shared application state accessible from all handlers.
pub struct AppState<L: Ledger> {
    pub ledger: Arc<L>,
    pub offers: OfferService<L, LogEmailSender>,
    pub checkout: CheckoutService<L, InMemoryPaymentGateway, LogEmailSender>,
    pub gateway: Arc<InMemoryPaymentGateway>,
    pub agencies: AgencyDirectory,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L: Ledger + 'static>(
    state: Arc<AppState<L>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/listings", post(routes::listings::create::<L>))
        .route("/listings/{id}", get(routes::listings::get::<L>))
        .route("/users/me/listings", get(routes::listings::mine::<L>))
        .route("/offers", post(routes::offers::create::<L>))
        .route("/offers/{id}/respond", post(routes::offers::respond::<L>))
        .route("/offers/made", get(routes::offers::made::<L>))
        .route("/offers/received", get(routes::offers::received::<L>))
        .route("/orders", post(routes::orders::create::<L>))
        .route("/orders", get(routes::orders::list::<L>))
        .route("/orders/{id}", get(routes::orders::get::<L>))
        .route("/payments/preference", post(routes::payments::create_preference::<L>))
        .route("/payments/{id}/confirm", post(routes::payments::confirm::<L>))
        .route("/cart", post(routes::cart::add::<L>))
        .route("/cart", get(routes::cart::list::<L>))
        .route("/cart/{listing_id}", delete(routes::cart::remove::<L>))
        .route("/notifications", get(routes::notifications::list::<L>))
        .route("/notifications/{id}/read", post(routes::notifications::mark_read::<L>))
        .route("/notifications/preferences", get(routes::notifications::preferences::<L>))
        .route("/notifications/preferences", put(routes::notifications::update_preferences::<L>))
        .route("/shipping/agencies", get(routes::shipping::agencies))
        .route("/shipping/agencies/{id}", get(routes::shipping::agency))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over the given ledger, wiring the
/// log-only email sender and the in-memory payment gateway.
pub fn create_default_state<L: Ledger + 'static>(
    ledger: Arc<L>,
    commission: CommissionRate,
) -> Arc<AppState<L>> {
    let sender = Arc::new(LogEmailSender);
    let gateway = Arc::new(InMemoryPaymentGateway::new());
    let dispatcher = NotificationDispatcher::new(Arc::clone(&ledger), sender);

    let offers = OfferService::new(Arc::clone(&ledger), dispatcher.clone());
    let checkout = CheckoutService::new(
        Arc::clone(&ledger),
        Arc::clone(&gateway),
        dispatcher,
        commission,
    );

    Arc::new(AppState {
        ledger,
        offers,
        checkout,
        gateway,
        agencies: AgencyDirectory::new(),
    })
}
