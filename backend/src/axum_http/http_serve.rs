use crate::{
    auth::AuthSettings,
    axum_http::{default_routers, routers, state::AppState},
    config::config_model::DotEnvyConfig,
    usecases::{
        billing::BillingSessionUseCase, plan_catalog::PlanCatalog, plan_resolver::PlanResolver,
        usage_guard::UsageGuardUseCase,
    },
};
use anyhow::Result;
use axum::{
    Router,
    http::{
        Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use crates::{
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            billing_customers::BillingCustomerPostgres, resources::ResourcePostgres,
            subscriptions::SubscriptionPostgres,
        },
    },
    payments::stripe_client::{StripeClient, StripeSettings},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

pub fn build_state(config: &DotEnvyConfig, db_pool: Arc<PgPoolSquad>) -> Result<AppState> {
    let catalog = Arc::new(PlanCatalog::from_config(&config.stripe)?);
    info!(
        pro_purchasable = config.stripe.price_pro.is_some(),
        creator_plus_purchasable = config.stripe.price_creator_plus.is_some(),
        "plan catalog loaded"
    );

    let stripe_client = StripeClient::new(StripeSettings {
        secret_key: config.stripe.secret_key.clone(),
        webhook_secret: config.stripe.webhook_secret.clone(),
        api_base: config.stripe.api_base.clone(),
        timeout: Duration::from_secs(config.stripe.timeout_secs),
    })?;

    let subscription_repository = Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool)));
    let resource_repository = Arc::new(ResourcePostgres::new(Arc::clone(&db_pool)));
    let customer_repository = Arc::new(BillingCustomerPostgres::new(Arc::clone(&db_pool)));

    let plan_resolver = Arc::new(PlanResolver::new(
        Arc::clone(&catalog),
        Arc::clone(&subscription_repository),
    ));
    let usage_guard = UsageGuardUseCase::new(Arc::clone(&plan_resolver), resource_repository);
    let billing = BillingSessionUseCase::new(
        catalog,
        subscription_repository,
        customer_repository,
        Arc::new(stripe_client),
    );

    Ok(AppState {
        auth: AuthSettings {
            jwt_secret: config.supabase.jwt_secret.clone(),
        },
        plan_resolver,
        usage_guard: Arc::new(usage_guard),
        billing: Arc::new(billing),
    })
}

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let state = build_state(&config, db_pool)?;

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest("/api/v1/billing", routers::billing::routes(state.clone()))
        .nest(
            "/api/v1/entitlements",
            routers::entitlements::routes(state.clone()),
        )
        .nest("/api/v1/resources", routers::resources::routes(state))
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(timeout_layer(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
