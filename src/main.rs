use std::sync::Arc;

use axum::middleware;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cinematch::{
    api::{create_router, AppState},
    config::Config,
    db::{
        create_pool, create_redis_client, run_migrations, PgInteractionStore, PgItemStore,
        RecommendationCache, RedisCache,
    },
    middleware::{make_span_with_request_id, request_id_middleware},
    services::{JsonModelLoader, ModelLoader, RecommendationService, Recommenders},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_json);

    tracing::info!(host = %config.host, port = config.port, "Starting cinematch");

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let redis_client = create_redis_client(&config.redis_url)?;
    let cache = RecommendationCache::new(Arc::new(RedisCache::new(redis_client)));

    let items = Arc::new(PgItemStore::new(pool.clone()));
    let interactions = Arc::new(PgInteractionStore::new(pool));

    // Missing artifacts only disable the tiers that need them
    let loader = JsonModelLoader::new(&config.model_storage_path, &config.model_version);
    let model = match loader.load().await {
        Ok(model) => Some(Arc::new(model)),
        Err(e) => {
            tracing::warn!(error = %e, "Collaborative model not loaded, falling back to content-based");
            None
        }
    };
    let hybrid_config = match loader.load_hybrid_config().await {
        Ok(hybrid_config) => Some(hybrid_config),
        Err(e) => {
            tracing::warn!(error = %e, "Hybrid configuration not loaded, hybrid requests use content-based");
            None
        }
    };

    let recommenders = Recommenders::assemble(
        items.clone(),
        interactions.clone(),
        model,
        hybrid_config,
        config.recommender_settings(),
    );
    let service = RecommendationService::new(
        recommenders,
        items.clone(),
        interactions,
        cache,
        config.cache_ttls(),
        config.max_rating,
    );

    let state = AppState::new(Arc::new(service), items, config.max_limit);

    let app = create_router(state).layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
            .layer(CorsLayer::permissive()),
    );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cinematch=info,tower_http=info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
