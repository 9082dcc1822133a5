use std::{process, sync::Arc};

use manga_catalog::{
    application::{
        admin::CatalogWriteService,
        catalog::CatalogReadService,
        cdn::PathTranslator,
        chapters::ChapterReadService,
        repos::{CatalogRepo, CatalogWriteRepo},
        showcase::ShowcaseService,
    },
    cache::{CacheConfig, CacheStore, InvalidationCoordinator, MemoryCacheStore, QueryCache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, HealthCheck, HttpState},
        telemetry,
    },
};
use tokio::{signal, sync::watch, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &InfraError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), InfraError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn connect(settings: &config::Settings) -> Result<PostgresRepositories, InfraError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool = PostgresRepositories::connect(
        database_url,
        settings.database.max_connections.get(),
        settings.database.acquire_timeout,
    )
    .await
    .map_err(|err| InfraError::database(err.to_string()))?;

    Ok(PostgresRepositories::new(pool))
}

async fn run_migrate(settings: config::Settings) -> Result<(), InfraError> {
    let repositories = connect(&settings).await?;
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| InfraError::migration(err.to_string()))?;
    info!("Database migrations applied");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), InfraError> {
    let repositories = Arc::new(connect(&settings).await?);
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| InfraError::migration(err.to_string()))?;

    let (http_state, admin_state) = build_states(repositories, &settings);
    serve_http(&settings, http_state, admin_state).await
}

fn build_states(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> (HttpState, AdminState) {
    let catalog_repo: Arc<dyn CatalogRepo> = repositories.clone();
    let write_repo: Arc<dyn CatalogWriteRepo> = repositories.clone();
    let health: Arc<dyn HealthCheck> = repositories;

    let cdn = Arc::new(PathTranslator::new(&settings.cdn));
    let cache_config = CacheConfig::from(&settings.cache);
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(&cache_config));
    let query_cache = Arc::new(QueryCache::new(cache_config.clone(), store.clone()));
    let invalidation = Arc::new(InvalidationCoordinator::new(cache_config.clone(), store));

    info!(
        cache_enabled = cache_config.enabled,
        max_entries_per_region = cache_config.max_entries_per_region,
        cdn_enabled = cdn.is_enabled(),
        "Catalog services configured"
    );

    let writes = Arc::new(CatalogWriteService::new(
        write_repo,
        invalidation,
        cdn.clone(),
    ));

    let http_state = HttpState {
        catalog: Arc::new(CatalogReadService::new(
            catalog_repo.clone(),
            query_cache.clone(),
            cdn.clone(),
        )),
        chapters: Arc::new(ChapterReadService::new(
            catalog_repo,
            query_cache,
            cdn.clone(),
        )),
        showcase: Arc::new(ShowcaseService::new(
            Arc::new(settings.showcase.clone()),
            cdn.clone(),
        )),
        views: writes.clone(),
        cdn,
        health: health.clone(),
    };
    let admin_state = AdminState { writes, health };

    (http_state, admin_state)
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
) -> Result<(), InfraError> {
    let public_router = http::build_router(http_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr).await?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr).await?;
    info!(
        public_addr = %settings.server.public_addr,
        admin_addr = %settings.server.admin_addr,
        "Listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx));

    let servers = async { try_join!(public_server, admin_server) };
    tokio::pin!(servers);

    tokio::select! {
        result = &mut servers => {
            result?;
            return Ok(());
        }
        () = shutdown_signal() => {
            let _ = shutdown_tx.send(true);
        }
    }

    match tokio::time::timeout(settings.server.graceful_shutdown, &mut servers).await {
        Ok(result) => {
            result?;
            info!("Server shutdown complete");
        }
        Err(_) => warn!(
            grace_seconds = settings.server.graceful_shutdown.as_secs(),
            "Graceful shutdown timed out; dropping open connections"
        ),
    }

    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
