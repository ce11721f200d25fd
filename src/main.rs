use std::{process, sync::Arc};

use discuss::{
    application::{
        discuss::{DiscussOptions, DiscussService},
        error::AppError,
        render::MarkdownRenderer,
    },
    cache::{CacheConfig, DiscussCache},
    config,
    indexing::{IndexConfig, IndexSyncPipeline},
    infra::{db::PostgresRepositories, error::InfraError, search, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
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

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        config::Command::Migrate => run_migrate(&settings).await,
        config::Command::Reindex => run_reindex(&settings).await,
    }
}

async fn run_migrate(settings: &config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(settings).await?;

    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    info!(target = "discuss::migrate", "Migrations applied");
    Ok(())
}

async fn run_reindex(settings: &config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(settings).await?;
    let search_index = search::search_index(&settings.search)?;

    let (pipeline, worker) =
        IndexSyncPipeline::spawn(IndexConfig::from(&settings.indexing), search_index);
    let cache = Arc::new(DiscussCache::new(&CacheConfig::from(&settings.cache)));
    let service = DiscussService::new(
        repositories.discuss_repos(),
        Arc::new(MarkdownRenderer::new()),
        cache,
        pipeline,
        DiscussOptions::from(&settings.discuss),
    );

    info!(target = "discuss::reindex", "Starting reindex");
    let result = service.reindex_all().await;

    // The worker exits once every pipeline handle is gone and the queue is drained.
    drop(service);
    worker.join().await;

    let summary = result?;
    info!(
        target = "discuss::reindex",
        topics = summary.topics,
        replies = summary.replies,
        skipped = summary.skipped,
        "Reindex completed"
    );
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}
