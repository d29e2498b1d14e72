use std::{process, sync::Arc, time::Duration};

use lumblog::{
    application::{
        admin::{
            activity::AdminActivityService, posts::AdminPostService,
            taxonomy::AdminTaxonomyService,
        },
        auth::{AdminGate, IdentityDelegate},
        content::ContentService,
        error::AppError,
        notifications::{NotificationDispatcher, PublishNotifier},
        repos::{
            ActivityRepo, HealthRepo, PostsRepo, PostsWriteRepo, SubscribersRepo, TaxonomyRepo,
            TaxonomyWriteRepo,
        },
        sitemap::SitemapService,
        subscriptions::SubscriptionService,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, HttpState, RouterState},
        mail::mailer_from_settings,
        platform_auth::PlatformIdentity,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
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

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_repositories(&settings).await?;
    info!(target = "lumblog::migrate", "migrations applied");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let router_state = build_router_state(repositories, &settings)?;
    serve_http(&settings, router_state).await
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or(InfraError::MissingDatabaseUrl)?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(InfraError::Connect)?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::Migrate)?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_router_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<RouterState, AppError> {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let taxonomy_repo: Arc<dyn TaxonomyRepo> = repositories.clone();
    let taxonomy_write_repo: Arc<dyn TaxonomyWriteRepo> = repositories.clone();
    let subscribers_repo: Arc<dyn SubscribersRepo> = repositories.clone();
    let activity_repo: Arc<dyn ActivityRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories;

    let mailer = mailer_from_settings(&settings.email).map_err(AppError::from)?;
    if settings.email.api_key.is_none() {
        warn!(
            target = "lumblog::startup",
            "email api key is not configured; outgoing mail will only be logged"
        );
    }

    let notifier: Arc<dyn PublishNotifier> = Arc::new(NotificationDispatcher::new(
        subscribers_repo.clone(),
        mailer.clone(),
        settings.site.base_url.clone(),
        settings.site.name.clone(),
    ));

    let delegate = match &settings.admin.platform_auth_url {
        Some(endpoint) => {
            let identity =
                PlatformIdentity::new(endpoint.clone(), settings.admin.platform_auth_timeout)
                    .map_err(AppError::from)?;
            Some(Arc::new(identity) as Arc<dyn IdentityDelegate>)
        }
        None => None,
    };
    if delegate.is_none() && settings.admin.api_key.is_none() {
        warn!(
            target = "lumblog::startup",
            "neither an admin key nor a platform identity service is configured; admin routes will reject every request"
        );
    }
    let gate = AdminGate::new(settings.admin.api_key.clone(), delegate);

    let activity = AdminActivityService::new(activity_repo);

    let content = ContentService::new(posts_repo.clone(), taxonomy_repo.clone());
    let subscriptions = SubscriptionService::new(
        subscribers_repo,
        mailer,
        settings.site.base_url.clone(),
        settings.site.name.clone(),
        settings.subscriptions.token_ttl_days.get(),
    );
    let posts = AdminPostService::new(
        posts_repo.clone(),
        posts_write_repo,
        taxonomy_repo.clone(),
        activity.clone(),
        Some(notifier),
    );
    let taxonomy = AdminTaxonomyService::new(taxonomy_repo, taxonomy_write_repo, activity);
    let sitemap = SitemapService::new(posts_repo, settings.site.base_url.clone());

    Ok(RouterState {
        http: HttpState {
            sitemap: Arc::new(sitemap),
            health: health_repo,
        },
        api: ApiState {
            content: Arc::new(content),
            subscriptions: Arc::new(subscriptions),
            posts: Arc::new(posts),
            taxonomy: Arc::new(taxonomy),
            gate: Arc::new(gate),
            session_max_age: settings.admin.session_max_age,
        },
    })
}

async fn serve_http(settings: &config::Settings, state: RouterState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|source| InfraError::Bind {
            addr: settings.server.addr,
            source,
        })?;

    info!(
        target = "lumblog::startup",
        addr = %settings.server.addr,
        "listening"
    );

    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    drain_within(settings.server.graceful_shutdown, server).await
}

/// Once the shutdown signal fires, in-flight requests get `grace` to finish.
async fn drain_within<F>(grace: Duration, server: F) -> Result<(), AppError>
where
    F: std::future::IntoFuture<Output = std::io::Result<()>>,
{
    let server = server.into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            return result.map_err(|err| AppError::unexpected(format!("server error: {err}")));
        }
        _ = shutdown_signal() => {}
    }

    match tokio::time::timeout(grace, server).await {
        Ok(result) => result.map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        Err(_) => {
            warn!(
                target = "lumblog::shutdown",
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "lumblog::shutdown",
            error = %err,
            "failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
    info!(target = "lumblog::shutdown", "shutdown signal received");
}
