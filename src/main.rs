use std::{process, sync::Arc};

use tidings::{
    application::{
        content::{ContentError, ContentService},
        downloads::DownloadService,
        error::AppError,
        files::FileService,
        inquiries::{InquiryNotifications, InquiryService},
        mail::Mailer,
        newsletter::{
            FanOutDispatcher, NewsletterLinks, NewsletterQueue, NewsletterService, NewsletterTask,
            NewsletterWorker,
        },
        repos::{ContentRepo, FilesRepo, HealthRepo, InquiriesRepo, SubscribersRepo},
        subscriptions::SubscriptionService,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        files::FileStorage,
        http::{self, AdminState, PublicState},
        mail::{LogMailer, SmtpMailer},
        telemetry,
    },
};
use tokio::{sync::mpsc, sync::watch, try_join};
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
        error!(target = "tidings::main", error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(target = "tidings::main", error = %error, "application error");
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
        config::Command::Broadcast(args) => run_broadcast(settings, args).await,
    }
}

/// Services wired against one repository set and one mail transport.
struct ApplicationContext {
    public_state: PublicState,
    admin_state: AdminState,
    content: Arc<ContentService>,
    worker: NewsletterWorker,
    receiver: mpsc::Receiver<NewsletterTask>,
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let ApplicationContext {
        public_state,
        admin_state,
        content,
        worker,
        receiver,
    } = build_application_context(repositories, &settings)?;
    drop(content);

    let worker_handle = worker.spawn(receiver);

    let result = serve_http(&settings, public_state, admin_state).await;

    // Routers are gone, so every queue sender is dropped; the worker finishes
    // its in-flight batches and returns.
    match tokio::time::timeout(settings.server.graceful_shutdown, worker_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(
            target = "tidings::main",
            error = %err,
            "newsletter worker terminated abnormally"
        ),
        Err(_) => warn!(
            target = "tidings::main",
            timeout_secs = settings.server.graceful_shutdown.as_secs(),
            "newsletter queue did not drain before shutdown"
        ),
    }

    result
}

async fn run_broadcast(
    settings: config::Settings,
    args: config::BroadcastArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let context = build_application_context(repositories, &settings)?;

    info!(
        target = "tidings::broadcast",
        content_kind = args.kind.as_str(),
        item_id = %args.id,
        "broadcasting newsletter"
    );

    let report = context
        .content
        .broadcast(args.kind, args.id)
        .await
        .map_err(content_error)?;

    info!(
        target = "tidings::broadcast",
        content_kind = args.kind.as_str(),
        item_id = %args.id,
        attempted = report.attempted,
        delivered = report.delivered,
        failed = report.failed,
        "broadcast finished"
    );

    Ok(())
}

fn content_error(err: ContentError) -> AppError {
    match err {
        ContentError::Domain(err) => AppError::Domain(err),
        ContentError::NotFound { .. } => AppError::NotFound,
        other => AppError::unexpected(other.to_string()),
    }
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

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_mailer(settings: &config::Settings) -> Result<Arc<dyn Mailer>, AppError> {
    match settings.mail.smtp.as_ref() {
        Some(smtp) => {
            let mailer = SmtpMailer::new(smtp)
                .map_err(|err| AppError::from(InfraError::mail(err.to_string())))?;
            info!(
                target = "tidings::main",
                host = %smtp.host,
                port = smtp.port,
                "smtp transport configured"
            );
            Ok(Arc::new(mailer))
        }
        None => {
            warn!(
                target = "tidings::main",
                "smtp is not configured; outgoing mail will only be logged"
            );
            Ok(Arc::new(LogMailer))
        }
    }
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let subscribers_repo: Arc<dyn SubscribersRepo> = repositories.clone();
    let content_repo: Arc<dyn ContentRepo> = repositories.clone();
    let files_repo: Arc<dyn FilesRepo> = repositories.clone();
    let inquiries_repo: Arc<dyn InquiriesRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories;

    let storage = Arc::new(
        FileStorage::new(settings.uploads.directory.clone())
            .map_err(|err| AppError::from(InfraError::from(err)))?,
    );
    let mailer = build_mailer(settings)?;

    let links = NewsletterLinks::new(
        settings.newsletter.site_url.clone(),
        settings.newsletter.listing_paths.clone(),
    );
    let dispatcher = FanOutDispatcher::new(mailer.clone(), settings.mail.from.clone());
    let newsletter = Arc::new(NewsletterService::new(
        subscribers_repo.clone(),
        content_repo.clone(),
        links,
        dispatcher,
    ));

    let (queue, receiver) = NewsletterQueue::new(settings.newsletter.queue_capacity.get());
    let worker = NewsletterWorker::new(newsletter.clone(), mailer);

    let content = Arc::new(ContentService::new(
        content_repo.clone(),
        files_repo.clone(),
        queue.clone(),
        newsletter,
    ));
    let files = Arc::new(FileService::new(files_repo.clone(), storage.clone()));
    let downloads = Arc::new(DownloadService::new(content_repo, files_repo, storage));
    let subscriptions = Arc::new(SubscriptionService::new(subscribers_repo));
    let inquiries = Arc::new(InquiryService::new(
        inquiries_repo,
        queue,
        InquiryNotifications {
            from: settings.mail.from.clone(),
            to: settings.mail.notify_address.clone(),
        },
    ));

    let public_state = PublicState {
        subscriptions,
        inquiries,
        downloads,
        health: health_repo.clone(),
    };
    let admin_state = AdminState {
        content: content.clone(),
        files,
        health: health_repo,
    };

    Ok(ApplicationContext {
        public_state,
        admin_state,
        content,
        worker,
        receiver,
    })
}

async fn serve_http(
    settings: &config::Settings,
    public_state: PublicState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_public_router(public_state);
    let upload_body_limit = usize::try_from(settings.uploads.max_request_bytes.get())
        .map_err(|_| AppError::unexpected("upload body limit exceeds usize"))?;
    let admin_router = http::build_admin_router(admin_state, upload_body_limit);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "tidings::main",
        public_addr = %settings.server.public_addr,
        admin_addr = %settings.server.admin_addr,
        "listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!(target = "tidings::main", "shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx));

    try_join!(public_server, admin_server)
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn wait_for_shutdown(mut receiver: watch::Receiver<bool>) {
    if receiver.wait_for(|stop| *stop).await.is_err() {
        // Sender dropped without a signal; keep serving.
        std::future::pending::<()>().await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "tidings::main", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(target = "tidings::main", error = %err, "failed to listen for SIGTERM");
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
}
