use std::{path::Path, process, sync::Arc};

use agora::{
    application::{
        error::{AppError, ErrorReport},
        feed::FeedService,
        posts::PostService,
        render::{RenderService, render_service},
        repos::{AuthorsRepo, CommentsRepo, PostsRepo, PostsWriteRepo},
    },
    cache::{CacheConfig, FeedCache},
    config,
    infra::{error::InfraError, memory::InMemoryRepositories, seed, telemetry},
};
use tokio::io::AsyncReadExt;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(i32::from(error.exit_code()));
    }
}

fn report_application_error(error: &AppError) {
    let report = ErrorReport::from_error("agora", error);
    let log = || {
        error!(
            source = report.source,
            error = %error,
            chain = ?report.messages,
            "application error"
        );
    };

    if dispatcher::has_been_set() {
        log();
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, log);
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        config::Command::Render(args) => run_render(args).await,
        config::Command::Feed(args) => run_feed(settings, args).await,
    }
}

async fn run_render(args: config::RenderArgs) -> Result<(), AppError> {
    let source = read_source(args.file.as_deref()).await?;
    let renderer = render_service();

    let html = if args.unsanitized {
        renderer
            .render_unsanitized(&source)
            .map_err(|err| AppError::unexpected(err.to_string()))?
    } else {
        renderer.render(&source, args.profile.into())
    };

    print!("{html}");
    Ok(())
}

async fn read_source(file: Option<&Path>) -> Result<String, AppError> {
    let source = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(InfraError::from)?,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .map_err(InfraError::from)?;
            buffer
        }
    };
    Ok(source)
}

async fn run_feed(settings: config::Settings, args: config::FeedArgs) -> Result<(), AppError> {
    let repositories = Arc::new(InMemoryRepositories::new());
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories.clone();
    let authors_repo: Arc<dyn AuthorsRepo> = repositories.clone();

    let cache = FeedCache::from_config(&CacheConfig::from(&settings.cache));
    let renderer: Arc<dyn RenderService> = render_service();

    let post_service = PostService::new(
        posts_repo.clone(),
        posts_write_repo,
        renderer,
        cache.clone(),
        settings.content.clone(),
    );
    let feed_service = FeedService::new(
        posts_repo,
        comments_repo,
        authors_repo.clone(),
        cache.clone(),
        settings.feed.posts_per_page,
    );

    let seeded = seed::seed_from_dir(&args.dir, authors_repo.as_ref(), &post_service).await?;
    info!(
        target = "agora::feed",
        seeded,
        backend = cache.backend_name(),
        page = args.page,
        "Building feed page"
    );

    // The second read is served from the cache when it is enabled.
    let page = feed_service.page(args.page).await?;
    let cached = feed_service.page(args.page).await?;
    if page != cached {
        return Err(AppError::unexpected(
            "cached feed page differs from the rebuilt page",
        ));
    }

    let json = serde_json::to_string_pretty(&page).map_err(InfraError::from)?;
    println!("{json}");
    Ok(())
}
