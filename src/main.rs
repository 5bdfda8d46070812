mod authentication;
mod axum_util;
mod config;
mod db;
mod error;
mod redact;
mod routes;
mod shutdown_actor;
mod tokio_util;
mod user;

use authentication::authentication_actor::AuthenticationActorHandler;
use db::Db;
use error::Result;
use shutdown_actor::ShutdownActorHandler;
use std::{panic, process};
use tokio::task::JoinSet;
use tower_http::{compression::CompressionLayer, trace, trace::TraceLayer};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let mut join_set = JoinSet::new();
    let result = user_auth_service(&mut join_set).await;

    if let Err(e) = &result {
        eprintln!("Error: {}", e);
    }

    join_set.join_all().await;

    if result.is_err() {
        process::exit(1);
    }
}

async fn user_auth_service(join_set: &mut JoinSet<()>) -> Result<()> {
    panic::set_hook(Box::new(|info| {
        tracing::error!("Task panic: {}", info);
        process::exit(1);
    }));

    let shutdown_handler = ShutdownActorHandler::new(join_set);

    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        return Err(e.into());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting server");

    let config = config::Config::from_env()?;

    let db = Db::connect(&config).await?;

    let authentication_actor_handler = AuthenticationActorHandler::new(&shutdown_handler, db).await?;

    // the shutdown actor finishes once the router releases the last actor handler
    drop(shutdown_handler);

    let listener = tokio::net::TcpListener::bind(&config.listen_address).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let app = routes::router(authentication_actor_handler)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CompressionLayer::new()
                .br(true)
                .deflate(true)
                .gzip(true)
                .zstd(true),
        );

    axum::serve(listener, app)
        .with_graceful_shutdown(tokio_util::shutdown_signal())
        .await?;

    tracing::info!("Server stopped");

    Ok(())
}
