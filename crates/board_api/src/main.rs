//! The club leaderboards API program.
//!
//! The program also includes a [library](board_api_lib). Overall, it uses the
//! [`boards_lib`] crate as a main dependency.

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use anyhow::Context;
use boards_lib::cache::BoardCache;
use boards_lib::sql::MySqlStore;
use mkenv::prelude::*;
use tracing::level_filters::LevelFilter;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// The main entry point.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv()?;
    board_api_lib::init_env()?;

    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let store = MySqlStore::connect(&board_api_lib::env().db_env.db_url.get()).await?;
    tracing::info!("Connected to the database");

    let store = web::Data::new(store);
    let cache = web::Data::new(BoardCache::new());

    HttpServer::new(move || {
        let cors = Cors::default()
            .supports_credentials()
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec!["accept", "content-type"])
            .max_age(3600);
        #[cfg(debug_assertions)]
        let cors = cors.allow_any_origin();
        #[cfg(not(debug_assertions))]
        let cors = cors.allowed_origin(&board_api_lib::env().host.host.get());

        App::new()
            .wrap(cors)
            .wrap(TracingLogger::default())
            .app_data(store.clone())
            .app_data(cache.clone())
            .service(board_api_lib::api_route())
            .default_service(web::to(board_api_lib::not_found))
    })
    .bind(("0.0.0.0", board_api_lib::env().port.get()))
    .context("Cannot bind 0.0.0.0 address")?
    .run()
    .await
    .context("Cannot create actix-web server")?;

    Ok(())
}
