use std::sync::Arc;

use axum::{extract::Extension, Router};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod error;
mod i18n;
mod mail;
mod model;
mod payment;
mod response;
mod routes;

use config::AppConfig;
use mail::Mailer;
use routes::account::account_router;
use routes::address::address_router;
use routes::auth::auth_router;
use routes::bookings::bookings_router;
use routes::clinics::clinics_router;
use routes::contacts::contacts_router;
use routes::doctors::doctors_router;
use routes::enums::enums_router;
use routes::payments::payments_router;
use routes::specialities::specialities_router;
use routes::uploads::uploads_router;
use routes::users::users_router;

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(AppConfig::from_env());

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to Postgres");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("failed to run migrations");

    let mailer = Mailer::new(&config.mail).expect("failed to build mail transport");

    let api = Router::new()
        .merge(auth_router())
        .merge(account_router())
        .merge(users_router())
        .merge(doctors_router())
        .merge(clinics_router())
        .merge(specialities_router())
        .merge(bookings_router())
        .merge(payments_router())
        .merge(contacts_router())
        .merge(address_router())
        .merge(enums_router())
        .merge(uploads_router());

    let app = Router::new()
        .nest("/api/v1", api)
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(Extension(pool))
        .layer(Extension(config.clone()))
        .layer(Extension(mailer))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    info!("listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("server stopped unexpectedly");
}
