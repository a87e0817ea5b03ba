use anyhow::Context;

mod app;
mod auth;
mod config;
mod error;
mod extract;
#[cfg(test)]
mod memory;
mod repository;
mod state;
mod users;
mod validation;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "accounts=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;

    MIGRATOR
        .run(&app_state.db)
        .await
        .context("run migrations")?;

    let host = app_state.config.host.clone();
    let port = app_state.config.port;
    let app = app::build_app(app_state);

    app::serve(app, &host, port).await
}
