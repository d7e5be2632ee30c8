// src/main.rs

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use dotenvy::dotenv;
use examhall::{
    config::Config,
    models::user::{Role, User},
    routes,
    state::AppState,
    store::{PgStore, Store},
    utils::hash::hash_password,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!(
                    "Database not ready, retrying in 2s... (Attempt {})",
                    retry_count
                );
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected");

    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied");

    let store = PgStore::new(pool);
    if let Err(e) = seed_admin_teacher(&store, &config).await {
        tracing::error!("Failed to seed admin teacher: {:?}", e);
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(Arc::new(store), config);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind listening address");
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}

/// Creates the bootstrap teacher account named by `ADMIN_USERNAME` and
/// `ADMIN_PASSWORD`, unless it already exists.
async fn seed_admin_teacher(
    store: &dyn Store,
    config: &Config,
) -> Result<(), examhall::error::AppError> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    if store.find_user_by_username(username).await?.is_some() {
        return Ok(());
    }

    tracing::info!("Seeding admin teacher: {}", username);
    let user = User {
        id: Uuid::new_v4(),
        username: username.clone(),
        password: hash_password(password)?,
        role: Role::Teacher,
        name: username.clone(),
        class_name: None,
        number: 1,
        belong_to: None,
        created_at: Utc::now(),
    };
    store.insert_user(&user).await?;
    tracing::info!("Admin teacher created");
    Ok(())
}
