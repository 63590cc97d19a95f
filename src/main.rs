use std::net::SocketAddr;
use taskboard::{db, routes};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 0. Load .env file immediately
    // Uses dotenvy which is just dotenv but maintained. Silently ignores if no .env exists.
    dotenvy::dotenv().ok();

    // 1. Initialize Sentry (if configured)
    // This guard must be kept in scope for Sentry to work
    let _guard = sentry::init((std::env::var("SENTRY_DSN").ok(), sentry::ClientOptions {
        release: sentry::release_name!(),
        send_default_pii: true,
        traces_sample_rate: 1.0,
        ..Default::default()
    }));

    // 2. Install rustls crypto provider
    // This needs to happen before any TLS connections are made (database, etc).
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // 3. Initialize logging
    // Uses tracing for structured logs. Respects RUST_LOG env var.
    // Defaults to debug level for the API and tower_http so you can see what's happening.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "taskboard=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer()) // Sentry integration
        .init();

    tracing::info!("Starting Taskboard API...");

    // 4. Connect to database
    // Runs migrations automatically and panics if DATABASE_URL isn't set.
    let db = db::connect().await?;
    tracing::info!("Connected to PostgreSQL successfully!");

    // 5. Derive the token signing keys
    // Reads JWT_SECRET from env and panics if it's missing. No secret, no server.
    let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
    let auth = taskboard::utils::auth::AuthKeys::from_secret(&secret);

    // 6. Build the app state
    // This is what gets passed to all route handlers. Contains the DB pool and token keys.
    let state = taskboard::state::AppState { db, auth };
    let app = routes::create_routes(state);

    // 7. Start the server
    // Listens on PORT env var (defaults to 3000).
    // 0.0.0.0 so it binds to all interfaces (necessary in Docker).
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = SocketAddr::from(([0, 0, 0, 0], port.parse()?));

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
