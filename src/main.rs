use skillswap::{AppState, Config, app, db, seed};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,skillswap=debug")),
        )
        .init();

    let config = Config::from_env()?;
    let db_pool = db::connect(&config).await?;
    info!(database_url = %config.database_url, "database ready");

    if std::env::args().nth(1).as_deref() == Some("seed") {
        let created = seed::seed_demo_users(&db_pool).await?;
        info!(created, "seeding finished");
        return Ok(());
    }

    let bind_addr = config.bind_addr.clone();
    let app = app(AppState::new(db_pool, config));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(%bind_addr, "skillswap listening");
    axum::serve(listener, app).await?;
    Ok(())
}
