use dotenvy::dotenv;
use log::info;
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use sprintplanner::api_router::configure_api_routes;
use sprintplanner::config::AppConfig;
use sprintplanner::shared::state::AppState;
use sprintplanner::shared::utils::{create_conn, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env();
    let pool = create_conn(&config.database_url)?;
    run_migrations(&pool).map_err(|e| anyhow::anyhow!("{}", e))?;

    let bind_addr = config.bind_addr();
    let state = Arc::new(AppState::new(config, pool));

    let app = configure_api_routes()
        .layer(CookieManagerLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("SprintPlanner server listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
