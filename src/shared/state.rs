use crate::config::AppConfig;
use crate::shared::utils::DbPool;
use crate::tasks::TaskEngine;

pub struct AppState {
    pub config: AppConfig,
    pub conn: DbPool,
    pub http: reqwest::Client,
    pub task_engine: TaskEngine,
}

impl AppState {
    pub fn new(config: AppConfig, conn: DbPool) -> Self {
        Self {
            config,
            task_engine: TaskEngine::new(conn.clone()),
            conn,
            http: reqwest::Client::new(),
        }
    }
}
