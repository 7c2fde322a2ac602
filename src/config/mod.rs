use std::time::Duration;

#[derive(Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database_url: String,
    pub ai_server_url: String,
    pub relay_timeout: Duration,
    pub secure_cookies: bool,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let get_str = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };
        let port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let relay_timeout_secs = std::env::var("RELAY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(120);

        AppConfig {
            server: ServerConfig {
                host: get_str("SERVER_HOST", "127.0.0.1"),
                port,
            },
            database_url: get_str(
                "DATABASE_URL",
                "postgres://sprintplanner:@localhost:5432/sprintplanner",
            ),
            ai_server_url: get_str("AI_SERVER", "http://localhost:8000"),
            relay_timeout: Duration::from_secs(relay_timeout_secs),
            secure_cookies: get_str("APP_ENV", "development") == "production",
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
