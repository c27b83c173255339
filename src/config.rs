use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    /// None selects the in-memory store
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    /// Lowercased usernames granted the site admin role at registration
    pub admin_usernames: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("PORT")
                .or_else(|_| env::var("SERVER_PORT"))
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 20),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-in-production".to_string()),
            access_token_ttl_minutes: parse_or("ACCESS_TOKEN_TTL_MINUTES", 15),
            refresh_token_ttl_days: parse_or("REFRESH_TOKEN_TTL_DAYS", 30),
            admin_usernames: parse_admin_usernames(&env::var("ADMIN_USERNAMES").unwrap_or_default()),
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn is_admin_username(&self, username: &str) -> bool {
        let username = username.to_lowercase();
        self.admin_usernames.iter().any(|admin| *admin == username)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 5000,
            database_url: None,
            database_max_connections: 20,
            jwt_secret: "dev-secret-change-in-production".to_string(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 30,
            admin_usernames: Vec::new(),
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn parse_admin_usernames(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}
