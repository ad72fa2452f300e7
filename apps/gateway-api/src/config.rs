/// Gateway configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret for validating REST-issued session cookies.
    pub session_secret: String,
    /// Name of the session cookie issued by the REST layer.
    pub session_cookie: String,
    /// Port the HTTP server binds to.
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self {
            session_secret: required_var("SESSION_SECRET"),
            session_cookie: std::env::var("SESSION_COOKIE")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "parlor_session".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4010),
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}
