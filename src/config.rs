use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Financeiro Visual";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upload ceiling for receipt images (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default log filter when RUST_LOG is not set.
pub fn default_log_filter() -> &'static str {
    "info,financeiro_visual=debug"
}

/// Get the application data directory (~/FinanceiroVisual)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("FinanceiroVisual")
}

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Staging directory for uploaded receipt images. Files placed here
    /// live only for the duration of one request.
    pub staging_dir: PathBuf,
    /// Gemini API credential. Absent means receipt extraction is
    /// misconfigured; every other feature still works.
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub gemini_model: String,
    /// Outbound request timeout for the Gemini call, in seconds.
    pub gemini_timeout_secs: u64,
    /// Base URL of the frontend, used to build password-reset links.
    pub frontend_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("FINV_BIND")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3001)));

        let database_path = std::env::var("FINV_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| app_data_dir().join("financeiro.db"));

        // Hosted deployments get the system temp dir; local development can
        // point this at a project folder.
        let staging_dir = std::env::var("FINV_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("financeiro-visual-uploads"));

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let gemini_base_url = std::env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());

        let gemini_model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string());

        let gemini_timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120);

        let frontend_url = std::env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            bind_addr,
            database_path,
            staging_dir,
            gemini_api_key,
            gemini_base_url,
            gemini_model,
            gemini_timeout_secs,
            frontend_url,
        }
    }
}
