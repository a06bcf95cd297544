//! Configuration module for the awards backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Google OAuth client settings. Present only when all three variables are set.
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy staff directory index
    pub index_path: PathBuf,
    /// Root directory of the image buckets
    pub upload_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Public base URL of this service, used for generated links
    pub public_url: String,
    /// Where browser flows (OAuth, magic links) land afterwards
    pub frontend_url: String,
    pub session_ttl_hours: i64,
    pub magic_link_ttl_minutes: i64,
    /// Only addresses at this domain may sign up or use Google sign-in
    pub allowed_email_domain: Option<String>,
    /// Accounts created with one of these emails start as admins
    pub admin_emails: Vec<String>,
    /// Echo magic-link tokens in API responses (development only)
    pub expose_magic_links: bool,
    pub google: Option<GoogleOAuthConfig>,
}

/// A variable was set but could not be parsed.
#[derive(Debug)]
pub struct ConfigError {
    pub variable: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.variable, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("AWARDS_DB_PATH")
            .unwrap_or_else(|_| "./data/awards.sqlite".to_string())
            .into();

        let index_path = env::var("AWARDS_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let upload_dir = env::var("AWARDS_UPLOAD_DIR")
            .unwrap_or_else(|_| "./data/uploads".to_string())
            .into();

        let bind_addr = env::var("AWARDS_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError {
                variable: "AWARDS_BIND_ADDR",
                message: e.to_string(),
            })?;

        let log_level = env::var("AWARDS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let public_url = env::var("AWARDS_PUBLIC_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string())
            .trim_end_matches('/')
            .to_string();

        let frontend_url = env::var("AWARDS_FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let session_ttl_hours = parse_number("AWARDS_SESSION_TTL_HOURS", 168)?;
        let magic_link_ttl_minutes = parse_number("AWARDS_MAGIC_LINK_TTL_MINUTES", 15)?;

        let allowed_email_domain = env::var("AWARDS_ALLOWED_EMAIL_DOMAIN")
            .ok()
            .map(|d| d.trim().trim_start_matches('@').to_lowercase())
            .filter(|d| !d.is_empty());

        let admin_emails = env::var("AWARDS_ADMIN_EMAILS")
            .map(|list| parse_email_list(&list))
            .unwrap_or_default();

        let expose_magic_links = env::var("AWARDS_EXPOSE_MAGIC_LINKS")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let google = match (
            env::var("AWARDS_GOOGLE_CLIENT_ID"),
            env::var("AWARDS_GOOGLE_CLIENT_SECRET"),
            env::var("AWARDS_GOOGLE_REDIRECT_URL"),
        ) {
            (Ok(client_id), Ok(client_secret), Ok(redirect_url)) => Some(GoogleOAuthConfig {
                client_id,
                client_secret,
                redirect_url,
            }),
            _ => None,
        };

        Ok(Self {
            db_path,
            index_path,
            upload_dir,
            bind_addr,
            log_level,
            public_url,
            frontend_url,
            session_ttl_hours,
            magic_link_ttl_minutes,
            allowed_email_domain,
            admin_emails,
            expose_magic_links,
            google,
        })
    }

    /// Whether an email address may be used to sign up under this deployment.
    pub fn email_domain_allowed(&self, email: &str) -> bool {
        match &self.allowed_email_domain {
            None => true,
            Some(domain) => email
                .rsplit_once('@')
                .map(|(_, d)| d.eq_ignore_ascii_case(domain))
                .unwrap_or(false),
        }
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }
}

fn parse_number(variable: &'static str, default: i64) -> Result<i64, ConfigError> {
    match env::var(variable) {
        Ok(raw) => raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError {
            variable,
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_email_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
impl Config {
    /// Configuration rooted in a scratch directory, used by tests.
    pub fn for_tests(root: &std::path::Path) -> Self {
        Self {
            db_path: root.join("test.sqlite"),
            index_path: root.join("index"),
            upload_dir: root.join("uploads"),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            public_url: "http://127.0.0.1:8080".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            session_ttl_hours: 1,
            magic_link_ttl_minutes: 15,
            allowed_email_domain: None,
            admin_emails: vec!["admin@example.com".to_string()],
            expose_magic_links: true,
            google: None,
        }
    }
}
