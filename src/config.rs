use clap::Parser;
use once_cell::sync::Lazy;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;
pub const MAX_PAGE: u64 = 1_000_000;
pub const TEMPORARY_PASSWORD_LENGTH: usize = 12;

pub const AUTH_COOKIE_NAME: &str = "firebase-token";

pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
pub const FIREBASE_ISSUER_PREFIX: &str = "https://securetoken.google.com/";
pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const IDENTITY_TOOLKIT_SCOPE: &str = "https://www.googleapis.com/auth/identitytoolkit";
// Fallback when the key endpoint does not send Cache-Control
pub const JWKS_DEFAULT_TTL_SECONDS: u64 = 3600;
// Unknown key ids trigger at most one refetch per interval
pub const JWKS_MIN_REFRESH_SECONDS: u64 = 60;

pub static APP_CONFIG: Lazy<Config> = Lazy::new(Config::parse);

#[derive(Debug, Parser, Clone)]
pub struct Config {
    #[clap(long, env, default_value_t = 8080)]
    pub port: u16,

    #[clap(long, env, default_value_t = true)]
    pub swagger_enabled: bool,

    #[clap(long, env, default_value = "info")]
    pub log_level: String,

    #[clap(long, env)]
    pub database_url: String,

    #[clap(long, env, default_value_t = true)]
    pub run_migrations: bool,

    #[clap(long, env)]
    pub firebase_project_id: String,

    /// Service-account key (JSON) used for account management calls
    #[clap(long, env)]
    pub firebase_service_account_path: Option<String>,

    #[clap(long, env, default_value = "*")]
    pub cors_allowed_origins: String,

    #[clap(long, env, default_value = "local")]
    pub app_env: String,

    #[clap(long, env)]
    pub bootstrap_principal_uid: Option<String>,

    #[clap(long, env)]
    pub bootstrap_principal_email: Option<String>,

    #[clap(long, env, default_value = "Principal")]
    pub bootstrap_principal_name: String,

    #[clap(long, env, default_value = "University")]
    pub college_name: String,

    #[clap(long, env, default_value = "2025-2026")]
    pub default_academic_year: String,
}
