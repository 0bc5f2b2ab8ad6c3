use std::path::PathBuf;

use convene_api::media::R2Config;

/// Object storage settings that have no usable default.
const REQUIRED_R2_VARS: &[&str] = &[
    "R2_ENDPOINT",
    "R2_BUCKET",
    "R2_ACCESS_KEY",
    "R2_SECRET_ACCESS_KEY",
    "R2_PUBLIC_URL",
];

pub struct Config {
    pub production: bool,
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub cors_origin: String,
    pub cross_site: bool,
    pub cookie_domain: Option<String>,
    pub session_ttl_hours: i64,
    pub sweep_interval_secs: u64,
    pub r2: R2Config,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn flag(name: &str) -> bool {
    matches!(
        non_empty(name).map(|v| v.to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

impl Config {
    /// Read configuration from the environment. Missing object storage
    /// credentials are fatal: the process prints what is missing and exits.
    pub fn from_env() -> anyhow::Result<Self> {
        let missing: Vec<&str> = REQUIRED_R2_VARS
            .iter()
            .copied()
            .filter(|name| non_empty(name).is_none())
            .collect();
        if !missing.is_empty() {
            eprintln!("FATAL: object storage is not configured.");
            eprintln!("       Missing: {}", missing.join(", "));
            eprintln!("       Set them in your .env file and restart.");
            std::process::exit(1);
        }

        let environment = var_or("CONVENE_ENV", "development");
        let port: u16 = var_or("CONVENE_PORT", "3000").parse()?;
        let session_ttl_hours: i64 = var_or("CONVENE_SESSION_TTL_HOURS", "24").parse()?;
        if session_ttl_hours <= 0 {
            anyhow::bail!("CONVENE_SESSION_TTL_HOURS must be positive");
        }
        let sweep_interval_secs = std::env::var("CONVENE_SESSION_SWEEP_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(900);

        Ok(Self {
            production: environment.eq_ignore_ascii_case("production"),
            host: var_or("CONVENE_HOST", "0.0.0.0"),
            port,
            db_path: var_or("CONVENE_DB_PATH", "convene.db").into(),
            cors_origin: var_or("CONVENE_CORS_ORIGIN", "http://localhost:5173"),
            cross_site: flag("CONVENE_CROSS_SITE"),
            cookie_domain: non_empty("CONVENE_COOKIE_DOMAIN"),
            session_ttl_hours,
            sweep_interval_secs,
            r2: R2Config {
                endpoint: non_empty("R2_ENDPOINT").unwrap_or_default(),
                bucket: non_empty("R2_BUCKET").unwrap_or_default(),
                access_key: non_empty("R2_ACCESS_KEY").unwrap_or_default(),
                secret_key: non_empty("R2_SECRET_ACCESS_KEY").unwrap_or_default(),
                public_url: non_empty("R2_PUBLIC_URL").unwrap_or_default(),
                region: non_empty("R2_REGION").unwrap_or_else(|| "auto".into()),
            },
        })
    }
}
