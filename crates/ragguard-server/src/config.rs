use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

use ragguard_scan::VirusTotalConfig;
use ragguard_scan::virustotal::DEFAULT_BASE_URL;

/// Secrets shipped in example env files. Refusing them keeps a copy-pasted
/// config from signing real tokens.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub jwt_secret: String,
    /// `None` when no API key is set; attachments are then refused.
    pub virustotal: Option<VirusTotalConfig>,
    pub admin: Option<AdminBootstrap>,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = var("RAGGUARD_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("RAGGUARD_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let host = var("RAGGUARD_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(var("RAGGUARD_PORT"), "RAGGUARD_PORT", 5000)?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let virustotal = match var("RAGGUARD_VT_API_KEY") {
            Some(key) => {
                let mut vt = VirusTotalConfig::new(key);
                vt.base_url = var("RAGGUARD_VT_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
                vt.timeout = Duration::from_secs(parse_or(
                    var("RAGGUARD_VT_TIMEOUT_SECS"),
                    "RAGGUARD_VT_TIMEOUT_SECS",
                    30,
                )?);
                vt.poll_attempts =
                    parse_or(var("RAGGUARD_VT_POLL_ATTEMPTS"), "RAGGUARD_VT_POLL_ATTEMPTS", 10)?;
                vt.poll_interval = Duration::from_secs(parse_or(
                    var("RAGGUARD_VT_POLL_INTERVAL_SECS"),
                    "RAGGUARD_VT_POLL_INTERVAL_SECS",
                    2,
                )?);
                Some(vt)
            }
            None => None,
        };

        let admin = match (var("RAGGUARD_ADMIN_EMAIL"), var("RAGGUARD_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap { email, password }),
            (None, None) => None,
            _ => bail!("RAGGUARD_ADMIN_EMAIL and RAGGUARD_ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            addr,
            db_path: var("RAGGUARD_DB_PATH").unwrap_or_else(|| "ragguard.db".into()).into(),
            upload_dir: var("RAGGUARD_UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()).into(),
            jwt_secret,
            virustotal,
            admin,
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v.parse().with_context(|| format!("{} has invalid value '{}'", key, v)),
        None => Ok(default),
    }
}
