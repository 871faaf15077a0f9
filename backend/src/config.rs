use anyhow::{anyhow, Context};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{env, net::SocketAddr, path::PathBuf};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub store_backend: StoreBackend,
    pub bind_addr: SocketAddr,
    /// Public address embedded in verification URLs and QR codes.
    pub public_base_url: Url,
    pub documents_dir: PathBuf,
    pub letterhead_path: PathBuf,
    pub time_zone: Tz,
    /// Longest continuous leave a student may request, in days.
    pub leave_max_days: i32,
    pub push_endpoint: Option<Url>,
    pub push_access_token: String,
    pub push_timeout_secs: u64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost:5432/passdesk".to_string());

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => return Err(anyhow!("Invalid STORE_BACKEND value: {}", other)),
        };

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);
        let bind_addr = SocketAddr::from(([0, 0, 0, 0], port));

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port));
        let public_base_url = Url::parse(&public_base_url)
            .with_context(|| format!("Invalid PUBLIC_BASE_URL value: {}", public_base_url))?;

        let documents_dir =
            PathBuf::from(env::var("DOCUMENTS_DIR").unwrap_or_else(|_| "./documents".to_string()));
        let letterhead_path = PathBuf::from(
            env::var("LETTERHEAD_PATH").unwrap_or_else(|_| "./assets/letterhead.json".to_string()),
        );

        let time_zone_name = env::var("APP_TIMEZONE").unwrap_or_else(|_| "UTC".to_string());
        let time_zone: Tz = time_zone_name
            .parse()
            .map_err(|_| anyhow!("Invalid APP_TIMEZONE value: {}", time_zone_name))?;

        let leave_max_days = env::var("LEAVE_MAX_DAYS")
            .unwrap_or_else(|_| "2".to_string())
            .parse()
            .unwrap_or(2);

        let push_endpoint = match env::var("PUSH_ENDPOINT") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                Url::parse(raw.trim())
                    .with_context(|| format!("Invalid PUSH_ENDPOINT value: {}", raw))?,
            ),
            _ => None,
        };
        let push_access_token = env::var("PUSH_ACCESS_TOKEN").unwrap_or_default();
        let push_timeout_secs = env::var("PUSH_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        Ok(Config {
            database_url,
            store_backend,
            bind_addr,
            public_base_url,
            documents_dir,
            letterhead_path,
            time_zone,
            leave_max_days,
            push_endpoint,
            push_access_token,
            push_timeout_secs,
        })
    }
}
