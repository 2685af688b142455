use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the portal API, e.g. `https://portal.example/api/v1/`.
    pub api_base: String,
    /// Bearer token for the API. Usually supplied via `VMPORTAL_TOKEN` or a
    /// token file; falls back to the session file when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Path of the persisted sign-in session.
    pub session_file: PathBuf,
    /// Watch the whole fleet (`vms/all`, administrators only) instead of the
    /// caller's own machines.
    pub watch_all: bool,
    /// Seconds between status polls per machine.
    pub poll_interval_secs: u64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8080/api/v1/".into(),
            token: None,
            session_file: PathBuf::from("vmportal-session.json"),
            watch_all: false,
            poll_interval_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("vmportal.toml"))
            .merge(Json::file("vmportal.json"))
            .merge(Env::prefixed("VMPORTAL_"))
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        // Support Docker-style secrets
        if let Ok(token_file) = std::env::var("VMPORTAL_TOKEN_FILE") {
            config.token = Some(std::fs::read_to_string(token_file)?.trim().to_string());
        }

        Ok(config)
    }
}
