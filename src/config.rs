use crate::storage::{self, StorageManager};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const BIND_ADDR: &str = "0.0.0.0:4000";
const TASK_QUEUE_MAX_THREADS: u16 = 4;
const SESSION_TTL_DAYS: i64 = 7;

const USER_AGENT_DEFAULT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0";
const PROBE_TIMEOUT_SECS: u64 = 3;
const PAGE_TIMEOUT_SECS: u64 = 5;
const MAX_REDIRECTS: usize = 3;
const FALLBACK_ICON_SIZE: u32 = 64;

/// Outbound HTTP settings shared by the favicon prober and extractor.
///
/// Passed explicitly into every network-touching function instead of
/// living in a global client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Browser-like identification string; some servers reject obvious bots.
    #[serde(default = "user_agent")]
    pub user_agent: String,

    /// Timeout for header-only existence probes.
    #[serde(default = "probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Timeout for full page fetches.
    #[serde(default = "page_timeout_secs")]
    pub page_timeout_secs: u64,

    #[serde(default = "max_redirects")]
    pub max_redirects: usize,

    /// Pixel size requested from the icon-service fallback tier.
    #[serde(default = "fallback_icon_size")]
    pub fallback_icon_size: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: user_agent(),
            probe_timeout_secs: probe_timeout_secs(),
            page_timeout_secs: page_timeout_secs(),
            max_redirects: max_redirects(),
            fallback_icon_size: fallback_icon_size(),
        }
    }
}

fn user_agent() -> String {
    USER_AGENT_DEFAULT.to_string()
}

fn probe_timeout_secs() -> u64 {
    PROBE_TIMEOUT_SECS
}

fn page_timeout_secs() -> u64 {
    PAGE_TIMEOUT_SECS
}

fn max_redirects() -> usize {
    MAX_REDIRECTS
}

fn fallback_icon_size() -> u32 {
    FALLBACK_ICON_SIZE
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "bind_addr")]
    pub bind_addr: String,

    #[serde(default = "task_queue_max_threads")]
    pub task_queue_max_threads: u16,

    #[serde(default = "session_ttl_days")]
    pub session_ttl_days: i64,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: bind_addr(),
            task_queue_max_threads: task_queue_max_threads(),
            session_ttl_days: session_ttl_days(),
            http: HttpConfig::default(),
            base_path: PathBuf::new(),
        }
    }
}

fn bind_addr() -> String {
    BIND_ADDR.to_string()
}

fn task_queue_max_threads() -> u16 {
    TASK_QUEUE_MAX_THREADS
}

fn session_ttl_days() -> i64 {
    SESSION_TTL_DAYS
}

impl Config {
    fn validate(&mut self) -> anyhow::Result<()> {
        if self.task_queue_max_threads == 0 {
            self.task_queue_max_threads = 1
        }

        if self.session_ttl_days <= 0 {
            bail!("session_ttl_days must be greater than 0");
        }

        if self.http.probe_timeout_secs == 0 || self.http.page_timeout_secs == 0 {
            bail!("http timeouts must be greater than 0");
        }

        if self.http.user_agent.is_empty() {
            bail!("http.user_agent must not be empty");
        }

        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            bail!("bind_addr {:?} is not a valid socket address", self.bind_addr);
        }

        Ok(())
    }

    pub fn load_with(base_path: &Path) -> anyhow::Result<Self> {
        let store = storage::BackendLocal::new(base_path)?;

        // create new if does not exist
        if !store.exists("config.yaml") {
            store.write(
                "config.yaml",
                serde_yml::to_string(&Self::default())?.as_bytes(),
            )?;
        }

        let config_str =
            String::from_utf8(store.read("config.yaml")?).context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write("config.yaml", config_str.as_bytes())?;

        Ok(())
    }
}
