use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::fleet::query::{validate_limit, DEFAULT_PAGE_SIZE};

pub const ENV_PREFIX: &str = "FLEETVIEW";
pub const DEFAULT_CONFIG_FILE: &str = "fleetview";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub server_url: String,
    pub session_header: String,
    #[serde(default)]
    pub session_token: Option<String>,
    pub page_size: u32,
    pub dump_dir: PathBuf,
    pub request_timeout_secs: u64,
}

/// Overrides coming from command-line flags; `None` keeps the loaded value.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub server_url: Option<String>,
    pub session_header: Option<String>,
    pub session_token: Option<String>,
    pub page_size: Option<u32>,
    pub dump_dir: Option<PathBuf>,
}

/// Defaults < config file < `FLEETVIEW_*` environment.
pub fn load(path: Option<&Path>) -> anyhow::Result<Settings> {
    from_sources(path, Some(Environment::with_prefix(ENV_PREFIX)))
}

pub(crate) fn from_sources(
    path: Option<&Path>,
    env: Option<Environment>,
) -> anyhow::Result<Settings> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };
    let mut builder = Config::builder()
        .set_default("server_url", "http://127.0.0.1:8080")?
        .set_default("session_header", "authorization")?
        .set_default("page_size", i64::from(DEFAULT_PAGE_SIZE))?
        .set_default("dump_dir", ".")?
        .set_default("request_timeout_secs", 30)?
        .add_source(file);
    if let Some(env) = env {
        builder = builder.add_source(env);
    }
    let settings: Settings = builder.build()?.try_deserialize()?;
    Ok(settings)
}

impl Settings {
    pub fn apply(mut self, overrides: SettingsOverrides) -> anyhow::Result<Self> {
        if let Some(url) = overrides.server_url {
            self.server_url = url;
        }
        if let Some(header) = overrides.session_header {
            self.session_header = header;
        }
        if let Some(token) = overrides.session_token {
            self.session_token = Some(token);
        }
        if let Some(page_size) = overrides.page_size {
            self.page_size = page_size;
        }
        if let Some(dir) = overrides.dump_dir {
            self.dump_dir = dir;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = reqwest::Url::parse(&self.server_url)
            .map_err(|err| anyhow::anyhow!("invalid server url '{}': {}", self.server_url, err))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("server url must use http or https: {}", self.server_url);
        }
        validate_limit(self.page_size)?;
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }
        Ok(())
    }
}
