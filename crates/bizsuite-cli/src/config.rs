// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use bizsuite_lookup::{
    DEFAULT_BULK_LIMIT, DEFAULT_DEBOUNCE, DEFAULT_SEARCH_LIMIT, LookupLimits, LookupSettings,
};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "bizsuite";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_API_TIMEOUT: &str = "10s";
const DEFAULT_ASSISTANT_TIMEOUT: &str = "60s";
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub lookup: Lookup,
    #[serde(default)]
    pub assistant: Assistant,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            lookup: Lookup::default(),
            assistant: Assistant::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Lookup {
    pub bulk_limit: Option<usize>,
    pub search_limit: Option<usize>,
    pub debounce: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Assistant {
    pub enabled: Option<bool>,
    pub timeout: Option<String>,
}

impl Default for Assistant {
    fn default() -> Self {
        Self {
            enabled: Some(true),
            timeout: Some(DEFAULT_ASSISTANT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("BIZSUITE_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set BIZSUITE_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and put values under [api], [lookup], [assistant], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.api.base_url
            && base_url.trim().is_empty()
        {
            bail!("api.base_url in {} must not be empty", path.display());
        }

        for (key, raw) in [
            ("api.timeout", self.api.timeout.as_deref()),
            ("assistant.timeout", self.assistant.timeout.as_deref()),
        ] {
            if let Some(raw) = raw
                && parse_duration(raw)? <= Duration::ZERO
            {
                bail!("{key} in {} must be positive, got {raw}", path.display());
            }
        }

        if let Some(raw) = &self.lookup.debounce {
            parse_duration(raw)
                .with_context(|| format!("lookup.debounce in {}", path.display()))?;
        }

        for (key, limit) in [
            ("lookup.bulk_limit", self.lookup.bulk_limit),
            ("lookup.search_limit", self.lookup.search_limit),
        ] {
            if limit == Some(0) {
                bail!("{key} in {} must be positive, got 0", path.display());
            }
        }

        if let Some(level) = &self.log.level {
            tracing_subscriber::EnvFilter::try_new(level).with_context(|| {
                format!("log.level {level:?} in {} is not a valid filter", path.display())
            })?;
        }

        Ok(())
    }

    /// `BIZSUITE_API_URL` wins over the config file.
    pub fn api_base_url(&self) -> String {
        self.base_url_with_override(env::var("BIZSUITE_API_URL").ok())
    }

    fn base_url_with_override(&self, override_url: Option<String>) -> String {
        let raw = override_url
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.api.base_url.clone())
            .unwrap_or_else(|| bizsuite_api::DEFAULT_BASE_URL.to_owned());
        raw.trim().trim_end_matches('/').to_owned()
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_API_TIMEOUT))
    }

    pub fn lookup_settings(&self) -> Result<LookupSettings> {
        let debounce = match &self.lookup.debounce {
            Some(raw) => parse_duration(raw)?,
            None => DEFAULT_DEBOUNCE,
        };
        Ok(LookupSettings {
            limits: LookupLimits {
                bulk: self.lookup.bulk_limit.unwrap_or(DEFAULT_BULK_LIMIT),
                search: self.lookup.search_limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
            },
            debounce,
        })
    }

    pub fn assistant_enabled(&self) -> bool {
        self.assistant.enabled.unwrap_or(true)
    }

    pub fn assistant_timeout(&self) -> Result<Duration> {
        parse_duration(
            self.assistant
                .timeout
                .as_deref()
                .unwrap_or(DEFAULT_ASSISTANT_TIMEOUT),
        )
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# bizsuite config\n# Place this file at: {}\n\nversion = 1\n\n[api]\n# BIZSUITE_API_URL overrides this value\nbase_url = \"{}\"\ntimeout = \"{}\"\n\n[lookup]\n# Entries fetched once per dropdown and cached for the session\nbulk_limit = {}\n# Entries requested per prefix search\nsearch_limit = {}\ndebounce = \"{}ms\"\n\n[assistant]\nenabled = true\ntimeout = \"{}\"\n\n[log]\n# Any tracing filter; RUST_LOG overrides it\nlevel = \"{}\"\n",
            path.display(),
            bizsuite_api::DEFAULT_BASE_URL,
            DEFAULT_API_TIMEOUT,
            DEFAULT_BULK_LIMIT,
            DEFAULT_SEARCH_LIMIT,
            DEFAULT_DEBOUNCE.as_millis(),
            DEFAULT_ASSISTANT_TIMEOUT,
            DEFAULT_LOG_LEVEL,
        )
    }
}

pub(crate) fn parse_duration(raw: &str) -> Result<Duration> {
    let trimmed = raw.trim();
    let split = trimmed
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    let amount: u64 = digits
        .parse()
        .with_context(|| format!("invalid duration {raw:?}; missing a whole number"))?;

    match unit {
        "ms" => Ok(Duration::from_millis(amount)),
        "s" => Ok(Duration::from_secs(amount)),
        "m" => Ok(Duration::from_secs(amount.saturating_mul(60))),
        _ => bail!(
            "invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 400ms or 10s)"
        ),
    }
}
