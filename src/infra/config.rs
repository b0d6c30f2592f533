//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::types::is_valid_trip_name;
use anyhow::{bail, Context};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// One JSON file per trip under `storage.dir`
    File,
    /// Nothing survives a restart
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Label attached to metrics (e.g., "ski-club")
    #[serde(default = "default_site_id")]
    pub id: String,
}

fn default_site_id() -> String {
    "trips".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self { id: default_site_id() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// HTTP API port (0 picks a free port)
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), port: default_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_kind")]
    pub kind: StorageKind,
    #[serde(default = "default_storage_dir")]
    pub dir: String,
}

fn default_storage_kind() -> StorageKind {
    StorageKind::File
}

fn default_storage_dir() -> String {
    "data/trips".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { kind: default_storage_kind(), dir: default_storage_dir() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterConfig {
    /// Trip timezone as minutes east of UTC; decides what "today" is for check-in
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Longest wait for a trip's lock before answering busy
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    2000
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self { utc_offset_minutes: 0, lock_timeout_ms: default_lock_timeout_ms() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Header carrying the verified caller email (set by the auth proxy)
    #[serde(default = "default_email_header")]
    pub email_header: String,
    /// Header carrying the caller display name
    #[serde(default = "default_name_header")]
    pub name_header: String,
}

fn default_email_header() -> String {
    "x-auth-request-email".to_string()
}

fn default_name_header() -> String {
    "x-auth-request-user".to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self { email_header: default_email_header(), name_header: default_name_header() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between metrics log lines (0 to disable)
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    60
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

/// A trip to create at startup if the store does not already hold it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TripSeed {
    pub name: String,
    /// Quoted "YYYY-MM-DD"
    pub date: NaiveDate,
    pub bus_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub roster: RosterConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub trips: Vec<TripSeed>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    bind_address: String,
    port: u16,
    storage_kind: StorageKind,
    storage_dir: String,
    utc_offset_minutes: i32,
    lock_timeout_ms: u64,
    email_header: String,
    name_header: String,
    metrics_interval_secs: u64,
    trips: Vec<TripSeed>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            bind_address: default_bind_address(),
            port: default_port(),
            storage_kind: StorageKind::File,
            storage_dir: default_storage_dir(),
            utc_offset_minutes: 0,
            lock_timeout_ms: default_lock_timeout_ms(),
            email_header: default_email_header(),
            name_header: default_name_header(),
            metrics_interval_secs: default_metrics_interval(),
            trips: Self::default_trips(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    fn default_trips() -> Vec<TripSeed> {
        [
            ("SkiTrip_Feb2025", (2025, 2, 15)),
            ("SkiTrip_Mar2025", (2025, 3, 15)),
            ("SkiTrip_Apr2025", (2025, 4, 12)),
            ("SkiTrip_May2025", (2025, 5, 10)),
        ]
        .into_iter()
        .filter_map(|(name, (y, m, d))| {
            NaiveDate::from_ymd_opt(y, m, d).map(|date| TripSeed {
                name: name.to_string(),
                date,
                bus_capacity: 50,
            })
        })
        .collect()
    }

    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str, origin: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig =
            toml::from_str(content).with_context(|| format!("Failed to parse config {origin}"))?;

        validate_trips(&toml_config.trips).with_context(|| format!("Invalid [[trips]] in {origin}"))?;

        if toml_config.roster.utc_offset_minutes.abs() >= 24 * 60 {
            bail!(
                "roster.utc_offset_minutes must be within +/- 1439, got {} in {origin}",
                toml_config.roster.utc_offset_minutes
            );
        }

        Ok(Self {
            site_id: toml_config.site.id,
            bind_address: toml_config.server.bind_address,
            port: toml_config.server.port,
            storage_kind: toml_config.storage.kind,
            storage_dir: toml_config.storage.dir,
            utc_offset_minutes: toml_config.roster.utc_offset_minutes,
            lock_timeout_ms: toml_config.roster.lock_timeout_ms,
            email_header: toml_config.identity.email_header.to_ascii_lowercase(),
            name_header: toml_config.identity.name_header.to_ascii_lowercase(),
            metrics_interval_secs: toml_config.metrics.interval_secs,
            trips: toml_config.trips,
            config_file: origin.to_string(),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Resolve the config path from args/env, then load it
    pub fn load(args: &[String]) -> Self {
        Self::load_from_path(&Self::resolve_config_path(args))
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.storage_kind
    }

    pub fn storage_dir(&self) -> &str {
        &self.storage_dir
    }

    pub fn utc_offset_minutes(&self) -> i32 {
        self.utc_offset_minutes
    }

    pub fn lock_timeout_ms(&self) -> u64 {
        self.lock_timeout_ms
    }

    pub fn email_header(&self) -> &str {
        &self.email_header
    }

    pub fn name_header(&self) -> &str {
        &self.name_header
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn trips(&self) -> &[TripSeed] {
        &self.trips
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}

fn validate_trips(trips: &[TripSeed]) -> anyhow::Result<()> {
    let mut names = HashSet::new();
    for trip in trips {
        if !is_valid_trip_name(&trip.name) {
            bail!("trip name {:?} must be non-empty ASCII letters, digits, '_' or '-'", trip.name);
        }
        if trip.bus_capacity == 0 {
            bail!("trip {} has bus_capacity 0", trip.name);
        }
        if !names.insert(trip.name.as_str()) {
            bail!("trip {} is listed twice", trip.name);
        }
    }
    Ok(())
}
