//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::{AppConfig, DatabaseConfig};
use crate::common::errors::{ClientError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Well-known credential variables (`BROKER_API_KEY`, `LINE_ACCESS_TOKEN`, ...)
/// 2. Environment variables (prefixed with APP__)
/// 3. Configuration file (TOML format)
/// 4. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    // Try to load from .env file
    dotenvy::dotenv().ok();

    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("APP")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ClientError::Configuration(e.to_string()))?;

    let mut app: AppConfig = config
        .try_deserialize()
        .map_err(|e| ClientError::Configuration(e.to_string()))?;

    apply_env_overrides(&mut app, |key| std::env::var(key).ok());
    app.validate()?;
    Ok(app)
}

/// Overlay the well-known credential variables
///
/// `lookup` is injected so the mapping can be tested without touching the
/// process environment.
pub fn apply_env_overrides<F>(app: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty("BROKER_API_KEY") {
        app.broker.api_key = Some(key);
    }
    if let Some(secret) = non_empty("BROKER_SECRET_KEY") {
        app.broker.secret_key = Some(secret);
    }
    if let Some(url) = non_empty("BROKER_URL") {
        app.broker.base_url = url;
    }
    if let Some(token) = non_empty("LINE_ACCESS_TOKEN") {
        app.notify.access_token = Some(token);
    }
    if let Some(user) = non_empty("LINE_USER_ID") {
        app.notify.recipient = Some(user);
    }
    if let Some(url) = non_empty("DATABASE_URL") {
        match app.database.as_mut() {
            Some(db) => db.url = url,
            None => {
                app.database = Some(DatabaseConfig {
                    url,
                    max_connections: 5,
                    connection_timeout_seconds: 30,
                })
            }
        }
    }
    if let Some(targets) = non_empty("TARGET_CONTRACTS") {
        app.settings.targets = targets
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }
}
