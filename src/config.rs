use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::domain::{Currency, StageSpec};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub target: TargetConfig,
    #[validate(nested)]
    pub payload: PayloadConfig,
    #[validate(nested)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TargetConfig {
    #[validate(url)]
    pub url: String,
    #[validate(length(min = 1))]
    pub api_key: String,
    #[validate(range(min = 1))]
    pub timeout_seconds: u64,
}

impl TargetConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/api/middleware/v1/transaction".to_string(),
            api_key: "moje-tajne-heslo-12345".to_string(),
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_amount_range"))]
pub struct PayloadConfig {
    #[validate(length(min = 1))]
    pub order_prefix: String,
    #[validate(range(min = 1))]
    pub amount_min: u32,
    pub amount_max: u32,
    #[validate(length(min = 1))]
    pub currencies: Vec<Currency>,
    #[validate(length(min = 1))]
    pub service_type: String,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            order_prefix: "TEST".to_string(),
            amount_min: 1,
            amount_max: 1000,
            currencies: vec![Currency::Czk, Currency::Eur],
            service_type: "PAYMENT".to_string(),
        }
    }
}

fn validate_amount_range(payload: &PayloadConfig) -> Result<(), ValidationError> {
    if payload.amount_min > payload.amount_max {
        return Err(ValidationError::new("amount_min_above_amount_max"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RunConfig {
    #[validate(range(min = 1))]
    pub think_time_ms: u64,
    #[validate(range(min = 1))]
    pub ramp_tick_ms: u64,
    pub random_seed: Option<u64>,
    #[validate(length(min = 1))]
    pub stages: Vec<StageSpec>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            think_time_ms: 1000,
            ramp_tick_ms: 250,
            random_seed: None,
            stages: vec![
                StageSpec::new("10s", 5),
                StageSpec::new("30s", 20),
                StageSpec::new("10s", 0),
            ],
        }
    }
}

impl Config {
    /// Built-in defaults, then `config/default.toml`, then `LOADGEN__*` env vars.
    pub fn load() -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("LOADGEN__").split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let cfg: Config = figment.extract().context("failed to read configuration")?;
        cfg.validate().context("invalid configuration")?;
        Ok(cfg)
    }
}
