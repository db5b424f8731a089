use energy_client::analytics::{IntegrationScope, DEFAULT_FACTOR_KG_CO2_PER_KWH};
use serde::Deserialize;
use std::{fs, path::PathBuf};

const CONFIG_ENV: &str = "ENERGY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "energy-config.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub uri: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: "sqlite://energy.sqlite3".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http_bind_addr: String,
    /// Directory served at `/` for the dashboard frontend.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_bind_addr: "127.0.0.1:5000".to_string(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub emissions_factor_kg_co2_per_kwh: f64,
    pub default_days: i64,
    pub integration_scope: IntegrationScope,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            emissions_factor_kg_co2_per_kwh: DEFAULT_FACTOR_KG_CO2_PER_KWH,
            default_days: 7,
            integration_scope: IntegrationScope::Pooled,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackfillConfig {
    pub batch_size: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            max_retries: 3,
            retry_backoff_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub analytics: AnalyticsConfig,
    pub backfill: BackfillConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Load from `$ENERGY_CONFIG`, else `energy-config.toml` if present, else defaults.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let cfg = match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_toml_str(&fs::read_to_string(&path)?)?,
            Err(_) => match fs::read_to_string(DEFAULT_CONFIG_PATH) {
                Ok(contents) => Self::from_toml_str(&contents)?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::info!("no config file found, using defaults");
                    Self::default()
                }
                Err(e) => return Err(e.into()),
            },
        };

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let factor = self.analytics.emissions_factor_kg_co2_per_kwh;
        if !factor.is_finite() || factor < 0.0 {
            anyhow::bail!("analytics.emissions_factor_kg_co2_per_kwh must be a non-negative number");
        }
        if self.analytics.default_days <= 0 {
            anyhow::bail!("analytics.default_days must be positive");
        }
        if self.backfill.batch_size == 0 {
            anyhow::bail!("backfill.batch_size must be positive");
        }
        Ok(())
    }
}
