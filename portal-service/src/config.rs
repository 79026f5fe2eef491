use serde::Deserialize;
use std::fs;

use crate::{aggregate::SectorAllowList, billing::Tariff};

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind_addr: String,
}

fn default_recent_periods() -> usize {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectorConfig {
    /// Sector names accepted in sector reports. Anything else is dropped.
    pub allowed: Vec<String>,
    /// How many of the latest periods each sector summary lists.
    #[serde(default = "default_recent_periods")]
    pub recent_periods: usize,
}

impl Default for SectorConfig {
    fn default() -> Self {
        Self {
            allowed: ["Centro", "Norte", "Sur", "Oriente", "Poniente"]
                .into_iter()
                .map(String::from)
                .collect(),
            recent_periods: default_recent_periods(),
        }
    }
}

impl SectorConfig {
    pub fn allow_list(&self) -> SectorAllowList {
        SectorAllowList::new(self.allowed.iter().cloned())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub tariff: Tariff,
    #[serde(default)]
    pub sectors: SectorConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("PORTAL_CONFIG").unwrap_or_else(|_| "portal-config.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [database]
            uri = "postgres://portal@localhost/agua"
            max_connections = 4

            [http]
            bind_addr = "0.0.0.0:8080"
            "#,
        )
        .expect("config");

        assert_eq!(cfg.tariff, Tariff::default());
        assert_eq!(cfg.sectors.recent_periods, 3);
        assert!(cfg.sectors.allow_list().contains("Centro"));
        assert!(cfg.metrics.is_none());
    }

    #[test]
    fn overrides_tariff_and_sectors() {
        let cfg = AppConfig::from_toml(
            r#"
            [database]
            uri = "postgres://portal@localhost/agua"
            max_connections = 4

            [http]
            bind_addr = "0.0.0.0:8080"

            [tariff]
            unit_price = 600.0

            [sectors]
            allowed = ["Alto", "Bajo"]

            [metrics]
            bind_addr = "0.0.0.0:9100"
            "#,
        )
        .expect("config");

        assert_eq!(cfg.tariff.unit_price, 600.0);
        assert_eq!(cfg.tariff.fixed_charge, 3550.0);
        let allow = cfg.sectors.allow_list();
        assert!(allow.contains("Alto"));
        assert!(!allow.contains("Centro"));
        assert_eq!(cfg.metrics.map(|m| m.bind_addr).as_deref(), Some("0.0.0.0:9100"));
    }

    #[test]
    fn missing_database_section_is_an_error() {
        assert!(AppConfig::from_toml("[http]\nbind_addr = \"0.0.0.0:8080\"").is_err());
    }
}
