use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tokio::fs;

use crate::client::HttpWalletClient;
use crate::core::pricing::{
    PendingAdminPricing, PriceTable, PromotionCostCalculator, DEFAULT_BOOST_COST, DEFAULT_FEATURED_COST,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

pub const ENV_BASE_URL: &str = "COIN_WALLET_BASE_URL";
pub const ENV_TOKEN: &str = "COIN_WALLET_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "COIN_WALLET_TIMEOUT_SECS";

/// Resolved wallet client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletConfig {
    pub api: ApiConfig,
    pub pricing: PricingConfig,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingConfig {
    Table(PriceTable),
    PendingAdmin,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
                auth_token: None,
            },
            pricing: PricingConfig::Table(PriceTable::default()),
            config_path: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    api: ApiSection,
    #[serde(default)]
    pricing: PricingSection,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ApiSection {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    auth_token: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PricingSection {
    mode: Option<PricingMode>,
    featured: Option<u64>,
    boost: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum PricingMode {
    Table,
    PendingAdmin,
}

impl WalletConfig {
    /// Reads the optional TOML file, then applies `COIN_WALLET_*` environment overrides.
    pub async fn from_sources(config_path: Option<PathBuf>) -> Result<Self> {
        let file_cfg = if let Some(path) = config_path.as_ref() {
            let contents = fs::read_to_string(path)
                .await
                .with_context(|| format!("reading wallet configuration from {}", path.display()))?;
            parse_config(&contents, path)?
        } else {
            FileConfig::default()
        };

        let mut config = Self::resolve(file_cfg)?;
        config.config_path = config_path;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parses a TOML document without touching the environment.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file_cfg = parse_config(contents, Path::new("<inline>"))?;
        Self::resolve(file_cfg)
    }

    fn resolve(file_cfg: FileConfig) -> Result<Self> {
        let defaults = Self::default();
        let timeout_secs = file_cfg.api.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            bail!("api.timeout_secs must be greater than zero");
        }

        let pricing = match file_cfg.pricing.mode.unwrap_or(PricingMode::Table) {
            PricingMode::Table => PricingConfig::Table(
                PriceTable::new(
                    file_cfg.pricing.featured.unwrap_or(DEFAULT_FEATURED_COST),
                    file_cfg.pricing.boost.unwrap_or(DEFAULT_BOOST_COST),
                )
                .context("invalid [pricing] table")?,
            ),
            PricingMode::PendingAdmin => PricingConfig::PendingAdmin,
        };

        Ok(Self {
            api: ApiConfig {
                base_url: file_cfg.api.base_url.unwrap_or(defaults.api.base_url),
                timeout: Duration::from_secs(timeout_secs),
                auth_token: file_cfg.api.auth_token.filter(|t| !t.is_empty()),
            },
            pricing,
            config_path: None,
        })
    }

    /// Environment values win over the file.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
            self.api.base_url = url;
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.is_empty()) {
            self.api.auth_token = Some(token);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds, got {:?}", ENV_TIMEOUT_SECS, raw))?;
            if secs == 0 {
                bail!("{} must be greater than zero", ENV_TIMEOUT_SECS);
            }
            self.api.timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    pub fn build_calculator(&self) -> PromotionCostCalculator {
        match self.pricing {
            PricingConfig::Table(table) => PromotionCostCalculator::with_price_table(table),
            PricingConfig::PendingAdmin => PromotionCostCalculator::new(Arc::new(PendingAdminPricing)),
        }
    }

    pub fn build_client(&self) -> Result<HttpWalletClient> {
        HttpWalletClient::new(
            self.api.base_url.clone(),
            self.api.timeout,
            self.api.auth_token.clone(),
        )
        .context("building wallet HTTP client")
    }
}

fn parse_config(contents: &str, path: &Path) -> Result<FileConfig> {
    toml::from_str(contents).with_context(|| format!("parsing wallet configuration at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::core::pricing::{PromotionFlag, PromotionFlags};

    #[test]
    fn test_defaults() {
        let config = WalletConfig::from_toml_str("").unwrap();
        assert_eq!(config, WalletConfig::default());
        assert_eq!(config.api.timeout, Duration::from_secs(15));
        let both = PromotionFlags::none()
            .with(PromotionFlag::Featured, true)
            .with(PromotionFlag::Boost, true);
        assert_eq!(config.build_calculator().total_cost(&both), 150);
    }

    #[test]
    fn test_file_sections() {
        let config = WalletConfig::from_toml_str(
            r#"
            [api]
            base_url = "https://wallet.example/api/v1"
            timeout_secs = 5
            auth_token = "secret"

            [pricing]
            featured = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://wallet.example/api/v1");
        assert_eq!(config.api.timeout, Duration::from_secs(5));
        assert_eq!(config.api.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.pricing, PricingConfig::Table(PriceTable { featured: 20, boost: 100 }));
    }

    #[test]
    fn test_pending_admin_mode() {
        let config = WalletConfig::from_toml_str("[pricing]\nmode = \"pending-admin\"\n").unwrap();
        assert_eq!(config.pricing, PricingConfig::PendingAdmin);
        let flags = PromotionFlags { featured: true, boost: true };
        assert_eq!(config.build_calculator().total_cost(&flags), 0);
    }

    #[test]
    fn test_rejects_bad_files() {
        assert!(WalletConfig::from_toml_str("[api]\ntimeout_secs = 0\n").is_err());
        assert!(WalletConfig::from_toml_str("[pricing]\nmode = \"free\"\n").is_err());
        assert!(WalletConfig::from_toml_str("[api]\nbase = \"x\"\n").is_err());
    }

    #[test]
    fn test_rejects_prices_below_coin_granularity() {
        let err = WalletConfig::from_toml_str("[pricing]\nfeatured = 7\n").unwrap_err();
        assert!(format!("{:#}", err).contains("featured price 7"), "got {:#}", err);
        assert!(WalletConfig::from_toml_str("[pricing]\nboost = 12\n").is_err());
        assert!(WalletConfig::from_toml_str("[pricing]\nfeatured = 0\nboost = 25\n").is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_BASE_URL, "http://127.0.0.1:9000"),
            (ENV_TOKEN, "tok"),
            (ENV_TIMEOUT_SECS, "3"),
        ]
        .into_iter()
        .collect();
        let mut config = WalletConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.api.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.api.auth_token.as_deref(), Some("tok"));
        assert_eq!(config.api.timeout, Duration::from_secs(3));

        let mut config = WalletConfig::default();
        assert!(config.apply_env(|k| (k == ENV_TIMEOUT_SECS).then(|| "soon".to_string())).is_err());
    }

    #[tokio::test]
    async fn test_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.toml");
        std::fs::write(&path, "[pricing]\nboost = 75\n").unwrap();
        let config = WalletConfig::from_sources(Some(path.clone())).await.unwrap();
        assert_eq!(config.config_path, Some(path));
        assert!(matches!(config.pricing, PricingConfig::Table(PriceTable { boost: 75, .. })));
    }
}
