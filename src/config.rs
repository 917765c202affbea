use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Deserializer;
use url::Url;

const APP_PREFIX: &str = "trendspot";
const CONFIG_FILE: &str = "config.yaml";

pub const DEFAULT_TRENDS_TABLE: &str = "bigquery-public-data.google_trends.top_terms";
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Longest news look-back the config accepts.
pub const MAX_WINDOW_DAYS: u32 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_key: String,
    #[serde(default)]
    pub api_base: Option<String>,
    pub model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub warehouse: Option<WarehouseConfig>,
    #[serde(default)]
    pub news: NewsConfig,
    /// Dashboard name -> embed URL
    #[serde(default)]
    pub dashboards: IndexMap<String, Url>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseConfig {
    pub project_id: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_trends_table")]
    pub table: String,
}

impl WarehouseConfig {
    /// Token from the config file, else from the environment.
    pub fn resolve_access_token(&self) -> Option<String> {
        self.access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsConfig {
    #[serde(default = "default_max_records")]
    pub max_records: u32,
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default = "default_fetch_body")]
    pub fetch_article_body: bool,
}

impl Default for NewsConfig {
    fn default() -> Self {
        NewsConfig {
            max_records: default_max_records(),
            window_days: default_window_days(),
            fetch_article_body: default_fetch_body(),
        }
    }
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_trends_table() -> String {
    DEFAULT_TRENDS_TABLE.to_string()
}

fn default_max_records() -> u32 {
    5
}

fn default_window_days() -> u32 {
    5
}

fn default_fetch_body() -> bool {
    true
}

pub struct EnsureOutcome {
    pub path: PathBuf,
    pub created: bool,
}

const CONFIG_TEMPLATE: &str = r#"# trendspot config (YAML)
# All keys are required unless marked optional.

api_key: "<your OpenAI API key>"
model: "gpt-4o-mini"

# Optional OpenAI-compatible endpoint
# api_base: "https://api.openai.com/v1"

# Optional (defaults shown)
image_model: "dall-e-3"
request_timeout_secs: 60

# Required for `trends`
warehouse:
  project_id: "<your GCP project>"
  # Optional, falls back to $GOOGLE_OAUTH_ACCESS_TOKEN
  # access_token: "<output of gcloud auth print-access-token>"
  table: "bigquery-public-data.google_trends.top_terms"

# Optional (defaults shown)
news:
  max_records: 5
  window_days: 5
  fetch_article_body: true

# Optional named dashboards for `dashboard`
dashboards:
  "Google Trends": "https://datasignals.looker.com/embed/dashboards/11?theme=GoogleWhite"

"#;

impl Config {
    pub fn ensure_user_config() -> Result<EnsureOutcome> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_PREFIX);

        if let Some(path) = xdg_dirs.find_config_file(CONFIG_FILE) {
            Ok(EnsureOutcome {
                path,
                created: false,
            })
        } else {
            let config_path = xdg_dirs
                .place_config_file(CONFIG_FILE)
                .context("Cannot create configuration directory")?;
            let mut config_file = File::create(&config_path)?;
            config_file.write_all(CONFIG_TEMPLATE.as_bytes())?;

            Ok(EnsureOutcome {
                path: config_path,
                created: true,
            })
        }
    }

    pub fn get_user_config() -> Result<Config> {
        let found = xdg::BaseDirectories::with_prefix(APP_PREFIX).find_config_file(CONFIG_FILE);

        match &found {
            Some(existing_config) => Config::load(existing_config),
            None => Err(anyhow!(
                "Could not read configuration file in config::get_user_config"
            )),
        }
    }

    pub fn load(path: &Path) -> Result<Config> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Config::from_yaml_str(&raw, &path.display().to_string())
    }

    pub fn from_yaml_str(raw: &str, origin: &str) -> Result<Config> {
        let deserialized = Deserializer::from_str(raw);
        let config: Config = serde_path_to_error::deserialize(deserialized).map_err(|e| {
            anyhow!("Invalid YAML in {} at `{}`: {}", origin, e.path(), e.inner())
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(1..=20).contains(&self.news.max_records) {
            return Err(anyhow!(
                "news.max_records must be between 1 and 20, got {}",
                self.news.max_records
            ));
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.news.window_days) {
            return Err(anyhow!(
                "news.window_days must be between 1 and {}, got {}",
                MAX_WINDOW_DAYS,
                self.news.window_days
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = Config::from_yaml_str("api_key: k\nmodel: m\n", "test").unwrap();
        assert_eq!(cfg.image_model, "dall-e-3");
        assert_eq!(cfg.request_timeout_secs, 60);
        assert_eq!(cfg.news.max_records, 5);
        assert_eq!(cfg.news.window_days, 5);
        assert!(cfg.news.fetch_article_body);
        assert!(cfg.warehouse.is_none());
        assert!(cfg.dashboards.is_empty());
    }

    #[test]
    fn template_parses() {
        let cfg = Config::from_yaml_str(CONFIG_TEMPLATE, "template").unwrap();
        let warehouse = cfg.warehouse.unwrap();
        assert_eq!(warehouse.table, DEFAULT_TRENDS_TABLE);
        assert_eq!(cfg.dashboards.len(), 1);
    }

    #[test]
    fn bad_value_reports_its_path() {
        let raw = "api_key: k\nmodel: m\nnews:\n  max_records: lots\n";
        let err = Config::from_yaml_str(raw, "cfg.yaml").unwrap_err().to_string();
        assert!(err.contains("cfg.yaml"), "{err}");
        assert!(err.contains("news.max_records"), "{err}");
    }

    #[test]
    fn record_cap_is_bounded() {
        let raw = "api_key: k\nmodel: m\nnews:\n  max_records: 50\n";
        assert!(Config::from_yaml_str(raw, "cfg.yaml").is_err());
    }

    #[test]
    fn window_days_is_bounded() {
        for days in ["0", "31", "4294967295"] {
            let raw = format!("api_key: k\nmodel: m\nnews:\n  window_days: {days}\n");
            let err = Config::from_yaml_str(&raw, "cfg.yaml").unwrap_err().to_string();
            assert!(err.contains("news.window_days"), "{err}");
        }
        let raw = "api_key: k\nmodel: m\nnews:\n  window_days: 30\n";
        assert_eq!(Config::from_yaml_str(raw, "cfg.yaml").unwrap().news.window_days, 30);
    }

    #[test]
    fn dashboards_keep_configured_order() {
        let raw = "api_key: k\nmodel: m\ndashboards:\n  \"Zeta Campaign\": \"https://looker.example.com/embed/dashboards/9\"\n  \"Alpha Audience\": \"https://looker.example.com/embed/dashboards/1\"\n";
        let cfg = Config::from_yaml_str(raw, "cfg.yaml").unwrap();
        let names: Vec<&str> = cfg.dashboards.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Zeta Campaign", "Alpha Audience"]);
    }

    #[test]
    fn configured_token_wins_over_environment() {
        let warehouse = WarehouseConfig {
            project_id: "p".into(),
            access_token: Some("from-file".into()),
            table: DEFAULT_TRENDS_TABLE.into(),
        };
        assert_eq!(warehouse.resolve_access_token().as_deref(), Some("from-file"));
    }
}
