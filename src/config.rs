use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use url::Url;

use crate::models::WatchItem;
use crate::utils::error::{AppError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "gpw.toml";

const DEFAULT_PRICE_SELECTOR: &str =
    "#pageContent > div > div > div > div > div > div > span > strong";
const DEFAULT_AVAILABILITY_SELECTOR: &str = ".availabilityText > div > div";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub pushover: PushoverConfig,
    #[serde(default)]
    pub webdriver: WebdriverConfig,
    #[serde(default)]
    pub selenium: SeleniumConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub items: BTreeMap<String, WatchItem>,
    // Older config files keep their items under [galaxus.*]; both tables
    // are swept and written back.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub galaxus: BTreeMap<String, WatchItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GeneralConfig {
    pub debug: bool,
    pub notification_level: u8,
    pub preflight_sleep: bool,
    pub preflight_sleep_max: u64,
    pub interval: u64,
    // Present in old config files; carried through rewrites, never read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqlite3dir: Option<String>,
    pub nav_error_policy: NavErrorPolicy,
    pub change_notify_policy: ChangeNotifyPolicy,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            debug: false,
            notification_level: 1,
            preflight_sleep: false,
            preflight_sleep_max: 60,
            interval: 60,
            sqlite3dir: None,
            nav_error_policy: NavErrorPolicy::Continue,
            change_notify_policy: ChangeNotifyPolicy::WhenEnabled,
        }
    }
}

/// What to do with the rest of the sweep when a page navigation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NavErrorPolicy {
    Continue,
    Abort,
}

/// When change notifications fire: at any enabled notification level, or
/// only at the maximum one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeNotifyPolicy {
    WhenEnabled,
    VerboseOnly,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PushoverConfig {
    pub api_token: String,
    pub user_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebdriverConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SeleniumConfig {
    pub path: String,
    pub port: u16,
    pub remote_url: String,
}

impl Default for SeleniumConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            port: 4444,
            remote_url: "http://localhost:{port}/wd/hub".to_string(),
        }
    }
}

impl SeleniumConfig {
    /// Remote endpoint with the port substituted into the template. The
    /// Go-era `%d`/`%v` verbs are still accepted so old files keep working.
    pub fn base_url(&self) -> String {
        let port = self.port.to_string();
        self.remote_url
            .replace("{port}", &port)
            .replace("%d", &port)
            .replace("%v", &port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SelectorConfig {
    pub price: String,
    pub availability: String,
    pub availability_mode: AvailabilityMode,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            price: DEFAULT_PRICE_SELECTOR.to_string(),
            availability: DEFAULT_AVAILABILITY_SELECTOR.to_string(),
            availability_mode: AvailabilityMode::Collection,
        }
    }
}

/// Whether availability is read from the first matching element or from the
/// joined text of every match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AvailabilityMode {
    Single,
    Collection,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self)?;
        fs::write(path, raw)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.selenium.port == 0 {
            return Err(AppError::Config(
                "selenium.port must be greater than 0".into(),
            ));
        }

        for (id, item) in self.items.iter().chain(self.galaxus.iter()) {
            if Url::parse(&item.url).is_err() {
                return Err(AppError::Config(format!(
                    "item \"{}\" has an invalid url: {}",
                    id, item.url
                )));
            }
        }

        Ok(())
    }

    /// All watched items across both tables, in deterministic id order.
    pub fn items_mut(&mut self) -> impl Iterator<Item = (&String, &mut WatchItem)> {
        self.items.iter_mut().chain(self.galaxus.iter_mut())
    }

    pub fn item_count(&self) -> usize {
        self.items.len() + self.galaxus.len()
    }
}
