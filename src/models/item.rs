use serde::{Deserialize, Serialize};

use super::WatchMode;

/// One watched product page, as stored in the config file.
///
/// `price` and `availability` hold whatever text the page showed on the last
/// successful check. They are opaque strings; the tool only compares them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchItem {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub availability: String,
    /// Raw watch mode: "price", "stock", or anything else for both.
    #[serde(default = "default_watch")]
    pub watch: String,
}

fn default_watch() -> String {
    "price".to_string()
}

/// Values extracted from a live page during a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub price: String,
    pub availability: String,
}

impl WatchItem {
    pub fn watch_mode(&self) -> WatchMode {
        WatchMode::parse(&self.watch)
    }

    /// Fold an observation into the stored values under the item's watch
    /// mode. Returns true when a tracked field actually changed.
    pub fn apply(&mut self, observed: &Observation) -> bool {
        let mode = self.watch_mode();
        let mut updated = false;

        if mode.tracks_price() && self.price != observed.price {
            self.price = observed.price.clone();
            updated = true;
        }
        if mode.tracks_availability() && self.availability != observed.availability {
            self.availability = observed.availability.clone();
            updated = true;
        }

        updated
    }
}
