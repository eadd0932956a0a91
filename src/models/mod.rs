pub mod item;

// Re-exports for convenience
pub use item::*;

/// What a configured item reacts to.
///
/// The config file keeps the raw string so unknown values survive a rewrite;
/// anything other than "price" or "stock" watches both fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    Price,
    Stock,
    Both,
}

impl WatchMode {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "price" => WatchMode::Price,
            "stock" => WatchMode::Stock,
            _ => WatchMode::Both,
        }
    }

    pub fn tracks_price(self) -> bool {
        !matches!(self, WatchMode::Stock)
    }

    pub fn tracks_availability(self) -> bool {
        !matches!(self, WatchMode::Price)
    }
}
