use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("webdriver command failed: {0}")]
    Command(String),
}

/// Narrow view of a driven browser page.
///
/// The checker only navigates and reads text, so this is all it gets to see.
/// Tests substitute an in-memory implementation for the live session.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Load the given URL in the browser.
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Visible text of the first element matching the CSS selector.
    async fn find_text(&self, selector: &str) -> Result<String, DriverError>;

    /// Joined visible text of every element matching the CSS selector,
    /// one line per element. Zero matches is an `ElementNotFound` error.
    async fn find_all_text(&self, selector: &str) -> Result<String, DriverError>;

    /// Full HTML source of the current page.
    async fn page_source(&self) -> Result<String, DriverError>;
}
