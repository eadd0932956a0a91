pub mod checker;
pub mod config;
pub mod driver;
pub mod models;
pub mod notifiers;
pub mod preflight;
pub mod session;
pub mod utils;

// Re-export commonly used types
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
