//! RC Mobile
//!
//! Application-facing entry point. Everything lives in [`rcsdk`]; this crate
//! re-exports it so screens depend on a single name.

#![warn(missing_docs)]

pub use rcsdk::*;

/// Build a platform against the sandbox server
pub fn sandbox_platform(app_key: &str, app_secret: &str) -> Result<Platform> {
    Platform::new(Credentials::sandbox(app_key, app_secret))
}

/// Build a platform against the production server
pub fn production_platform(app_key: &str, app_secret: &str) -> Result<Platform> {
    Platform::new(Credentials::production(app_key, app_secret))
}
