//! # Lunaris Core
//!
//! Core utilities and foundational types shared across the Lunaris engine
//! crates: error handling, logging/tracing setup, frame timing, and the
//! base vector/colour/transform math that domain crates (such as
//! `lunaris-ik`) build on.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod error;
pub mod logger;
pub mod math;
pub mod time;

pub use error::{Error, Result};
pub use logger::{LogLevel, Logger};
pub use math::{Color, Rect, Transform2D, Transform3D, Vec2, Vec3};
pub use time::Time;

/// Lunaris Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize core systems (logging, etc.)
///
/// # Errors
///
/// Returns an error if initialization fails (e.g., logging already initialized)
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init()
        .map_err(|e| Error::Init(e.to_string()))?;

    tracing::info!("Lunaris Engine v{VERSION} initialized");
    Ok(())
}
