//! Utility functions.
//!
//! - [`app_data`] - Application configuration (XDG-compliant location)
//! - [`time`] - Second-resolution mtimes used for change detection

pub mod app_data;
pub mod time;

pub use app_data::*;
pub use time::*;
