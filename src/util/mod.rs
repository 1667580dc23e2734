//! Utility modules for reel
//!
//! This module contains utility functions and types used by reel.

pub mod logging;

// Re-export all utility functions
pub use logging::init_logging;
