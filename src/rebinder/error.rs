//! Error types for the rebinder
//!
//! This module contains error types and a result type for the rebinder.
//!
//! Errors exist only at request-construction and build time. The rebind
//! scan itself is total: a symbol absent from every image, an image with
//! no import tables, or a slot already holding the replacement are all
//! expected conditions and degrade to silent skips, never errors.

use std::ffi::NulError;
use thiserror::Error;

/// Result type for rebinder operations
pub type Result<T> = std::result::Result<T, RebindError>;

/// Error type for rebinder operations
#[derive(Debug, Error)]
pub enum RebindError {
	/// The symbol name is empty
	#[error("symbol name is empty")]
	EmptySymbolName,

	/// The symbol name contains an interior NUL byte
	#[error("symbol name contains an interior NUL byte: {0}")]
	InvalidSymbolName(#[from] NulError),

	/// The replacement address is null
	#[error("replacement address is null")]
	NullReplacement,
}
