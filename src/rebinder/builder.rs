//! Builder for creating rebinders
//!
//! This module contains the `RebinderBuilder` struct and related
//! functionality for collecting rebinding requests.

use std::ffi::c_void;

use crate::rebinder::{Rebinder, Rebinding, Result};

/// Builder for creating rebinders
///
/// Requests are applied in the order they are added: when two requests
/// name the same symbol, the first one wins for every matching slot.
#[derive(Debug, Default)]
pub struct RebinderBuilder {
	/// The collected requests, in insertion order
	rebindings: Vec<Rebinding>,
}

impl RebinderBuilder {
	/// Create a new rebinder builder with no requests
	#[must_use]
	pub const fn new() -> Self {
		Self {
			rebindings: Vec::new(),
		}
	}

	/// Add a prepared rebinding request
	#[must_use]
	pub fn rebind(mut self, rebinding: Rebinding) -> Self {
		self.rebindings.push(rebinding);
		self
	}

	/// Add a request by name and replacement address
	///
	/// # Errors
	///
	/// Fails for an empty name, a name with an interior NUL byte, or a
	/// null replacement.
	pub fn symbol(self, name: impl Into<String>, replacement: *mut c_void) -> Result<Self> {
		Ok(self.rebind(Rebinding::new(name, replacement)?))
	}

	/// Add a request that also captures the original slot value
	///
	/// # Errors
	///
	/// Fails for an empty name, a name with an interior NUL byte, or a
	/// null replacement.
	pub fn symbol_with_original(
		self,
		name: impl Into<String>,
		replacement: *mut c_void,
		original: *mut *mut c_void,
	) -> Result<Self> {
		Ok(self.rebind(Rebinding::new(name, replacement)?.capture_original(original)))
	}

	/// Build the rebinder
	#[must_use]
	pub fn build(self) -> Rebinder {
		Rebinder::new(self.rebindings)
	}
}
