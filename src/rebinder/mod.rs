//! Rebinding engine
//!
//! This module contains the public surface of the rebinding engine: the
//! [`Rebinding`] request, the [`Rebinder`] that runs a point-in-time scan
//! over all loaded images, and the [`rebind_symbols`] convenience entry.

mod builder;
mod error;
mod patcher;

pub use builder::RebinderBuilder;
pub use error::{RebindError, Result};

use std::ffi::{CStr, CString, c_void};
use std::ptr;

use crate::macho::{ImageView, MachHeader64};

/// One rebinding request: redirect an imported symbol to a replacement.
///
/// The name is the bare symbol name as written in source (`"printf"`, not
/// `"_printf"`); the leading linkage underscore that Mach-O applies to
/// exported C names is stripped from each resolved symbol before
/// comparison, never added to the request.
pub struct Rebinding {
	/// Bare symbol name to match
	name: CString,
	/// Address calls should be redirected to
	replacement: *mut c_void,
	/// Optional out-pointer receiving the pre-patch slot value
	original: *mut *mut c_void,
}

impl std::fmt::Debug for Rebinding {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Rebinding")
			.field("name", &self.name)
			.field("replacement", &self.replacement)
			.field("captures_original", &!self.original.is_null())
			.finish()
	}
}

impl Rebinding {
	/// Create a rebinding request.
	///
	/// # Errors
	///
	/// Returns [`RebindError::EmptySymbolName`] for an empty name,
	/// [`RebindError::InvalidSymbolName`] for a name with an interior NUL
	/// byte, and [`RebindError::NullReplacement`] for a null replacement.
	pub fn new(name: impl Into<String>, replacement: *mut c_void) -> Result<Self> {
		let name = name.into();
		if name.is_empty() {
			return Err(RebindError::EmptySymbolName);
		}
		if replacement.is_null() {
			return Err(RebindError::NullReplacement);
		}
		Ok(Self {
			name: CString::new(name)?,
			replacement,
			original: ptr::null_mut(),
		})
	}

	/// Capture the previous slot value through `original` when a slot is
	/// patched. Pass null to disable capture.
	///
	/// The pointer is written once per patched slot, at the moment of the
	/// patch. When several images import the same symbol, each patched
	/// image overwrites it in turn and the last one wins; a single capture
	/// pointer cannot hold more than one distinct original.
	#[must_use]
	pub const fn capture_original(mut self, original: *mut *mut c_void) -> Self {
		self.original = original;
		self
	}

	/// The bare symbol name this request matches.
	#[must_use]
	pub fn name(&self) -> &CStr {
		&self.name
	}

	/// The replacement address.
	#[must_use]
	pub const fn replacement(&self) -> *mut c_void {
		self.replacement
	}

	pub(crate) const fn original(&self) -> *mut *mut c_void {
		self.original
	}
}

/// A configured set of rebinding requests.
///
/// Built with [`RebinderBuilder`]; running it scans every image currently
/// loaded in the process and patches matching import-pointer slots
/// in place. The scan is a point-in-time pass: images loaded afterwards
/// are untouched until the caller re-runs it.
#[derive(Debug)]
pub struct Rebinder {
	/// The requests, in caller-supplied order (first match wins)
	rebindings: Vec<Rebinding>,
}

impl Rebinder {
	/// Create a new rebinder.
	///
	/// This is typically called by the `RebinderBuilder` and not directly.
	pub(crate) const fn new(rebindings: Vec<Rebinding>) -> Self {
		Self { rebindings }
	}

	/// The requests this rebinder will apply.
	#[must_use]
	pub fn rebindings(&self) -> &[Rebinding] {
		&self.rebindings
	}

	/// Scan all currently loaded images and patch matching import slots.
	///
	/// The operation is total: images without import tables, sections of
	/// other types, and unmatched symbols are skipped silently. Nothing is
	/// reported back; partial success across images is normal.
	///
	/// # Safety
	///
	/// The caller must ensure:
	/// - No other thread runs an overlapping rebind concurrently
	/// - No targeted lazy import is being resolved by dyld concurrently
	///   (interpose before the import is first exercised)
	/// - Every replacement is ABI-compatible with the symbol it replaces
	/// - The targeted slots are mapped writable
	#[cfg(target_os = "macos")]
	pub unsafe fn rebind(&mut self) {
		unsafe { rebind_symbols(&mut self.rebindings) };
	}

	/// Patch matching import slots in a single image.
	///
	/// This is the per-image entry point behind [`Rebinder::rebind`],
	/// usable directly by callers that enumerate images themselves.
	///
	/// # Safety
	///
	/// `header` and `slide` must describe an image currently mapped by
	/// dyld (or an equivalent, fully materialized in-memory image), and
	/// the caller obligations of [`Rebinder::rebind`] apply.
	pub unsafe fn rebind_image(&mut self, header: *const MachHeader64, slide: isize) {
		let view = unsafe { ImageView::new(header, slide) };
		unsafe { patcher::patch_image(&view, &mut self.rebindings) };
	}
}

/// Rebind `rebindings` across all currently loaded images.
///
/// Convenience entry mirroring the one-call C surface; equivalent to
/// building a [`Rebinder`] over the slice and running it once.
///
/// # Safety
///
/// See [`Rebinder::rebind`].
#[cfg(target_os = "macos")]
pub unsafe fn rebind_symbols(rebindings: &mut [Rebinding]) {
	use tracing::debug;

	for image in crate::ffi::loaded_images() {
		if let Some(path) = unsafe { image.path() } {
			debug!("rebind: scanning {}", path.to_string_lossy());
		}
		let view = unsafe { ImageView::new(image.header, image.slide) };
		unsafe { patcher::patch_image(&view, rebindings) };
	}
}
