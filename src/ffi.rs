//! Raw dyld FFI and the C-compatible entry point
//!
//! This module declares the dyld image-registry functions the enumerator
//! is built on, and exports a C-callable `reel_rebind_symbols` with the
//! classic `struct rebinding` layout so existing C and Swift callers can
//! link against this crate directly.

use libc::{c_char, c_int};
use std::ffi::{CStr, c_void};
use std::slice;

use crate::macho::MachHeader64;
use crate::rebinder::Rebinding;

unsafe extern "C" {
	fn _dyld_image_count() -> u32;
	fn _dyld_get_image_header(index: u32) -> *const MachHeader64;
	fn _dyld_get_image_vmaddr_slide(index: u32) -> isize;
	fn _dyld_get_image_name(index: u32) -> *const c_char;
}

/// One image currently mapped into the process.
#[derive(Debug, Clone, Copy)]
pub struct LoadedImage {
	/// Location of the image's `mach_header_64`
	pub header: *const MachHeader64,
	/// The vmaddr slide dyld applied when mapping the image
	pub slide: isize,
	name: *const c_char,
}

impl LoadedImage {
	/// The image's file-system path as reported by dyld.
	///
	/// # Safety
	///
	/// The image must still be loaded; dyld owns the string.
	#[must_use]
	pub unsafe fn path(&self) -> Option<&CStr> {
		if self.name.is_null() {
			None
		} else {
			Some(unsafe { CStr::from_ptr(self.name) })
		}
	}
}

/// Iterator over the images currently loaded in the process.
///
/// The image count is sampled when the iterator is created; headers that
/// disappear or are not 64-bit Mach-O are skipped.
#[derive(Debug)]
pub struct LoadedImages {
	index: u32,
	count: u32,
}

impl Iterator for LoadedImages {
	type Item = LoadedImage;

	fn next(&mut self) -> Option<LoadedImage> {
		while self.index < self.count {
			let i = self.index;
			self.index += 1;

			let header = unsafe { _dyld_get_image_header(i) };
			if header.is_null() || !unsafe { (*header).is_valid() } {
				continue;
			}
			return Some(LoadedImage {
				header,
				slide: unsafe { _dyld_get_image_vmaddr_slide(i) },
				name: unsafe { _dyld_get_image_name(i) },
			});
		}
		None
	}
}

/// Enumerate the images currently loaded in the process.
///
/// Queries the dyld registry fresh on every call; the set of loaded
/// images can grow between calls, so results are never cached.
#[must_use]
pub fn loaded_images() -> LoadedImages {
	LoadedImages {
		index: 0,
		count: unsafe { _dyld_image_count() },
	}
}

/// C-compatible rebinding request.
///
/// Field-for-field the classic layout:
///
/// ```c
/// struct rebinding {
///   const char *name;
///   void *replacement;
///   void **original;
/// };
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ReelRebinding {
	/// Bare symbol name, NUL-terminated
	pub name: *const c_char,
	/// Address calls should be redirected to
	pub replacement: *mut c_void,
	/// Optional out-pointer for the previous slot value, may be null
	pub original: *mut *mut c_void,
}

/// Rebind `count` requests across all currently loaded images.
///
/// Returns 0 on success and -1 if any request is malformed (null array
/// with nonzero count, null/empty/non-UTF-8 name, or null replacement).
/// Matching behavior is identical to [`crate::rebind_symbols`].
///
/// # Safety
///
/// `rebindings` must point to `count` valid [`ReelRebinding`] values with
/// NUL-terminated names, and the caller obligations of
/// [`crate::Rebinder::rebind`] apply.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn reel_rebind_symbols(
	rebindings: *const ReelRebinding,
	count: usize,
) -> c_int {
	crate::util::init_logging();

	if count == 0 {
		return 0;
	}
	if rebindings.is_null() {
		return -1;
	}

	let requests = unsafe { slice::from_raw_parts(rebindings, count) };
	let mut converted = Vec::with_capacity(count);
	for request in requests {
		if request.name.is_null() {
			return -1;
		}
		let Ok(name) = unsafe { CStr::from_ptr(request.name) }.to_str() else {
			return -1;
		};
		let Ok(rebinding) = Rebinding::new(name, request.replacement) else {
			return -1;
		};
		converted.push(rebinding.capture_original(request.original));
	}

	unsafe { crate::rebinder::rebind_symbols(&mut converted) };
	0
}
