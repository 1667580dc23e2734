//! reel-rs - A library for rebinding dynamically-linked Mach-O symbols
//!
//! This library redirects calls to imported functions in a running macOS
//! process by patching the lazy and non-lazy symbol-pointer tables of
//! every loaded image, optionally capturing the original target so the
//! replacement can call through to it.
//!
//! # Getting Started
//!
//! ```no_run
//! # #[cfg(target_os = "macos")]
//! # fn demo() -> reel_rs::Result<()> {
//! use std::ffi::c_void;
//! use std::ptr;
//!
//! extern "C" fn my_getpid() -> i32 {
//!     4242
//! }
//!
//! let mut original: *mut c_void = ptr::null_mut();
//!
//! let mut rebinder = reel_rs::new()
//!     .symbol_with_original("getpid", my_getpid as *mut c_void, &mut original)?
//!     .build();
//!
//! // Patch every loaded image in one pass.
//! unsafe { rebinder.rebind() };
//! # Ok(())
//! # }
//! ```
//!
//! # Caveats
//!
//! The scan is a point-in-time pass over the images loaded right now;
//! re-run it after loading new code. Patching races dyld's own lazy
//! binding if a targeted import is exercised concurrently, so interpose
//! early, and serialize overlapping rebind calls yourself. Images built
//! with chained fixups carry no classical symbol-pointer sections and are
//! silently left untouched.
//!
//! Set `REEL_DEBUG=1` (or `RUST_LOG`) to see per-image scan logging once
//! [`util::init_logging`] has run.

pub mod macho;
pub mod rebinder;
pub mod util;

#[cfg(target_os = "macos")]
pub mod ffi;

pub use macho::{ImageView, ImportKind, ImportSection, LinkeditTables, MachHeader64};
#[cfg(target_os = "macos")]
pub use rebinder::rebind_symbols;
pub use rebinder::{RebindError, Rebinder, RebinderBuilder, Rebinding, Result};

/// Create a new rebinder builder
#[must_use]
pub fn new() -> RebinderBuilder {
	RebinderBuilder::new()
}
