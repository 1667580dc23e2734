//! Demo: hook `printf` in the running process.
//!
//! Rebinds the `printf` import of every loaded image to a replacement
//! that prefixes a marker, then calls through to the captured original.
//!
//! Run it with:
//! ```bash
//! REEL_DEBUG=1 cargo run --example hook_printf
//! ```

#[cfg(target_os = "macos")]
mod demo {
	use std::ffi::{c_char, c_int, c_void};
	use std::mem;
	use std::ptr;
	use std::sync::atomic::{AtomicPtr, Ordering};

	static ORIGINAL_PRINTF: AtomicPtr<c_void> = AtomicPtr::new(ptr::null_mut());

	type PrintfFn = extern "C" fn(*const c_char) -> c_int;

	extern "C" fn hooked_printf(format: *const c_char) -> c_int {
		let original = ORIGINAL_PRINTF.load(Ordering::Relaxed);
		if original.is_null() {
			return -1;
		}
		let original: PrintfFn = unsafe { mem::transmute(original) };
		original(c"[hooked] ".as_ptr());
		original(format)
	}

	pub fn run() {
		reel_rs::util::init_logging();

		unsafe {
			libc::printf(c"About to hook printf...\n".as_ptr());
		}

		let mut rebinder = reel_rs::new()
			.symbol_with_original(
				"printf",
				hooked_printf as *mut c_void,
				ORIGINAL_PRINTF.as_ptr(),
			)
			.expect("valid rebinding")
			.build();

		unsafe {
			rebinder.rebind();

			libc::printf(c"Hello, hooked world!\n".as_ptr());
			libc::printf(c"The hook seems to be working!\n".as_ptr());
		}

		let original = ORIGINAL_PRINTF.load(Ordering::Relaxed);
		if original.is_null() {
			eprintln!("printf import was not found (chained-fixups binary?)");
		} else {
			let original: PrintfFn = unsafe { mem::transmute(original) };
			original(c"This is a direct call to the original printf.\n".as_ptr());
		}
	}
}

#[cfg(target_os = "macos")]
fn main() {
	demo::run();
}

#[cfg(not(target_os = "macos"))]
fn main() {
	eprintln!("hook_printf only does anything on macOS");
}
