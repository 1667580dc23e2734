//! Demo: enumerate the images loaded in this process.
//!
//! Prints each image's header address, slide, and how many import-pointer
//! slots its sections expose to the rebinder.

#[cfg(target_os = "macos")]
fn main() {
	use reel_rs::ImageView;
	use reel_rs::ffi::loaded_images;

	reel_rs::util::init_logging();

	for image in loaded_images() {
		let path = unsafe { image.path() }
			.map(|p| p.to_string_lossy().into_owned())
			.unwrap_or_else(|| "<unknown>".to_string());

		let view = unsafe { ImageView::new(image.header, image.slide) };
		let mut slots = 0usize;
		if unsafe { view.linkedit_tables() }.is_some() {
			unsafe {
				view.for_each_import_section(|section| slots += section.count);
			}
		}

		println!(
			"{:p}  slide {:#14x}  {:5} import slots  {}",
			image.header, image.slide, slots, path
		);
	}
}

#[cfg(not(target_os = "macos"))]
fn main() {
	eprintln!("list_images only does anything on macOS");
}
