//! Import-pointer patching
//!
//! The per-image patch pass: resolve each slot of each import-pointer
//! section to its symbol name, match it against the request list, and
//! substitute the slot value in place.

use tracing::{debug, trace};

use crate::macho::{INDIRECT_SYMBOL_ABS, INDIRECT_SYMBOL_LOCAL, ImageView, ImportSection, LinkeditTables};
use crate::rebinder::Rebinding;

/// Patch every matching import-pointer slot of one image.
///
/// An image missing any of its symbol-table, dynamic-symbol-table or
/// `__LINKEDIT` descriptors is skipped whole; per-slot resolution
/// failures (sentinel indirect entries, out-of-range indices, empty
/// names) skip just that slot. Nothing here fails observably.
///
/// # Safety
///
/// The image behind `view` must be mapped, its import-pointer slots
/// writable, and the caller obligations of [`crate::Rebinder::rebind`]
/// upheld.
pub(crate) unsafe fn patch_image(view: &ImageView, rebindings: &mut [Rebinding]) {
	if rebindings.is_empty() {
		return;
	}
	let Some(tables) = (unsafe { view.linkedit_tables() }) else {
		trace!("image at {:p} has no symbol tables, skipping", view.header());
		return;
	};
	unsafe {
		view.for_each_import_section(|section| {
			trace!(
				"scanning {:?} import section at {:p} ({} slots)",
				section.kind, section.slots, section.count
			);
			patch_section(section, &tables, rebindings);
		});
	}
}

/// Patch matching slots within one import-pointer section.
unsafe fn patch_section(
	section: &ImportSection,
	tables: &LinkeditTables,
	rebindings: &mut [Rebinding],
) {
	for i in 0..section.count {
		// Slot i of the section corresponds to indirect-table entry
		// (reserved1 + i), which holds the owning symbol's table index.
		let Some(symbol_index) = (unsafe { tables.indirect_entry(section.first_indirect + i) })
		else {
			continue;
		};
		if symbol_index & (INDIRECT_SYMBOL_LOCAL | INDIRECT_SYMBOL_ABS) != 0 {
			continue;
		}
		let Some(symbol) = (unsafe { tables.symbol(symbol_index) }) else {
			continue;
		};
		let Some(name) = (unsafe { tables.symbol_name(symbol.n_strx) }) else {
			continue;
		};
		let name = name.to_bytes();
		if name.is_empty() {
			continue;
		}
		// Exported C names carry one linkage underscore; requests use the
		// bare source-level name.
		let bare = &name[1..];

		for rebinding in rebindings.iter_mut() {
			if rebinding.name().to_bytes() != bare {
				continue;
			}
			let slot = unsafe { section.slots.add(i) };
			let current = unsafe { slot.read_unaligned() };
			if current != rebinding.replacement() {
				let original = rebinding.original();
				if !original.is_null() {
					unsafe { original.write(current) };
				}
				unsafe { slot.write_unaligned(rebinding.replacement()) };
				debug!(
					"patched {} at {:p}: {:p} -> {:p}",
					String::from_utf8_lossy(bare),
					slot,
					current,
					rebinding.replacement(),
				);
			}
			break;
		}
	}
}
