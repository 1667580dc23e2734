//! Rebinding tests over synthetic in-memory images.
//!
//! Each test builds a miniature 64-bit Mach-O image in a heap allocation:
//! real load commands, `__LINKEDIT`-described symbol/string/indirect
//! tables, and live pointer-slot arrays. The image's "slide" is simply
//! its allocation address and every virtual address in the metadata is an
//! offset into the allocation, so the engine performs the same
//! slide-folding address arithmetic it performs against dyld-mapped
//! images.

use std::ffi::c_void;
use std::mem::{offset_of, size_of};
use std::ptr;

use reel_rs::macho::{
	DysymtabCommand, INDIRECT_SYMBOL_ABS, INDIRECT_SYMBOL_LOCAL, LC_DYSYMTAB, LC_SEGMENT_64,
	LC_SYMTAB, MH_MAGIC_64, MachHeader64, Nlist64, S_LAZY_SYMBOL_POINTERS,
	S_NON_LAZY_SYMBOL_POINTERS, Section64, SegmentCommand64, SymtabCommand,
};
use reel_rs::{RebindError, Rebinder, Rebinding};

const STRTAB_LEN: usize = 64;

/// A complete image: header, four load commands (a `__DATA` segment with
/// one lazy and one non-lazy pointer section, the `__LINKEDIT` segment,
/// `LC_SYMTAB`, `LC_DYSYMTAB`), followed by the tables and slot arrays
/// the commands describe.
#[repr(C)]
struct TestImage {
	header: MachHeader64,
	data_seg: SegmentCommand64,
	lazy_sect: Section64,
	nonlazy_sect: Section64,
	linkedit_seg: SegmentCommand64,
	symtab_cmd: SymtabCommand,
	dysymtab_cmd: DysymtabCommand,
	lazy_slots: [*mut c_void; 2],
	nonlazy_slots: [*mut c_void; 2],
	indirect: [u32; 4],
	symbols: [Nlist64; 4],
	strings: [u8; STRTAB_LEN],
}

impl TestImage {
	/// Run `rebinder` over this image.
	fn rebind(&mut self, rebinder: &mut Rebinder) {
		let slide = &raw const *self as isize;
		let header = &raw const self.header;
		unsafe { rebinder.rebind_image(header, slide) };
	}
}

fn name16(name: &[u8]) -> [u8; 16] {
	let mut buf = [0u8; 16];
	buf[..name.len()].copy_from_slice(name);
	buf
}

/// Build an image whose two lazy slots resolve to `names[0]`/`names[1]`
/// and whose two non-lazy slots resolve to `names[2]`/`names[3]`. Names
/// are raw symbol-table names, i.e. they carry the linkage underscore.
fn test_image_named(names: [&str; 4]) -> Box<TestImage> {
	let mut strings = [0u8; STRTAB_LEN];
	let mut strx = [0u32; 4];
	let mut pos = 1usize; // offset 0 is the conventional empty name
	for (i, name) in names.iter().enumerate() {
		strx[i] = pos as u32;
		strings[pos..pos + name.len()].copy_from_slice(name.as_bytes());
		pos += name.len() + 1;
	}
	assert!(pos <= STRTAB_LEN, "string table overflow");

	let data_cmdsize = (size_of::<SegmentCommand64>() + 2 * size_of::<Section64>()) as u32;
	let sizeofcmds = data_cmdsize
		+ size_of::<SegmentCommand64>() as u32
		+ size_of::<SymtabCommand>() as u32
		+ size_of::<DysymtabCommand>() as u32;

	let mut dysymtab_cmd: DysymtabCommand = unsafe { std::mem::zeroed() };
	dysymtab_cmd.cmd = LC_DYSYMTAB;
	dysymtab_cmd.cmdsize = size_of::<DysymtabCommand>() as u32;
	dysymtab_cmd.indirectsymoff = offset_of!(TestImage, indirect) as u32;
	dysymtab_cmd.nindirectsyms = 4;

	Box::new(TestImage {
		header: MachHeader64 {
			magic: MH_MAGIC_64,
			cputype: 0x0100_000C,
			cpusubtype: 0,
			filetype: 2,
			ncmds: 4,
			sizeofcmds,
			flags: 0,
			reserved: 0,
		},
		data_seg: SegmentCommand64 {
			cmd: LC_SEGMENT_64,
			cmdsize: data_cmdsize,
			segname: name16(b"__DATA"),
			vmaddr: offset_of!(TestImage, lazy_slots) as u64,
			vmsize: 32,
			fileoff: offset_of!(TestImage, lazy_slots) as u64,
			filesize: 32,
			maxprot: 3,
			initprot: 3,
			nsects: 2,
			flags: 0,
		},
		lazy_sect: Section64 {
			sectname: name16(b"__la_symbol_ptr"),
			segname: name16(b"__DATA"),
			addr: offset_of!(TestImage, lazy_slots) as u64,
			size: (2 * size_of::<*mut c_void>()) as u64,
			offset: 0,
			align: 3,
			reloff: 0,
			nreloc: 0,
			flags: S_LAZY_SYMBOL_POINTERS,
			reserved1: 0,
			reserved2: 0,
			reserved3: 0,
		},
		nonlazy_sect: Section64 {
			sectname: name16(b"__got"),
			segname: name16(b"__DATA"),
			addr: offset_of!(TestImage, nonlazy_slots) as u64,
			size: (2 * size_of::<*mut c_void>()) as u64,
			offset: 0,
			align: 3,
			reloff: 0,
			nreloc: 0,
			flags: S_NON_LAZY_SYMBOL_POINTERS,
			reserved1: 2,
			reserved2: 0,
			reserved3: 0,
		},
		linkedit_seg: SegmentCommand64 {
			cmd: LC_SEGMENT_64,
			cmdsize: size_of::<SegmentCommand64>() as u32,
			segname: name16(b"__LINKEDIT"),
			vmaddr: 0x4000,
			vmsize: 0x1000,
			fileoff: 0x4000,
			filesize: 0x1000,
			maxprot: 1,
			initprot: 1,
			nsects: 0,
			flags: 0,
		},
		symtab_cmd: SymtabCommand {
			cmd: LC_SYMTAB,
			cmdsize: size_of::<SymtabCommand>() as u32,
			symoff: offset_of!(TestImage, symbols) as u32,
			nsyms: 4,
			stroff: offset_of!(TestImage, strings) as u32,
			strsize: STRTAB_LEN as u32,
		},
		dysymtab_cmd,
		lazy_slots: [0x1111 as *mut c_void, 0x2222 as *mut c_void],
		nonlazy_slots: [0x3333 as *mut c_void, 0x4444 as *mut c_void],
		indirect: [0, 1, 2, 3],
		symbols: std::array::from_fn(|i| Nlist64 {
			n_strx: strx[i],
			n_type: 0,
			n_sect: 0,
			n_desc: 0,
			n_value: 0,
		}),
		strings,
	})
}

fn test_image() -> Box<TestImage> {
	test_image_named(["_printf", "_malloc", "_free", "_close"])
}

fn rebinder_for(name: &str, replacement: usize) -> Rebinder {
	reel_rs::new()
		.symbol(name, replacement as *mut c_void)
		.unwrap()
		.build()
}

#[test]
fn patches_matching_slot() {
	let mut img = test_image();
	let mut rebinder = rebinder_for("printf", 0xBEEF);

	img.rebind(&mut rebinder);

	assert_eq!(img.lazy_slots[0], 0xBEEF as *mut c_void);
	assert_eq!(img.lazy_slots[1], 0x2222 as *mut c_void);
	assert_eq!(img.nonlazy_slots, [0x3333 as *mut c_void, 0x4444 as *mut c_void]);
}

#[test]
fn patches_lazy_and_nonlazy_sections() {
	let mut img = test_image();
	let mut rebinder = reel_rs::new()
		.symbol("printf", 0xA1 as *mut c_void)
		.unwrap()
		.symbol("free", 0xA2 as *mut c_void)
		.unwrap()
		.symbol("close", 0xA3 as *mut c_void)
		.unwrap()
		.build();

	img.rebind(&mut rebinder);

	assert_eq!(img.lazy_slots[0], 0xA1 as *mut c_void);
	assert_eq!(img.lazy_slots[1], 0x2222 as *mut c_void);
	assert_eq!(img.nonlazy_slots[0], 0xA2 as *mut c_void);
	assert_eq!(img.nonlazy_slots[1], 0xA3 as *mut c_void);
}

#[test]
fn patches_every_slot_bound_to_symbol() {
	// The same symbol can be imported through both a lazy and a non-lazy
	// slot; one request patches both.
	let mut img = test_image_named(["_printf", "_malloc", "_printf", "_close"]);
	let mut rebinder = rebinder_for("printf", 0xBEEF);

	img.rebind(&mut rebinder);

	assert_eq!(img.lazy_slots[0], 0xBEEF as *mut c_void);
	assert_eq!(img.nonlazy_slots[0], 0xBEEF as *mut c_void);
}

#[test]
fn captures_original_value() {
	let mut img = test_image();
	let mut original: *mut c_void = ptr::null_mut();
	let mut rebinder = reel_rs::new()
		.symbol_with_original("printf", 0xBEEF as *mut c_void, &raw mut original)
		.unwrap()
		.build();

	img.rebind(&mut rebinder);

	assert_eq!(original, 0x1111 as *mut c_void);
	assert_eq!(img.lazy_slots[0], 0xBEEF as *mut c_void);
}

#[test]
fn second_pass_is_a_no_op() {
	let mut img = test_image();
	let mut original: *mut c_void = ptr::null_mut();
	let mut rebinder = reel_rs::new()
		.symbol_with_original("printf", 0xBEEF as *mut c_void, &raw mut original)
		.unwrap()
		.build();

	img.rebind(&mut rebinder);
	assert_eq!(original, 0x1111 as *mut c_void);

	// The slot now equals the replacement: the second pass must neither
	// rewrite the slot nor write the capture pointer again.
	original = ptr::null_mut();
	img.rebind(&mut rebinder);

	assert_eq!(img.lazy_slots[0], 0xBEEF as *mut c_void);
	assert_eq!(original, ptr::null_mut());
}

#[test]
fn strips_exactly_one_underscore() {
	// "_printf" in the symbol table matches the bare request "printf"...
	let mut img = test_image();
	let mut rebinder = rebinder_for("printf", 0xBEEF);
	img.rebind(&mut rebinder);
	assert_eq!(img.lazy_slots[0], 0xBEEF as *mut c_void);

	// ...but not a request spelled with the underscore.
	let mut img = test_image();
	let mut rebinder = rebinder_for("_printf", 0xBEEF);
	img.rebind(&mut rebinder);
	assert_eq!(img.lazy_slots[0], 0x1111 as *mut c_void);
}

#[test]
fn strips_only_the_linkage_prefix_from_mangled_names() {
	// A C++ name "__ZN..." keeps its own leading underscore after the
	// linkage prefix is stripped.
	let mut img = test_image_named(["__ZN3Foo3barEv", "_malloc", "_free", "_close"]);
	let mut rebinder = rebinder_for("_ZN3Foo3barEv", 0xC0DE);

	img.rebind(&mut rebinder);

	assert_eq!(img.lazy_slots[0], 0xC0DE as *mut c_void);
}

#[test]
fn first_matching_request_wins() {
	let mut img = test_image();
	let mut late_original: *mut c_void = ptr::null_mut();
	let mut rebinder = reel_rs::new()
		.symbol("printf", 0xAAAA as *mut c_void)
		.unwrap()
		.symbol_with_original("printf", 0xBBBB as *mut c_void, &raw mut late_original)
		.unwrap()
		.build();

	img.rebind(&mut rebinder);

	assert_eq!(img.lazy_slots[0], 0xAAAA as *mut c_void);
	assert_eq!(late_original, ptr::null_mut());
}

#[test]
fn unmatched_request_modifies_nothing() {
	let mut img = test_image();
	let mut rebinder = rebinder_for("no_such_symbol_anywhere", 0xBEEF);

	img.rebind(&mut rebinder);

	assert_eq!(img.lazy_slots, [0x1111 as *mut c_void, 0x2222 as *mut c_void]);
	assert_eq!(img.nonlazy_slots, [0x3333 as *mut c_void, 0x4444 as *mut c_void]);
}

#[test]
fn shared_capture_pointer_holds_last_image() {
	// Two images import malloc; one capture pointer cannot hold two
	// originals, the last image patched wins.
	let mut first = test_image();
	let mut second = test_image();
	second.lazy_slots[1] = 0x9999 as *mut c_void;

	let mut original: *mut c_void = ptr::null_mut();
	let mut rebinder = reel_rs::new()
		.symbol_with_original("malloc", 0xBEEF as *mut c_void, &raw mut original)
		.unwrap()
		.build();

	first.rebind(&mut rebinder);
	second.rebind(&mut rebinder);

	assert_eq!(first.lazy_slots[1], 0xBEEF as *mut c_void);
	assert_eq!(second.lazy_slots[1], 0xBEEF as *mut c_void);
	assert_eq!(original, 0x9999 as *mut c_void);
}

#[test]
fn image_missing_a_descriptor_is_skipped() {
	// No LC_SYMTAB.
	let mut img = test_image();
	img.symtab_cmd.cmd = 0x7F;
	let mut rebinder = rebinder_for("printf", 0xBEEF);
	img.rebind(&mut rebinder);
	assert_eq!(img.lazy_slots[0], 0x1111 as *mut c_void);

	// No LC_DYSYMTAB.
	let mut img = test_image();
	img.dysymtab_cmd.cmd = 0x7F;
	let mut rebinder = rebinder_for("printf", 0xBEEF);
	img.rebind(&mut rebinder);
	assert_eq!(img.lazy_slots[0], 0x1111 as *mut c_void);

	// No __LINKEDIT segment.
	let mut img = test_image();
	img.linkedit_seg.segname = name16(b"__NOTEDIT");
	let mut rebinder = rebinder_for("printf", 0xBEEF);
	img.rebind(&mut rebinder);
	assert_eq!(img.lazy_slots[0], 0x1111 as *mut c_void);
}

#[test]
fn non_import_sections_are_untouched() {
	let mut img = test_image();
	img.lazy_sect.flags = 0; // S_REGULAR
	let mut rebinder = reel_rs::new()
		.symbol("printf", 0xA1 as *mut c_void)
		.unwrap()
		.symbol("free", 0xA2 as *mut c_void)
		.unwrap()
		.build();

	img.rebind(&mut rebinder);

	assert_eq!(img.lazy_slots[0], 0x1111 as *mut c_void);
	assert_eq!(img.nonlazy_slots[0], 0xA2 as *mut c_void);
}

#[test]
fn sentinel_indirect_entries_are_skipped() {
	let mut img = test_image();
	img.indirect[0] = INDIRECT_SYMBOL_ABS;
	img.indirect[1] = INDIRECT_SYMBOL_LOCAL;
	let mut rebinder = reel_rs::new()
		.symbol("printf", 0xA1 as *mut c_void)
		.unwrap()
		.symbol("malloc", 0xA2 as *mut c_void)
		.unwrap()
		.build();

	img.rebind(&mut rebinder);

	assert_eq!(img.lazy_slots, [0x1111 as *mut c_void, 0x2222 as *mut c_void]);
}

#[test]
fn out_of_range_indices_are_skipped() {
	// A symbol index past the symbol table.
	let mut img = test_image();
	img.indirect[0] = 1000;
	let mut rebinder = rebinder_for("printf", 0xBEEF);
	img.rebind(&mut rebinder);
	assert_eq!(img.lazy_slots[0], 0x1111 as *mut c_void);

	// A name offset past the string table.
	let mut img = test_image();
	img.symbols[1].n_strx = 60000;
	let mut rebinder = rebinder_for("malloc", 0xBEEF);
	img.rebind(&mut rebinder);
	assert_eq!(img.lazy_slots[1], 0x2222 as *mut c_void);
}

#[test]
fn empty_symbol_names_never_match() {
	let mut img = test_image();
	img.symbols[0].n_strx = 0; // offset 0 is the empty name
	let mut rebinder = rebinder_for("printf", 0xBEEF);

	img.rebind(&mut rebinder);

	assert_eq!(img.lazy_slots[0], 0x1111 as *mut c_void);
}

#[test]
fn malformed_command_size_ends_the_walk() {
	let mut img = test_image();
	img.data_seg.cmdsize = 4; // smaller than a load_command header
	let mut rebinder = rebinder_for("printf", 0xBEEF);

	img.rebind(&mut rebinder);

	assert_eq!(img.lazy_slots[0], 0x1111 as *mut c_void);
}

#[test]
fn linkedit_bias_folds_file_offset_mapping() {
	// __LINKEDIT mapped at vmaddr != fileoff: the table offsets are only
	// reachable through (vmaddr - fileoff) + slide.
	const DELTA: u32 = 0x40;
	let mut img = test_image();
	img.linkedit_seg.vmaddr += u64::from(DELTA);
	img.symtab_cmd.symoff -= DELTA;
	img.symtab_cmd.stroff -= DELTA;
	img.dysymtab_cmd.indirectsymoff -= DELTA;
	let mut rebinder = rebinder_for("printf", 0xBEEF);

	img.rebind(&mut rebinder);

	assert_eq!(img.lazy_slots[0], 0xBEEF as *mut c_void);
}

#[test]
fn rejects_invalid_requests() {
	assert!(matches!(
		Rebinding::new("", 0x1 as *mut c_void),
		Err(RebindError::EmptySymbolName)
	));
	assert!(matches!(
		Rebinding::new("a\0b", 0x1 as *mut c_void),
		Err(RebindError::InvalidSymbolName(_))
	));
	assert!(matches!(
		Rebinding::new("printf", ptr::null_mut()),
		Err(RebindError::NullReplacement)
	));
}

#[cfg(target_os = "macos")]
#[test]
fn scans_real_process_images() {
	// A symbol imported by nothing: the scan must traverse every real
	// image's metadata and complete without touching anything.
	let mut rebinder = rebinder_for("reel_test_symbol_bound_nowhere", 0x1);
	unsafe { rebinder.rebind() };
}
