//! Bounded views over a Mach-O image mapped into the current process.
//!
//! Everything here reads loader-owned memory through explicit, checked
//! views: the load-command walk is bounded by both `ncmds` and
//! `sizeofcmds`, and every table access goes through an accessor that
//! validates the index against the owning descriptor's element count.
//! The data itself is trusted (dyld mapped it), but a stray offset never
//! turns into a wild read.

use std::ffi::{CStr, c_void};
use std::mem::size_of;

use super::structs::{
	DysymtabCommand, LC_DYSYMTAB, LC_SEGMENT_64, LC_SYMTAB, LoadCommand, MachHeader64, Nlist64,
	S_LAZY_SYMBOL_POINTERS, S_NON_LAZY_SYMBOL_POINTERS, SEG_LINKEDIT, Section64, SegmentCommand64,
	SymtabCommand,
};

/// One loaded image: its header location plus the ASLR slide dyld applied
/// when mapping it.
#[derive(Debug, Clone, Copy)]
pub struct ImageView {
	header: *const MachHeader64,
	slide: isize,
}

/// Absolute, slide-adjusted addresses of the symbol, string and indirect
/// tables of one image, with the element counts needed to index them.
#[derive(Debug, Clone, Copy)]
pub struct LinkeditTables {
	symbols: *const Nlist64,
	nsyms: u32,
	strings: *const u8,
	strsize: u32,
	indirect: *const u32,
	nindirect: u32,
}

/// Whether an import-pointer section is resolved lazily (on first call)
/// or eagerly (at load time).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
	/// `S_LAZY_SYMBOL_POINTERS`, e.g. `__la_symbol_ptr`
	Lazy,
	/// `S_NON_LAZY_SYMBOL_POINTERS`, e.g. `__got`
	NonLazy,
}

/// A section of imported-symbol pointer slots, located at its runtime
/// address.
#[derive(Debug, Clone, Copy)]
pub struct ImportSection {
	/// Runtime base of the slot array
	pub slots: *mut *mut c_void,
	/// Number of pointer-sized slots
	pub count: usize,
	/// Index of slot 0 in the indirect symbol table (`reserved1`)
	pub first_indirect: usize,
	/// Lazy or non-lazy resolution
	pub kind: ImportKind,
}

/// Iterator over an image's load commands, bounded by `ncmds` and
/// `sizeofcmds`. A command whose self-declared size is smaller than the
/// command header or overruns the declared command area ends the walk.
struct LoadCommands {
	cur: *const u8,
	end: *const u8,
	remaining: u32,
}

impl Iterator for LoadCommands {
	type Item = *const LoadCommand;

	fn next(&mut self) -> Option<*const LoadCommand> {
		if self.remaining == 0 {
			return None;
		}
		if (self.cur as usize).checked_add(size_of::<LoadCommand>())? > self.end as usize {
			return None;
		}
		let cmd = self.cur.cast::<LoadCommand>();
		let cmdsize = unsafe { (*cmd).cmdsize } as usize;
		if cmdsize < size_of::<LoadCommand>()
			|| (self.cur as usize).checked_add(cmdsize)? > self.end as usize
		{
			return None;
		}
		self.remaining -= 1;
		self.cur = unsafe { self.cur.add(cmdsize) };
		Some(cmd)
	}
}

impl ImageView {
	/// Create a view over one loaded image.
	///
	/// # Safety
	///
	/// `header` must point at the `mach_header_64` of an image currently
	/// mapped by dyld, with `slide` being that image's vmaddr slide. The
	/// image must stay mapped for the lifetime of the view.
	#[must_use]
	pub const unsafe fn new(header: *const MachHeader64, slide: isize) -> Self {
		Self { header, slide }
	}

	/// The image's header location.
	#[must_use]
	pub const fn header(&self) -> *const MachHeader64 {
		self.header
	}

	/// The image's vmaddr slide.
	#[must_use]
	pub const fn slide(&self) -> isize {
		self.slide
	}

	unsafe fn commands(&self) -> LoadCommands {
		let header = unsafe { &*self.header };
		let first = unsafe { self.header.cast::<u8>().add(size_of::<MachHeader64>()) };
		LoadCommands {
			cur: first,
			end: first.wrapping_add(header.sizeofcmds as usize),
			remaining: header.ncmds,
		}
	}

	/// Locate the symbol, string and indirect tables of this image.
	///
	/// Walks the load commands once, collecting the `LC_SYMTAB` and
	/// `LC_DYSYMTAB` commands and the `__LINKEDIT` segment, then folds the
	/// segment's file-to-memory mapping and the slide into absolute table
	/// addresses. Returns `None` if any of the three commands is missing;
	/// such images have no classical import tables and are not
	/// reboundable.
	///
	/// # Safety
	///
	/// The view's header and load commands must be mapped (see
	/// [`ImageView::new`]).
	#[must_use]
	pub unsafe fn linkedit_tables(&self) -> Option<LinkeditTables> {
		let mut symtab: Option<&SymtabCommand> = None;
		let mut dysymtab: Option<&DysymtabCommand> = None;
		let mut linkedit: Option<&SegmentCommand64> = None;

		for cmd in unsafe { self.commands() } {
			let (cmd_type, cmdsize) = unsafe { ((*cmd).cmd, (*cmd).cmdsize as usize) };
			match cmd_type {
				LC_SYMTAB if cmdsize >= size_of::<SymtabCommand>() => {
					symtab = Some(unsafe { &*cmd.cast::<SymtabCommand>() });
				},
				LC_DYSYMTAB if cmdsize >= size_of::<DysymtabCommand>() => {
					dysymtab = Some(unsafe { &*cmd.cast::<DysymtabCommand>() });
				},
				LC_SEGMENT_64 if cmdsize >= size_of::<SegmentCommand64>() => {
					let seg = unsafe { &*cmd.cast::<SegmentCommand64>() };
					if seg.name() == SEG_LINKEDIT {
						linkedit = Some(seg);
					}
				},
				_ => {},
			}
		}

		let (symtab, dysymtab, linkedit) = (symtab?, dysymtab?, linkedit?);

		// The linkedit tables are described by file offsets; the segment's
		// vmaddr/fileoff pair plus the slide converts them to runtime
		// addresses.
		let base = (self.slide as usize)
			.wrapping_add(linkedit.vmaddr.wrapping_sub(linkedit.fileoff) as usize);

		Some(LinkeditTables {
			symbols: base.wrapping_add(symtab.symoff as usize) as *const Nlist64,
			nsyms: symtab.nsyms,
			strings: base.wrapping_add(symtab.stroff as usize) as *const u8,
			strsize: symtab.strsize,
			indirect: base.wrapping_add(dysymtab.indirectsymoff as usize) as *const u32,
			nindirect: dysymtab.nindirectsyms,
		})
	}

	/// Visit every lazy and non-lazy symbol-pointer section of this image.
	///
	/// Walks the load commands a second time, over every section of every
	/// segment. `nsects` is cross-checked against the segment command's
	/// own size before the section array is touched.
	///
	/// # Safety
	///
	/// The view's header and load commands must be mapped (see
	/// [`ImageView::new`]).
	pub unsafe fn for_each_import_section(&self, mut f: impl FnMut(&ImportSection)) {
		for cmd in unsafe { self.commands() } {
			let (cmd_type, cmdsize) = unsafe { ((*cmd).cmd, (*cmd).cmdsize as usize) };
			if cmd_type != LC_SEGMENT_64 || cmdsize < size_of::<SegmentCommand64>() {
				continue;
			}
			let seg = unsafe { &*cmd.cast::<SegmentCommand64>() };
			let fitting = (cmdsize - size_of::<SegmentCommand64>()) / size_of::<Section64>();
			let nsects = (seg.nsects as usize).min(fitting);
			let sections =
				unsafe { cmd.cast::<u8>().add(size_of::<SegmentCommand64>()) }.cast::<Section64>();

			for j in 0..nsects {
				let sect = unsafe { &*sections.add(j) };
				let kind = match sect.section_type() {
					S_LAZY_SYMBOL_POINTERS => ImportKind::Lazy,
					S_NON_LAZY_SYMBOL_POINTERS => ImportKind::NonLazy,
					_ => continue,
				};
				let count = sect.size as usize / size_of::<*mut c_void>();
				if count == 0 {
					continue;
				}
				f(&ImportSection {
					slots: (self.slide as usize).wrapping_add(sect.addr as usize)
						as *mut *mut c_void,
					count,
					first_indirect: sect.reserved1 as usize,
					kind,
				});
			}
		}
	}
}

impl LinkeditTables {
	/// Indirect-table entry at `index`, or `None` if out of range.
	///
	/// # Safety
	///
	/// The image the tables were resolved from must still be mapped.
	#[must_use]
	pub unsafe fn indirect_entry(&self, index: usize) -> Option<u32> {
		if index >= self.nindirect as usize {
			return None;
		}
		Some(unsafe { self.indirect.add(index).read_unaligned() })
	}

	/// Symbol-table entry at `index`, or `None` if out of range.
	///
	/// # Safety
	///
	/// The image the tables were resolved from must still be mapped.
	#[must_use]
	pub unsafe fn symbol(&self, index: u32) -> Option<Nlist64> {
		if index >= self.nsyms {
			return None;
		}
		Some(unsafe { self.symbols.add(index as usize).read_unaligned() })
	}

	/// NUL-terminated symbol name at string-table offset `strx`, or `None`
	/// if the offset lies outside the string table.
	///
	/// # Safety
	///
	/// The image the tables were resolved from must still be mapped, and
	/// the string table NUL-terminated as the loader guarantees.
	#[must_use]
	pub unsafe fn symbol_name(&self, strx: u32) -> Option<&CStr> {
		if strx >= self.strsize {
			return None;
		}
		Some(unsafe { CStr::from_ptr(self.strings.add(strx as usize).cast()) })
	}
}
