//! Mach-O image model
//!
//! This module contains the repr(C) load-command structures and the
//! bounded views used to walk a loaded image's metadata: load commands,
//! linkedit tables, and import-pointer sections.

pub mod image;
pub mod structs;

pub use image::{ImageView, ImportKind, ImportSection, LinkeditTables};
pub use structs::{
	DysymtabCommand, INDIRECT_SYMBOL_ABS, INDIRECT_SYMBOL_LOCAL, LC_DYSYMTAB, LC_SEGMENT_64,
	LC_SYMTAB, LoadCommand, MH_MAGIC_64, MachHeader64, Nlist64, S_LAZY_SYMBOL_POINTERS,
	S_NON_LAZY_SYMBOL_POINTERS, SECTION_TYPE, SEG_LINKEDIT, Section64, SegmentCommand64,
	SymtabCommand,
};
