//! Mach-O load-command structures and constants.
//!
//! These structures mirror the layouts dyld maps into the process and must
//! match the platform's `<mach-o/loader.h>` / `<mach-o/nlist.h>` contract
//! bit-exactly. Only the 64-bit variants are defined; modern macOS loads
//! no 32-bit images.

/// Magic number of a 64-bit Mach-O header (`MH_MAGIC_64`).
pub const MH_MAGIC_64: u32 = 0xFEED_FACF;

/// Load command type for a 64-bit segment (`LC_SEGMENT_64`).
pub const LC_SEGMENT_64: u32 = 0x19;
/// Load command type for the symbol table (`LC_SYMTAB`).
pub const LC_SYMTAB: u32 = 0x2;
/// Load command type for the dynamic symbol table (`LC_DYSYMTAB`).
pub const LC_DYSYMTAB: u32 = 0xB;

/// Mask extracting the section type from `Section64::flags`.
pub const SECTION_TYPE: u32 = 0x0000_00FF;
/// Section type of a non-lazy symbol-pointer section (`__got` and friends).
pub const S_NON_LAZY_SYMBOL_POINTERS: u32 = 0x6;
/// Section type of a lazy symbol-pointer section (`__la_symbol_ptr`).
pub const S_LAZY_SYMBOL_POINTERS: u32 = 0x7;

/// Indirect-table sentinel: slot bound to a symbol local to its image.
pub const INDIRECT_SYMBOL_LOCAL: u32 = 0x8000_0000;
/// Indirect-table sentinel: slot bound to an absolute symbol.
pub const INDIRECT_SYMBOL_ABS: u32 = 0x4000_0000;

/// Name of the segment holding the symbol, string and indirect tables.
pub const SEG_LINKEDIT: &[u8] = b"__LINKEDIT";

/// 64-bit Mach-O header.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct MachHeader64 {
	/// Magic number (`MH_MAGIC_64`)
	pub magic: u32,
	/// CPU type
	pub cputype: i32,
	/// CPU subtype
	pub cpusubtype: i32,
	/// File type
	pub filetype: u32,
	/// Number of load commands
	pub ncmds: u32,
	/// Total size of all load commands
	pub sizeofcmds: u32,
	/// Flags
	pub flags: u32,
	/// Reserved
	pub reserved: u32,
}

impl MachHeader64 {
	/// Returns true if this is a valid 64-bit Mach-O header.
	#[inline]
	#[must_use]
	pub fn is_valid(&self) -> bool {
		self.magic == MH_MAGIC_64
	}
}

/// Generic load-command header, common prefix of every command.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct LoadCommand {
	/// Command type (`LC_*`)
	pub cmd: u32,
	/// Size of this command in bytes, including any trailing payload
	pub cmdsize: u32,
}

/// 64-bit segment command (`LC_SEGMENT_64`), followed in memory by
/// `nsects` [`Section64`] entries.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct SegmentCommand64 {
	/// `LC_SEGMENT_64`
	pub cmd: u32,
	/// Size of this command including its section headers
	pub cmdsize: u32,
	/// Segment name (NUL-padded)
	pub segname: [u8; 16],
	/// Link-time virtual address
	pub vmaddr: u64,
	/// Virtual memory size
	pub vmsize: u64,
	/// File offset of the mapped data
	pub fileoff: u64,
	/// Number of bytes mapped from the file
	pub filesize: u64,
	/// Maximum VM protection
	pub maxprot: i32,
	/// Initial VM protection
	pub initprot: i32,
	/// Number of section headers following this command
	pub nsects: u32,
	/// Flags
	pub flags: u32,
}

impl SegmentCommand64 {
	/// Segment name with NUL padding trimmed.
	#[must_use]
	pub fn name(&self) -> &[u8] {
		let end = self.segname.iter().position(|&b| b == 0).unwrap_or(self.segname.len());
		&self.segname[..end]
	}
}

/// 64-bit section header.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct Section64 {
	/// Section name (NUL-padded)
	pub sectname: [u8; 16],
	/// Owning segment name (NUL-padded)
	pub segname: [u8; 16],
	/// Link-time virtual address
	pub addr: u64,
	/// Size in bytes
	pub size: u64,
	/// File offset
	pub offset: u32,
	/// Alignment as a power of two
	pub align: u32,
	/// File offset of relocation entries
	pub reloff: u32,
	/// Number of relocation entries
	pub nreloc: u32,
	/// Flags, low byte is the section type
	pub flags: u32,
	/// For symbol-pointer sections: first index into the indirect table
	pub reserved1: u32,
	/// Reserved
	pub reserved2: u32,
	/// Reserved
	pub reserved3: u32,
}

impl Section64 {
	/// The section type, extracted from the flags word.
	#[inline]
	#[must_use]
	pub fn section_type(&self) -> u32 {
		self.flags & SECTION_TYPE
	}
}

/// Symbol-table command (`LC_SYMTAB`).
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct SymtabCommand {
	/// `LC_SYMTAB`
	pub cmd: u32,
	/// Size of this command
	pub cmdsize: u32,
	/// File offset of the symbol table
	pub symoff: u32,
	/// Number of symbol-table entries
	pub nsyms: u32,
	/// File offset of the string table
	pub stroff: u32,
	/// Size of the string table in bytes
	pub strsize: u32,
}

/// Dynamic-symbol-table command (`LC_DYSYMTAB`).
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct DysymtabCommand {
	/// `LC_DYSYMTAB`
	pub cmd: u32,
	/// Size of this command
	pub cmdsize: u32,
	/// Index of the first local symbol
	pub ilocalsym: u32,
	/// Number of local symbols
	pub nlocalsym: u32,
	/// Index of the first externally defined symbol
	pub iextdefsym: u32,
	/// Number of externally defined symbols
	pub nextdefsym: u32,
	/// Index of the first undefined symbol
	pub iundefsym: u32,
	/// Number of undefined symbols
	pub nundefsym: u32,
	/// File offset of the table of contents
	pub tocoff: u32,
	/// Number of table-of-contents entries
	pub ntoc: u32,
	/// File offset of the module table
	pub modtaboff: u32,
	/// Number of module-table entries
	pub nmodtab: u32,
	/// File offset of the referenced-symbol table
	pub extrefsymoff: u32,
	/// Number of referenced-symbol entries
	pub nextrefsyms: u32,
	/// File offset of the indirect symbol table
	pub indirectsymoff: u32,
	/// Number of indirect-symbol entries
	pub nindirectsyms: u32,
	/// File offset of external relocation entries
	pub extreloff: u32,
	/// Number of external relocation entries
	pub nextrel: u32,
	/// File offset of local relocation entries
	pub locreloff: u32,
	/// Number of local relocation entries
	pub nlocrel: u32,
}

/// 64-bit symbol-table entry (`struct nlist_64`). The first field is a
/// one-member union in the C headers; it is declared directly here.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct Nlist64 {
	/// Byte offset of the symbol name in the string table
	pub n_strx: u32,
	/// Type flags
	pub n_type: u8,
	/// Section number, or `NO_SECT`
	pub n_sect: u8,
	/// Extra description flags
	pub n_desc: u16,
	/// Symbol value (address for defined symbols)
	pub n_value: u64,
}
