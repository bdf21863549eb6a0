//! The compiled script object handed to the loader.
//!
//! Code is a flat list of `i32` cells: an instruction cell followed by its
//! operands. Every operand whose final value is only known at load time
//! (addresses of globals, of literal pool entries, of imports or of script
//! functions) is listed in `fixups`.
mod opcode;

use std::fmt::{self, Display};

pub use opcode::*;
use rustc_hash::FxHashMap;

/// A relocation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixup {
	/// Index of the code cell to relocate
	pub offset: usize,
	pub kind:   FixupKind,
}

/// A function defined in the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFunction {
	pub name:     String,
	/// Code offset of the first instruction
	pub offset:   usize,
	pub num_args: usize,
}

/// What an exported name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
	Function,
	Data,
}

/// An entry of the export table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
	/// Functions are exported as `name$<number of arguments>`
	pub name:   String,
	pub kind:   ExportKind,
	/// Code offset for functions, global data offset for data
	pub offset: usize,
}

/// Where a source section starts in the code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionStart {
	pub name:   String,
	pub offset: usize,
}

/// Bytecode, relocations and symbol tables of one compile.
#[derive(Debug, Default, Clone)]
pub struct CompiledScript {
	pub code:        Vec<i32>,
	pub fixups:      Vec<Fixup>,
	/// Global variables followed by literal pool entries, in allocation order
	pub global_data: Vec<u8>,
	pub functions:   Vec<ScriptFunction>,
	/// Import names, an emptied slot is an import that got defined locally
	pub imports:     Vec<String>,
	pub exports:     Vec<Export>,
	pub sections:    Vec<SectionStart>,
	/// Compile time stack depth in bytes, relative to the function's entry
	pub(crate) cur_sp: i32,
	/// Line number waiting to be emitted before the next instruction
	pending_line:    Option<usize>,
	last_line:       Option<usize>,
	literal_pool:    FxHashMap<Vec<u8>, usize>,
}

impl CompiledScript {
	pub fn new() -> Self { Self::default() }

	/// Index of the next code cell.
	pub fn codesize(&self) -> usize { self.code.len() }

	/// Emit an instruction and its operands.
	pub fn write_cmd(&mut self, op: Opcode, args: &[i32]) {
		debug_assert_eq!(op.arity(), args.len(), "{op:?}");
		self.flush_line_number();
		self.code.push(op as i32);
		self.code.extend_from_slice(args);
	}

	pub fn write_cmd0(&mut self, op: Opcode) { self.write_cmd(op, &[]) }

	pub fn write_cmd1(&mut self, op: Opcode, arg: i32) { self.write_cmd(op, &[arg]) }

	pub fn write_cmd2(&mut self, op: Opcode, arg1: i32, arg2: i32) { self.write_cmd(op, &[arg1, arg2]) }

	/// Register to register instruction.
	pub fn write_reg2(&mut self, op: Opcode, reg1: Register, reg2: Register) {
		self.write_cmd2(op, reg1 as i32, reg2 as i32)
	}

	/// Load a literal into a register.
	pub fn write_lit(&mut self, reg: Register, value: i32) { self.write_cmd2(Opcode::LitToReg, reg as i32, value) }

	pub fn push_reg(&mut self, reg: Register) {
		self.write_cmd1(Opcode::PushReg, reg as i32);
		self.cur_sp += 4;
	}

	pub fn pop_reg(&mut self, reg: Register) {
		self.write_cmd1(Opcode::PopReg, reg as i32);
		self.cur_sp -= 4;
	}

	/// Release `bytes` of stack.
	pub fn free_stack(&mut self, bytes: i32) {
		if bytes > 0 {
			self.write_cmd2(Opcode::Sub, Register::Sp as i32, bytes);
			self.cur_sp -= bytes;
		}
	}

	/// Point MAR at a stack location recorded at depth `offset`.
	pub fn load_sp_offs(&mut self, offset: i32) { self.write_cmd1(Opcode::LoadSpOffs, self.cur_sp - offset) }

	/// Record a relocation for the code cell at `offset`.
	pub fn add_fixup(&mut self, offset: usize, kind: FixupKind) { self.fixups.push(Fixup { offset, kind }) }

	/// Record a relocation for the last emitted cell.
	pub fn fixup_previous(&mut self, kind: FixupKind) {
		if let Some(offset) = self.codesize().checked_sub(1) {
			self.add_fixup(offset, kind)
		}
	}

	/// Emit a jump with a placeholder distance, return the operand's index.
	pub fn write_jump(&mut self, op: Opcode) -> usize {
		self.write_cmd1(op, 0);
		self.codesize() - 1
	}

	/// Emit a jump to `target`.
	pub fn write_jump_to(&mut self, op: Opcode, target: usize) {
		let operand = self.write_jump(op);
		self.patch_jump(operand, target);
	}

	/// Point the jump whose operand is at `operand` at `target`.
	/// Distances are relative to the cell after the operand.
	pub fn patch_jump(&mut self, operand: usize, target: usize) {
		self.code[operand] = target as i32 - (operand as i32 + 1);
	}

	/// Overwrite an operand cell.
	pub fn patch(&mut self, offset: usize, value: i32) { self.code[offset] = value; }

	/// Reserve `size` bytes of global data, zeroed unless `init` is given.
	pub fn add_global(&mut self, size: usize, init: Option<&[u8]>) -> usize {
		let offset = self.global_data.len();
		let mut data = vec![0; size];
		if let Some(init) = init {
			let len = init.len().min(size);
			data[..len].copy_from_slice(&init[..len]);
		}
		self.global_data.extend(data);
		offset
	}

	/// Place a literal in the pool, identical literals share one entry.
	pub fn add_literal(&mut self, bytes: &[u8]) -> usize {
		if let Some(&offset) = self.literal_pool.get(bytes) {
			return offset;
		}
		let offset = self.add_global(bytes.len(), Some(bytes));
		self.literal_pool.insert(bytes.to_vec(), offset);
		offset
	}

	/// Pool a string literal with its terminating NUL.
	pub fn add_string_literal(&mut self, text: &str) -> usize {
		let mut bytes = text.as_bytes().to_vec();
		bytes.push(0);
		self.add_literal(&bytes)
	}

	pub fn add_float_literal(&mut self, value: f32) -> usize { self.add_literal(&value.to_le_bytes()) }

	/// Add an import, returning its index.
	pub fn add_import(&mut self, name: &str) -> usize {
		if let Some(index) = self.imports.iter().position(|i| i == name) {
			return index;
		}
		self.imports.push(name.to_string());
		self.imports.len() - 1
	}

	/// Empty an import slot once its name gets defined locally.
	pub fn remove_import(&mut self, index: usize) {
		if let Some(import) = self.imports.get_mut(index) {
			import.clear();
		}
	}

	/// Register a function starting at the current code offset.
	pub fn add_function(&mut self, name: &str, num_args: usize) -> usize {
		let offset = self.codesize();
		self.functions.push(ScriptFunction { name: name.to_string(), offset, num_args });
		offset
	}

	pub fn add_export(&mut self, name: String, kind: ExportKind, offset: usize) {
		if !self.exports.iter().any(|e| e.name == name) {
			self.exports.push(Export { name, kind, offset });
		}
	}

	pub fn start_new_section(&mut self, name: &str) {
		self.sections.push(SectionStart { name: name.to_string(), offset: self.codesize() });
	}

	/// Emit a line marker before the next instruction if `line` is new.
	pub fn set_line(&mut self, line: usize) {
		self.pending_line = (self.last_line != Some(line)).then_some(line);
	}

	fn flush_line_number(&mut self) {
		if let Some(line) = self.pending_line.take() {
			self.last_line = Some(line);
			self.code.push(Opcode::LineNum as i32);
			self.code.push(line as i32);
		}
	}

	/// Forget the last line so the next function starts with a marker.
	pub(crate) fn reset_line(&mut self) { self.last_line = None; }
}

impl Display for CompiledScript {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let fixups: FxHashMap<usize, FixupKind> = self.fixups.iter().map(|f| (f.offset, f.kind)).collect();
		let mut sections = self.sections.iter().peekable();
		let mut pos = 0;
		while pos < self.code.len() {
			while let Some(section) = sections.next_if(|s| s.offset <= pos) {
				writeln!(f, "; section {:?}", section.name)?;
			}
			for function in self.functions.iter().filter(|func| func.offset == pos) {
				writeln!(f, "{}:", function.name)?;
			}
			let Some(op) = Opcode::from_code(self.code[pos]) else {
				writeln!(f, "{pos:6}  .data {}", self.code[pos])?;
				pos += 1;
				continue;
			};
			write!(f, "{pos:6}  {:<16}", op.mnemonic())?;
			for i in 0..op.arity() {
				let cell = pos + 1 + i;
				let Some(&value) = self.code.get(cell) else {
					break;
				};
				let separator = if i == 0 { "" } else { ", " };
				match Register::from_code(value).filter(|_| op.operand_is_register(i)) {
					Some(reg) => write!(f, "{separator}{}", reg.name())?,
					None => write!(f, "{separator}{value}")?,
				}
				if let Some(kind) = fixups.get(&cell) {
					write!(f, " [{}]", kind.name())?;
				}
			}
			writeln!(f)?;
			pos += 1 + op.arity();
		}

		if !self.imports.is_empty() {
			writeln!(f, "; imports")?;
			for (i, import) in self.imports.iter().enumerate().filter(|(_, name)| !name.is_empty()) {
				writeln!(f, "{i:6}  {import}")?;
			}
		}
		if !self.exports.is_empty() {
			writeln!(f, "; exports")?;
			for export in &self.exports {
				writeln!(f, "{:6}  {} ({:?})", export.offset, export.name, export.kind)?;
			}
		}
		writeln!(f, "; {} bytes of global data, {} fixups", self.global_data.len(), self.fixups.len())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn push_and_pop_track_stack_depth() {
		let mut scrip = CompiledScript::new();
		scrip.push_reg(Register::Ax);
		scrip.push_reg(Register::Bx);
		assert_eq!(scrip.cur_sp, 8);
		scrip.load_sp_offs(0);
		assert_eq!(&scrip.code[4..], [Opcode::LoadSpOffs as i32, 8]);
		scrip.pop_reg(Register::Bx);
		scrip.free_stack(4);
		assert_eq!(scrip.cur_sp, 0);
	}

	#[test]
	fn jumps_are_relative_to_the_next_cell() {
		let mut scrip = CompiledScript::new();
		let start = scrip.codesize();
		let forward = scrip.write_jump(Opcode::Jz);
		scrip.write_lit(Register::Ax, 1);
		scrip.patch_jump(forward, scrip.codesize());
		scrip.write_jump_to(Opcode::Jmp, start);
		assert_eq!(scrip.code, [Opcode::Jz as i32, 3, Opcode::LitToReg as i32, 3, 1, Opcode::Jmp as i32, -7]);
	}

	#[test]
	fn literals_are_pooled_once() {
		let mut scrip = CompiledScript::new();
		let global = scrip.add_global(4, None);
		let hello = scrip.add_string_literal("Hello");
		let pi = scrip.add_float_literal(3.5);
		assert_eq!((global, hello, pi), (0, 4, 10));
		assert_eq!(scrip.add_string_literal("Hello"), hello);
		assert_eq!(&scrip.global_data[4..10], b"Hello\0");
		assert_eq!(&scrip.global_data[10..], 3.5f32.to_le_bytes());
	}

	#[test]
	fn line_numbers_precede_the_next_instruction() {
		let mut scrip = CompiledScript::new();
		scrip.set_line(3);
		scrip.set_line(4);
		scrip.write_cmd0(Opcode::Ret);
		scrip.set_line(4);
		scrip.write_cmd0(Opcode::Ret);
		assert_eq!(scrip.code, [Opcode::LineNum as i32, 4, Opcode::Ret as i32, Opcode::Ret as i32]);
	}

	#[test]
	fn listing_names_registers_and_fixups() {
		let mut scrip = CompiledScript::new();
		scrip.start_new_section("Main");
		scrip.add_function("main", 0);
		scrip.write_lit(Register::Mar, 0);
		scrip.fixup_previous(FixupKind::GlobalData);
		scrip.write_cmd1(Opcode::MemRead, Register::Ax as i32);
		let listing = scrip.to_string();
		assert!(listing.contains("; section \"Main\""));
		assert!(listing.contains("main:"));
		assert!(listing.contains("mar, 0 [global]"));
		assert!(listing.lines().any(|l| l.contains("memread") && l.ends_with("ax")));
	}
}
