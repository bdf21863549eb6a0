/// Instructions of the script virtual machine. The numbering is the on-disk
/// encoding and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Opcode {
	/// reg1 += arg2
	Add = 1,
	/// reg1 -= arg2
	Sub = 2,
	/// reg2 = reg1
	RegToReg = 3,
	/// m[MAR] = arg2 (arg1 bytes)
	WriteLit = 4,
	/// return from subroutine
	Ret = 5,
	/// reg1 = arg2
	LitToReg = 6,
	/// reg1 = m[MAR]
	MemRead = 7,
	/// m[MAR] = reg1
	MemWrite = 8,
	/// reg1 *= reg2
	MulReg = 9,
	/// reg1 /= reg2
	DivReg = 10,
	/// reg1 += reg2
	AddReg = 11,
	/// reg1 -= reg2
	SubReg = 12,
	/// bitwise reg1 & reg2
	BitAnd = 13,
	/// bitwise reg1 | reg2
	BitOr = 14,
	/// reg1 == reg2
	IsEqual = 15,
	/// reg1 != reg2
	NotEqual = 16,
	/// reg1 > reg2
	Greater = 17,
	/// reg1 < reg2
	LessThan = 18,
	/// reg1 >= reg2
	Gte = 19,
	/// reg1 <= reg2
	Lte = 20,
	/// reg1 && reg2
	And = 21,
	/// reg1 || reg2
	Or = 22,
	/// jump to subroutine at reg1
	Call = 23,
	/// reg1 = m[MAR] (1 byte)
	MemReadB = 24,
	/// reg1 = m[MAR] (2 bytes)
	MemReadW = 25,
	/// m[MAR] = reg1 (1 byte)
	MemWriteB = 26,
	/// m[MAR] = reg1 (2 bytes)
	MemWriteW = 27,
	/// jump if AX == 0
	Jz = 28,
	/// m[sp] = reg1; sp += 4
	PushReg = 29,
	/// sp -= 4; reg1 = m[sp]
	PopReg = 30,
	/// jump by arg1
	Jmp = 31,
	/// reg1 *= arg2
	Mul = 32,
	/// call external (imported) function reg1
	CallExt = 33,
	/// push reg1 onto the real stack
	PushReal = 34,
	/// drop arg1 entries from the real stack
	SubRealStack = 35,
	/// debug line number
	LineNum = 36,
	/// call a script function of another instance at reg1
	CallAs = 37,
	/// current relative address
	ThisBase = 38,
	/// number of parameters passed to the next external call
	NumFuncArgs = 39,
	/// reg1 %= reg2
	ModReg = 40,
	/// reg1 ^= reg2
	XorReg = 41,
	/// reg1 = !reg1
	NotReg = 42,
	/// reg1 <<= reg2
	ShiftLeft = 43,
	/// reg1 >>= reg2
	ShiftRight = 44,
	/// next call is a member call on object reg1
	CallObj = 45,
	/// check reg1 is between 0 and arg2
	CheckBounds = 46,
	/// m[MAR] = reg1 (managed pointer)
	MemWritePtr = 47,
	/// reg1 = m[MAR] (managed pointer)
	MemReadPtr = 48,
	/// m[MAR] = 0 (release managed pointer)
	MemZeroPtr = 49,
	/// m[MAR] = reg1 (without releasing the old value)
	MemInitPtr = 50,
	/// MAR = SP - arg1
	LoadSpOffs = 51,
	/// error if MAR is null
	CheckNull = 52,
	/// float reg1 += arg2
	FAdd = 53,
	/// float reg1 -= arg2
	FSub = 54,
	/// float reg1 *= reg2
	FMulReg = 55,
	/// float reg1 /= reg2
	FDivReg = 56,
	/// float reg1 += reg2
	FAddReg = 57,
	/// float reg1 -= reg2
	FSubReg = 58,
	/// float reg1 > reg2
	FGreater = 59,
	/// float reg1 < reg2
	FLessThan = 60,
	/// float reg1 >= reg2
	FGte = 61,
	/// float reg1 <= reg2
	FLte = 62,
	/// m[MAR] = 0 (arg1 bytes)
	ZeroMemory = 63,
	/// reg1 = new String(reg1)
	CreateString = 64,
	/// string compare reg1 == reg2
	StringsEqual = 65,
	/// string compare reg1 != reg2
	StringsNotEq = 66,
	/// error if reg1 is null
	CheckNullReg = 67,
	/// no loop checking in this function
	LoopCheckOff = 68,
	/// m[MAR] = 0 (no dispose)
	MemZeroPtrNd = 69,
	/// jump if AX != 0
	Jnz = 70,
	/// check reg1 is within the dynamic array at MAR
	DynamicBounds = 71,
	/// reg1 = new array of reg1 elements of arg2 bytes, arg3 = managed
	NewArray = 72,
	/// reg1 = new object of arg2 bytes
	NewUserObject = 73,
}

impl Opcode {
	#[rustfmt::skip]
	const ALL: [Opcode; 73] = {
		use Opcode::*;
		[
			Add, Sub, RegToReg, WriteLit, Ret, LitToReg, MemRead, MemWrite, MulReg, DivReg,
			AddReg, SubReg, BitAnd, BitOr, IsEqual, NotEqual, Greater, LessThan, Gte, Lte,
			And, Or, Call, MemReadB, MemReadW, MemWriteB, MemWriteW, Jz, PushReg, PopReg,
			Jmp, Mul, CallExt, PushReal, SubRealStack, LineNum, CallAs, ThisBase, NumFuncArgs, ModReg,
			XorReg, NotReg, ShiftLeft, ShiftRight, CallObj, CheckBounds, MemWritePtr, MemReadPtr, MemZeroPtr, MemInitPtr,
			LoadSpOffs, CheckNull, FAdd, FSub, FMulReg, FDivReg, FAddReg, FSubReg, FGreater, FLessThan,
			FGte, FLte, ZeroMemory, CreateString, StringsEqual, StringsNotEq, CheckNullReg, LoopCheckOff, MemZeroPtrNd, Jnz,
			DynamicBounds, NewArray, NewUserObject,
		]
	};

	/// Decode an instruction cell.
	pub fn from_code(code: i32) -> Option<Self> {
		usize::try_from(code).ok().and_then(|c| c.checked_sub(1)).and_then(|i| Self::ALL.get(i).copied())
	}

	/// Number of operand cells following the instruction cell.
	pub fn arity(self) -> usize {
		use Opcode::*;
		match self {
			Ret | CheckNull | LoopCheckOff | MemZeroPtr | MemZeroPtrNd => 0,
			WriteLit | Add | Sub | RegToReg | LitToReg | MulReg | DivReg | AddReg | SubReg | BitAnd | BitOr
			| IsEqual | NotEqual | Greater | LessThan | Gte | Lte | And | Or | Mul | ModReg | XorReg
			| ShiftLeft | ShiftRight | CheckBounds | FAdd | FSub | FMulReg | FDivReg | FAddReg | FSubReg
			| FGreater | FLessThan | FGte | FLte | StringsEqual | StringsNotEq | NewUserObject => 2,
			NewArray => 3,
			_ => 1,
		}
	}

	/// Assembler mnemonic.
	pub fn mnemonic(self) -> &'static str {
		use Opcode::*;
		#[rustfmt::skip]
		let name = match self {
			Add => "add", Sub => "sub", RegToReg => "mov", WriteLit => "memwritelit", Ret => "ret",
			LitToReg => "mov", MemRead => "memread", MemWrite => "memwrite", MulReg => "mul", DivReg => "div",
			AddReg => "add", SubReg => "sub", BitAnd => "and", BitOr => "or", IsEqual => "cmpeq",
			NotEqual => "cmpne", Greater => "gt", LessThan => "lt", Gte => "gte", Lte => "lte",
			And => "land", Or => "lor", Call => "call", MemReadB => "memread.b", MemReadW => "memread.w",
			MemWriteB => "memwrite.b", MemWriteW => "memwrite.w", Jz => "jz", PushReg => "push", PopReg => "pop",
			Jmp => "jmp", Mul => "mul", CallExt => "farcall", PushReal => "farpush", SubRealStack => "farsubsp",
			LineNum => "sourceline", CallAs => "callscr", ThisBase => "thisaddr", NumFuncArgs => "setfuncargs",
			ModReg => "mod", XorReg => "xor", NotReg => "not", ShiftLeft => "shl", ShiftRight => "shr",
			CallObj => "callobj", CheckBounds => "checkbounds", MemWritePtr => "memwrite.ptr",
			MemReadPtr => "memread.ptr", MemZeroPtr => "memwrite.ptr.0", MemInitPtr => "meminit.ptr",
			LoadSpOffs => "load.sp.offs", CheckNull => "checknull.ptr", FAdd => "f.add", FSub => "f.sub",
			FMulReg => "f.mul", FDivReg => "f.div", FAddReg => "f.add", FSubReg => "f.sub", FGreater => "f.gt",
			FLessThan => "f.lt", FGte => "f.gte", FLte => "f.lte", ZeroMemory => "zeromem",
			CreateString => "newstring", StringsEqual => "strcmp", StringsNotEq => "strnotcmp",
			CheckNullReg => "checknull", LoopCheckOff => "loopcheckoff", MemZeroPtrNd => "memwrite.ptr.0.nd",
			Jnz => "jnz", DynamicBounds => "dynamicbounds", NewArray => "newarray", NewUserObject => "newuserobject",
		};
		name
	}

	/// Whether operand `index` names a register.
	pub fn operand_is_register(self, index: usize) -> bool {
		use Opcode::*;
		match self {
			RegToReg | MulReg | DivReg | AddReg | SubReg | BitAnd | BitOr | IsEqual | NotEqual | Greater | LessThan
			| Gte | Lte | And | Or | ModReg | XorReg | ShiftLeft | ShiftRight | FMulReg | FDivReg | FAddReg
			| FSubReg | FGreater | FLessThan | FGte | FLte | StringsEqual | StringsNotEq => true,
			Add | Sub | LitToReg | Mul | CheckBounds | FAdd | FSub | NewArray | NewUserObject => index == 0,
			MemRead | MemWrite | Call | MemReadB | MemReadW | MemWriteB | MemWriteW | PushReg | PopReg | CallExt
			| PushReal | CallAs | NotReg | CallObj | MemWritePtr | MemReadPtr | MemInitPtr | CreateString
			| CheckNullReg | DynamicBounds => index == 0,
			_ => false,
		}
	}
}

/// Registers of the script virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Register {
	/// Stack pointer
	Sp = 1,
	/// Memory address register
	Mar = 2,
	/// General purpose, holds expression results
	Ax = 3,
	/// General purpose, right operand of binary operators
	Bx = 4,
	Cx = 5,
	/// Object pointer for member function calls
	Op = 6,
	Dx = 7,
}

impl Register {
	pub fn from_code(code: i32) -> Option<Self> {
		use Register::*;
		[Sp, Mar, Ax, Bx, Cx, Op, Dx].get(usize::try_from(code).ok()?.checked_sub(1)?).copied()
	}

	pub fn name(self) -> &'static str {
		use Register::*;
		match self {
			Sp => "sp",
			Mar => "mar",
			Ax => "ax",
			Bx => "bx",
			Cx => "cx",
			Op => "op",
			Dx => "dx",
		}
	}
}

/// What a relocation entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FixupKind {
	/// Offset into the global data segment, which holds the literal pool too
	GlobalData = 1,
	/// Code offset of a function of this script
	Function = 2,
	/// Offset into a string table
	String = 3,
	/// Index into the import table
	Import = 4,
	/// Global data cell holding a pointer into global data
	DataData = 5,
	/// Stack address
	Stack = 6,
}

impl FixupKind {
	pub fn name(self) -> &'static str {
		use FixupKind::*;
		match self {
			GlobalData => "global",
			Function => "function",
			String => "string",
			Import => "import",
			DataData => "datadata",
			Stack => "stack",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decode_round_trips_numbering() {
		for code in 1..=73 {
			let op = Opcode::from_code(code).unwrap();
			assert_eq!(op as i32, code);
		}
		assert_eq!(Opcode::from_code(0), None);
		assert_eq!(Opcode::from_code(74), None);
		assert_eq!(Opcode::from_code(-3), None);
	}

	#[test]
	fn arities() {
		assert_eq!(Opcode::Ret.arity(), 0);
		assert_eq!(Opcode::PushReg.arity(), 1);
		assert_eq!(Opcode::LitToReg.arity(), 2);
		assert_eq!(Opcode::NewArray.arity(), 3);
	}
}
