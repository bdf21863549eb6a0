use bitflags::bitflags;

use super::Symbol;
use crate::compiled_script::Opcode;

bitflags! {
	/// Qualifiers written in front of a declaration, in any order.
	#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct Qualifiers: u16 {
		const IMPORT = 1 << 0;
		const READONLY = 1 << 1;
		const STATIC = 1 << 2;
		const PROTECTED = 1 << 3;
		const ATTRIBUTE = 1 << 4;
		const WRITEPROTECTED = 1 << 5;
		const MANAGED = 1 << 6;
		const AUTOPTR = 1 << 7;
		const BUILTIN = 1 << 8;
		const INTERNALSTRING = 1 << 9;
		const CONST = 1 << 10;
		const NOLOOPCHECK = 1 << 11;
	}
}

bitflags! {
	/// Facts about a symbol established while parsing.
	#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct SymbolFlags: u16 {
		/// The vartype is a struct
		const STRUCT = 1 << 0;
		/// Instances live on the managed heap and are held by pointer
		const MANAGED = 1 << 1;
		/// Declarations of this type are pointers without writing `*`
		const AUTOPTR = 1 << 2;
		/// Cannot be instantiated by scripts
		const BUILTIN = 1 << 3;
		/// The vartype is an enum
		const ENUM = 1 << 4;
		/// Defined by another script or the engine
		const IMPORTED = 1 << 5;
		/// Used by the code generated so far
		const ACCESSED = 1 << 6;
		/// Function takes `...`
		const VARIADIC = 1 << 7;
		/// Belongs to a struct
		const STRUCT_MEMBER = 1 << 8;
		/// Function body has been compiled
		const HAS_BODY = 1 << 9;
		/// Attribute read and written with an index
		const INDEXED = 1 << 10;
	}
}

bitflags! {
	#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct VartypeFlags: u8 {
		const POINTER = 1 << 0;
		const DYNARRAY = 1 << 1;
		const CONST = 1 << 2;
	}
}

/// Reserved words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
	Attribute,
	Autoptr,
	Break,
	Builtin,
	Case,
	Const,
	Continue,
	Default,
	Do,
	Else,
	Enum,
	Export,
	Extends,
	For,
	If,
	Import,
	InternalString,
	Managed,
	New,
	NoLoopCheck,
	Protected,
	ReadOnly,
	Return,
	Static,
	Struct,
	Switch,
	This,
	While,
	WriteProtected,
}

impl Keyword {
	/// The qualifier this keyword stands for, if it is one.
	pub fn qualifier(self) -> Option<Qualifiers> {
		use Keyword::*;
		let qualifier = match self {
			Attribute => Qualifiers::ATTRIBUTE,
			Autoptr => Qualifiers::AUTOPTR,
			Builtin => Qualifiers::BUILTIN,
			Const => Qualifiers::CONST,
			Import => Qualifiers::IMPORT,
			InternalString => Qualifiers::INTERNALSTRING,
			Managed => Qualifiers::MANAGED,
			NoLoopCheck => Qualifiers::NOLOOPCHECK,
			Protected => Qualifiers::PROTECTED,
			ReadOnly => Qualifiers::READONLY,
			Static => Qualifiers::STATIC,
			WriteProtected => Qualifiers::WRITEPROTECTED,
			_ => return None,
		};
		Some(qualifier)
	}
}

/// Operators usable inside expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
	Not,
	BitNeg,
	Mul,
	Div,
	Mod,
	Add,
	Sub,
	Shl,
	Shr,
	BitAnd,
	BitOr,
	Xor,
	Eq,
	Ne,
	Gt,
	Lt,
	Ge,
	Le,
	And,
	Or,
}

impl Operator {
	/// Binding strength, 1 binds tightest.
	pub fn priority(self) -> u8 {
		use Operator::*;
		match self {
			Not | BitNeg => 1,
			Mul | Div | Mod => 3,
			Add | Sub => 5,
			Shl | Shr => 7,
			BitAnd => 9,
			BitOr | Xor => 10,
			Eq | Ne | Gt | Lt | Ge | Le => 12,
			And => 18,
			Or => 19,
		}
	}

	/// Operators that only ever take one operand.
	pub fn is_unary_only(self) -> bool { matches!(self, Operator::Not | Operator::BitNeg) }

	pub fn is_comparison(self) -> bool {
		use Operator::*;
		matches!(self, Eq | Ne | Gt | Lt | Ge | Le)
	}

	pub fn is_logical(self) -> bool { matches!(self, Operator::And | Operator::Or) }

	/// Instruction combining AX and BX for int-like operands.
	pub fn int_opcode(self) -> Option<Opcode> {
		use Operator::*;
		let op = match self {
			Not => Opcode::NotReg,
			BitNeg => return None,
			Mul => Opcode::MulReg,
			Div => Opcode::DivReg,
			Mod => Opcode::ModReg,
			Add => Opcode::AddReg,
			Sub => Opcode::SubReg,
			Shl => Opcode::ShiftLeft,
			Shr => Opcode::ShiftRight,
			BitAnd => Opcode::BitAnd,
			BitOr => Opcode::BitOr,
			Xor => Opcode::XorReg,
			Eq => Opcode::IsEqual,
			Ne => Opcode::NotEqual,
			Gt => Opcode::Greater,
			Lt => Opcode::LessThan,
			Ge => Opcode::Gte,
			Le => Opcode::Lte,
			And => Opcode::And,
			Or => Opcode::Or,
		};
		Some(op)
	}

	/// Instruction combining AX and BX for float operands.
	pub fn float_opcode(self) -> Option<Opcode> {
		use Operator::*;
		let op = match self {
			Mul => Opcode::FMulReg,
			Div => Opcode::FDivReg,
			Add => Opcode::FAddReg,
			Sub => Opcode::FSubReg,
			Gt => Opcode::FGreater,
			Lt => Opcode::FLessThan,
			Ge => Opcode::FGte,
			Le => Opcode::FLte,
			Eq => Opcode::IsEqual,
			Ne => Opcode::NotEqual,
			_ => return None,
		};
		Some(op)
	}
}

/// Punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
	OpenParen,
	CloseParen,
	OpenBracket,
	CloseBracket,
	OpenBrace,
	CloseBrace,
	Comma,
	Semicolon,
	Dot,
	ScopeRes,
	Colon,
	Question,
	Ellipsis,
	Arrow,
}

/// What a symbol currently denotes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
	/// Interned but not declared yet
	#[default]
	NoType,
	Keyword(Keyword),
	Operator(Operator),
	Assign,
	/// `+=` and friends
	CompoundAssign(Operator),
	/// `++` and `--`
	Crement(Operator),
	Punct(Punct),
	Vartype,
	/// Forward declared struct
	UndefinedStruct,
	GlobalVar,
	LocalVar,
	Function,
	StructComponent,
	Attribute,
	/// Enum member
	Constant,
	LiteralInt,
	LiteralFloat,
	LiteralString,
	Null,
}

/// Type of a variable, parameter, member or expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Vartype {
	/// The type name symbol
	pub base:  Symbol,
	pub flags: VartypeFlags,
	/// Element count of a fixed size array
	pub array: Option<usize>,
}

impl Vartype {
	pub fn new(base: Symbol) -> Self { Self { base, flags: VartypeFlags::empty(), array: None } }

	pub fn pointer(mut self) -> Self {
		self.flags |= VartypeFlags::POINTER;
		self
	}

	pub fn dynarray(mut self) -> Self {
		self.flags |= VartypeFlags::DYNARRAY;
		self
	}

	pub fn constant(mut self) -> Self {
		self.flags |= VartypeFlags::CONST;
		self
	}

	pub fn with_array(mut self, len: usize) -> Self {
		self.array = Some(len);
		self
	}

	pub fn is_pointer(&self) -> bool { self.flags.contains(VartypeFlags::POINTER) }

	pub fn is_dynarray(&self) -> bool { self.flags.contains(VartypeFlags::DYNARRAY) }

	pub fn is_const(&self) -> bool { self.flags.contains(VartypeFlags::CONST) }

	pub fn is_array(&self) -> bool { self.array.is_some() }

	/// Held through a managed handle: pointers and dynamic arrays.
	pub fn is_handle(&self) -> bool { self.is_dynarray() || (self.is_pointer() && self.array.is_none()) }

	/// Type of one element of a (dynamic) array.
	pub fn element(&self) -> Vartype {
		let mut element = self.clone();
		element.array = None;
		element.flags.remove(VartypeFlags::DYNARRAY);
		element
	}

	pub fn without_const(&self) -> Vartype {
		let mut vartype = self.clone();
		vartype.flags.remove(VartypeFlags::CONST);
		vartype
	}
}

/// Signature of a function. Parameter arrays run in parallel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
	pub return_type:    Vartype,
	pub param_types:    Vec<Vartype>,
	/// Default value of each parameter, floats as their bit pattern
	pub param_defaults: Vec<Option<i32>>,
	pub param_names:    Vec<Option<Symbol>>,
	/// Parameters the body must not modify
	pub param_readonly: Vec<bool>,
	pub variadic:       bool,
}

impl FunctionSignature {
	pub fn new(return_type: Vartype) -> Self {
		Self {
			return_type,
			param_types: vec![],
			param_defaults: vec![],
			param_names: vec![],
			param_readonly: vec![],
			variadic: false,
		}
	}

	pub fn num_params(&self) -> usize { self.param_types.len() }

	pub fn param_has_default(&self, index: usize) -> bool { self.param_default_value(index).is_some() }

	pub fn param_default_value(&self, index: usize) -> Option<i32> { self.param_defaults.get(index).copied().flatten() }

	/// Number of arguments a call must supply.
	pub fn required_args(&self) -> usize {
		self.param_defaults.iter().rposition(Option::is_none).map_or(0, |i| i + 1)
	}

	/// Same parameter and return types, names and defaults aside.
	pub fn same_shape(&self, other: &FunctionSignature) -> bool {
		self.return_type == other.return_type && self.param_types == other.param_types && self.variadic == other.variadic
	}
}

/// Everything known about one symbol.
#[derive(Debug, Clone, Default)]
pub struct SymbolEntry {
	pub name:         String,
	pub kind:         SymbolKind,
	pub decl_section: usize,
	pub decl_line:    usize,
	pub flags:        SymbolFlags,
	pub qualifiers:   Qualifiers,
	pub vartype:      Option<Vartype>,
	/// Byte size; for vartypes the size of one instance
	pub size:         usize,
	/// Global data offset, stack depth, member offset or code offset
	pub offset:       i32,
	pub import_index: Option<usize>,
	/// Value of an enum constant
	pub value:        i32,
	/// Struct a member belongs to
	pub owner:        Option<Symbol>,
	/// Parent of a struct
	pub extends:      Option<Symbol>,
	/// Nesting depth a local variable was declared at
	pub scope_level:  usize,
	pub signature:    Option<FunctionSignature>,
	/// Accessor functions of an attribute
	pub getter:       Option<Symbol>,
	pub setter:       Option<Symbol>,
}

impl SymbolEntry {
	pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self { Self { name: name.into(), kind, ..Self::default() } }

	/// Forget everything but the name, e.g. when a local goes out of scope.
	pub fn clear(&mut self) {
		let name = std::mem::take(&mut self.name);
		*self = Self::new(name, SymbolKind::NoType);
	}

	pub fn is_struct(&self) -> bool { self.flags.contains(SymbolFlags::STRUCT) }

	pub fn is_managed(&self) -> bool { self.flags.contains(SymbolFlags::MANAGED) }

	pub fn is_imported(&self) -> bool { self.flags.contains(SymbolFlags::IMPORTED) }
}
