//! Variables, array elements, struct members and attributes.
use anyhow::Context;

use super::Parser;
use crate::{
	compiled_script::{FixupKind, Opcode, Register},
	error::parser::{ParseErrorType::*, ParserError},
	symbol_table::{Keyword, Punct, Qualifiers, Symbol, SymbolFlags, SymbolKind, SymbolTable, Vartype},
	token_stream::SrcList,
};

/// Where the value named by an access chain lives once its code has run.
#[derive(Debug, Clone)]
pub(super) enum Location {
	/// MAR points at the value
	Memory { vartype: Vartype, readonly: bool, name: Symbol },
	/// The value is in AX
	Value(Vartype),
	/// Attribute of the object in MAR, or a static one. The index of an
	/// indexed attribute is in DX.
	Attribute { attribute: Symbol, object: bool },
	/// A struct named for a static member
	Type(Symbol),
}

impl<'a> Parser<'a> {
	/// Bare name of a possibly mangled symbol.
	pub(super) fn member_name(&self, symbol: Symbol) -> String { SymbolTable::unmangle(self.sym.name(symbol)).to_string() }

	/// Whether the function being compiled belongs to `strct` or to a struct
	/// derived from it.
	fn inside_member_of(&self, strct: Symbol) -> bool {
		self.function.as_ref().and_then(|f| f.owner).is_some_and(|owner| self.sym.is_derived_from(owner, strct))
	}

	/// Emit the code that locates `expr`, e.g. `a`, `list[i].items[2]` or
	/// `player.Say("hi")`.
	pub(super) fn access(&mut self, expr: &SrcList<'a>) -> Result<Location, ParserError> {
		if expr.is_empty() {
			return Err(self.error(ExpectedExpression));
		}
		let first = expr[0];
		let mut pos = 1;
		let mut location = match self.sym.kind(first) {
			SymbolKind::GlobalVar => self.access_global(first)?,
			SymbolKind::LocalVar => self.access_local(first)?,
			SymbolKind::Keyword(Keyword::This) => {
				let this_type = self.function.as_ref().and_then(|f| f.this_type);
				let this_type = this_type.ok_or_else(|| self.error(ThisOutsideMember))?;
				self.scrip.write_reg2(Opcode::RegToReg, Register::Op, Register::Mar);
				Location::Memory { vartype: Vartype::new(this_type), readonly: true, name: first }
			}
			SymbolKind::Function => Location::Value(self.call_function(expr, &mut pos, first, false)?),
			SymbolKind::Vartype if self.sym.is_struct_type(first) => Location::Type(first),
			SymbolKind::Punct(Punct::OpenParen) => {
				let close = self.find_closer(expr, 0).ok_or_else(|| self.expected("')'", Symbol::EOF))?;
				pos = close + 1;
				Location::Value(self.parse_expression(expr.sub_view(1, close))?)
			}
			SymbolKind::NoType if !first.is_eof() => return Err(self.error(Undefined(self.name(first)))),
			_ => return Err(self.unexpected(first)),
		};

		while pos < expr.len() {
			let symbol = expr[pos];
			match self.sym.kind(symbol) {
				SymbolKind::Punct(Punct::OpenBracket) => {
					let close = self.find_closer(expr, pos).ok_or_else(|| self.expected("']'", Symbol::EOF))?;
					location = self.index_into(location, expr.sub_view(pos + 1, close))?;
					pos = close + 1;
				}
				SymbolKind::Punct(Punct::Dot) => {
					let member = expr[pos + 1];
					pos += 2;
					location = self.member_access(location, member, expr, &mut pos)?;
				}
				_ => return Err(self.unexpected(symbol)),
			}
		}
		Ok(location)
	}

	fn access_global(&mut self, symbol: Symbol) -> Result<Location, ParserError> {
		let entry = &mut self.sym[symbol];
		entry.flags |= SymbolFlags::ACCESSED;
		let vartype = entry.vartype.clone().context("variable without a type")?;
		let readonly = entry.is_imported() && entry.qualifiers.contains(Qualifiers::READONLY);
		match entry.import_index.filter(|_| entry.is_imported()) {
			Some(index) => {
				self.scrip.write_lit(Register::Mar, index as i32);
				self.scrip.fixup_previous(FixupKind::Import);
			}
			None => {
				let offset = entry.offset;
				self.scrip.write_lit(Register::Mar, offset);
				self.scrip.fixup_previous(FixupKind::GlobalData);
			}
		}
		let readonly = readonly || (vartype.is_const() && !self.sym.is_old_string(&vartype));
		Ok(Location::Memory { vartype, readonly, name: symbol })
	}

	fn access_local(&mut self, symbol: Symbol) -> Result<Location, ParserError> {
		let entry = &self.sym[symbol];
		let vartype = entry.vartype.clone().context("variable without a type")?;
		let offset = entry.offset;
		let declared_readonly = entry.qualifiers.contains(Qualifiers::READONLY);
		self.scrip.load_sp_offs(offset);
		// old string parameters hold the address of the string
		if offset < 0 && self.sym.is_old_string(&vartype) {
			self.scrip.write_cmd1(Opcode::MemRead, Register::Mar as i32);
		}
		let readonly = declared_readonly || (vartype.is_const() && !self.sym.is_old_string(&vartype));
		Ok(Location::Memory { vartype, readonly, name: symbol })
	}

	/// Point MAR at the object a handle refers to.
	fn dereference(&mut self, location: &Location) {
		if let Location::Value(_) = location {
			self.scrip.write_reg2(Opcode::RegToReg, Register::Ax, Register::Mar);
		} else {
			self.scrip.write_cmd1(Opcode::MemReadPtr, Register::Mar as i32);
		}
		self.scrip.write_cmd0(Opcode::CheckNull);
	}

	fn index_into(&mut self, location: Location, index: SrcList<'a>) -> Result<Location, ParserError> {
		let (vartype, readonly, name) = match &location {
			Location::Memory { vartype, readonly, name } => (vartype.clone(), *readonly, *name),
			Location::Value(vartype) => (vartype.clone(), false, Symbol::EOF),
			Location::Attribute { .. } => {
				let vartype = self.read_location(&location)?;
				return self.index_into(Location::Value(vartype), index);
			}
			Location::Type(strct) => return Err(self.error(NotArray(self.name(*strct)))),
		};
		let fixed = matches!(location, Location::Memory { .. }) && vartype.is_array();
		if !fixed && !vartype.is_dynarray() {
			let shown = if name.is_eof() { self.sym.vartype_name(&vartype) } else { self.member_name(name) };
			return Err(self.error(NotArray(shown)));
		}
		if !fixed {
			self.dereference(&location);
		}

		self.scrip.push_reg(Register::Mar);
		let index_type = self.parse_expression(index)?;
		let int = self.sym.int_type();
		self.convert(&index_type, &int)?;
		self.scrip.pop_reg(Register::Mar);

		let element = vartype.element();
		let element_size = self.sym.size_of(&element) as i32;
		if let Some(len) = vartype.array.filter(|_| fixed) {
			self.scrip.write_cmd2(Opcode::CheckBounds, Register::Ax as i32, len as i32);
		}
		if element_size != 1 {
			self.scrip.write_cmd2(Opcode::Mul, Register::Ax as i32, element_size);
		}
		if !fixed {
			self.scrip.write_cmd1(Opcode::DynamicBounds, Register::Ax as i32);
		}
		self.scrip.write_reg2(Opcode::AddReg, Register::Mar, Register::Ax);
		Ok(Location::Memory { vartype: element, readonly, name })
	}

	fn member_access(
		&mut self,
		location: Location,
		member: Symbol,
		expr: &SrcList<'a>,
		pos: &mut usize,
	) -> Result<Location, ParserError> {
		let (strct, object) = match &location {
			Location::Memory { vartype, .. } | Location::Value(vartype)
				if vartype.is_pointer() && !vartype.is_dynarray() && !vartype.is_array() =>
			{
				self.dereference(&location);
				(vartype.base, true)
			}
			Location::Memory { vartype, .. } if vartype.flags.is_empty() && !vartype.is_array() => (vartype.base, true),
			Location::Type(strct) => (*strct, false),
			Location::Memory { vartype, .. } | Location::Value(vartype) => {
				return Err(self.error(NotStruct(self.sym.vartype_name(vartype))));
			}
			// the getter runs first, its result is the next step's object
			Location::Attribute { .. } => {
				let vartype = self.read_location(&location)?;
				return self.member_access(Location::Value(vartype), member, expr, pos);
			}
		};
		if !self.sym.is_struct_type(strct) {
			return Err(self.error(NotStruct(self.name(strct))));
		}

		let bare = self.sym.name(member).to_string();
		let Some(found) = self.sym.find_member(strct, &bare) else {
			return Err(self.error(NotPublicMember { member: bare, strct: self.name(strct) }));
		};
		let entry = &self.sym[found];
		let owner = entry.owner.unwrap_or(strct);
		let qualifiers = entry.qualifiers;
		let is_static = qualifiers.contains(Qualifiers::STATIC);
		if qualifiers.contains(Qualifiers::PROTECTED) && !self.inside_member_of(owner) {
			return Err(self.error(ProtectedAccess(bare)));
		}
		if !object && !is_static {
			return Err(self.error(NonStaticThroughType { member: bare, strct: self.name(strct) }));
		}

		match entry.kind {
			SymbolKind::StructComponent => {
				let vartype = entry.vartype.clone().context("member without a type")?;
				let offset = entry.offset;
				if offset != 0 {
					self.scrip.write_cmd2(Opcode::Add, Register::Mar as i32, offset);
				}
				let readonly = qualifiers.intersects(Qualifiers::READONLY | Qualifiers::WRITEPROTECTED)
					&& !self.inside_member_of(owner);
				Ok(Location::Memory { vartype, readonly, name: found })
			}
			SymbolKind::Attribute => {
				if entry.flags.contains(SymbolFlags::INDEXED) {
					if !self.sym.is_punct(expr[*pos], Punct::OpenBracket) {
						return Err(self.expected("'[' after an indexed attribute", expr[*pos]));
					}
					let close = self.find_closer(expr, *pos).ok_or_else(|| self.expected("']'", Symbol::EOF))?;
					let index = expr.sub_view(*pos + 1, close);
					*pos = close + 1;
					self.scrip.push_reg(Register::Mar);
					let index_type = self.parse_expression(index)?;
					let int = self.sym.int_type();
					self.convert(&index_type, &int)?;
					self.scrip.write_reg2(Opcode::RegToReg, Register::Ax, Register::Dx);
					self.scrip.pop_reg(Register::Mar);
				}
				Ok(Location::Attribute { attribute: found, object: object && !is_static })
			}
			SymbolKind::Function => {
				let vartype = self.call_function(expr, pos, found, object && !is_static)?;
				Ok(Location::Value(vartype))
			}
			_ => Err(self.error(NotPublicMember { member: bare, strct: self.name(strct) })),
		}
	}

	/// Load the value at `location` into AX.
	pub(super) fn read_location(&mut self, location: &Location) -> Result<Vartype, ParserError> {
		match location {
			Location::Memory { vartype, name, .. } => {
				if vartype.is_array() {
					return Err(self.error(ArrayAsValue(self.member_name(*name))));
				}
				if self.sym.is_old_string(vartype) {
					self.scrip.write_reg2(Opcode::RegToReg, Register::Mar, Register::Ax);
					return Ok(vartype.clone());
				}
				if self.sym.is_struct_type(vartype.base) && !vartype.is_handle() {
					return Err(self.error(StructAsValue(self.name(vartype.base))));
				}
				self.read_mar_into_ax(vartype);
				Ok(vartype.clone())
			}
			Location::Value(vartype) => Ok(vartype.clone()),
			Location::Attribute { attribute, object } => {
				let entry = &self.sym[*attribute];
				let vartype = entry.vartype.clone().context("attribute without a type")?;
				let getter = entry.getter.context("attribute without a getter")?;
				self.call_accessor(*attribute, getter, *object, false)?;
				Ok(vartype)
			}
			Location::Type(strct) => Err(self.error(TypeAsValue(self.name(*strct)))),
		}
	}

	/// Call the getter or setter of an attribute. The setter's value is in
	/// AX. MAR and OP survive the call.
	pub(super) fn call_accessor(
		&mut self,
		attribute: Symbol,
		accessor: Symbol,
		object: bool,
		with_value: bool,
	) -> Result<(), ParserError> {
		let indexed = self.sym[attribute].flags.contains(SymbolFlags::INDEXED);
		let entry = &mut self.sym[accessor];
		entry.flags |= SymbolFlags::ACCESSED;
		let index = entry.import_index.context("accessor without an import")?;

		self.scrip.push_reg(Register::Op);
		self.scrip.push_reg(Register::Mar);
		let mut args = 0;
		if with_value {
			self.scrip.write_cmd1(Opcode::PushReal, Register::Ax as i32);
			args += 1;
		}
		if indexed {
			self.scrip.write_cmd1(Opcode::PushReal, Register::Dx as i32);
			args += 1;
		}
		if object {
			self.scrip.write_cmd1(Opcode::CallObj, Register::Mar as i32);
		}
		self.scrip.write_cmd1(Opcode::NumFuncArgs, args);
		self.scrip.write_lit(Register::Ax, index as i32);
		self.scrip.fixup_previous(FixupKind::Import);
		self.scrip.write_cmd1(Opcode::CallExt, Register::Ax as i32);
		if args > 0 {
			self.scrip.write_cmd1(Opcode::SubRealStack, args);
		}
		self.scrip.pop_reg(Register::Mar);
		self.scrip.pop_reg(Register::Op);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::super::tests::{compile, instructions, message, opcodes};
	use crate::compiled_script::{FixupKind, Opcode};

	const POINT: &str = "managed struct Point { int x; int y; protected int secret; writeprotected int level; import int Length(); \
	                     import static int Count(); };\n";

	#[test]
	fn globals_are_relocated() {
		let scrip = compile("int a;\nint b;\nvoid f() { b = a; }").unwrap();
		let globals: Vec<i32> =
			scrip.fixups.iter().filter(|f| f.kind == FixupKind::GlobalData).map(|f| scrip.code[f.offset]).collect();
		assert_eq!(globals, [0, 4]);
	}

	#[test]
	fn fixed_arrays_are_bounds_checked() {
		let scrip = compile("int a[10];\nvoid f() { a[3] = 1; }").unwrap();
		let checks: Vec<_> = instructions(&scrip).into_iter().filter(|(_, op, _)| *op == Opcode::CheckBounds).collect();
		assert_eq!(checks.len(), 1);
		assert_eq!(checks[0].2, [3, 10]);
		assert!(instructions(&scrip).into_iter().any(|(_, op, args)| op == Opcode::Mul && args == [3, 4]));
	}

	#[test]
	fn dynamic_arrays_are_dereferenced() {
		let scrip = compile("int a[];\nvoid f() { a = new int[5]; a[2] = 7; }").unwrap();
		let ops = opcodes(&scrip);
		assert!(ops.contains(&Opcode::NewArray));
		assert!(ops.windows(2).any(|w| w == [Opcode::MemReadPtr, Opcode::CheckNull]));
		assert!(ops.contains(&Opcode::DynamicBounds));
	}

	#[test]
	fn member_access_and_calls() {
		let source = format!("{POINT}Point *p;\nint f() {{ p.y = 2; return p.x + p.Length() + Point.Count(); }}");
		let scrip = compile(&source).unwrap();
		assert_eq!(scrip.imports, ["Point::Length^0", "Point::Count^0"]);
		assert!(instructions(&scrip).into_iter().any(|(_, op, args)| op == Opcode::Add && args == [2, 4]));
		let calls = opcodes(&scrip).iter().filter(|&&op| op == Opcode::CallObj).count();
		assert_eq!(calls, 1);
	}

	#[test]
	fn member_errors() {
		let source = |body: &str| format!("{POINT}Point *p;\nvoid f() {{ {body} }}");
		assert_eq!(
			message(&source("p.z = 1;")),
			"'z' is not a public member of 'Point'. Are you sure you spelt it correctly (remember, capital letters are \
			 important)?"
		);
		assert_eq!(message(&source("p.secret = 1;")), "Cannot access protected member 'secret'");
		assert_eq!(message(&source("p.level = 1;")), "'level' is read-only");
		assert_eq!(message(&source("int n = Point.Length();")), "Must have an instance of 'Point' to access the non-static member 'Length'");
		assert_eq!(message(&source("int n = p;")), "Type mismatch: cannot convert 'Point*' to 'int'");
		assert_eq!(message(&source("p[1] = 1;")), "'p' is not an array");
		assert_eq!(message(&source("int n = Point;")), "The type 'Point' cannot be used as a value");
	}

	#[test]
	fn members_write_protected_from_outside_only() {
		let source = format!("{POINT}int Point::Length() {{ this.level = 3; return this.secret; }}");
		let source = source.replace("import int Length();", "int Length();");
		assert!(compile(&source).is_ok());
		assert_eq!(message("void f() { this.x = 1; }"), "'this' can only be used in non-static member functions");
	}

	#[test]
	fn attributes_call_their_accessors() {
		let source = "managed struct S { import attribute int Size; import readonly attribute int Items[]; };\nS *s;\n\
		              void f() { s.Size += s.Items[2]; }";
		let scrip = compile(source).unwrap();
		let imports: Vec<i32> =
			scrip.fixups.iter().filter(|f| f.kind == FixupKind::Import).map(|f| scrip.code[f.offset]).collect();
		// geti_Items, then get_Size and set_Size
		assert_eq!(imports, [2, 0, 1]);
		assert_eq!(message("managed struct S { import readonly attribute int Items[]; };\nS *s;\nvoid f() { s.Items[1] = 2; }"), "'Items' is read-only");
	}

	#[test]
	fn attribute_getters_run_inside_chains() {
		let import_indexes = |source: &str| {
			let scrip = compile(source).unwrap();
			let indexes: Vec<i32> =
				scrip.fixups.iter().filter(|f| f.kind == FixupKind::Import).map(|f| scrip.code[f.offset]).collect();
			(indexes, opcodes(&scrip))
		};
		let rooms = "managed struct Room { import attribute int W; };\nmanaged struct Character { import attribute Room *Where; \
		             };\nCharacter *c;\n";

		// get_Where, then get_W on the room it returned
		let (indexes, ops) = import_indexes(&format!("{rooms}int f() {{ return c.Where.W; }}"));
		assert_eq!(indexes, [2, 0]);
		assert_eq!(ops.iter().filter(|&&op| op == Opcode::CallObj).count(), 2);
		let (indexes, _) = import_indexes(&format!("{rooms}void f() {{ c.Where.W = 5; }}"));
		assert_eq!(indexes, [2, 1]);

		let trees = "managed struct Leaf { int Arr[]; };\nmanaged struct Tree { import readonly attribute Leaf *Child; };\n\
		             Tree *t;\n";
		let (indexes, ops) = import_indexes(&format!("{trees}int f() {{ t.Child.Arr[0] = 4; return t.Child.Arr[0]; }}"));
		assert_eq!(indexes, [0, 0]);
		assert!(ops.contains(&Opcode::DynamicBounds));

		assert_eq!(message(&format!("{rooms}int f() {{ return c.Where.W.X; }}")), "'int' is not a struct, it has no members");
		assert_eq!(message(&format!("{rooms}int f() {{ return c.Where[1]; }}")), "'Room*' is not an array");
	}
}
