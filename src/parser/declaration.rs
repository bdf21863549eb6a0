use log::debug;

use super::{Parser, PendingExport};
use crate::{
	compiler::CompileOptions,
	error::parser::{ParseErrorType::*, ParserError},
	symbol_table::{
		FunctionSignature, Keyword, Operator, Punct, Qualifiers, Symbol, SymbolFlags, SymbolKind, SymbolTable, Vartype,
	},
};

impl<'a> Parser<'a> {
	/// One declaration outside of functions.
	pub(super) fn parse_top_level(&mut self) -> Result<(), ParserError> {
		let qualifiers = self.parse_qualifiers();
		let symbol = self.src.get_next();
		match self.sym.kind(symbol) {
			SymbolKind::Keyword(Keyword::Struct) => self.parse_struct(qualifiers),
			SymbolKind::Keyword(Keyword::Enum) => {
				self.check_qualifiers(qualifiers, Qualifiers::empty(), "in front of 'enum'")?;
				self.parse_enum()
			}
			SymbolKind::Keyword(Keyword::Export) => {
				self.check_qualifiers(qualifiers, Qualifiers::empty(), "in front of 'export'")?;
				self.parse_export()
			}
			SymbolKind::Vartype | SymbolKind::UndefinedStruct => self.parse_vartype_declaration(symbol, qualifiers),
			SymbolKind::Punct(Punct::Semicolon) if qualifiers.is_empty() => Ok(()),
			SymbolKind::NoType => Err(self.error(ExpectedVartype(self.name(symbol)))),
			_ => Err(self.unexpected(symbol)),
		}
	}

	/// The type of a declaration, its name already consumed: an optional `*`
	/// and an optional `[]`.
	pub(super) fn parse_vartype(&mut self, base: Symbol, constant: bool) -> Result<Vartype, ParserError> {
		if base == self.sym.well_known.string && !constant && !self.options.contains(CompileOptions::OLD_STRINGS) {
			return Err(self.error(OldStringsDisabled));
		}
		let mut vartype = Vartype::new(base);
		if constant {
			vartype = vartype.constant();
		}
		let explicit_pointer = self.peek_kind() == SymbolKind::Operator(Operator::Mul);
		if explicit_pointer {
			self.src.get_next();
		}
		if explicit_pointer || self.sym[base].flags.contains(SymbolFlags::AUTOPTR) {
			if !self.sym.is_managed_type(base) {
				return Err(self.error(PointerToNonManaged(self.name(base))));
			}
			vartype = vartype.pointer();
		}
		let cursor = self.src.cursor();
		if self.sym.is_punct(self.src.get(cursor), Punct::OpenBracket)
			&& self.sym.is_punct(self.src.get(cursor + 1), Punct::CloseBracket)
		{
			self.src.set_cursor(cursor + 2);
			vartype = vartype.dynarray();
		}
		Ok(vartype)
	}

	/// `[]` or `[size]` after a variable name.
	pub(super) fn parse_array_suffix(&mut self, vartype: &mut Vartype) -> Result<(), ParserError> {
		if !self.next_if(Punct::OpenBracket) {
			return Ok(());
		}
		if self.next_if(Punct::CloseBracket) {
			*vartype = vartype.clone().dynarray();
			return Ok(());
		}
		let size = self.src.peek_next();
		if vartype.is_dynarray() {
			return Err(self.unexpected(size));
		}
		if !matches!(self.sym.kind(size), SymbolKind::LiteralInt | SymbolKind::Constant) {
			return Err(self.error(ArraySize(self.name(size))));
		}
		let len = self.parse_constant_int()?;
		let len = usize::try_from(len).ok().filter(|&n| n > 0).ok_or_else(|| self.error(ArraySize(len.to_string())))?;
		self.expect(Punct::CloseBracket, "']'")?;
		*vartype = vartype.clone().with_array(len);
		Ok(())
	}

	/// Declaration starting with a type: functions and global variables.
	fn parse_vartype_declaration(&mut self, type_sym: Symbol, qualifiers: Qualifiers) -> Result<(), ParserError> {
		let vartype = self.parse_vartype(type_sym, qualifiers.contains(Qualifiers::CONST))?;
		let name = self.src.get_next();
		if self.next_if(Punct::ScopeRes) {
			let function = self.parse_member_function_name(name)?;
			return self.parse_function(function, vartype, qualifiers);
		}
		if self.peek_is(Punct::OpenParen) {
			return self.parse_function(name, vartype, qualifiers);
		}
		self.parse_globals(name, vartype, qualifiers)
	}

	/// `Struct::name` of a member function defined outside of its struct.
	fn parse_member_function_name(&mut self, strct: Symbol) -> Result<Symbol, ParserError> {
		let member = self.src.get_next();
		let bare = self.name(member);
		if !self.sym.is_struct_type(strct) {
			return Err(self.error(NotStruct(self.name(strct))));
		}
		let function = self
			.sym
			.find(&SymbolTable::mangle(self.sym.name(strct), &bare))
			.filter(|&f| self.sym.kind(f) == SymbolKind::Function && self.sym[f].owner == Some(strct));
		function.ok_or_else(|| self.error(MemberFunctionOwner { function: bare, strct: self.name(strct) }))
	}

	fn parse_globals(&mut self, first: Symbol, vartype: Vartype, qualifiers: Qualifiers) -> Result<(), ParserError> {
		self.check_qualifiers(qualifiers, Qualifiers::IMPORT | Qualifiers::READONLY, "in front of a variable")?;
		let mut name = first;
		loop {
			self.expect_identifier(name)?;
			let mut vartype = vartype.clone();
			self.parse_array_suffix(&mut vartype)?;
			self.check_variable_type(&vartype)?;
			self.declare_global(name, vartype, qualifiers)?;

			let next = self.src.get_next();
			match self.sym.kind(next) {
				SymbolKind::Punct(Punct::Comma) => name = self.src.get_next(),
				SymbolKind::Punct(Punct::Semicolon) => return Ok(()),
				_ => return Err(self.expected("',' or ';'", next)),
			}
		}
	}

	fn declare_global(&mut self, name: Symbol, vartype: Vartype, qualifiers: Qualifiers) -> Result<(), ParserError> {
		let import = qualifiers.contains(Qualifiers::IMPORT);
		let display = self.name(name);
		match self.sym.kind(name) {
			SymbolKind::NoType => {}
			SymbolKind::GlobalVar if self.sym[name].is_imported() => {
				if import {
					return Err(self.error(AlreadyImported(display)));
				}
				if self.sym[name].vartype.as_ref() != Some(&vartype) {
					return Err(self.error(ImportMismatch(display)));
				}
				self.override_import(name)?;
			}
			_ => return Err(self.error(AlreadyDefined(display))),
		}

		let size = self.variable_size(&vartype, name)?;
		let initializer = self.peek_kind() == SymbolKind::Assign;
		if import {
			if initializer {
				return Err(self.error(ImportInitializer(display)));
			}
			let index = self.scrip.add_import(&display);
			let entry = &mut self.sym[name];
			entry.import_index = Some(index);
			entry.flags |= SymbolFlags::IMPORTED;
		} else {
			let init = if initializer {
				self.src.get_next();
				Some(self.parse_global_initializer(&vartype, &display)?)
			} else {
				None
			};
			let total = self.scrip.global_data.len() + size as usize;
			if i32::try_from(total).is_err() {
				return Err(self.error(VariableTooLarge { name: display, size: size as usize }));
			}
			let offset = self.scrip.add_global(size as usize, init.as_deref());
			self.sym[name].offset = offset as i32;
		}

		let entry = &mut self.sym[name];
		entry.kind = SymbolKind::GlobalVar;
		entry.vartype = Some(vartype);
		entry.qualifiers = qualifiers;
		entry.size = size as usize;
		self.declare_here(name);
		Ok(())
	}

	fn parse_struct(&mut self, qualifiers: Qualifiers) -> Result<(), ParserError> {
		self.check_qualifiers(
			qualifiers,
			Qualifiers::MANAGED | Qualifiers::AUTOPTR | Qualifiers::BUILTIN | Qualifiers::INTERNALSTRING,
			"in front of 'struct'",
		)?;
		let strct = self.src.get_next();
		self.expect_identifier(strct)?;
		if !matches!(self.sym.kind(strct), SymbolKind::NoType | SymbolKind::UndefinedStruct) {
			return Err(self.error(AlreadyDefined(self.name(strct))));
		}
		let mut flags = SymbolFlags::STRUCT;
		flags.set(SymbolFlags::MANAGED, qualifiers.contains(Qualifiers::MANAGED));
		flags.set(SymbolFlags::AUTOPTR, qualifiers.contains(Qualifiers::AUTOPTR));
		flags.set(SymbolFlags::BUILTIN, qualifiers.contains(Qualifiers::BUILTIN));

		if self.next_if(Punct::Semicolon) {
			if !qualifiers.contains(Qualifiers::MANAGED) {
				return Err(self.error(ForwardDeclarationNotManaged(self.name(strct))));
			}
			if self.sym.kind(strct) == SymbolKind::NoType {
				let entry = &mut self.sym[strct];
				entry.kind = SymbolKind::UndefinedStruct;
				entry.flags = flags;
				self.declare_here(strct);
			}
			return Ok(());
		}

		debug!("Declaring struct {}", self.sym.name(strct));
		let entry = &mut self.sym[strct];
		entry.kind = SymbolKind::Vartype;
		entry.flags = flags;
		entry.size = 0;
		self.declare_here(strct);
		if qualifiers.contains(Qualifiers::INTERNALSTRING) {
			self.sym.string_struct = Some(strct);
		}

		let mut size = 0;
		if self.sym.is_keyword(self.src.peek_next(), Keyword::Extends) {
			self.src.get_next();
			let parent = self.src.get_next();
			if self.sym.kind(parent) != SymbolKind::Vartype || !self.sym.is_struct_type(parent) {
				return Err(self.error(MustExtendStruct));
			}
			if parent == strct || self.sym.is_managed_type(parent) != self.sym.is_managed_type(strct) {
				return Err(self.error(InvalidExtends));
			}
			self.sym[strct].extends = Some(parent);
			size = self.sym[parent].size;
		}

		self.expect(Punct::OpenBrace, "'{'")?;
		while !self.peek_is(Punct::CloseBrace) {
			if self.src.reached_eof() {
				return Err(self.expected("'}'", Symbol::EOF));
			}
			self.parse_struct_member(strct, &mut size)?;
		}
		self.src.get_next();
		self.sym[strct].size = size;
		self.expect(Punct::Semicolon, "';' after the struct declaration")
	}

	/// One member declaration, possibly naming several members.
	fn parse_struct_member(&mut self, strct: Symbol, size: &mut usize) -> Result<(), ParserError> {
		let qualifiers = self.parse_qualifiers();
		self.check_qualifiers(
			qualifiers,
			Qualifiers::IMPORT
				| Qualifiers::READONLY
				| Qualifiers::STATIC
				| Qualifiers::PROTECTED
				| Qualifiers::ATTRIBUTE
				| Qualifiers::WRITEPROTECTED,
			"inside a struct",
		)?;
		if qualifiers.contains(Qualifiers::PROTECTED | Qualifiers::WRITEPROTECTED) {
			return Err(self.error(ProtectedAndWriteprotected));
		}
		let type_sym = self.src.get_next();
		if !self.sym.is_vartype(type_sym) {
			return Err(self.error(ExpectedVartype(self.name(type_sym))));
		}
		if type_sym == self.sym.well_known.string {
			return Err(self.error(StringInStruct));
		}
		let vartype = self.parse_vartype(type_sym, false)?;
		let prefix = SymbolTable::mangle(self.sym.name(strct), "");

		loop {
			let member = self.src.get_next();
			let Some(bare) = self.sym.name(member).strip_prefix(&prefix).map(str::to_string) else {
				return Err(self.expected("a member name", member));
			};
			if self.sym.kind(member) != SymbolKind::NoType {
				return Err(self.error(AlreadyDefined(bare)));
			}
			if let Some(parent) = self.sym[strct].extends
				&& self.sym.find_member(parent, &bare).is_some()
			{
				return Err(self.error(AlreadyDefined(bare)));
			}

			if self.peek_is(Punct::OpenParen) {
				if qualifiers.contains(Qualifiers::ATTRIBUTE) {
					return Err(self.error(AttributeFunction));
				}
				return self.parse_member_function_declaration(strct, member, vartype, qualifiers);
			}
			if qualifiers.contains(Qualifiers::ATTRIBUTE) {
				self.declare_attribute(strct, member, &bare, vartype.clone(), qualifiers)?;
			} else {
				self.declare_member_variable(strct, member, vartype.clone(), qualifiers, size)?;
			}
			self.declare_here(member);

			let next = self.src.get_next();
			match self.sym.kind(next) {
				SymbolKind::Punct(Punct::Comma) => continue,
				SymbolKind::Punct(Punct::Semicolon) => return Ok(()),
				_ => return Err(self.expected("',' or ';'", next)),
			}
		}
	}

	fn declare_member_variable(
		&mut self,
		strct: Symbol,
		member: Symbol,
		mut vartype: Vartype,
		qualifiers: Qualifiers,
		size: &mut usize,
	) -> Result<(), ParserError> {
		if qualifiers.contains(Qualifiers::IMPORT) {
			return Err(self.error(ImportMemberVariable));
		}
		if qualifiers.contains(Qualifiers::STATIC) {
			return Err(self.error(StaticMemberVariable));
		}
		self.parse_array_suffix(&mut vartype)?;
		if self.sym.is_struct_type(vartype.base) && !vartype.is_pointer() && !vartype.is_dynarray() {
			return Err(self.error(StructMemberByValue));
		}
		self.check_variable_type(&vartype)?;

		let member_size = self.variable_size(&vartype, member)?;
		let offset = i32::try_from(*size).ok().filter(|offset| offset.checked_add(member_size).is_some());
		let Some(offset) = offset else {
			return Err(self.error(VariableTooLarge { name: self.name(strct), size: *size + member_size as usize }));
		};
		let member_size = member_size as usize;
		let entry = &mut self.sym[member];
		entry.kind = SymbolKind::StructComponent;
		entry.vartype = Some(vartype);
		entry.offset = offset;
		entry.size = member_size;
		entry.owner = Some(strct);
		entry.qualifiers = qualifiers;
		entry.flags = SymbolFlags::STRUCT_MEMBER;
		*size += member_size;
		Ok(())
	}

	/// An attribute is backed by imported accessor functions `get_X` and,
	/// unless it is read-only, `set_X`. Indexed attributes use `geti_X` and
	/// `seti_X`, which take the index first.
	fn declare_attribute(
		&mut self,
		strct: Symbol,
		member: Symbol,
		bare: &str,
		vartype: Vartype,
		qualifiers: Qualifiers,
	) -> Result<(), ParserError> {
		let indexed = self.next_if(Punct::OpenBracket);
		if indexed {
			self.expect(Punct::CloseBracket, "']'")?;
		}
		self.check_variable_type(&vartype)?;
		let (get, set) = if indexed { ("geti_", "seti_") } else { ("get_", "set_") };
		let index_params = if indexed { vec![self.sym.int_type()] } else { vec![] };
		let accessor_qualifiers = qualifiers & Qualifiers::STATIC;

		let mut getter = FunctionSignature::new(vartype.clone());
		getter.param_types = index_params.clone();
		let getter = self.declare_accessor(strct, &format!("{get}{bare}"), getter, accessor_qualifiers)?;
		let setter = if qualifiers.contains(Qualifiers::READONLY) {
			None
		} else {
			let mut setter = FunctionSignature::new(self.sym.void_type());
			setter.param_types = index_params;
			setter.param_types.push(vartype.clone());
			Some(self.declare_accessor(strct, &format!("{set}{bare}"), setter, accessor_qualifiers)?)
		};

		let entry = &mut self.sym[member];
		entry.kind = SymbolKind::Attribute;
		entry.vartype = Some(vartype);
		entry.owner = Some(strct);
		entry.qualifiers = qualifiers;
		entry.flags = SymbolFlags::STRUCT_MEMBER;
		entry.flags.set(SymbolFlags::INDEXED, indexed);
		entry.getter = Some(getter);
		entry.setter = setter;
		Ok(())
	}

	fn declare_accessor(
		&mut self,
		strct: Symbol,
		name: &str,
		mut signature: FunctionSignature,
		qualifiers: Qualifiers,
	) -> Result<Symbol, ParserError> {
		let mangled = SymbolTable::mangle(self.sym.name(strct), name);
		let function = self.sym.find_or_add(&mangled);
		if self.sym.kind(function) != SymbolKind::NoType {
			return Err(self.error(AlreadyDefined(name.to_string())));
		}
		signature.param_defaults = vec![None; signature.num_params()];
		signature.param_names = vec![None; signature.num_params()];
		let index = self.scrip.add_import(&super::function::import_name(&mangled, &signature));

		let entry = &mut self.sym[function];
		entry.kind = SymbolKind::Function;
		entry.owner = Some(strct);
		entry.qualifiers = qualifiers | Qualifiers::IMPORT;
		entry.flags = SymbolFlags::STRUCT_MEMBER | SymbolFlags::IMPORTED;
		entry.import_index = Some(index);
		entry.signature = Some(signature);
		self.declare_here(function);
		Ok(function)
	}

	/// Member function declared inside its struct, the cursor is at `(`.
	fn parse_member_function_declaration(
		&mut self,
		strct: Symbol,
		function: Symbol,
		return_type: Vartype,
		qualifiers: Qualifiers,
	) -> Result<(), ParserError> {
		self.check_return_type(&return_type)?;
		let signature = self.parse_parameters(return_type)?;
		if self.peek_is(Punct::OpenBrace) {
			return Err(self.error(BodyInStruct));
		}
		self.expect(Punct::Semicolon, "';'")?;

		let name = self.name(function);
		let import = qualifiers.contains(Qualifiers::IMPORT);
		let import_index = import.then(|| self.scrip.add_import(&super::function::import_name(&name, &signature)));
		let entry = &mut self.sym[function];
		entry.kind = SymbolKind::Function;
		entry.owner = Some(strct);
		entry.qualifiers = qualifiers;
		entry.flags = SymbolFlags::STRUCT_MEMBER;
		entry.flags.set(SymbolFlags::IMPORTED, import);
		entry.flags.set(SymbolFlags::VARIADIC, signature.variadic);
		entry.import_index = import_index;
		entry.signature = Some(signature);
		self.declare_here(function);
		Ok(())
	}

	/// Enumerators count up from 1 unless given a value.
	fn parse_enum(&mut self) -> Result<(), ParserError> {
		let name = self.src.get_next();
		self.expect_identifier(name)?;
		if self.sym.kind(name) != SymbolKind::NoType {
			return Err(self.error(AlreadyDefined(self.name(name))));
		}
		let entry = &mut self.sym[name];
		entry.kind = SymbolKind::Vartype;
		entry.size = 4;
		entry.flags = SymbolFlags::ENUM;
		self.declare_here(name);
		let vartype = Vartype::new(name);

		self.expect(Punct::OpenBrace, "'{'")?;
		let mut value: i32 = 0;
		loop {
			let item = self.src.get_next();
			if self.sym.is_punct(item, Punct::CloseBrace) {
				break;
			}
			self.expect_identifier(item)?;
			if self.sym.kind(item) != SymbolKind::NoType {
				return Err(self.error(AlreadyDefined(self.name(item))));
			}
			value = if self.peek_kind() == SymbolKind::Assign {
				self.src.get_next();
				self.parse_constant_int()?
			} else {
				value.checked_add(1).ok_or_else(|| self.error(EnumOverflow(self.name(item))))?
			};
			let entry = &mut self.sym[item];
			entry.kind = SymbolKind::Constant;
			entry.value = value;
			entry.vartype = Some(vartype.clone());
			self.declare_here(item);

			let next = self.src.get_next();
			match self.sym.kind(next) {
				SymbolKind::Punct(Punct::Comma) => continue,
				SymbolKind::Punct(Punct::CloseBrace) => break,
				_ => return Err(self.expected("',' or '}'", next)),
			}
		}
		self.expect(Punct::Semicolon, "';' after the enum declaration")
	}

	fn parse_export(&mut self) -> Result<(), ParserError> {
		loop {
			let symbol = self.src.get_next();
			self.expect_identifier(symbol)?;
			self.exports.push(PendingExport {
				symbol,
				line: self.src.lineno(),
				section: self.src.section().to_string(),
			});
			let next = self.src.get_next();
			match self.sym.kind(next) {
				SymbolKind::Punct(Punct::Comma) => continue,
				SymbolKind::Punct(Punct::Semicolon) => return Ok(()),
				_ => return Err(self.expected("',' or ';'", next)),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::super::tests::{compile, compile_with, message};
	use crate::{
		compiler::CompileOptions,
		symbol_table::{SymbolKind, SymbolTable},
		tokenizer::tokenize,
	};

	fn declare(source: &str) -> SymbolTable {
		let mut sym = SymbolTable::new();
		let tokens = tokenize(&mut sym, "", source).unwrap();
		super::Parser::new(&mut sym, &tokens, CompileOptions::empty()).parse().unwrap();
		sym
	}

	#[test]
	fn enum_values_count_up_from_one() {
		let sym = declare("enum Bear { polar, grizzly = 5, black, popularity = -3, brown };");
		let value = |name: &str| sym[sym.find(name).unwrap()].value;
		assert_eq!(value("polar"), 1);
		assert_eq!(value("grizzly"), 5);
		assert_eq!(value("black"), 6);
		assert_eq!(value("popularity"), -3);
		assert_eq!(value("brown"), -2);
		assert_eq!(sym.kind(sym.find("Bear").unwrap()), SymbolKind::Vartype);
	}

	#[test]
	fn enum_values_at_the_limits() {
		let sym = declare("enum E { a = 2147483647, b = -2147483648, c = 0xFFFFFFFF };");
		assert_eq!(sym[sym.find("a").unwrap()].value, i32::MAX);
		assert_eq!(sym[sym.find("b").unwrap()].value, i32::MIN);
		assert_eq!(sym[sym.find("c").unwrap()].value as u32, 4294967295);

		assert_eq!(message("enum E { a = 2147483647, b };"), "Overflow when calculating the value of enum member 'b'");
		assert_eq!(message("enum E { a = 2147483648 };"), "Could not parse integer symbol '2147483648' because of overflow.");
		assert_eq!(message("enum E { a = 0x1FFFFFFFF };"), "Could not parse integer symbol '0x1FFFFFFFF' because of overflow.");
	}

	#[test]
	fn struct_layout() {
		let sym = declare("struct P { int x; short y; char z; float w[3]; };");
		let member = |name: &str| &sym[sym.find(name).unwrap()];
		assert_eq!(member("P::x").offset, 0);
		assert_eq!(member("P::y").offset, 4);
		assert_eq!(member("P::z").offset, 6);
		assert_eq!(member("P::w").offset, 7);
		assert_eq!(member("P").size, 19);
		assert_eq!(member("P::w").owner, sym.find("P"));
	}

	#[test]
	fn derived_structs_start_after_their_parent() {
		let sym = declare("managed struct A { int a; };\nmanaged struct B extends A { int b; };");
		let b = sym.find("B").unwrap();
		assert_eq!(sym[b].size, 8);
		assert_eq!(sym[sym.find("B::b").unwrap()].offset, 4);
		assert_eq!(sym.find_member(b, "a"), sym.find("A::a"));
		assert_eq!(
			message("managed struct A { int a; };\nmanaged struct B extends A { int a; };"),
			"'a' is already defined"
		);
		assert_eq!(message("struct A { int a; };\nmanaged struct B extends A { };"), "Invalid use of 'extends'");
		assert_eq!(message("managed struct B extends int { };"), "Must extend a struct type");
	}

	#[test]
	fn qualifiers_in_any_order() {
		for source in [
			"struct S { import static readonly attribute int A; };",
			"struct S { readonly static import attribute int A; };",
			"struct S { attribute static readonly import static int A; };",
		] {
			let sym = declare(source);
			let attribute = sym.find("S::A").unwrap();
			assert_eq!(sym.kind(attribute), SymbolKind::Attribute);
			assert!(sym[attribute].setter.is_none());
			assert!(sym.find("S::get_A").is_some());
		}
	}

	#[test]
	fn attributes_declare_accessors() {
		let scrip = compile("managed struct S { import attribute int Size; import readonly attribute int Items[]; };").unwrap();
		assert_eq!(scrip.imports, ["S::get_Size^0", "S::set_Size^1", "S::geti_Items^1"]);
	}

	#[test]
	fn struct_member_errors() {
		assert_eq!(message("struct S { protected writeprotected int x; };"), "Field cannot be both protected and write-protected.");
		assert_eq!(
			compile_with("struct S { string s; };", CompileOptions::OLD_STRINGS).unwrap_err().to_string(),
			"line 1: 'string' not allowed inside struct"
		);
		assert_eq!(message("struct T { int a; };\nstruct S { T t; };"), "Member variable cannot be struct");
		assert_eq!(message("struct S { Undeclared x; };"), "Expected a variable type instead of 'Undeclared'");
		assert_eq!(message("struct S { int f() { } };"), "Cannot define a function body inside a struct");
		assert_eq!(message("struct S { import int x; };"), "Struct member variables cannot be imported");
	}

	#[test]
	fn forward_declared_structs() {
		assert!(compile("managed struct F;\nF *f;\nmanaged struct F { int x; };").is_ok());
		assert_eq!(message("struct F;"), "Forward-declared struct 'F' must be 'managed'");
		assert_eq!(message("managed struct F;\nF f[];"), "cannot pass non-pointer struct array");
	}

	#[test]
	fn globals_and_initializers() {
		let scrip = compile("int a = 5;\nshort b = -2;\nchar c = 'A';\nfloat d = 1.5;\nint e[3];").unwrap();
		let mut expected = vec![5, 0, 0, 0, 0xFE, 0xFF, 65];
		expected.extend(1.5f32.to_le_bytes());
		expected.extend([0; 12]);
		assert_eq!(scrip.global_data, expected);

		assert_eq!(message("int a = b;"), "Expected an integer constant instead of 'b'");
		assert_eq!(message("import int a = 5;"), "Imported variable 'a' cannot be initialized");
		assert_eq!(message("int a;\nint a;"), "'a' is already defined");
		assert_eq!(message("int a[0];"), "Expected a positive integer array size instead of '0'");
	}

	#[test]
	fn imported_globals() {
		let scrip = compile("import int counter;\nimport float speed;").unwrap();
		assert_eq!(scrip.imports, ["counter", "speed"]);
		assert!(scrip.global_data.is_empty());

		let scrip = compile("import int counter;\nint counter = 3;").unwrap();
		assert_eq!(scrip.imports, [""]);
		assert_eq!(scrip.global_data, [3, 0, 0, 0]);
		assert_eq!(message("import int counter;\nfloat counter;"), "The type of 'counter' differs from its import declaration");
	}

	#[test]
	fn managed_types_need_pointers() {
		assert_eq!(
			message("managed struct M { };\nM m;"),
			"Cannot declare a variable of managed type 'M', use a pointer instead"
		);
		assert_eq!(message("struct S { };\nS *s;"), "Cannot declare a pointer to non-managed type 'S'");
		assert_eq!(message("string s;"), "Type 'string' is no longer supported; use 'String' instead");
		assert!(compile_with("string s;", CompileOptions::OLD_STRINGS).is_ok());
	}

	#[test]
	fn member_functions_defined_outside() {
		let scrip = compile("struct S { int x; import int Get(); int Twice(); };\nint S::Twice() { return this.x * 2; }").unwrap();
		assert_eq!(scrip.functions[0].name, "S::Twice");
		assert_eq!(scrip.imports, ["S::Get^0"]);
		assert_eq!(message("struct S { };\nint S::Nope() { return 0; }"), "'Nope' has not been declared as a member function of 'S'");
	}

	#[test]
	fn variables_must_fit_in_memory() {
		assert_eq!(message("int a[600000000];"), "'a' is too large (2400000000 bytes, max. is 2147483647)");
		assert_eq!(
			message("struct S { int a[400000000]; int b[400000000]; };"),
			"'S' is too large (3200000000 bytes, max. is 2147483647)"
		);
		assert_eq!(message("void f() { int a[600000000]; }"), "'a' is too large (2400000000 bytes, max. is 2147483647)");
		assert_eq!(
			message("void f() { int a[300000000]; int b[300000000]; }"),
			"'b' is too large (1200000000 bytes, max. is 2147483647)"
		);
	}
}
