use anyhow::Context;
use log::debug;

use super::{FunctionContext, Parser, PendingCall};
use crate::{
	compiled_script::{FixupKind, Opcode, Register},
	compiler::CompileOptions,
	error::parser::{ParseErrorType::*, ParserError},
	symbol_table::{FunctionSignature, Punct, Qualifiers, Symbol, SymbolFlags, SymbolKind, Vartype},
	token_stream::SrcList,
};

/// Argument count as it appears in import and export names, variadic
/// functions count 100 extra.
pub(super) fn arity(signature: &FunctionSignature) -> usize {
	signature.num_params() + if signature.variadic { 100 } else { 0 }
}

/// `name^arity`, the name a function is imported under.
pub(super) fn import_name(name: &str, signature: &FunctionSignature) -> String {
	format!("{name}^{}", arity(signature))
}

impl<'a> Parser<'a> {
	/// Function declaration or definition, the cursor is at `(`.
	pub(super) fn parse_function(
		&mut self,
		function: Symbol,
		return_type: Vartype,
		qualifiers: Qualifiers,
	) -> Result<(), ParserError> {
		self.check_qualifiers(
			qualifiers,
			Qualifiers::IMPORT | Qualifiers::STATIC | Qualifiers::CONST | Qualifiers::NOLOOPCHECK,
			"in front of a function",
		)?;
		self.expect_identifier(function)?;
		self.check_return_type(&return_type)?;
		let signature = self.parse_parameters(return_type)?;
		let has_body = self.peek_is(Punct::OpenBrace);
		if !has_body {
			self.expect(Punct::Semicolon, "'{' or ';'")?;
		}
		let name = self.name(function);
		let import = qualifiers.contains(Qualifiers::IMPORT);
		if import && has_body {
			return Err(self.error(ImportWithBody(name)));
		}

		match self.sym.kind(function) {
			SymbolKind::Function => self.merge_declaration(function, signature, qualifiers, has_body)?,
			SymbolKind::NoType => {
				let variadic = signature.variadic;
				let import_index = import.then(|| self.scrip.add_import(&import_name(&name, &signature)));
				let entry = &mut self.sym[function];
				entry.kind = SymbolKind::Function;
				entry.qualifiers = qualifiers;
				entry.signature = Some(signature);
				entry.import_index = import_index;
				entry.flags.set(SymbolFlags::VARIADIC, variadic);
				entry.flags.set(SymbolFlags::IMPORTED, import);
				self.declare_here(function);
			}
			_ => return Err(self.error(AlreadyDefined(name))),
		}

		if has_body {
			self.parse_function_body(function)?;
		}
		Ok(())
	}

	/// A function that has been declared before shows up again.
	fn merge_declaration(
		&mut self,
		function: Symbol,
		signature: FunctionSignature,
		qualifiers: Qualifiers,
		has_body: bool,
	) -> Result<(), ParserError> {
		let name = self.name(function);
		let entry = &self.sym[function];
		let earlier = entry.signature.as_ref().context("function symbol without a signature")?;
		if !earlier.same_shape(&signature) {
			return Err(self.error(SignatureMismatch(name)));
		}
		let import = qualifiers.contains(Qualifiers::IMPORT);
		if entry.flags.contains(SymbolFlags::HAS_BODY) && (has_body || import) {
			return Err(self.error(FunctionRedefined(name)));
		}
		if has_body && entry.is_imported() {
			self.override_import(function)?;
		} else if import && !entry.is_imported() {
			let index = self.scrip.add_import(&import_name(&name, &signature));
			let entry = &mut self.sym[function];
			entry.import_index = Some(index);
			entry.flags |= SymbolFlags::IMPORTED;
		}

		let entry = &mut self.sym[function];
		entry.qualifiers |= qualifiers.difference(Qualifiers::IMPORT);
		if let Some(earlier) = entry.signature.as_mut() {
			for (index, default) in signature.param_defaults.iter().enumerate() {
				if default.is_some() {
					earlier.param_defaults[index] = *default;
				}
			}
			if has_body {
				earlier.param_names = signature.param_names;
				earlier.param_readonly = signature.param_readonly;
			}
		}
		Ok(())
	}

	/// A local definition replaces an import of the same name, as long as no
	/// code refers to the import yet.
	pub(super) fn override_import(&mut self, symbol: Symbol) -> Result<(), ParserError> {
		let name = self.name(symbol);
		if self.options.contains(CompileOptions::NO_IMPORT_OVERRIDE) {
			return Err(self.error(AlreadyImported(name)));
		}
		if self.sym[symbol].flags.contains(SymbolFlags::ACCESSED) {
			return Err(self.error(ReferencedAsImport(name)));
		}
		debug!("Local definition of {name} replaces its import");
		let entry = &mut self.sym[symbol];
		entry.flags.remove(SymbolFlags::IMPORTED);
		entry.qualifiers.remove(Qualifiers::IMPORT);
		if let Some(index) = entry.import_index.take() {
			self.scrip.remove_import(index);
		}
		Ok(())
	}

	/// `( params )`, the cursor is at `(`.
	pub(super) fn parse_parameters(&mut self, return_type: Vartype) -> Result<FunctionSignature, ParserError> {
		self.expect(Punct::OpenParen, "'('")?;
		let mut signature = FunctionSignature::new(return_type);
		let after = self.src.get(self.src.cursor() + 1);
		if self.src.peek_next() == self.sym.well_known.void && self.sym.is_punct(after, Punct::CloseParen) {
			self.src.get_next();
		}
		if self.next_if(Punct::CloseParen) {
			return Ok(signature);
		}

		loop {
			if self.next_if(Punct::Ellipsis) {
				signature.variadic = true;
				if !self.next_if(Punct::CloseParen) {
					return Err(self.error(EllipsisNotLast));
				}
				return Ok(signature);
			}

			let qualifiers = self.parse_qualifiers();
			self.check_qualifiers(qualifiers, Qualifiers::CONST | Qualifiers::READONLY, "in a parameter list")?;
			let type_sym = self.src.get_next();
			if !self.sym.is_vartype(type_sym) {
				return Err(self.error(ExpectedVartype(self.name(type_sym))));
			}
			if type_sym == self.sym.well_known.void {
				return Err(self.error(VoidParameter));
			}
			let mut vartype = self.parse_vartype(type_sym, qualifiers.contains(Qualifiers::CONST))?;

			let candidate = self.src.peek_next();
			let name = match self.sym.kind(candidate) {
				SymbolKind::NoType if !candidate.is_eof() => Some(self.src.get_next()),
				SymbolKind::GlobalVar
				| SymbolKind::LocalVar
				| SymbolKind::Function
				| SymbolKind::Constant
				| SymbolKind::Vartype => {
					self.src.get_next();
					return Err(self.error(AlreadyDefined(self.name(candidate))));
				}
				_ => None,
			};
			if self.next_if(Punct::OpenBracket) {
				self.expect(Punct::CloseBracket, "']'")?;
				vartype = vartype.dynarray();
			}
			self.check_parameter_type(&vartype)?;
			let default = match self.peek_kind() {
				SymbolKind::Assign => {
					self.src.get_next();
					Some(self.parse_default_value(&vartype)?)
				}
				_ => None,
			};

			signature.param_types.push(vartype);
			signature.param_defaults.push(default);
			signature.param_names.push(name);
			signature.param_readonly.push(qualifiers.contains(Qualifiers::READONLY));

			let next = self.src.get_next();
			match self.sym.kind(next) {
				SymbolKind::Punct(Punct::Comma) => continue,
				SymbolKind::Punct(Punct::CloseParen) => return Ok(signature),
				_ => return Err(self.expected("',' or ')'", next)),
			}
		}
	}

	/// The cursor is at the `{` opening the body.
	fn parse_function_body(&mut self, function: Symbol) -> Result<(), ParserError> {
		let name = self.name(function);
		let entry = &self.sym[function];
		let signature = entry.signature.clone().context("function symbol without a signature")?;
		let owner = entry.owner;
		let is_static = entry.qualifiers.contains(Qualifiers::STATIC);
		let loop_check_off = entry.qualifiers.contains(Qualifiers::NOLOOPCHECK);
		debug!("Compiling function {name}");

		self.scrip.reset_line();
		if self.options.contains(CompileOptions::LINE_NUMBERS) {
			self.scrip.set_line(self.src.lineno());
		}
		let offset = self.scrip.add_function(&name, signature.num_params());
		let entry = &mut self.sym[function];
		entry.offset = offset as i32;
		entry.flags |= SymbolFlags::HAS_BODY;
		self.resolve_calls_to(function, offset);

		self.scrip.cur_sp = 0;
		self.scrip.write_cmd1(Opcode::ThisBase, offset as i32);
		if loop_check_off {
			self.scrip.write_cmd0(Opcode::LoopCheckOff);
		}
		self.function = Some(FunctionContext {
			symbol: function,
			this_type: owner.filter(|_| !is_static),
			owner,
			return_type: signature.return_type.clone(),
		});
		self.nesting = 1;

		// The caller pushed the arguments last to first, then the return
		// address: parameter i sits 4 * (i + 2) bytes below the entry depth.
		for (index, (param, vartype)) in signature.param_names.iter().zip(&signature.param_types).enumerate() {
			let Some(param) = *param else {
				return Err(self.error(ParamNeedsName(index + 1)));
			};
			if self.sym.kind(param) != SymbolKind::NoType {
				return Err(self.error(AlreadyDefined(self.name(param))));
			}
			let offset = -4 * (index as i32 + 2);
			let readonly = signature.param_readonly.get(index).copied().unwrap_or(false);
			let entry = &mut self.sym[param];
			entry.kind = SymbolKind::LocalVar;
			if readonly {
				entry.qualifiers = Qualifiers::READONLY;
			}
			entry.vartype = Some(vartype.clone());
			entry.offset = offset;
			entry.size = 4;
			entry.scope_level = 1;
			self.locals.push(param);
			if vartype.is_handle() {
				self.scrip.load_sp_offs(offset);
				self.scrip.write_cmd1(Opcode::MemRead, Register::Ax as i32);
				self.scrip.write_cmd1(Opcode::MemInitPtr, Register::Ax as i32);
			}
		}

		self.expect(Punct::OpenBrace, "'{'")?;
		while !self.peek_is(Punct::CloseBrace) {
			if self.src.reached_eof() {
				return Err(self.expected("'}'", Symbol::EOF));
			}
			self.parse_statement()?;
		}
		self.src.get_next();

		self.scrip.write_lit(Register::Ax, 0);
		self.exit_scope(0);
		self.scrip.write_cmd0(Opcode::Ret);
		self.function = None;
		self.nesting = 0;
		self.loops.clear();
		Ok(())
	}

	fn resolve_calls_to(&mut self, function: Symbol, offset: usize) {
		let scrip = &mut self.scrip;
		self.pending_calls.retain(|call| {
			if call.function != function {
				return true;
			}
			scrip.patch(call.operand, offset as i32);
			false
		});
	}

	/// Call `function` with the arguments in parentheses at `pos`. For member
	/// functions called on an object, `object` is set and MAR holds the
	/// object.
	pub(super) fn call_function(
		&mut self,
		expr: &SrcList<'a>,
		pos: &mut usize,
		function: Symbol,
		object: bool,
	) -> Result<Vartype, ParserError> {
		let name = self.name(function);
		if !self.sym.is_punct(expr[*pos], Punct::OpenParen) {
			return Err(self.expected("'(' after a function name", expr[*pos]));
		}
		let close = self.find_closer(expr, *pos).ok_or_else(|| self.expected("')'", Symbol::EOF))?;
		let args_view = expr.sub_view(*pos + 1, close);
		*pos = close + 1;
		let args = if args_view.is_empty() { vec![] } else { self.split_top_level(&args_view, Punct::Comma) };

		let entry = &self.sym[function];
		let signature = entry.signature.clone().context("function symbol without a signature")?;
		let import = entry.import_index.filter(|_| entry.is_imported());
		let body = entry.flags.contains(SymbolFlags::HAS_BODY).then_some(entry.offset);
		if args.len() < signature.required_args() {
			return Err(self.error(NotEnoughArgs(name)));
		}
		if args.len() > signature.num_params() && !signature.variadic {
			return Err(self.error(TooManyArgs(name)));
		}
		if args.iter().any(SrcList::is_empty) {
			return Err(self.error(ExpectedExpression));
		}

		let object_slot = object.then(|| {
			self.scrip.push_reg(Register::Op);
			let slot = self.scrip.cur_sp;
			self.scrip.push_reg(Register::Mar);
			slot
		});

		let total = args.len().max(signature.num_params());
		for index in (0..total).rev() {
			match args.get(index) {
				Some(arg) => {
					let vartype = self.parse_expression(arg.clone())?;
					if let Some(param) = signature.param_types.get(index) {
						self.convert(&vartype, param)?;
					}
				}
				None => {
					let value = signature.param_default_value(index).context("missing argument without default")?;
					self.scrip.write_lit(Register::Ax, value);
				}
			}
			if import.is_some() {
				self.scrip.write_cmd1(Opcode::PushReal, Register::Ax as i32);
			} else {
				self.scrip.push_reg(Register::Ax);
			}
		}

		if let Some(slot) = object_slot {
			self.scrip.load_sp_offs(slot);
			self.scrip.write_cmd1(Opcode::MemRead, Register::Ax as i32);
			self.scrip.write_cmd1(Opcode::CallObj, Register::Ax as i32);
		}
		let argc = total as i32;
		match import {
			Some(index) => {
				self.scrip.write_cmd1(Opcode::NumFuncArgs, argc);
				self.scrip.write_lit(Register::Ax, index as i32);
				self.scrip.fixup_previous(FixupKind::Import);
				self.scrip.write_cmd1(Opcode::CallExt, Register::Ax as i32);
				if argc > 0 {
					self.scrip.write_cmd1(Opcode::SubRealStack, argc);
				}
			}
			None => {
				if signature.variadic {
					self.scrip.write_cmd1(Opcode::NumFuncArgs, argc);
				}
				self.scrip.write_lit(Register::Ax, body.unwrap_or(0));
				self.scrip.fixup_previous(FixupKind::Function);
				if body.is_none() {
					self.pending_calls.push(PendingCall {
						function,
						operand: self.scrip.codesize() - 1,
						line: self.src.lineno(),
						section: self.src.section().to_string(),
					});
				}
				self.scrip.write_cmd1(Opcode::Call, Register::Ax as i32);
				self.scrip.free_stack(4 * argc);
			}
		}
		if object_slot.is_some() {
			self.scrip.pop_reg(Register::Bx);
			self.scrip.pop_reg(Register::Op);
		}
		self.sym[function].flags |= SymbolFlags::ACCESSED;
		Ok(signature.return_type)
	}
}

#[cfg(test)]
mod tests {
	use super::super::tests::{compile, compile_with, message, opcodes};
	use crate::{
		compiled_script::{ExportKind, FixupKind, Opcode},
		compiler::CompileOptions,
	};

	#[test]
	fn function_frame() {
		let scrip = compile("int f(int a, int b) { return a; }").unwrap();
		assert_eq!(scrip.functions.len(), 1);
		assert_eq!(scrip.functions[0].name, "f");
		assert_eq!(scrip.functions[0].num_args, 2);
		let ops = opcodes(&scrip);
		assert_eq!(ops[0], Opcode::ThisBase);
		assert_eq!(&ops[1..3], [Opcode::LoadSpOffs, Opcode::MemRead]);
		assert_eq!(ops[3], Opcode::Ret);
		// `return a`: a is 8 bytes below the entry depth
		assert_eq!(scrip.code[3], 8);
		assert_eq!(ops.last(), Some(&Opcode::Ret));
	}

	#[test]
	fn imports_are_named_with_their_arity() {
		let scrip = compile("import int Random(int max);\nimport void Display(const string, ...);").unwrap();
		assert_eq!(scrip.imports, ["Random^1", "Display^101"]);
		assert!(scrip.code.is_empty());
	}

	#[test]
	fn calls_to_imports() {
		let scrip = compile("import int Random(int max);\nint f() { return Random(5); }").unwrap();
		let ops = opcodes(&scrip);
		let expected = [
			Opcode::LitToReg,
			Opcode::PushReal,
			Opcode::NumFuncArgs,
			Opcode::LitToReg,
			Opcode::CallExt,
			Opcode::SubRealStack,
		];
		assert!(ops.windows(expected.len()).any(|w| w == expected), "{ops:?}");
		assert_eq!(scrip.fixups.iter().filter(|f| f.kind == FixupKind::Import).count(), 1);
	}

	#[test]
	fn forward_calls_are_patched() {
		let scrip = compile("int g();\nint f() { return g(); }\nint g() { return 7; }").unwrap();
		let g = scrip.functions.iter().find(|f| f.name == "g").unwrap().offset;
		let fixup = scrip.fixups.iter().find(|f| f.kind == FixupKind::Function).unwrap();
		assert_eq!(scrip.code[fixup.offset], g as i32);
	}

	#[test]
	fn never_defined_functions_are_reported() {
		assert_eq!(message("int g();\nint f() { return g(); }"), "Function 'g' is called but never defined");
	}

	#[test]
	fn default_arguments_fill_in() {
		let scrip = compile("int g(int a, int b = 5) { return b; }\nint f() { return g(1); }").unwrap();
		let f = scrip.functions.iter().find(|f| f.name == "f").unwrap().offset;
		let code = &scrip.code[f..];
		// the default is pushed first, the call pops both arguments
		assert_eq!(&code[2..5], [Opcode::LitToReg as i32, 3, 5]);
		assert!(code.windows(3).any(|w| w == [Opcode::Sub as i32, 1, 8]));
	}

	#[test]
	fn argument_count_is_checked() {
		assert_eq!(message("int g(int a);\nint f() { return g(); }"), "Not enough parameters in call to function 'g'");
		assert_eq!(message("import int g(int a);\nint f() { return g(1, 2); }"), "Too many parameters in call to function 'g'");
	}

	#[test]
	fn import_override() {
		let scrip = compile("import int f(int a);\nint f(int a) { return a; }").unwrap();
		assert_eq!(scrip.imports, [""]);
		assert_eq!(scrip.functions[0].name, "f");

		let err = compile_with("import int f(int a);\nint f(int a) { return a; }", CompileOptions::NO_IMPORT_OVERRIDE)
			.unwrap_err();
		assert!(err.to_string().contains("'f' is already imported"));

		assert_eq!(
			message("import int f(int a);\nint g() { return f(1); }\nint f(int a) { return a; }"),
			"Already referenced name as import; you must define 'f' before using it"
		);
	}

	#[test]
	fn redeclarations_must_match() {
		assert_eq!(message("int f(int a);\nint f(float a) { return 0; }"), "Function 'f' does not match its earlier declaration");
		assert_eq!(message("int f() { return 0; }\nint f() { return 1; }"), "Function 'f' is already defined");
		assert_eq!(message("import int f() { return 0; }"), "Imported function 'f' cannot have a body");
	}

	#[test]
	fn definitions_need_parameter_names() {
		assert_eq!(message("int f(int) { return 0; }"), "Parameter 1 of a function definition must have a name");
		assert!(compile("int f(int);").is_ok());
	}

	#[test]
	fn exports() {
		let scrip = compile("int counter;\nint f(int a) { return a; }\nexport counter, f;").unwrap();
		let exports: Vec<_> = scrip.exports.iter().map(|e| (e.name.as_str(), e.kind)).collect();
		assert_eq!(exports, [("counter", ExportKind::Data), ("f$1", ExportKind::Function)]);

		let scrip = compile_with("void a() {}\nvoid b(int x) {}", CompileOptions::EXPORT_ALL).unwrap();
		let names: Vec<_> = scrip.exports.iter().map(|e| e.name.as_str()).collect();
		assert_eq!(names, ["a$0", "b$1"]);

		assert_eq!(
			message("import int f();\nexport f;"),
			"Can only export global variables and functions defined in this script, not 'f'"
		);
	}

	#[test]
	fn loop_check_off() {
		let scrip = compile("noloopcheck void f() { }").unwrap();
		assert_eq!(&opcodes(&scrip)[..2], [Opcode::ThisBase, Opcode::LoopCheckOff]);
	}
}
