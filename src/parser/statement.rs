use anyhow::Context;

use super::{LoopContext, Parser, access::Location};
use crate::{
	compiled_script::{Opcode, Register},
	compiler::CompileOptions,
	error::parser::{ParseErrorType::*, ParserError},
	symbol_table::{Keyword, Operator, Punct, Qualifiers, Symbol, SymbolKind, Vartype},
	token_stream::SrcList,
};

impl<'a> Parser<'a> {
	/// One statement inside a function body.
	pub(super) fn parse_statement(&mut self) -> Result<(), ParserError> {
		if self.options.contains(CompileOptions::LINE_NUMBERS) {
			self.scrip.set_line(self.src.line_at(self.src.cursor()));
		}
		let symbol = self.src.peek_next();
		match self.sym.kind(symbol) {
			SymbolKind::Punct(Punct::OpenBrace) => {
				self.src.get_next();
				self.parse_block()
			}
			SymbolKind::Punct(Punct::Semicolon) => {
				self.src.get_next();
				Ok(())
			}
			SymbolKind::Keyword(keyword) => self.parse_keyword_statement(keyword),
			SymbolKind::Vartype | SymbolKind::UndefinedStruct
				if !self.sym.is_punct(self.src.get(self.src.cursor() + 1), Punct::Dot) =>
			{
				self.src.get_next();
				self.parse_local_declaration(symbol, Qualifiers::empty())
			}
			_ => {
				let start = self.src.cursor();
				let statement = match self.until(Punct::Semicolon, "';'") {
					Ok(statement) => statement,
					// e.g. a misspelt keyword in front of a block
					Err(_) if self.sym.kind(symbol) == SymbolKind::NoType && !symbol.is_eof() => {
						self.src.set_cursor(start + 1);
						return Err(self.error(Undefined(self.name(symbol))));
					}
					Err(e) => return Err(e),
				};
				self.parse_simple_statement(statement)?;
				self.src.get_next();
				Ok(())
			}
		}
	}

	/// Whether the statement at the cursor declares local variables.
	fn at_declaration(&self) -> bool {
		let symbol = self.src.peek_next();
		match self.sym.kind(symbol) {
			SymbolKind::Keyword(keyword) => keyword.qualifier().is_some(),
			SymbolKind::Vartype | SymbolKind::UndefinedStruct => {
				!self.sym.is_punct(self.src.get(self.src.cursor() + 1), Punct::Dot)
			}
			_ => false,
		}
	}

	fn parse_keyword_statement(&mut self, keyword: Keyword) -> Result<(), ParserError> {
		if keyword.qualifier().is_some() {
			let qualifiers = self.parse_qualifiers();
			self.check_qualifiers(qualifiers, Qualifiers::CONST | Qualifiers::READONLY, "inside a function body")?;
			let type_sym = self.src.get_next();
			if !self.sym.is_vartype(type_sym) {
				return Err(self.error(ExpectedVartype(self.name(type_sym))));
			}
			return self.parse_local_declaration(type_sym, qualifiers);
		}
		match keyword {
			Keyword::This | Keyword::New => {
				let statement = self.until(Punct::Semicolon, "';'")?;
				self.parse_simple_statement(statement)?;
				self.src.get_next();
				return Ok(());
			}
			_ => {}
		}
		let symbol = self.src.get_next();
		match keyword {
			Keyword::If => self.parse_if(),
			Keyword::While => self.parse_while(),
			Keyword::Do => self.parse_do_while(),
			Keyword::For => self.parse_for(),
			Keyword::Switch => self.parse_switch(),
			Keyword::Return => self.parse_return(),
			Keyword::Break | Keyword::Continue => self.parse_loop_jump(keyword),
			Keyword::Case | Keyword::Default => Err(self.error(OutsideSwitch(self.name(symbol)))),
			_ => Err(self.unexpected(symbol)),
		}
	}

	/// Statements up to the closing `}`, the `{` has been consumed.
	fn parse_block(&mut self) -> Result<(), ParserError> {
		self.nesting += 1;
		while !self.peek_is(Punct::CloseBrace) {
			if self.src.reached_eof() {
				return Err(self.expected("'}'", Symbol::EOF));
			}
			self.parse_statement()?;
		}
		self.src.get_next();
		self.exit_scope(self.nesting - 1);
		self.nesting -= 1;
		Ok(())
	}

	/// The body of `if`, `else` and the loops gets a scope of its own.
	fn parse_controlled_statement(&mut self) -> Result<(), ParserError> {
		self.nesting += 1;
		self.parse_statement()?;
		self.exit_scope(self.nesting - 1);
		self.nesting -= 1;
		Ok(())
	}

	/// Emit the release of managed handles held by locals deeper than
	/// `level`. Returns the stack size those locals take up.
	fn release_locals(&mut self, level: usize) -> i32 {
		let mut released = vec![];
		for &local in self.locals.iter().rev() {
			let entry = &self.sym[local];
			if entry.scope_level <= level {
				break;
			}
			if let Some(vartype) = &entry.vartype {
				released.push((entry.offset, entry.size, vartype.clone()));
			}
		}

		let mut size = 0;
		for (offset, local_size, vartype) in released {
			if vartype.is_handle() {
				self.scrip.load_sp_offs(offset);
				self.scrip.write_cmd0(Opcode::MemZeroPtr);
			} else if vartype.is_pointer() {
				for element in 0..vartype.array.unwrap_or(0) {
					self.scrip.load_sp_offs(offset + 4 * element as i32);
					self.scrip.write_cmd0(Opcode::MemZeroPtr);
				}
			}
			// parameters belong to the caller's part of the stack
			if offset >= 0 {
				size += local_size as i32;
			}
		}
		size
	}

	/// Leave all scopes deeper than `level`.
	pub(super) fn exit_scope(&mut self, level: usize) {
		let size = self.release_locals(level);
		self.scrip.free_stack(size);
		while let Some(&local) = self.locals.last() {
			if self.sym[local].scope_level <= level {
				break;
			}
			self.sym[local].clear();
			self.locals.pop();
		}
	}

	/// Release the locals deeper than `level` on a path that jumps away.
	/// The compile time stack depth stays as it is for the code that follows.
	fn unwind_to(&mut self, level: usize) {
		let size = self.release_locals(level);
		if size > 0 {
			self.scrip.write_cmd2(Opcode::Sub, Register::Sp as i32, size);
		}
	}

	fn parse_local_declaration(&mut self, type_sym: Symbol, qualifiers: Qualifiers) -> Result<(), ParserError> {
		let vartype = self.parse_vartype(type_sym, qualifiers.contains(Qualifiers::CONST))?;
		loop {
			let name = self.src.get_next();
			self.expect_identifier(name)?;
			if self.sym.kind(name) != SymbolKind::NoType {
				return Err(self.error(AlreadyDefined(self.name(name))));
			}
			let mut vartype = vartype.clone();
			self.parse_array_suffix(&mut vartype)?;
			self.check_variable_type(&vartype)?;
			self.declare_local(name, vartype, qualifiers)?;

			let next = self.src.get_next();
			match self.sym.kind(next) {
				SymbolKind::Punct(Punct::Comma) => continue,
				SymbolKind::Punct(Punct::Semicolon) => return Ok(()),
				_ => return Err(self.expected("',' or ';'", next)),
			}
		}
	}

	/// Allocate `name` on the stack, initialized from the expression after
	/// `=` or zeroed.
	fn declare_local(&mut self, name: Symbol, vartype: Vartype, qualifiers: Qualifiers) -> Result<(), ParserError> {
		let size = self.variable_size(&vartype, name)?;
		let offset = self.scrip.cur_sp;
		if offset.checked_add(size).is_none() {
			return Err(self.error(VariableTooLarge { name: self.name(name), size: size as usize }));
		}
		if self.peek_kind() == SymbolKind::Assign {
			self.src.get_next();
			if vartype.is_array() {
				return Err(self.error(ArrayAsValue(self.name(name))));
			}
			if self.sym.is_old_string(&vartype) {
				return Err(self.error(NotAssignable(self.name(name))));
			}
			let init = self.until_any(&[Punct::Comma, Punct::Semicolon], "';'")?;
			let value = self.parse_expression(init)?;
			self.convert(&value, &vartype)?;
			self.scrip.write_reg2(Opcode::RegToReg, Register::Sp, Register::Mar);
			self.write_ax_to_mar(&vartype, true);
		} else {
			self.scrip.write_reg2(Opcode::RegToReg, Register::Sp, Register::Mar);
			self.scrip.write_cmd1(Opcode::ZeroMemory, size);
		}
		self.scrip.write_cmd2(Opcode::Add, Register::Sp as i32, size);
		self.scrip.cur_sp += size;

		let entry = &mut self.sym[name];
		entry.kind = SymbolKind::LocalVar;
		entry.vartype = Some(vartype);
		entry.qualifiers = qualifiers.intersection(Qualifiers::READONLY);
		entry.offset = offset;
		entry.size = size as usize;
		entry.scope_level = self.nesting;
		self.locals.push(name);
		self.declare_here(name);
		Ok(())
	}

	/// `( condition )` of `if` and the loops, left in AX.
	fn parse_condition(&mut self) -> Result<(), ParserError> {
		let condition = self.parenthesized()?;
		let vartype = self.parse_expression(condition)?;
		self.check_condition(&vartype)
	}

	fn parse_if(&mut self) -> Result<(), ParserError> {
		self.parse_condition()?;
		let skip_then = self.scrip.write_jump(Opcode::Jz);
		self.parse_controlled_statement()?;
		if self.sym.is_keyword(self.src.peek_next(), Keyword::Else) {
			self.src.get_next();
			let skip_else = self.scrip.write_jump(Opcode::Jmp);
			self.scrip.patch_jump(skip_then, self.scrip.codesize());
			self.parse_controlled_statement()?;
			self.scrip.patch_jump(skip_else, self.scrip.codesize());
		} else {
			self.scrip.patch_jump(skip_then, self.scrip.codesize());
		}
		Ok(())
	}

	fn enter_loop(&mut self) {
		self.loops.push(LoopContext { level: self.nesting, switch: false, breaks: vec![], continues: vec![] });
	}

	/// Point the loop's pending jumps at their targets.
	fn leave_loop(&mut self, end: usize, continue_target: usize) -> Result<(), ParserError> {
		let context = self.loops.pop().context("loop context missing")?;
		for operand in context.breaks {
			self.scrip.patch_jump(operand, end);
		}
		for operand in context.continues {
			self.scrip.patch_jump(operand, continue_target);
		}
		Ok(())
	}

	fn parse_while(&mut self) -> Result<(), ParserError> {
		let start = self.scrip.codesize();
		self.parse_condition()?;
		let exit = self.scrip.write_jump(Opcode::Jz);
		self.enter_loop();
		self.parse_controlled_statement()?;
		self.scrip.write_jump_to(Opcode::Jmp, start);
		let end = self.scrip.codesize();
		self.scrip.patch_jump(exit, end);
		self.leave_loop(end, start)
	}

	fn parse_do_while(&mut self) -> Result<(), ParserError> {
		let start = self.scrip.codesize();
		self.enter_loop();
		self.parse_controlled_statement()?;
		let symbol = self.src.get_next();
		if !self.sym.is_keyword(symbol, Keyword::While) {
			return Err(self.expected("'while'", symbol));
		}
		let condition = self.scrip.codesize();
		self.parse_condition()?;
		self.scrip.write_jump_to(Opcode::Jnz, start);
		self.expect(Punct::Semicolon, "';'")?;
		self.leave_loop(self.scrip.codesize(), condition)
	}

	/// `for (init; condition; step) body`. The step is compiled before the
	/// body and jumped over:
	///
	/// ```text
	///     init
	/// cond:
	///     condition; jz end; jmp body
	/// step:
	///     step; jmp cond
	/// body:
	///     body; jmp step
	/// end:
	/// ```
	fn parse_for(&mut self) -> Result<(), ParserError> {
		self.expect(Punct::OpenParen, "'('")?;
		self.nesting += 1;

		let next = self.src.peek_next();
		let declaration = self.sym.is_vartype(next) && !self.sym.is_punct(self.src.get(self.src.cursor() + 1), Punct::Dot);
		if declaration {
			self.src.get_next();
			self.parse_local_declaration(next, Qualifiers::empty())?;
		} else if !self.next_if(Punct::Semicolon) {
			let init = self.until(Punct::Semicolon, "';'")?;
			self.parse_simple_statement(init)?;
			self.src.get_next();
		}

		let condition_start = self.scrip.codesize();
		let condition = self.until(Punct::Semicolon, "';'")?;
		self.src.get_next();
		let exit = if condition.is_empty() {
			None
		} else {
			let vartype = self.parse_expression(condition)?;
			self.check_condition(&vartype)?;
			Some(self.scrip.write_jump(Opcode::Jz))
		};

		let step = self.until(Punct::CloseParen, "')'")?;
		self.src.get_next();
		let to_body = self.scrip.write_jump(Opcode::Jmp);
		let step_start = self.scrip.codesize();
		if !step.is_empty() {
			self.parse_simple_statement(step)?;
		}
		self.scrip.write_jump_to(Opcode::Jmp, condition_start);
		self.scrip.patch_jump(to_body, self.scrip.codesize());

		self.enter_loop();
		self.parse_controlled_statement()?;
		self.scrip.write_jump_to(Opcode::Jmp, step_start);
		let end = self.scrip.codesize();
		if let Some(exit) = exit {
			self.scrip.patch_jump(exit, end);
		}
		self.leave_loop(end, step_start)?;

		self.exit_scope(self.nesting - 1);
		self.nesting -= 1;
		Ok(())
	}

	/// `switch (selector) { case a: ... default: ... }`. The selector waits
	/// in BX. Each `case` tests it inline, falling through skips the test:
	///
	/// ```text
	///     selector; mov ax bx; jmp test1
	/// test1:
	///     a == bx; jz test2
	/// body1:
	///     ...; jmp body2
	/// test2:
	///     ...
	/// tail:
	///     jmp default
	/// end:
	/// ```
	fn parse_switch(&mut self) -> Result<(), ParserError> {
		let selector = self.parenthesized()?;
		let selector_type = self.parse_expression(selector)?;
		if selector_type.base == self.sym.well_known.void {
			return Err(self.error(VoidValue));
		}
		self.scrip.write_reg2(Opcode::RegToReg, Register::Ax, Register::Bx);
		self.expect(Punct::OpenBrace, "'{'")?;
		self.loops.push(LoopContext { level: self.nesting, switch: true, breaks: vec![], continues: vec![] });
		self.nesting += 1;

		let mut next_test = Some(self.scrip.write_jump(Opcode::Jmp));
		let mut default = None;
		let mut labelled = false;
		loop {
			let symbol = self.src.peek_next();
			match self.sym.kind(symbol) {
				SymbolKind::Punct(Punct::CloseBrace) => break,
				SymbolKind::Keyword(Keyword::Case) => {
					self.src.get_next();
					let case = self.src.cursor() - 1;
					let Some(colon) = self.find_ternary_colon(&self.src, case) else {
						self.src.set_cursor(self.src.len());
						return Err(self.expected("':'", Symbol::EOF));
					};
					let value = self.src.sub_view(case + 1, colon);
					self.src.set_cursor(colon + 1);

					let to_body = labelled.then(|| self.scrip.write_jump(Opcode::Jmp));
					if let Some(jump) = next_test.take() {
						self.scrip.patch_jump(jump, self.scrip.codesize());
					}
					self.scrip.push_reg(Register::Bx);
					let case_type = self.parse_expression(value)?;
					self.scrip.pop_reg(Register::Bx);
					let comparable = self.is_assignable(&case_type, &selector_type)
						|| (self.is_string_like(&case_type) && self.is_string_like(&selector_type));
					if !comparable {
						return Err(self.error(TypeMismatch {
							from: self.sym.vartype_name(&case_type),
							to:   self.sym.vartype_name(&selector_type),
						}));
					}
					self.emit_binary(Operator::Eq, symbol, &case_type, &selector_type, Register::Ax, Register::Bx)?;
					next_test = Some(self.scrip.write_jump(Opcode::Jz));
					if let Some(to_body) = to_body {
						self.scrip.patch_jump(to_body, self.scrip.codesize());
					}
					labelled = true;
				}
				SymbolKind::Keyword(Keyword::Default) => {
					self.src.get_next();
					if default.is_some() {
						return Err(self.error(DuplicateDefault));
					}
					self.expect(Punct::Colon, "':'")?;
					default = Some(self.scrip.codesize());
					labelled = true;
				}
				_ if self.src.reached_eof() => return Err(self.expected("'}'", Symbol::EOF)),
				_ if !labelled => return Err(self.expected("'case' or 'default'", symbol)),
				_ if self.at_declaration() => return Err(self.error(DeclarationInSwitch)),
				_ => self.parse_statement()?,
			}
		}
		self.src.get_next();

		let to_end = self.scrip.write_jump(Opcode::Jmp);
		if let Some(jump) = next_test {
			self.scrip.patch_jump(jump, self.scrip.codesize());
		}
		if let Some(default) = default {
			self.scrip.write_jump_to(Opcode::Jmp, default);
		}
		let end = self.scrip.codesize();
		self.scrip.patch_jump(to_end, end);
		self.nesting -= 1;
		self.leave_loop(end, end)
	}

	fn parse_return(&mut self) -> Result<(), ParserError> {
		let return_type = self.function.as_ref().map(|f| f.return_type.clone()).context("'return' outside of a function")?;
		let value = self.until(Punct::Semicolon, "';'")?;
		self.src.get_next();
		let returns_void = return_type.base == self.sym.well_known.void;
		match (value.is_empty(), returns_void) {
			(true, true) => {}
			(true, false) => return Err(self.error(MissingReturnValue)),
			(false, true) => return Err(self.error(ReturnValueFromVoid)),
			(false, false) => {
				let vartype = self.parse_expression(value)?;
				self.convert(&vartype, &return_type)?;
			}
		}
		self.unwind_to(0);
		self.scrip.write_cmd0(Opcode::Ret);
		Ok(())
	}

	fn parse_loop_jump(&mut self, keyword: Keyword) -> Result<(), ParserError> {
		let is_break = keyword == Keyword::Break;
		let name = if is_break { "break" } else { "continue" };
		let Some(target) = self.loops.iter().rposition(|l| is_break || !l.switch) else {
			return Err(self.error(OutsideLoop(name.to_string())));
		};
		self.expect(Punct::Semicolon, "';'")?;
		self.unwind_to(self.loops[target].level);
		let operand = self.scrip.write_jump(Opcode::Jmp);
		let context = &mut self.loops[target];
		if is_break { context.breaks.push(operand) } else { context.continues.push(operand) }
		Ok(())
	}

	/// Assignment, compound assignment, increment or a call.
	pub(super) fn parse_simple_statement(&mut self, statement: SrcList<'a>) -> Result<(), ParserError> {
		if statement.is_empty() {
			return Err(self.error(ExpectedExpression));
		}
		let assignment = self.find_top_level(&statement, 0, |k| {
			matches!(k, SymbolKind::Assign | SymbolKind::CompoundAssign(_) | SymbolKind::Crement(_))
		});
		let Some(pos) = assignment else {
			let calls = statement.symbols().iter().any(|&s| self.sym.is_punct(s, Punct::OpenParen));
			if !calls {
				return Err(self.error(NoEffect));
			}
			self.parse_expression(statement)?;
			return Ok(());
		};

		let operator = statement[pos];
		let len = statement.len();
		match self.sym.kind(operator) {
			SymbolKind::Assign => {
				let value = statement.sub_view(pos + 1, len);
				let vartype = self.parse_expression(value)?;
				self.scrip.push_reg(Register::Ax);
				let location = self.access(&statement.sub_view(0, pos))?;
				self.scrip.pop_reg(Register::Ax);
				self.write_location(&location, &vartype)
			}
			SymbolKind::CompoundAssign(op) => {
				let value = statement.sub_view(pos + 1, len);
				let value_type = self.parse_expression(value)?;
				self.scrip.push_reg(Register::Ax);
				let location = self.access(&statement.sub_view(0, pos))?;
				let current = self.read_location(&location)?;
				self.scrip.pop_reg(Register::Bx);
				let result = self.emit_binary(op, operator, &current, &value_type, Register::Ax, Register::Bx)?;
				self.write_location(&location, &result)
			}
			SymbolKind::Crement(op) => {
				let target = match pos {
					0 => statement.sub_view(1, len),
					_ if pos == len - 1 => statement.sub_view(0, pos),
					_ => return Err(self.unexpected(statement[pos + 1])),
				};
				let location = self.access(&target)?;
				let current = self.read_location(&location)?;
				if !self.sym.is_int_like(&current) {
					return Err(self.error(OperatorType {
						operator: self.name(operator),
						vartype:  self.sym.vartype_name(&current),
					}));
				}
				let step = if op == Operator::Add { Opcode::Add } else { Opcode::Sub };
				self.scrip.write_cmd2(step, Register::Ax as i32, 1);
				self.write_location(&location, &current)
			}
			_ => Err(self.unexpected(operator)),
		}
	}

	/// Store AX, of type `vartype`, into `location`.
	fn write_location(&mut self, location: &Location, vartype: &Vartype) -> Result<(), ParserError> {
		match location {
			Location::Memory { vartype: target, readonly, name } => {
				let shown = self.member_name(*name);
				if *readonly {
					let entry = &self.sym[*name];
					let declared = entry.kind == SymbolKind::LocalVar && entry.qualifiers.contains(Qualifiers::READONLY);
					return Err(self.error(if declared { ReadonlyModified(shown) } else { ReadOnly(shown) }));
				}
				if target.is_array() {
					return Err(self.error(ArrayAsValue(shown)));
				}
				if self.sym.is_old_string(target) || (self.sym.is_struct_type(target.base) && !target.is_handle()) {
					return Err(self.error(NotAssignable(shown)));
				}
				self.convert(vartype, target)?;
				self.write_ax_to_mar(target, false);
				Ok(())
			}
			Location::Attribute { attribute, object } => {
				let entry = &self.sym[*attribute];
				let target = entry.vartype.clone().context("attribute without a type")?;
				let Some(setter) = entry.setter else {
					return Err(self.error(ReadOnly(self.member_name(*attribute))));
				};
				self.convert(vartype, &target)?;
				self.call_accessor(*attribute, setter, *object, true)
			}
			Location::Value(value) => Err(self.error(NotAssignable(self.sym.vartype_name(value)))),
			Location::Type(strct) => Err(self.error(NotAssignable(self.name(*strct)))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::super::tests::{compile, compile_with, instructions, message, opcodes};
	use crate::{compiled_script::Opcode, compiler::CompileOptions, error::parser::ParserError};

	/// Every jump must land on an instruction.
	fn assert_jumps_land(source: &str) {
		let scrip = compile(source).unwrap();
		let instructions = instructions(&scrip);
		let starts: Vec<usize> = instructions.iter().map(|(start, ..)| *start).collect();
		for (start, op, args) in &instructions {
			if matches!(op, Opcode::Jz | Opcode::Jnz | Opcode::Jmp) {
				let target = (*start as i32 + 2 + args[0]) as usize;
				assert!(starts.contains(&target) || target == scrip.codesize(), "{op:?} at {start} to {target}");
			}
		}
	}

	#[test]
	fn control_flow_jumps_land_on_instructions() {
		assert_jumps_land("int f(int a) { if (a) return 1; else return 2; }");
		assert_jumps_land("void f() { int i = 0; while (i < 10) { i++; if (i == 5) break; } }");
		assert_jumps_land("void f() { int i; do { i += 2; if (i < 3) continue; } while (i < 10); }");
		assert_jumps_land("void f() { int s; for (int i = 0; i < 10; i++) { if (i == 3) continue; s += i; } }");
		assert_jumps_land("void f() { for (;;) { break; } }");
	}

	#[test]
	fn while_loops_jump_back() {
		let scrip = compile("void f() { int i; while (i < 10) i++; }").unwrap();
		let backward = instructions(&scrip).into_iter().any(|(_, op, args)| op == Opcode::Jmp && args[0] < 0);
		assert!(backward);
	}

	#[test]
	fn scopes_free_their_locals() {
		let scrip = compile("void f() { int a = 1; { int b; } }").unwrap();
		let frees = instructions(&scrip).into_iter().filter(|(_, op, args)| *op == Opcode::Sub && args[..] == [1, 4]).count();
		assert_eq!(frees, 2);
		assert!(opcodes(&scrip).contains(&Opcode::ZeroMemory));
	}

	#[test]
	fn locals_can_be_redeclared_after_their_scope() {
		assert!(compile("void f() { { int a; } { int a; } }").is_ok());
		assert!(compile("void f() { for (int i = 0; i < 2; i++) { } for (int i = 0; i < 2; i++) { } }").is_ok());
		assert_eq!(message("void f() { int a; int a; }"), "'a' is already defined");
	}

	#[test]
	fn handles_are_released() {
		let scrip = compile("managed struct M { };\nvoid f() { M *m; }").unwrap();
		let ops = opcodes(&scrip);
		let release = [Opcode::LoadSpOffs, Opcode::MemZeroPtr];
		assert!(ops.windows(2).any(|w| w == release), "{ops:?}");
	}

	#[test]
	fn returns_are_checked() {
		assert_eq!(message("void f() { return 1; }"), "Cannot return a value from a 'void' function");
		assert_eq!(message("int f() { return; }"), "This function must return a value");
		assert_eq!(message("void f() { break; }"), "'break' is only allowed inside a loop");
		assert_eq!(message("void f() { continue; }"), "'continue' is only allowed inside a loop");
	}

	#[test]
	fn simple_statements() {
		assert!(compile("void f() { int a; a += 2; a++; --a; a <<= 1; }").is_ok());
		assert_eq!(message("void f() { int a; a == 1; }"), "This expression has no effect");
		assert_eq!(message("void f() { float x; x++; }"), "Operator '++' cannot be applied to 'float'");
		assert_eq!(message("void f() { 5 = 3; }"), "Unexpected '5'");
		assert_eq!(message("void f() { static int a; }"), "'static' is not allowed inside a function body");
	}

	#[test]
	fn line_numbers() {
		let scrip = compile_with("void f()\n{\n  int a;\n  a = 1;\n}", CompileOptions::LINE_NUMBERS).unwrap();
		let lines: Vec<i32> =
			instructions(&scrip).into_iter().filter(|(_, op, _)| *op == Opcode::LineNum).map(|(_, _, args)| args[0]).collect();
		assert_eq!(lines, [1, 3, 4]);
	}

	#[test]
	fn switch_tests_cases_and_falls_through() {
		let source = "int f(int a) { int r; switch (a) { case 1: r = 10; case 2: r += 2; break; default: r = 3; } return r; }";
		assert_jumps_land(source);
		let instructions = instructions(&compile(source).unwrap());
		let tests = instructions.iter().filter(|(_, op, _)| *op == Opcode::IsEqual).count();
		assert_eq!(tests, 2);
		// failing every test jumps back up to the default label
		assert!(instructions.iter().any(|(_, op, args)| *op == Opcode::Jmp && args[0] < 0));

		assert_jumps_land("void f(int a) { switch (a) { } }");
		assert_jumps_land("void f(int a) { switch (a) { default: a = 1; case 1 + 2: { int b = a; } } }");
		assert_jumps_land("void f(int a) { while (a) { switch (a) { case 1: continue; case 2: break; } a--; } }");
	}

	#[test]
	fn switch_errors() {
		assert_eq!(message("void f() { case 1: }"), "'case' is only allowed directly within a 'switch' block");
		assert_eq!(message("void f(int a) { switch (a) { default: default: } }"), "This switch block already has a 'default' label");
		assert_eq!(
			message("void f(int a) { switch (a) { case 1: int b; } }"),
			"Cannot use declarations directly within a switch body, put '{ ... }' around them"
		);
		assert_eq!(message("void f(int a) { switch (a) { a = 1; } }"), "Expected 'case' or 'default' instead of 'a'");
		assert_eq!(message("void f(int a) { switch (a) { case 1.0: } }"), "Type mismatch: cannot convert 'float' to 'int'");
		assert_eq!(message("void f() { switch (1) { case 1: continue; } }"), "'continue' is only allowed inside a loop");
	}

	#[test]
	fn readonly_variables_are_not_modified() {
		let source = "int ReadonlyTest(readonly int ReadOnly) { readonly int A = ReadOnly; int B; B = ReadOnly; int C = \
		              ReadOnly; return ReadOnly + A; }";
		assert!(compile(source).is_ok());
		assert_eq!(
			message("int f(readonly int bar) { bar++; return bar; }"),
			"'bar' is declared 'readonly' and cannot be modified"
		);
		assert_eq!(message("void f() { readonly int a = 1; a = 2; }"), "'a' is declared 'readonly' and cannot be modified");
		assert_eq!(message("void f() { readonly int a[2]; a[0] += 2; }"), "'a' is declared 'readonly' and cannot be modified");
		// the definition decides
		assert!(compile("int f(readonly int bar);\nint f(int bar) { bar = 1; return bar; }").is_ok());
	}

	#[test]
	fn unknown_words_at_statement_start() {
		let Err(ParserError::ParseError(err)) = compile("void f()\n{\n  repeat (3) { }\n}") else {
			panic!("expected a parse error");
		};
		assert_eq!(err.line, 3);
		assert_eq!(err.r#type.to_string(), "Identifier 'repeat' is undeclared");
	}
}
